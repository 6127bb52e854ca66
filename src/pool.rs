//! Thin public-surface alias for [`crate::password`]: `pool::make` and
//! `pool::check` as the short names callers reach for, while the actual
//! implementation lives in `password.rs` alongside its trigram-driven
//! pronounceable path.

use crate::password::{CharPool, PoolError, Strength};
use crate::policy::Policy;

pub fn make(policy: &Policy) -> Result<CharPool, PoolError> {
    CharPool::make(policy, None)
}

pub fn check(pw: &str) -> Strength {
    crate::password::check_password(pw)
}
