//! Character-pool password synthesis and strength checking.
//!
//! Two generation paths share one composed alphabet: uniform draws for
//! the classic path, a trigram-frequency random walk for the
//! pronounceable one. Every draw goes through [`crate::rng::range`]
//! rather than a general-purpose RNG facade, so the unbiased-sampling
//! property is a small, directly auditable function.

use crate::policy::{self, Policy, PRONOUNCEABLE, USE_DIGIT, USE_LOWER, USE_SYMBOL, USE_UPPER};
use crate::rng;
use crate::trigram;

pub const STD_LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
pub const STD_UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const STD_DIGITS: &str = "0123456789";
pub const STD_SYMBOLS: &str = "+-=_@#$%^&;:,.<>/~\\[](){}?!|*";

const SUFFICIENT_LENGTH: usize = 12;
const MIN_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Neither a character class nor `PRONOUNCEABLE` was set.
    NoClasses,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    Strong,
    TooShort,
    Weak,
}

/// The composed alphabet a policy draws from. Construction mirrors
/// `CPasswordCharPool`'s constructor: concatenate each enabled class's
/// standard characters, falling back to a user default then the
/// built-in default for symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct CharPool {
    alphabet: Vec<char>,
    pronounceable: bool,
    use_lower: bool,
    use_upper: bool,
    use_digit: bool,
}

impl CharPool {
    /// This crate has no preferences store of its own, so the caller
    /// passes its own default symbol set via `user_default_symbols`, or
    /// `None` to fall back to [`STD_SYMBOLS`].
    pub fn make(policy: &Policy, user_default_symbols: Option<&str>) -> Result<Self, PoolError> {
        let use_lower = policy.flags & USE_LOWER != 0;
        let use_upper = policy.flags & USE_UPPER != 0;
        let use_digit = policy.flags & USE_DIGIT != 0;
        let use_symbol = policy.flags & USE_SYMBOL != 0;
        let pronounceable = policy.flags & PRONOUNCEABLE != 0;

        if !use_lower && !use_upper && !use_digit && !use_symbol && !pronounceable {
            return Err(PoolError::NoClasses);
        }

        let mut alphabet = Vec::new();
        if use_lower {
            alphabet.extend(STD_LOWERCASE.chars());
        }
        if use_upper {
            alphabet.extend(STD_UPPERCASE.chars());
        }
        if use_digit {
            alphabet.extend(STD_DIGITS.chars());
        }
        if use_symbol {
            if !policy.symbols.is_empty() {
                alphabet.extend(policy.symbols.chars());
            } else if let Some(defaults) = user_default_symbols.filter(|s| !s.is_empty()) {
                alphabet.extend(defaults.chars());
            } else {
                alphabet.extend(STD_SYMBOLS.chars());
            }
        }

        Ok(Self {
            alphabet,
            pronounceable,
            use_lower,
            use_upper,
            use_digit,
        })
    }

    fn random_char(&self) -> char {
        let idx = rng::range(self.alphabet.len() as u32) as usize;
        self.alphabet[idx]
    }
}

/// Synthesize a password of `length` characters from `pool`.
///
/// Dispatches to the pronounceable random-walk path when the policy that
/// built `pool` set `PRONOUNCEABLE`; otherwise draws uniformly from the
/// composed alphabet, retrying the whole password (when `length > 4`)
/// until it contains an alpha character (if any alpha class is enabled)
/// and a digit (if digits are enabled).
pub fn make_password(pool: &CharPool, length: usize) -> String {
    if pool.pronounceable {
        return make_pronounceable(pool, length);
    }

    loop {
        let mut has_alpha = !pool.use_lower && !pool.use_upper;
        let mut has_digit = !pool.use_digit;

        let mut password = String::with_capacity(length);
        for _ in 0..length {
            let ch = pool.random_char();
            password.push(ch);
            if ch.is_alphabetic() {
                has_alpha = true;
            }
            if ch.is_ascii_digit() {
                has_digit = true;
            }
        }

        if length <= 4 || (has_alpha && has_digit) {
            return password;
        }
    }
}

fn make_pronounceable(pool: &CharPool, length: usize) -> String {
    if length == 0 {
        return String::new();
    }

    let mut letters: Vec<u8> = Vec::with_capacity(length);

    let sigma = trigram::sigma();
    let mut ranno = rng::range64(sigma);
    let mut sum: u64 = 0;
    'seed: for c1 in 0..26u8 {
        for c2 in 0..26u8 {
            for c3 in 0..26u8 {
                sum += trigram::freq(c1, c2, c3) as u64;
                if sum > ranno {
                    letters.push(c1);
                    if length > 1 {
                        letters.push(c2);
                    }
                    if length > 2 {
                        letters.push(c3);
                    }
                    break 'seed;
                }
            }
        }
    }

    while letters.len() < length.min(3) {
        letters.push(0);
    }

    while letters.len() < length {
        let c1 = letters[letters.len() - 2];
        let c2 = letters[letters.len() - 1];

        let sumfreq: u64 = (0..26u8).map(|c3| trigram::freq(c1, c2, c3) as u64).sum();
        if sumfreq == 0 {
            break;
        }

        ranno = rng::range64(sumfreq);
        sum = 0;
        let mut chosen = None;
        for c3 in 0..26u8 {
            sum += trigram::freq(c1, c2, c3) as u64;
            if sum > ranno {
                chosen = Some(c3);
                break;
            }
        }
        letters.push(chosen.unwrap_or(0));
    }

    letters.truncate(length);

    let mut password: Vec<char> = letters
        .iter()
        .map(|&l| (b'a' + l) as char)
        .collect();

    if pool.use_lower && !pool.use_upper {
        // already all-lowercase
    } else if !pool.use_lower && pool.use_upper {
        for ch in password.iter_mut() {
            *ch = ch.to_ascii_uppercase();
        }
    } else if pool.use_lower && pool.use_upper {
        for ch in password.iter_mut() {
            if rng::range(2) == 1 {
                *ch = ch.to_ascii_uppercase();
            }
        }
    }

    password.into_iter().collect()
}

/// `Strong` if `len >= 12`; `TooShort` if `len < 8`; otherwise `Strong`
/// iff the password has at least one uppercase, one lowercase, and one
/// digit-or-other character, else `Weak`.
pub fn check_password(pw: &str) -> Strength {
    let len = pw.chars().count();
    if len >= SUFFICIENT_LENGTH {
        return Strength::Strong;
    }
    if len < MIN_LENGTH {
        return Strength::TooShort;
    }

    let mut has_upper = false;
    let mut has_lower = false;
    let mut has_digit_or_other = false;

    for ch in pw.chars() {
        if ch.is_lowercase() {
            has_lower = true;
        } else if ch.is_uppercase() {
            has_upper = true;
        } else {
            has_digit_or_other = true;
        }
    }

    if has_upper && has_lower && has_digit_or_other {
        Strength::Strong
    } else {
        Strength::Weak
    }
}

pub use policy::{from_string, to_string};

#[cfg(test)]
mod tests {
    use super::*;

    fn classic_policy(flags: u16, length: u16) -> Policy {
        Policy {
            flags,
            length,
            symbols: String::new(),
        }
    }

    #[test]
    fn classic_password_has_requested_length() {
        let policy = classic_policy(USE_LOWER | USE_UPPER | USE_DIGIT, 16);
        let pool = CharPool::make(&policy, None).unwrap();
        let pw = make_password(&pool, policy.length as usize);
        assert_eq!(pw.chars().count(), 16);
    }

    #[test]
    fn classic_password_distribution_s6() {
        let policy = classic_policy(USE_LOWER | USE_UPPER | USE_DIGIT, 16);
        let pool = CharPool::make(&policy, None).unwrap();

        for _ in 0..2000 {
            let pw = make_password(&pool, 16);
            assert_eq!(pw.chars().count(), 16);
            assert!(pw.chars().any(|c| c.is_alphabetic()));
            assert!(pw.chars().any(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn no_classes_is_an_error() {
        let policy = classic_policy(0, 10);
        assert_eq!(CharPool::make(&policy, None), Err(PoolError::NoClasses));
    }

    #[test]
    fn pronounceable_path_produces_requested_length() {
        let policy = classic_policy(PRONOUNCEABLE | USE_LOWER, 10);
        let pool = CharPool::make(&policy, None).unwrap();
        let pw = make_password(&pool, 10);
        assert_eq!(pw.chars().count(), 10);
        assert!(pw.chars().all(|c| c.is_ascii_alphabetic()));
    }

    #[test]
    fn pronounceable_respects_uppercase_only() {
        let policy = classic_policy(PRONOUNCEABLE | USE_UPPER, 10);
        let pool = CharPool::make(&policy, None).unwrap();
        let pw = make_password(&pool, 10);
        assert!(pw.chars().all(|c| c.is_uppercase()));
    }

    #[test]
    fn check_password_strong_above_twelve() {
        assert_eq!(check_password("aaaaaaaaaaaa"), Strength::Strong);
    }

    #[test]
    fn check_password_too_short_below_eight() {
        assert_eq!(check_password("abc123"), Strength::TooShort);
    }

    #[test]
    fn check_password_weak_when_missing_classes() {
        assert_eq!(check_password("lowercase"), Strength::Weak);
    }

    #[test]
    fn check_password_strong_with_mixed_classes() {
        assert_eq!(check_password("Abcdefg1"), Strength::Strong);
    }
}
