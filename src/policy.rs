//! Password policy struct and its compact 7-hex-character persisted form.
//!
//! Grounded on `original_source/src/core/PWPolicy.cpp`: `POL_STR_ENC_LEN`
//! is 7 (4 hex digits of flags, 3 of length), and any parse failure there
//! collapses to an all-zero policy rather than a partially-applied one.

pub const USE_LOWER: u16 = 0x8000;
pub const USE_UPPER: u16 = 0x4000;
pub const USE_DIGIT: u16 = 0x2000;
pub const USE_SYMBOL: u16 = 0x1000;
pub const PRONOUNCEABLE: u16 = 0x0400;

const ENC_LEN: usize = 7;
const MAX_LENGTH: u16 = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub flags: u16,
    pub length: u16,
    pub symbols: String,
}

impl Policy {
    /// flags == 0 means "fall back to the caller's default policy".
    pub fn empty() -> Self {
        Self {
            flags: 0,
            length: 0,
            symbols: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.flags == 0
    }
}

/// Encode `p` as 7 hex characters: 4 for flags, 3 for length. Callers
/// holding an empty policy still get a well-formed `"0000000"` back;
/// the "collapse to empty" behavior is only a property of decoding.
pub fn to_string(p: &Policy) -> String {
    format!("{:04x}{:03x}", p.flags, p.length.min(MAX_LENGTH))
}

/// Decode a persisted policy string. Any parse failure, a flags field of
/// zero, or a length above 1024 all collapse to [`Policy::empty`],
/// never to a partially valid policy.
pub fn from_string(s: &str) -> Policy {
    if s.len() != ENC_LEN || !s.is_ascii() {
        return Policy::empty();
    }

    let (flags_hex, len_hex) = s.split_at(4);
    let flags = match u16::from_str_radix(flags_hex, 16) {
        Ok(f) => f,
        Err(_) => return Policy::empty(),
    };
    let length = match u16::from_str_radix(len_hex, 16) {
        Ok(l) => l,
        Err(_) => return Policy::empty(),
    };

    if flags == 0 || length > MAX_LENGTH {
        return Policy::empty();
    }

    Policy {
        flags,
        length,
        symbols: String::new(),
    }
}
