//! The plaintext preamble written at the start of every Lumimaja v3 file.
//!
//! Grounded on `original_source/src/core/PWSfileV3.h` (the `TAGHDR` packed
//! struct plus `ARGON2_TAGLEN`/`HPTAGLEN` constants) and `PWSfileV3.cpp`'s
//! `WriteHeader`/`ReadCBC`-equivalent preamble handling. Everything here is
//! written and read literally, in file order, with no TLV framing of its
//! own: the preamble comes before the TLV world starts.

use crate::bytes::read_u32_le;
use crate::kdf::HPTAG_LEN;

pub const MAGIC: [u8; 4] = *b"LuM3";

/// Size of the fixed plaintext preamble on disk: magic(4) + kdf_variant(1)
/// + aead(1) + hash(1) + salt(32) + t_cost(4) + m_cost_kib(4) + lanes(4)
/// + hptag(16).
pub const PREAMBLE_LEN: usize = 4 + 1 + 1 + 1 + 32 + 4 + 4 + 4 + HPTAG_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfVariant {
    /// A bespoke combined variant not implementable against the
    /// standard Argon2 d/i/id family; reads of this variant always
    /// fail with `Unsupported`.
    Argon2ds,
    Argon2id,
}

impl KdfVariant {
    fn to_byte(self) -> u8 {
        match self {
            KdfVariant::Argon2ds => 0,
            KdfVariant::Argon2id => 1,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(KdfVariant::Argon2ds),
            1 => Some(KdfVariant::Argon2id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadAlgo {
    ChaCha20Poly1305,
}

impl AeadAlgo {
    fn to_byte(self) -> u8 {
        match self {
            AeadAlgo::ChaCha20Poly1305 => 0,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(AeadAlgo::ChaCha20Poly1305),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgo {
    Blake2b,
}

impl HashAlgo {
    fn to_byte(self) -> u8 {
        match self {
            HashAlgo::Blake2b => 0,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(HashAlgo::Blake2b),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreambleError {
    Truncated,
    NotOurFile,
    Unsupported,
}

#[derive(Debug, Clone)]
pub struct PlaintextPreamble {
    pub kdf_variant: KdfVariant,
    pub aead: AeadAlgo,
    pub hash: HashAlgo,
    pub salt: [u8; 32],
    pub t_cost: u32,
    pub m_cost_kib: u32,
    pub lanes: u32,
    pub hptag: [u8; HPTAG_LEN],
}

impl PlaintextPreamble {
    pub fn new_for_write(
        kdf_variant: KdfVariant,
        salt: [u8; 32],
        t_cost: u32,
        m_cost_kib: u32,
        lanes: u32,
        hptag: [u8; HPTAG_LEN],
    ) -> Self {
        Self {
            kdf_variant,
            aead: AeadAlgo::ChaCha20Poly1305,
            hash: HashAlgo::Blake2b,
            salt,
            t_cost,
            m_cost_kib,
            lanes,
            hptag,
        }
    }

    /// The first 7 bytes of the serialized preamble (magic + the three
    /// one-byte algorithm ids), bound into the KDF call so that changing
    /// any of them changes the derived key (see
    /// [`crate::kdf::effective_salt`]).
    pub fn tag_bytes(&self) -> [u8; 7] {
        let mut out = [0u8; 7];
        out[..4].copy_from_slice(&MAGIC);
        out[4] = self.kdf_variant.to_byte();
        out[5] = self.aead.to_byte();
        out[6] = self.hash.to_byte();
        out
    }

    pub fn to_bytes(&self) -> [u8; PREAMBLE_LEN] {
        let mut out = [0u8; PREAMBLE_LEN];
        let mut cursor = 0;

        out[cursor..cursor + 4].copy_from_slice(&MAGIC);
        cursor += 4;
        out[cursor] = self.kdf_variant.to_byte();
        cursor += 1;
        out[cursor] = self.aead.to_byte();
        cursor += 1;
        out[cursor] = self.hash.to_byte();
        cursor += 1;
        out[cursor..cursor + 32].copy_from_slice(&self.salt);
        cursor += 32;

        out[cursor..cursor + 4].copy_from_slice(&self.t_cost.to_le_bytes());
        cursor += 4;
        out[cursor..cursor + 4].copy_from_slice(&self.m_cost_kib.to_le_bytes());
        cursor += 4;
        out[cursor..cursor + 4].copy_from_slice(&self.lanes.to_le_bytes());
        cursor += 4;

        out[cursor..cursor + HPTAG_LEN].copy_from_slice(&self.hptag);
        cursor += HPTAG_LEN;
        debug_assert_eq!(cursor, PREAMBLE_LEN);

        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, PreambleError> {
        if buf.len() < PREAMBLE_LEN {
            return Err(PreambleError::Truncated);
        }
        if buf[0..4] != MAGIC {
            return Err(PreambleError::NotOurFile);
        }

        let kdf_variant =
            KdfVariant::from_byte(buf[4]).ok_or(PreambleError::Unsupported)?;
        let aead = AeadAlgo::from_byte(buf[5]).ok_or(PreambleError::Unsupported)?;
        let hash = HashAlgo::from_byte(buf[6]).ok_or(PreambleError::Unsupported)?;

        let mut salt = [0u8; 32];
        salt.copy_from_slice(&buf[7..39]);

        let t_cost = read_u32_le(&buf[39..43]);
        let m_cost_kib = read_u32_le(&buf[43..47]);
        let lanes = read_u32_le(&buf[47..51]);

        let mut hptag = [0u8; HPTAG_LEN];
        hptag.copy_from_slice(&buf[51..51 + HPTAG_LEN]);

        Ok(Self {
            kdf_variant,
            aead,
            hash,
            salt,
            t_cost,
            m_cost_kib,
            lanes,
            hptag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let p = PlaintextPreamble::new_for_write(
            KdfVariant::Argon2id,
            [5u8; 32],
            3,
            1 << 16,
            1,
            [9u8; HPTAG_LEN],
        );
        let bytes = p.to_bytes();
        assert_eq!(bytes.len(), PREAMBLE_LEN);

        let back = PlaintextPreamble::from_bytes(&bytes).unwrap();
        assert_eq!(back.salt, p.salt);
        assert_eq!(back.t_cost, p.t_cost);
        assert_eq!(back.m_cost_kib, p.m_cost_kib);
        assert_eq!(back.lanes, p.lanes);
        assert_eq!(back.hptag, p.hptag);
        assert_eq!(back.kdf_variant, p.kdf_variant);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = vec![0u8; PREAMBLE_LEN];
        bytes[0..4].copy_from_slice(b"NOPE");
        assert_eq!(
            PlaintextPreamble::from_bytes(&bytes),
            Err(PreambleError::NotOurFile)
        );
    }

    #[test]
    fn rejects_truncated_buffer() {
        let bytes = vec![0u8; PREAMBLE_LEN - 1];
        assert_eq!(
            PlaintextPreamble::from_bytes(&bytes),
            Err(PreambleError::Truncated)
        );
    }

    #[test]
    fn rejects_unsupported_kdf_variant_on_read() {
        let p = PlaintextPreamble::new_for_write(
            KdfVariant::Argon2id,
            [1u8; 32],
            1,
            1 << 15,
            1,
            [0u8; HPTAG_LEN],
        );
        let mut bytes = p.to_bytes();
        bytes[4] = 0xEE; // neither 0 nor 1
        assert_eq!(
            PlaintextPreamble::from_bytes(&bytes),
            Err(PreambleError::Unsupported)
        );
    }

    #[test]
    fn argon2ds_variant_parses_but_is_rejected_later_by_kdf() {
        let p = PlaintextPreamble::new_for_write(
            KdfVariant::Argon2ds,
            [1u8; 32],
            1,
            1 << 15,
            1,
            [0u8; HPTAG_LEN],
        );
        let bytes = p.to_bytes();
        let back = PlaintextPreamble::from_bytes(&bytes).unwrap();
        assert_eq!(back.kdf_variant, KdfVariant::Argon2ds);
    }
}
