//! Key derivation and authenticated encryption primitives.
//!
//! Small free functions over `secrecy`/`zeroize`-backed secret types,
//! one `thiserror` enum for everything that can go wrong
//! cryptographically. Two points deliberately don't match a literal
//! port of the original C++ engine this format descends from: the
//! Argon2 variant actually supported (see [`CryptoError::UnsupportedVariant`]),
//! and how the 7-byte algorithm tag is bound into the derivation in
//! place of Argon2's raw associated-data parameter, which the `argon2`
//! crate's safe API doesn't expose (see [`effective_salt`]).

use argon2::{Algorithm, Argon2, Params as Argon2Params, Version};
use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::bytes::ScopedSecret;
use crate::preamble::{KdfVariant, PlaintextPreamble};

/// Length of the combined Argon2 tag: nonce (12) + key (32).
pub const TAG_LEN: usize = NONCE_LEN + KEY_LEN;
pub const NONCE_LEN: usize = 12;
pub const KEY_LEN: usize = 32;
pub const HPTAG_LEN: usize = 16;
pub const AEAD_TAG_LEN: usize = 16;

const MIN_LANES: u32 = 1;
const MAX_LANES: u32 = 0x00FF_FFFF; // Argon2's 24-bit parallelism field

/// Argon2 cost parameters for a new write. There's no config-file layer
/// or ambient global: callers either pick a named constructor or build
/// one field-by-field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub t_cost: u32,
    pub m_cost_kib: u32,
    pub lanes: u32,
}

impl KdfParams {
    /// A conservative interactive-use default: ~64 MiB, 3 passes, single
    /// lane.
    pub fn recommended() -> Self {
        Self {
            t_cost: 3,
            m_cost_kib: 64 * 1024,
            lanes: 1,
        }
    }

    /// Minimal cost for test suites where wall-clock time matters more
    /// than resistance to offline attack.
    pub fn for_tests() -> Self {
        Self {
            t_cost: 1,
            m_cost_kib: 32 * 1024,
            lanes: 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(argon2::Error),

    #[error("blake2 error")]
    Blake2,

    #[error("aead authentication failure")]
    Aead,

    #[error("wrong passphrase")]
    WrongPassword,

    #[error("unsupported kdf variant")]
    UnsupportedVariant,
}

impl From<argon2::Error> for CryptoError {
    fn from(e: argon2::Error) -> Self {
        CryptoError::Argon2(e)
    }
}

/// Key derivation output: `nonce0` (12 bytes) and `key` (32 bytes), held
/// in a zeroize-on-drop buffer until split.
pub struct DerivedSecrets {
    tag: ScopedSecret,
}

impl DerivedSecrets {
    pub fn nonce0(&self) -> [u8; NONCE_LEN] {
        let mut n = [0u8; NONCE_LEN];
        n.copy_from_slice(&self.tag.as_slice()[..NONCE_LEN]);
        n
    }

    pub fn key(&self) -> [u8; KEY_LEN] {
        let mut k = [0u8; KEY_LEN];
        k.copy_from_slice(&self.tag.as_slice()[NONCE_LEN..TAG_LEN]);
        k
    }
}

/// Clamp t_cost/m_cost_kib/lanes into sane bounds so a maliciously
/// small or large preamble can't push Argon2 into a pathological cost.
pub fn clamp_params(t_cost: u32, m_cost_kib: u32, lanes: u32) -> (u32, u32, u32) {
    let t = t_cost.clamp(1, 1000);
    let m = m_cost_kib.clamp(32 * 1024, 32 * 1024 * 1024);
    let l = lanes.clamp(MIN_LANES, MAX_LANES);
    (t, m, l)
}

/// Effective salt fed to Argon2: `BLAKE2b-256(tag_bytes || salt)`. This
/// stands in for Argon2's native associated-data parameter, which the
/// `argon2` crate's safe API doesn't expose: binding `tag_bytes` (the
/// on-disk algorithm identifiers) into the salt means any change to
/// those bytes changes the derived key, the same property raw AD would
/// have provided.
fn effective_salt(tag_bytes: &[u8; 7], salt: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Blake2bVar::new(32).expect("32 is a valid blake2b output length");
    hasher.update(tag_bytes);
    hasher.update(salt);
    let mut out = [0u8; 32];
    hasher
        .finalize_variable(&mut out)
        .expect("output buffer matches requested length");
    out
}

fn passphrase_to_utf8(passphrase: &SecretString) -> ScopedSecret {
    ScopedSecret::from_vec(passphrase.expose_secret().as_bytes().to_vec())
}

/// Derive the 44-byte Argon2 tag from `passphrase` and `preamble`.
pub fn derive(
    passphrase: &SecretString,
    preamble: &PlaintextPreamble,
) -> Result<DerivedSecrets, CryptoError> {
    if preamble.kdf_variant != KdfVariant::Argon2id {
        return Err(CryptoError::UnsupportedVariant);
    }

    let (t_cost, m_cost_kib, lanes) =
        clamp_params(preamble.t_cost, preamble.m_cost_kib, preamble.lanes);

    let params = Argon2Params::new(m_cost_kib, t_cost, lanes, Some(TAG_LEN))
        .map_err(CryptoError::Argon2)?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let salt = effective_salt(&preamble.tag_bytes(), &preamble.salt);

    let pass_bytes = passphrase_to_utf8(passphrase);
    let mut tag = ScopedSecret::new(TAG_LEN);
    argon2
        .hash_password_into(pass_bytes.as_slice(), &salt, tag.as_mut_slice())
        .map_err(CryptoError::Argon2)?;
    // pass_bytes is dropped (and zeroized) here, at end of scope.

    Ok(DerivedSecrets { tag })
}

fn hptag_of(tag: &[u8]) -> Result<[u8; HPTAG_LEN], CryptoError> {
    let mut hasher = Blake2bVar::new(HPTAG_LEN).map_err(|_| CryptoError::Blake2)?;
    hasher.update(tag);
    let mut out = [0u8; HPTAG_LEN];
    hasher
        .finalize_variable(&mut out)
        .map_err(|_| CryptoError::Blake2)?;
    Ok(out)
}

/// Derive `passphrase` against `preamble` and verify it against the
/// stored `hptag` in constant time before returning the derived key
/// material.
pub fn verify(
    passphrase: &SecretString,
    preamble: &PlaintextPreamble,
) -> Result<DerivedSecrets, CryptoError> {
    let secrets = derive(passphrase, preamble)?;
    let computed = hptag_of(secrets.tag.as_slice())?;
    if constant_time_eq(&computed, &preamble.hptag) {
        Ok(secrets)
    } else {
        Err(CryptoError::WrongPassword)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Compute `hptag` for a freshly derived tag, for use while writing a
/// new preamble.
pub fn hptag(secrets: &DerivedSecrets) -> Result<[u8; HPTAG_LEN], CryptoError> {
    hptag_of(secrets.tag.as_slice())
}

/// `nonce0 + 1`: add 1 to the first byte only, with 8-bit wraparound, no
/// carry into later bytes. Not a full 96-bit little-endian increment.
pub fn increment_nonce(nonce0: &[u8; NONCE_LEN]) -> [u8; NONCE_LEN] {
    let mut n = *nonce0;
    n[0] = n[0].wrapping_add(1);
    n
}

/// Seal `plaintext` under `key`/`nonce` with ChaCha20-Poly1305 (IETF,
/// 12-byte nonce) and empty associated data. Returns `ciphertext || tag`.
pub fn aead_seal(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::Aead)
}

/// Open `ciphertext || tag` under `key`/`nonce`. Never exposes partial
/// plaintext on authentication failure.
pub fn aead_open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Aead)
}
