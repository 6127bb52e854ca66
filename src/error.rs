//! The flat, exhaustive error kind surfaced at the engine boundary.
//!
//! One top-level `thiserror` enum that the smaller, module-local error
//! types (`kdf::CryptoError`, `tlv::TlvError`, `header::HeaderError`,
//! `preamble::PreambleError`) convert into via `From` impls, so every
//! fallible path in the crate eventually lands on the same type without
//! each module needing to know about the others.

use thiserror::Error;

use crate::header::HeaderError;
use crate::kdf::CryptoError;
use crate::preamble::PreambleError;
use crate::tlv::TlvError;

#[derive(Debug, Error)]
pub enum LumiError {
    #[error("cannot open file")]
    CantOpen,

    #[error("file is truncated")]
    Truncated,

    #[error("not a lumimaja v3 file")]
    NotOurFile,

    #[error("unsupported algorithm or version")]
    Unsupported,

    #[error("wrong passphrase")]
    WrongPassword,

    #[error("key derivation failed")]
    KdfError,

    #[error("cryptographic operation failed")]
    CryptoError,

    #[error("malformed record")]
    Malformed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PreambleError> for LumiError {
    fn from(e: PreambleError) -> Self {
        match e {
            PreambleError::Truncated => LumiError::Truncated,
            PreambleError::NotOurFile => LumiError::NotOurFile,
            PreambleError::Unsupported => LumiError::Unsupported,
        }
    }
}

impl From<CryptoError> for LumiError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::WrongPassword => LumiError::WrongPassword,
            CryptoError::UnsupportedVariant => LumiError::Unsupported,
            CryptoError::Aead => LumiError::CryptoError,
            CryptoError::Argon2(_) | CryptoError::Blake2 => LumiError::KdfError,
        }
    }
}

impl From<TlvError> for LumiError {
    fn from(_: TlvError) -> Self {
        LumiError::Malformed
    }
}

impl From<HeaderError> for LumiError {
    fn from(_: HeaderError) -> Self {
        LumiError::Malformed
    }
}

pub type Result<T> = std::result::Result<T, LumiError>;
