//! The file engine: open/close/read/write lifecycle, atomic commit.
//!
//! Writes land in a sibling temp file, get fsynced, and are only then
//! renamed over the destination, so a crash mid-write never leaves a
//! half-written database in place. Concurrent access to the same path
//! from two engines at once is undefined: this module doesn't take a
//! file lock; callers serialize that themselves.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use secrecy::SecretString;

use crate::entry::{self, Entry};
use crate::error::{LumiError, Result};
use crate::header::{self, HeaderRecord};
use crate::kdf::{self, DerivedSecrets, KdfParams, AEAD_TAG_LEN};
use crate::preamble::{KdfVariant, PlaintextPreamble, PREAMBLE_LEN};
use crate::rng;
use crate::tlv::Decoder;

const SIZE_FRAME_LEN: usize = 8 + AEAD_TAG_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Reading,
    Writing,
    Failed,
}

/// One open database. Holds key material and plaintext only while in
/// `Reading`/`Writing` state; both are zeroized (directly, or via
/// `DerivedSecrets`'s `Drop`) once the engine returns to `Idle`.
pub struct Engine {
    state: State,
    path: PathBuf,
    temp_path: Option<PathBuf>,
    header: HeaderRecord,
    /// Plaintext entry bytes. While reading: the undrained remainder of
    /// the decrypted body, past the header. While writing: the
    /// in-progress plaintext body (header gets serialized in at
    /// `close`-time, not eagerly, so `set_header` can still be called).
    body: Vec<u8>,
    cursor: usize,
    secrets: Option<DerivedSecrets>,
    /// The preamble minted at `open_write` time (salt, kdf params, hptag
    /// already computed); reused verbatim at `close`, since the salt
    /// that produced `secrets` must match the one written to disk.
    pending_preamble: Option<PlaintextPreamble>,
}

impl Engine {
    fn new(path: PathBuf) -> Self {
        Self {
            state: State::Idle,
            path,
            temp_path: None,
            header: HeaderRecord::default(),
            body: Vec::new(),
            cursor: 0,
            secrets: None,
            pending_preamble: None,
        }
    }

    pub fn header(&self) -> &HeaderRecord {
        &self.header
    }

    pub fn set_header(&mut self, header: HeaderRecord) {
        self.header = header;
    }

    /// Drain TLV records from the cursor into the next entry. `Ok(None)`
    /// once the body is exhausted.
    pub fn read_record(&mut self) -> Result<Option<Entry>> {
        if self.state != State::Reading {
            return Err(LumiError::CantOpen);
        }
        let mut decoder = Decoder::new(&self.body[self.cursor..]);
        match entry::read_entry(&mut decoder) {
            Ok(entry) => {
                self.cursor += decoder.position();
                Ok(entry)
            }
            Err(e) => {
                // A malformed record aborts this read, but records
                // already returned to the caller remain valid; only the
                // cursor position is left where it was.
                self.state = State::Failed;
                Err(e.into())
            }
        }
    }

    /// Append `entry`'s TLV stream to the plaintext body under
    /// construction.
    pub fn write_record(&mut self, fields: &[(u8, &[u8])]) -> Result<()> {
        if self.state != State::Writing {
            return Err(LumiError::CantOpen);
        }
        entry::write_entry(&mut self.body, fields);
        Ok(())
    }

    /// Seal the body, fsync, and atomically rename into place. Idempotent:
    /// calling `close` on an already-`Idle` engine is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.close_impl(false)
    }

    /// Like [`Engine::close`], named to make the explicit-flush intent
    /// visible at call sites. Both variants fsync before rename; there
    /// is no "fast" unsynced commit path in this crate.
    pub fn close_sync(&mut self) -> Result<()> {
        self.close_impl(true)
    }

    fn close_impl(&mut self, _explicit_sync: bool) -> Result<()> {
        match self.state {
            State::Idle => return Ok(()),
            State::Reading => {
                self.reset_secret_state();
                self.state = State::Idle;
                return Ok(());
            }
            State::Failed => {
                self.reset_secret_state();
                self.state = State::Idle;
                return Ok(());
            }
            State::Writing => {}
        }

        let span = tracing::trace_span!("lumimaja_core::file::close", path = %self.path.display());
        let _enter = span.enter();

        let result = self.commit_write();
        self.reset_secret_state();
        self.state = State::Idle;
        result
    }

    fn commit_write(&mut self) -> Result<()> {
        let secrets = self.secrets.as_ref().expect("writing state always has secrets");
        let key = secrets.key();
        let nonce0 = secrets.nonce0();
        let nonce1 = kdf::increment_nonce(&nonce0);

        let mut plaintext = Vec::new();
        header::write_header(&mut plaintext, &self.header);
        plaintext.extend_from_slice(&self.body);

        let size_frame = kdf::aead_seal(&key, &nonce0, &(plaintext.len() as u64).to_le_bytes())
            .map_err(LumiError::from)?;
        let body_frame = kdf::aead_seal(&key, &nonce1, &plaintext).map_err(LumiError::from)?;

        let preamble = self
            .pending_preamble
            .clone()
            .expect("writing state always has a pending preamble");

        let temp_path = self
            .temp_path
            .clone()
            .expect("writing state always has a temp path");

        let mut out = Vec::with_capacity(PREAMBLE_LEN + size_frame.len() + body_frame.len());
        out.extend_from_slice(&preamble.to_bytes());
        out.extend_from_slice(&size_frame);
        out.extend_from_slice(&body_frame);

        let mut file = File::create(&temp_path)?;
        file.write_all(&out)?;
        file.sync_all()?;
        drop(file);

        match fs::rename(&temp_path, &self.path) {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(
                    temp = %temp_path.display(),
                    dest = %self.path.display(),
                    error = %err,
                    "lumimaja_core: rename of temp file to destination failed; temp file retained"
                );
                Err(LumiError::Io(err))
            }
        }
    }

    fn reset_secret_state(&mut self) {
        self.secrets = None;
        self.body.clear();
        self.cursor = 0;
        self.temp_path = None;
        self.pending_preamble = None;
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Random-suffix temp file name, `<path>.<8 alnum>.tmp`, matching
/// `original_source`'s `PWSfile::FOpen`.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(rng::rand_az(8));
    name.push(".tmp");
    PathBuf::from(name)
}

pub fn open_read(path: impl AsRef<Path>, passphrase: &SecretString) -> Result<Engine> {
    let path = path.as_ref().to_path_buf();
    let mut file = File::open(&path).map_err(|_| LumiError::CantOpen)?;

    let mut raw = Vec::new();
    file.read_to_end(&mut raw).map_err(|_| LumiError::CantOpen)?;

    if raw.len() < PREAMBLE_LEN + SIZE_FRAME_LEN {
        return Err(LumiError::Truncated);
    }

    let preamble = PlaintextPreamble::from_bytes(&raw[..PREAMBLE_LEN])?;
    let secrets = kdf::verify(passphrase, &preamble)?;

    let nonce0 = secrets.nonce0();
    let nonce1 = kdf::increment_nonce(&nonce0);
    let key = secrets.key();

    let size_frame = &raw[PREAMBLE_LEN..PREAMBLE_LEN + SIZE_FRAME_LEN];
    let size_plain = kdf::aead_open(&key, &nonce0, size_frame).map_err(LumiError::from)?;
    let body_len = u64::from_le_bytes(size_plain.try_into().map_err(|_| LumiError::Malformed)?) as usize;

    let body_start = PREAMBLE_LEN + SIZE_FRAME_LEN;
    let body_end = body_start + body_len + AEAD_TAG_LEN;
    if raw.len() < body_end {
        return Err(LumiError::Truncated);
    }

    let body_cipher = &raw[body_start..body_end];
    let plaintext = kdf::aead_open(&key, &nonce1, body_cipher).map_err(LumiError::from)?;

    let mut decoder = Decoder::new(&plaintext);
    let header = header::read_header(&mut decoder)?;
    let consumed = decoder.position();

    let mut engine = Engine::new(path);
    engine.header = header;
    engine.body = plaintext[consumed..].to_vec();
    engine.cursor = 0;
    engine.state = State::Reading;
    engine.secrets = Some(secrets);

    tracing::trace!(path = %engine.path.display(), "lumimaja_core: opened for read");
    Ok(engine)
}

pub fn open_write(
    path: impl AsRef<Path>,
    passphrase: &SecretString,
    params: KdfParams,
) -> Result<Engine> {
    let path = path.as_ref().to_path_buf();

    let mut salt = [0u8; 32];
    rng::fill(&mut salt);

    // Persist the clamped values, not the raw caller-supplied ones: they
    // must equal what kdf::derive actually uses, or a reader re-deriving
    // from the on-disk preamble would use different Argon2 parameters
    // than the writer did.
    let (t_cost, m_cost_kib, lanes) =
        kdf::clamp_params(params.t_cost, params.m_cost_kib, params.lanes);

    let mut preamble = PlaintextPreamble::new_for_write(
        KdfVariant::Argon2id,
        salt,
        t_cost,
        m_cost_kib,
        lanes,
        [0u8; kdf::HPTAG_LEN],
    );

    let secrets = kdf::derive(passphrase, &preamble).map_err(LumiError::from)?;
    preamble.hptag = kdf::hptag(&secrets).map_err(LumiError::from)?;

    let mut engine = Engine::new(path);
    engine.temp_path = Some(temp_path_for(&engine.path));
    engine.header = HeaderRecord::new((14, 3)); // (minor, major), v3.14, inverted byte order
    engine.body = Vec::new();
    engine.state = State::Writing;
    engine.secrets = Some(secrets);
    engine.pending_preamble = Some(preamble);

    tracing::trace!(path = %engine.path.display(), "lumimaja_core: opened for write");
    Ok(engine)
}
