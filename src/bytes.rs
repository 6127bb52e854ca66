//! Little-endian byte primitives and secure-zero helpers.
//!
//! These are the lowest-level building blocks in the crate: every other
//! module packs and unpacks multi-byte integers through here rather than
//! reaching for `to_le_bytes`/`from_le_bytes` directly, so the handful of
//! places that deliberately deviate (the named-policy encoding in
//! [`crate::header`] uses big-endian) stand out as exceptions rather than
//! typos.

use zeroize::Zeroize;

pub fn read_u16_le(buf: &[u8]) -> u16 {
    u16::from_le_bytes([buf[0], buf[1]])
}

pub fn write_u16_le(out: &mut Vec<u8>, val: u16) {
    out.extend_from_slice(&val.to_le_bytes());
}

pub fn read_u32_le(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

pub fn write_u32_le(out: &mut Vec<u8>, val: u32) {
    out.extend_from_slice(&val.to_le_bytes());
}

pub fn read_u64_le(buf: &[u8]) -> u64 {
    let mut arr = [0u8; 8];
    arr.copy_from_slice(&buf[..8]);
    u64::from_le_bytes(arr)
}

pub fn read_i64_le(buf: &[u8]) -> i64 {
    let mut arr = [0u8; 8];
    arr.copy_from_slice(&buf[..8]);
    i64::from_le_bytes(arr)
}

pub fn write_u64_le(out: &mut Vec<u8>, val: u64) {
    out.extend_from_slice(&val.to_le_bytes());
}

pub fn write_i64_le(out: &mut Vec<u8>, val: i64) {
    out.extend_from_slice(&val.to_le_bytes());
}

/// Zero `len` bytes starting at `ptr`, with a compiler barrier after the
/// clearing write so the store can't be optimized away as dead.
///
/// # Safety
/// `ptr` must be valid for `len` writable bytes.
pub unsafe fn zeroize(ptr: *mut u8, len: usize) {
    if len == 0 {
        return;
    }
    unsafe {
        std::ptr::write_bytes(ptr, 0, len);
    }
    std::sync::atomic::compiler_fence(std::sync::atomic::Ordering::SeqCst);
}

/// A fixed-capacity secret buffer that zeroes itself on drop, used for
/// key material and intermediate passphrase bytes whose lifetime the
/// caller must bound explicitly.
pub struct ScopedSecret {
    buf: Box<[u8]>,
}

impl ScopedSecret {
    pub fn new(len: usize) -> Self {
        Self {
            buf: vec![0u8; len].into_boxed_slice(),
        }
    }

    pub fn from_vec(v: Vec<u8>) -> Self {
        Self {
            buf: v.into_boxed_slice(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Drop for ScopedSecret {
    fn drop(&mut self) {
        self.buf.zeroize();
    }
}
