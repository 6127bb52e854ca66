//! Type-length-value record framing shared by the header block and every
//! entry's field stream.
//!
//! A cursor-based decoder over a borrowed buffer, built around the
//! opaque `(type, bytes)` model: neither the header nor an entry needs
//! to know what a field means to read and re-emit it byte-exact.

/// Sentinel type for "no more records here": used both as `HDR_END`
/// after the header block and as the entry terminator after each entry's
/// field stream.
pub const END: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlvError {
    /// The declared length runs past the end of the buffer.
    Malformed,
}

/// Append one `(type, length:u32-LE, value)` record to `out`. Values
/// longer than `u32::MAX` are truncated. This cannot happen for any
/// field this crate itself produces, but callers passing arbitrary entry
/// data must not assume the full value survives.
pub fn encode_record(out: &mut Vec<u8>, ty: u8, value: &[u8]) {
    let len = if value.len() > u32::MAX as usize {
        tracing::trace!(actual = value.len(), "tlv: truncating oversized value");
        u32::MAX as usize
    } else {
        value.len()
    };

    out.push(ty);
    out.extend_from_slice(&(len as u32).to_le_bytes());
    out.extend_from_slice(&value[..len]);
}

/// Append the terminator record (`type = 0xFF`, `length = 0`).
pub fn encode_end(out: &mut Vec<u8>) {
    out.push(END);
    out.extend_from_slice(&0u32.to_le_bytes());
}

/// Cursor-based decoder over a borrowed buffer: never allocates, yields
/// `(type, value_slice)` pairs without copying.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Yields the next record, `None` once the cursor reaches the end of
    /// the buffer cleanly (no trailing bytes), or `Err` on malformed
    /// framing. `type == END` is handed back to the caller rather than
    /// swallowed here: callers decide what "end" means in their context
    /// (header terminator vs. entry terminator).
    pub fn next(&mut self) -> Result<Option<(u8, &'a [u8])>, TlvError> {
        if self.remaining() == 0 {
            return Ok(None);
        }
        if self.remaining() < 5 {
            return Err(TlvError::Malformed);
        }

        let ty = self.buf[self.pos];
        let len_bytes = &self.buf[self.pos + 1..self.pos + 5];
        let len =
            u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;

        let value_start = self.pos + 5;
        let value_end = match value_start.checked_add(len) {
            Some(end) if end <= self.buf.len() => end,
            _ => return Err(TlvError::Malformed),
        };

        let value = &self.buf[value_start..value_end];
        self.pos = value_end;
        Ok(Some((ty, value)))
    }
}
