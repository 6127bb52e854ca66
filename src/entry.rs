//! Opaque entry records: an ordered TLV field stream representing one
//! password entry, terminated by the same sentinel used for `HDR_END`.
//!
//! This layer never interprets field semantics beyond "write opaque
//! TLV, read opaque TLV". It's just an ordered bag of fields that the
//! caller assigns meaning to.

use crate::tlv::{self, Decoder, TlvError};

/// One entry: an ordered list of `(type, value)` pairs, as read from or
/// about to be written to the body. Field semantics are the caller's
/// concern; this crate only guarantees ordering and byte-exactness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    fields: Vec<(u8, Vec<u8>)>,
}

impl Entry {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn from_fields(fields: Vec<(u8, Vec<u8>)>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[(u8, Vec<u8>)] {
        &self.fields
    }

    pub fn push(&mut self, ty: u8, value: Vec<u8>) {
        self.fields.push((ty, value));
    }
}

/// Serialize `fields` as a TLV stream followed by the entry terminator.
pub fn write_entry(out: &mut Vec<u8>, fields: &[(u8, &[u8])]) {
    for &(ty, value) in fields {
        tlv::encode_record(out, ty, value);
    }
    tlv::encode_end(out);
}

/// Decode one entry's worth of TLV records starting at the decoder's
/// current position, stopping at (and consuming) the terminator. Returns
/// `Ok(None)` if the decoder is already at the end of the buffer with no
/// records at all (the caller's signal that the body is exhausted).
pub fn read_entry(decoder: &mut Decoder<'_>) -> Result<Option<Entry>, TlvError> {
    let mut fields = Vec::new();
    let mut saw_any = false;

    loop {
        match decoder.next()? {
            None => {
                return if saw_any {
                    Ok(Some(Entry::from_fields(fields)))
                } else {
                    Ok(None)
                };
            }
            Some((tlv::END, _)) => {
                return Ok(Some(Entry::from_fields(fields)));
            }
            Some((ty, value)) => {
                saw_any = true;
                fields.push((ty, value.to_vec()));
            }
        }
    }
}
