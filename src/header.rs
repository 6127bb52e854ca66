//! The header block: known, typed fields plus verbatim pass-through of
//! anything this crate doesn't recognize.
//!
//! One struct field per known header type, plus an `unknown_fields` bag
//! for the rest, so loading a database written by a newer version of
//! this format and saving it back doesn't silently drop fields this
//! version has never heard of. The named-policy compact encoding is
//! deliberately big-endian inside an otherwise little-endian format;
//! see [`encode_named_policies`] for why that's preserved rather than
//! normalized.

use uuid::Uuid;

use crate::bytes::{read_i64_le, write_i64_le};
use crate::tlv::{self, Decoder, TlvError};

pub const HDR_VERSION: u8 = 0x00;
pub const HDR_UUID: u8 = 0x01;
pub const HDR_PREFS: u8 = 0x02;
pub const HDR_DISPLAY_STATUS: u8 = 0x03;
pub const HDR_LAST_SAVE_TIME: u8 = 0x04;
pub const HDR_LAST_SAVE_APP: u8 = 0x06;
pub const HDR_LAST_SAVE_USER: u8 = 0x07;
pub const HDR_LAST_SAVE_HOST: u8 = 0x08;
pub const HDR_DB_NAME: u8 = 0x09;
pub const HDR_DB_DESC: u8 = 0x0a;
pub const HDR_FILTERS: u8 = 0x0b;
pub const HDR_RECENTLY_USED: u8 = 0x0f;
pub const HDR_NAMED_POLICIES: u8 = 0x10;
pub const HDR_EMPTY_GROUP: u8 = 0x11;
pub const HDR_YUBI_SK: u8 = 0x12;

const MAX_RECENTLY_USED: usize = 255;
const YUBI_SK_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    Malformed,
    MissingVersion,
}

impl From<TlvError> for HeaderError {
    fn from(_: TlvError) -> Self {
        HeaderError::Malformed
    }
}

/// One entry of the `NAMED_POLICIES` compact list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPolicy {
    pub name: String,
    pub flags: u16,
    pub length: u16,
    pub lower_min: u16,
    pub upper_min: u16,
    pub digit_min: u16,
    pub symbol_min: u16,
    pub symbols: String,
}

#[derive(Debug, Clone, Default)]
pub struct HeaderRecord {
    /// `(minor, major)`; the on-disk byte order is inverted from what
    /// you'd expect, low byte (minor) first.
    pub version: (u8, u8),
    pub uuid: Option<Uuid>,
    pub prefs: Option<String>,
    pub display_status: Option<String>,
    pub last_save_time: Option<i64>,
    pub last_save_app: Option<String>,
    pub last_save_user: Option<String>,
    pub last_save_host: Option<String>,
    pub db_name: Option<String>,
    pub db_desc: Option<String>,
    pub filters: Option<String>,
    pub recently_used: Vec<Uuid>,
    pub named_policies: Vec<NamedPolicy>,
    pub empty_groups: Vec<String>,
    pub yubi_sk: Option<[u8; YUBI_SK_LEN]>,
    /// Fields this crate doesn't know about, kept byte-exact in read
    /// order and re-emitted before the terminator.
    pub unknown_fields: Vec<(u8, Vec<u8>)>,
}

impl HeaderRecord {
    pub fn new(version: (u8, u8)) -> Self {
        Self {
            version,
            ..Default::default()
        }
    }
}

fn encode_named_policies(out: &mut Vec<u8>, policies: &[NamedPolicy]) {
    // Entries whose name is too long for the one-byte length prefix are
    // dropped on write; filter first so the count byte matches what's
    // actually emitted.
    let kept: Vec<&NamedPolicy> = policies.iter().filter(|p| p.name.len() <= 255).collect();
    let count = kept.len().min(255) as u8;
    out.push(count);
    for policy in kept.into_iter().take(count as usize) {
        out.push(policy.name.len() as u8);
        out.extend_from_slice(policy.name.as_bytes());
        out.extend_from_slice(&policy.flags.to_be_bytes());
        out.extend_from_slice(&policy.length.to_be_bytes());
        out.extend_from_slice(&policy.lower_min.to_be_bytes());
        out.extend_from_slice(&policy.upper_min.to_be_bytes());
        out.extend_from_slice(&policy.digit_min.to_be_bytes());
        out.extend_from_slice(&policy.symbol_min.to_be_bytes());
        out.push(policy.symbols.len().min(255) as u8);
        let sym_bytes = policy.symbols.as_bytes();
        let sym_len = sym_bytes.len().min(255);
        out.extend_from_slice(&sym_bytes[..sym_len]);
    }
}

fn decode_named_policies(buf: &[u8]) -> Result<Vec<NamedPolicy>, HeaderError> {
    let mut policies = Vec::new();
    if buf.is_empty() {
        return Ok(policies);
    }
    let count = buf[0] as usize;
    let mut pos = 1usize;

    for _ in 0..count {
        if pos >= buf.len() {
            return Err(HeaderError::Malformed);
        }
        let name_len = buf[pos] as usize;
        pos += 1;
        if pos + name_len > buf.len() {
            return Err(HeaderError::Malformed);
        }
        let name = String::from_utf8(buf[pos..pos + name_len].to_vec())
            .map_err(|_| HeaderError::Malformed)?;
        pos += name_len;

        if pos + 12 > buf.len() {
            return Err(HeaderError::Malformed);
        }
        let flags = u16::from_be_bytes([buf[pos], buf[pos + 1]]);
        let length = u16::from_be_bytes([buf[pos + 2], buf[pos + 3]]);
        let lower_min = u16::from_be_bytes([buf[pos + 4], buf[pos + 5]]);
        let upper_min = u16::from_be_bytes([buf[pos + 6], buf[pos + 7]]);
        let digit_min = u16::from_be_bytes([buf[pos + 8], buf[pos + 9]]);
        let symbol_min = u16::from_be_bytes([buf[pos + 10], buf[pos + 11]]);
        pos += 12;

        if pos >= buf.len() {
            return Err(HeaderError::Malformed);
        }
        let sym_len = buf[pos] as usize;
        pos += 1;
        if pos + sym_len > buf.len() {
            return Err(HeaderError::Malformed);
        }
        let symbols = String::from_utf8(buf[pos..pos + sym_len].to_vec())
            .map_err(|_| HeaderError::Malformed)?;
        pos += sym_len;

        policies.push(NamedPolicy {
            name,
            flags,
            length,
            lower_min,
            upper_min,
            digit_min,
            symbol_min,
            symbols,
        });
    }

    Ok(policies)
}

fn utf8(value: &[u8]) -> Result<String, HeaderError> {
    String::from_utf8(value.to_vec()).map_err(|_| HeaderError::Malformed)
}

fn uuid_from(value: &[u8]) -> Result<Uuid, HeaderError> {
    let arr: [u8; 16] = value.try_into().map_err(|_| HeaderError::Malformed)?;
    Ok(Uuid::from_bytes(arr))
}

/// Serialize `header` as a TLV stream terminated by `HDR_END`, known
/// fields in declaration order with unknown fields re-emitted last in
/// their original read order.
pub fn write_header(out: &mut Vec<u8>, header: &HeaderRecord) {
    tlv::encode_record(out, HDR_VERSION, &[header.version.0, header.version.1]);

    if let Some(uuid) = header.uuid {
        tlv::encode_record(out, HDR_UUID, uuid.as_bytes());
    }
    if let Some(prefs) = &header.prefs {
        tlv::encode_record(out, HDR_PREFS, prefs.as_bytes());
    }
    if let Some(ds) = &header.display_status {
        tlv::encode_record(out, HDR_DISPLAY_STATUS, ds.as_bytes());
    }
    if let Some(t) = header.last_save_time {
        let mut buf = Vec::with_capacity(8);
        write_i64_le(&mut buf, t);
        tlv::encode_record(out, HDR_LAST_SAVE_TIME, &buf);
    }
    if let Some(app) = &header.last_save_app {
        tlv::encode_record(out, HDR_LAST_SAVE_APP, app.as_bytes());
    }
    if let Some(user) = &header.last_save_user {
        tlv::encode_record(out, HDR_LAST_SAVE_USER, user.as_bytes());
    }
    if let Some(host) = &header.last_save_host {
        tlv::encode_record(out, HDR_LAST_SAVE_HOST, host.as_bytes());
    }
    if let Some(name) = &header.db_name {
        tlv::encode_record(out, HDR_DB_NAME, name.as_bytes());
    }
    if let Some(desc) = &header.db_desc {
        tlv::encode_record(out, HDR_DB_DESC, desc.as_bytes());
    }
    if let Some(filters) = &header.filters {
        tlv::encode_record(out, HDR_FILTERS, filters.as_bytes());
    }
    if !header.recently_used.is_empty() {
        let mut buf = Vec::new();
        let n = header.recently_used.len().min(MAX_RECENTLY_USED);
        buf.push(n as u8);
        for uuid in header.recently_used.iter().take(n) {
            buf.extend_from_slice(uuid.as_bytes());
        }
        tlv::encode_record(out, HDR_RECENTLY_USED, &buf);
    }
    if !header.named_policies.is_empty() {
        let mut buf = Vec::new();
        encode_named_policies(&mut buf, &header.named_policies);
        tlv::encode_record(out, HDR_NAMED_POLICIES, &buf);
    }
    for group in &header.empty_groups {
        tlv::encode_record(out, HDR_EMPTY_GROUP, group.as_bytes());
    }
    if let Some(sk) = &header.yubi_sk {
        tlv::encode_record(out, HDR_YUBI_SK, sk);
    }

    for (ty, value) in &header.unknown_fields {
        tlv::encode_record(out, *ty, value);
    }

    tlv::encode_end(out);
}

/// Parse a header TLV stream up to (and consuming) `HDR_END`. Any
/// unrecognized type is preserved verbatim in `unknown_fields`, in the
/// order encountered.
pub fn read_header(decoder: &mut Decoder<'_>) -> Result<HeaderRecord, HeaderError> {
    let mut header = HeaderRecord::default();
    let mut saw_version = false;

    loop {
        let (ty, value) = match decoder.next()? {
            Some(rec) => rec,
            None => break,
        };

        if ty == tlv::END {
            break;
        }

        match ty {
            HDR_VERSION => {
                if value.len() != 2 {
                    return Err(HeaderError::Malformed);
                }
                header.version = (value[0], value[1]);
                saw_version = true;
            }
            HDR_UUID => header.uuid = Some(uuid_from(value)?),
            HDR_PREFS => header.prefs = Some(utf8(value)?),
            HDR_DISPLAY_STATUS => header.display_status = Some(utf8(value)?),
            HDR_LAST_SAVE_TIME => {
                if value.len() != 8 {
                    return Err(HeaderError::Malformed);
                }
                header.last_save_time = Some(read_i64_le(value));
            }
            HDR_LAST_SAVE_APP => header.last_save_app = Some(utf8(value)?),
            HDR_LAST_SAVE_USER => header.last_save_user = Some(utf8(value)?),
            HDR_LAST_SAVE_HOST => header.last_save_host = Some(utf8(value)?),
            HDR_DB_NAME => header.db_name = Some(utf8(value)?),
            HDR_DB_DESC => header.db_desc = Some(utf8(value)?),
            HDR_FILTERS => header.filters = Some(utf8(value)?),
            HDR_RECENTLY_USED => {
                if value.is_empty() {
                    return Err(HeaderError::Malformed);
                }
                let n = value[0] as usize;
                if value.len() != 1 + n * 16 {
                    return Err(HeaderError::Malformed);
                }
                let mut uuids = Vec::with_capacity(n);
                for i in 0..n {
                    let start = 1 + i * 16;
                    uuids.push(uuid_from(&value[start..start + 16])?);
                }
                header.recently_used = uuids;
            }
            HDR_NAMED_POLICIES => {
                header.named_policies = decode_named_policies(value)?;
            }
            HDR_EMPTY_GROUP => header.empty_groups.push(utf8(value)?),
            HDR_YUBI_SK => {
                let arr: [u8; YUBI_SK_LEN] =
                    value.try_into().map_err(|_| HeaderError::Malformed)?;
                header.yubi_sk = Some(arr);
            }
            other => header.unknown_fields.push((other, value.to_vec())),
        }
    }

    if !saw_version {
        return Err(HeaderError::MissingVersion);
    }

    Ok(header)
}
