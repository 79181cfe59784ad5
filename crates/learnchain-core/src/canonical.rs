//! Canonical CBOR encoding of event records.
//!
//! A record is encoded as a CBOR map with small integer keys, written with
//! RFC 8949 core deterministic rules:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//!
//! The event body is nested as a byte string holding its serde CBOR form.
//! The same record therefore always produces the same bytes and the same id.

use ciborium::value::Value;

use crate::error::CodecError;
use crate::event::{Event, EventRecord};
use crate::types::EventId;

/// Current record encoding version.
pub const RECORD_VERSION: u8 = 1;

/// Domain separator hashed in front of the canonical bytes.
pub const RECORD_DOMAIN: &[u8] = b"learnchain-event-v1:";

/// Record field keys. Keys 0-23 encode as single bytes.
mod keys {
    pub const VERSION: u64 = 0;
    pub const SEQ: u64 = 1;
    pub const TIMESTAMP: u64 = 2;
    pub const KIND: u64 = 3;
    pub const PREV: u64 = 4;
    pub const EVENT: u64 = 5;
}

/// Encode a record to canonical bytes.
pub fn encode_record(record: &EventRecord) -> Result<Vec<u8>, CodecError> {
    let mut body = Vec::new();
    ciborium::into_writer(&record.event, &mut body)
        .map_err(|e| CodecError::Encoding(e.to_string()))?;

    let prev = match &record.prev {
        Some(id) => Value::Bytes(id.0.to_vec()),
        None => Value::Null,
    };
    let entries = vec![
        (int(keys::VERSION), Value::Integer(RECORD_VERSION.into())),
        (int(keys::SEQ), Value::Integer(record.seq.into())),
        (int(keys::TIMESTAMP), Value::Integer(record.timestamp.into())),
        (int(keys::KIND), Value::Text(record.event.kind().to_string())),
        (int(keys::PREV), prev),
        (int(keys::EVENT), Value::Bytes(body)),
    ];

    let mut buf = Vec::new();
    encode_value_to(&mut buf, &Value::Map(entries))?;
    Ok(buf)
}

/// Content-addressed id: Blake3(domain || canonical bytes).
pub fn record_id(record: &EventRecord) -> Result<EventId, CodecError> {
    let bytes = encode_record(record)?;
    Ok(id_of_bytes(&bytes))
}

/// Id of already-encoded canonical bytes.
pub fn id_of_bytes(canonical: &[u8]) -> EventId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(RECORD_DOMAIN);
    hasher.update(canonical);
    EventId(*hasher.finalize().as_bytes())
}

/// Decode a record from canonical bytes.
pub fn decode_record(bytes: &[u8]) -> Result<EventRecord, CodecError> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CodecError::Decoding(e.to_string()))?;
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CodecError::Malformed("expected map".into())),
    };

    let version = match lookup(&map, keys::VERSION) {
        Some(Value::Integer(i)) => i128::from(*i),
        _ => return Err(CodecError::Malformed("missing version".into())),
    };
    if version != i128::from(RECORD_VERSION) {
        return Err(CodecError::UnsupportedVersion(version.clamp(0, 255) as u8));
    }

    let seq = match lookup(&map, keys::SEQ) {
        Some(Value::Integer(i)) => u64::try_from(*i)
            .map_err(|_| CodecError::Malformed("seq out of range".into()))?,
        _ => return Err(CodecError::Malformed("missing seq".into())),
    };

    let timestamp = match lookup(&map, keys::TIMESTAMP) {
        Some(Value::Integer(i)) => i64::try_from(*i)
            .map_err(|_| CodecError::Malformed("timestamp out of range".into()))?,
        _ => return Err(CodecError::Malformed("missing timestamp".into())),
    };

    let prev = match lookup(&map, keys::PREV) {
        Some(Value::Bytes(b)) => Some(
            EventId::try_from(b.as_slice())
                .map_err(|_| CodecError::Malformed("invalid prev id".into()))?,
        ),
        Some(Value::Null) | None => None,
        _ => return Err(CodecError::Malformed("invalid prev id".into())),
    };

    let event: Event = match lookup(&map, keys::EVENT) {
        Some(Value::Bytes(b)) => ciborium::from_reader(b.as_slice())
            .map_err(|e| CodecError::Decoding(e.to_string()))?,
        _ => return Err(CodecError::Malformed("missing event body".into())),
    };

    match lookup(&map, keys::KIND) {
        Some(Value::Text(kind)) if kind == event.kind() => {}
        _ => return Err(CodecError::Malformed("kind does not match event body".into())),
    }

    Ok(EventRecord {
        seq,
        prev,
        timestamp,
        event,
    })
}

fn lookup(map: &[(Value, Value)], key: u64) -> Option<&Value> {
    map.iter()
        .find(|(k, _)| match k {
            Value::Integer(i) => i128::from(*i) == i128::from(key),
            _ => false,
        })
        .map(|(_, v)| v)
}

fn int(key: u64) -> Value {
    Value::Integer(key.into())
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), CodecError> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(items) => {
            encode_uint(buf, 4, items.len() as u64);
            for item in items {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        _ => {
            return Err(CodecError::Encoding(
                "unsupported value in canonical encoding".into(),
            ))
        }
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // -1 encodes as 0, -2 as 1, ...
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a map with keys sorted by their encoded bytes.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<(), CodecError> {
    let mut pairs = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SkillDraft;
    use crate::types::{Address, SkillId};

    fn record(seq: u64, prev: Option<EventId>) -> EventRecord {
        EventRecord {
            seq,
            prev,
            timestamp: 1_700_000_000,
            event: Event::SkillCreated {
                skill_id: SkillId(3),
                instructor: Address::from_bytes([9; 20]),
                draft: SkillDraft {
                    title: "Rust".into(),
                    description: "Ownership".into(),
                    category: "Programming".into(),
                    duration: 90,
                    price: 10u128.pow(20),
                    content_hash: "QmX".into(),
                },
            },
        }
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = encode_record(&record(1, None)).unwrap();
        let b = encode_record(&record(1, None)).unwrap();
        assert_eq!(a, b);
        assert_eq!(record_id(&record(1, None)).unwrap(), id_of_bytes(&a));
    }

    #[test]
    fn test_header_starts_with_sorted_map() {
        let bytes = encode_record(&record(1, None)).unwrap();
        // map(6), key 0, version 1
        assert_eq!(&bytes[..3], &[0xa6, 0x00, RECORD_VERSION]);
    }

    #[test]
    fn test_decode_roundtrip_with_prev() {
        let first = record(1, None);
        let prev = record_id(&first).unwrap();
        let second = record(2, Some(prev));
        let decoded = decode_record(&encode_record(&second).unwrap()).unwrap();
        assert_eq!(decoded, second);
    }

    #[test]
    fn test_negative_timestamp() {
        let mut r = record(1, None);
        r.timestamp = -5;
        let decoded = decode_record(&encode_record(&r).unwrap()).unwrap();
        assert_eq!(decoded.timestamp, -5);
    }

    #[test]
    fn test_id_changes_with_any_field() {
        let base = record_id(&record(1, None)).unwrap();
        assert_ne!(base, record_id(&record(2, None)).unwrap());
        let mut later = record(1, None);
        later.timestamp += 1;
        assert_ne!(base, record_id(&later).unwrap());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut bytes = encode_record(&record(1, None)).unwrap();
        bytes[2] = 0x07;
        assert!(matches!(
            decode_record(&bytes),
            Err(CodecError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(decode_record(&[0x01, 0x02]).is_err());
    }
}
