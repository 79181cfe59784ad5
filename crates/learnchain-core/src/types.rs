//! Strong type definitions for Learnchain.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Token amount in the smallest unit of denomination.
pub type Amount = u128;

/// Unix time in seconds, as supplied by the execution environment.
pub type Timestamp = i64;

/// A 20-byte account identity.
///
/// Opaque to the engine: it is only compared, hashed and rendered.
/// The textual form is `0x` followed by 40 hex digits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Create an address from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Derive a stable address from a label.
    ///
    /// Derived from Blake3("learnchain-address-v0:" || label), truncated to 20 bytes.
    pub fn derive(label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"learnchain-address-v0:");
        hasher.update(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hasher.finalize().as_bytes()[..20]);
        Self(bytes)
    }

    /// Convert to lowercase hex with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex, with or without `0x` prefix. Case-insensitive.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(digits)?;
        if bytes.len() != 20 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 20] = slice.try_into()?;
        Ok(Self(arr))
    }
}

// Hex string for human-readable formats (TOML, JSON), raw bytes for CBOR.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AddressVisitor;

        impl<'de> Visitor<'de> for AddressVisitor {
            type Value = Address;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 20-byte address as hex string or bytes")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Address, E> {
                Address::from_hex(v).map_err(E::custom)
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Address, E> {
                Address::try_from(v).map_err(|_| E::invalid_length(v.len(), &self))
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Address, E> {
                self.visit_bytes(&v)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(AddressVisitor)
        } else {
            deserializer.deserialize_bytes(AddressVisitor)
        }
    }
}

/// Identifier of a skill listing. Assigned sequentially from 1.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SkillId(pub u64);

impl SkillId {
    /// The first id ever assigned.
    pub const FIRST: Self = Self(1);

    /// The id that follows this one.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SkillId({})", self.0)
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a learning session. Assigned sequentially from 1.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    /// The first id ever assigned.
    pub const FIRST: Self = Self(1);

    /// The id that follows this one.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 32-byte event identifier, computed as Blake3(canonical_bytes(record)).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub [u8; 32]);

impl EventId {
    /// Create a new EventId from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for EventId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for EventId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::from_bytes([0x42; 20]);
        let hex = addr.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 42);
        assert_eq!(Address::from_hex(&hex).unwrap(), addr);
    }

    #[test]
    fn test_address_parse_is_case_insensitive() {
        let lower = Address::from_hex("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd").unwrap();
        let upper = Address::from_hex("0XABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD").unwrap();
        let bare = Address::from_hex("abcdefabcdefabcdefabcdefabcdefabcdefabcd").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower, bare);
    }

    #[test]
    fn test_address_wrong_length() {
        assert!(Address::from_hex("0x1234").is_err());
    }

    #[test]
    fn test_address_derive_is_stable() {
        assert_eq!(Address::derive("platform"), Address::derive("platform"));
        assert_ne!(Address::derive("platform"), Address::derive("other"));
    }

    #[test]
    fn test_address_json_is_hex_string() {
        let addr = Address::from_bytes([0x01; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_address_cbor_is_bytes() {
        let addr = Address::from_bytes([0x07; 20]);
        let mut buf = Vec::new();
        ciborium::into_writer(&addr, &mut buf).unwrap();
        // major type 2 (bytes), length 20
        assert_eq!(buf[0], 0x54);
        let back: Address = ciborium::from_reader(&buf[..]).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_ids_are_sequential() {
        assert_eq!(SkillId::FIRST.next(), SkillId(2));
        assert_eq!(SessionId::FIRST.next().next(), SessionId(3));
    }

    #[test]
    fn test_event_id_display() {
        let id = EventId::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", id), "abababababababab");
        assert!(format!("{:?}", id).starts_with("EventId("));
    }
}
