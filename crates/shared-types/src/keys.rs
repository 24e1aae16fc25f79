//! # Fixed-Length Identifiers
//!
//! | Type | Bytes | Text form |
//! |------|-------|-----------|
//! | `DevicePublicKey` | 32 | base58 |
//! | `SignatureBytes` | 64 | base58 |
//! | `ProofDigest` | 32 | lowercase hex |
//! | `MerkleRoot` | 32 | lowercase hex |
//!
//! Serialization always writes the text form. Deserialization of keys and
//! signatures also accepts a raw byte array or an object wrapping one under
//! `bytes`/`data`, which is how records written by older app builds look.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::KeyFormatError;

fn decode_base58<const N: usize>(s: &str) -> Result<[u8; N], KeyFormatError> {
    let bytes = bs58::decode(s.trim())
        .into_vec()
        .map_err(|e| KeyFormatError::InvalidBase58(e.to_string()))?;
    to_array(&bytes)
}

fn decode_hex<const N: usize>(s: &str) -> Result<[u8; N], KeyFormatError> {
    let trimmed = s.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(trimmed).map_err(|e| KeyFormatError::InvalidHex(e.to_string()))?;
    to_array(&bytes)
}

fn to_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], KeyFormatError> {
    bytes.try_into().map_err(|_| KeyFormatError::InvalidLength {
        expected: N,
        actual: bytes.len(),
    })
}

/// Visitor accepting base58 text, a byte sequence, or `{ "bytes": ... }`.
struct LenientBytesVisitor<const N: usize>;

impl<'de, const N: usize> Visitor<'de> for LenientBytesVisitor<N> {
    type Value = [u8; N];

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a base58 string, a {}-byte array, or an object with a bytes field", N)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        decode_base58(v).map_err(E::custom)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        to_array(v).map_err(E::custom)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut bytes = Vec::with_capacity(N);
        while let Some(b) = seq.next_element::<u8>()? {
            bytes.push(b);
        }
        to_array(&bytes).map_err(de::Error::custom)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut found = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == "bytes" || key == "data" {
                found = Some(map.next_value::<Lenient<N>>()?.0);
            } else {
                map.next_value::<de::IgnoredAny>()?;
            }
        }
        found.ok_or_else(|| de::Error::missing_field("bytes"))
    }
}

struct Lenient<const N: usize>([u8; N]);

impl<'de, const N: usize> Deserialize<'de> for Lenient<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(LenientBytesVisitor::<N>).map(Lenient)
    }
}

// =============================================================================
// DEVICE PUBLIC KEY
// =============================================================================

/// Ed25519 public key of the capturing device.
///
/// This is also the device identity carried in every `Reading`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DevicePublicKey([u8; 32]);

impl DevicePublicKey {
    /// Wrap raw key bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Canonical text form.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Display for DevicePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for DevicePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DevicePublicKey({})", self.to_base58())
    }
}

impl FromStr for DevicePublicKey {
    type Err = KeyFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_base58(s).map(Self)
    }
}

impl Serialize for DevicePublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for DevicePublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Lenient::<32>::deserialize(deserializer).map(|l| Self(l.0))
    }
}

// =============================================================================
// SIGNATURE
// =============================================================================

/// Ed25519 signature over a canonical message (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureBytes([u8; 64]);

impl SignatureBytes {
    /// Wrap raw signature bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Display for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes({})", self)
    }
}

impl FromStr for SignatureBytes {
    type Err = KeyFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_base58(s).map(Self)
    }
}

impl Serialize for SignatureBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SignatureBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Lenient::<64>::deserialize(deserializer).map(|l| Self(l.0))
    }
}

// =============================================================================
// HEX HASHES
// =============================================================================

macro_rules! hex_hash {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Wrap raw hash bytes.
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Raw hash bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Lowercase hex form.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = KeyFormatError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_hex(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

hex_hash!(
    /// Content hash of a reading's canonical encoding.
    ///
    /// Identifies the claim, not the signer: two devices signing the same
    /// reading share a digest.
    ProofDigest
);

hex_hash!(
    /// Root of a Merkle batch committed to the ledger.
    MerkleRoot
);
