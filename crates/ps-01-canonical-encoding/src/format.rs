//! Canonical message layouts.

use serde::{Deserialize, Serialize};

use crate::errors::EncodingError;

/// Domain tag opening every length-prefixed message.
pub const DOMAIN_TAG: &[u8; 4] = b"PSv1";

/// Field separator of the delimited layout.
pub const DELIMITER: char = '|';

/// Number of fields in a canonical message.
pub(crate) const FIELD_COUNT: usize = 4;

/// Byte layout of a canonical message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalFormat {
    /// Domain tag followed by four `u32`-length-prefixed fields.
    #[default]
    LengthPrefixed,
    /// Four fields joined with `|`.
    Delimited,
}

pub(crate) fn write_length_prefixed(fields: &[&[u8]; FIELD_COUNT]) -> Vec<u8> {
    let body: usize = fields.iter().map(|f| f.len() + 4).sum();
    let mut out = Vec::with_capacity(DOMAIN_TAG.len() + body);
    out.extend_from_slice(DOMAIN_TAG);
    for field in fields {
        out.extend_from_slice(&(field.len() as u32).to_be_bytes());
        out.extend_from_slice(field);
    }
    out
}

/// Split a length-prefixed message back into its four fields.
pub fn split_length_prefixed(bytes: &[u8]) -> Result<Vec<&[u8]>, EncodingError> {
    let mut rest = bytes
        .strip_prefix(DOMAIN_TAG.as_slice())
        .ok_or_else(|| EncodingError::Malformed("missing domain tag".into()))?;

    let mut fields = Vec::with_capacity(FIELD_COUNT);
    while !rest.is_empty() {
        if rest.len() < 4 {
            return Err(EncodingError::Malformed("truncated length prefix".into()));
        }
        let (len_bytes, tail) = rest.split_at(4);
        let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
        if tail.len() < len {
            return Err(EncodingError::Malformed(format!(
                "field {} declares {} bytes, {} remain",
                fields.len(),
                len,
                tail.len()
            )));
        }
        let (field, tail) = tail.split_at(len);
        fields.push(field);
        rest = tail;
    }

    if fields.len() != FIELD_COUNT {
        return Err(EncodingError::Malformed(format!(
            "expected {} fields, found {}",
            FIELD_COUNT,
            fields.len()
        )));
    }
    Ok(fields)
}
