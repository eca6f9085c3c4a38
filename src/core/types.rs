// Basic types for Bitcoin blockchain

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use super::error::{CodecError, Result};
use super::serialize::{read_fixed, write_fixed, Serializable};

/// Reverse a byte sequence into a new vector
pub fn reverse_bytes(data: &[u8]) -> Vec<u8> {
    data.iter().rev().copied().collect()
}

/// Hex-encode a blob in display order: the first byte of `data`
/// becomes the last two characters of the output.
pub fn reverse_hex_encode(data: &[u8]) -> String {
    hex::encode(reverse_bytes(data))
}

/// Inverse of [`reverse_hex_encode`]. A leading `0x` is ignored.
pub fn reverse_hex_decode(hex_str: &str) -> Result<Vec<u8>> {
    let digits = hex_str
        .strip_prefix("0x")
        .or_else(|| hex_str.strip_prefix("0X"))
        .unwrap_or(hex_str);
    let mut bytes = hex::decode(digits)?;
    bytes.reverse();
    Ok(bytes)
}

/// 256-bit hash type (32 bytes)
/// Used for transaction IDs and previous-output references.
/// Stored in wire order; the text form is byte-reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// Create a new Hash256 from a byte array
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a Hash256 from a slice
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| {
            CodecError::InvalidSize(format!("hash must be 32 bytes, got {}", slice.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Get the hash as a byte slice
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create zero hash (marks a coinbase input's previous output)
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Convert to hex string (reversed for display, Bitcoin convention)
    pub fn to_hex(&self) -> String {
        reverse_hex_encode(&self.0)
    }

    /// Create from hex string (expects reversed byte order, optional `0x`)
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        Self::from_slice(&reverse_hex_decode(hex_str)?)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Hash256 {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serializable for Hash256 {
    fn pack<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        write_fixed(writer, &self.0)
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Ok(Self(read_fixed(reader)?))
    }
}
