// Public key material

use std::fmt;
use std::io::{Read, Write};

use secp256k1::PublicKey;

use super::error::{CodecError, Result};
use super::hash::hash160;
use super::serialize::{read_var_bytes, write_var_bytes, Serializable};

/// Uncompressed (or hybrid) SEC1 key length
pub const PUBLIC_KEY_SIZE: usize = 65;
/// Compressed SEC1 key length
pub const COMPRESSED_PUBLIC_KEY_SIZE: usize = 33;
/// Raw curve point x || y without prefix byte
pub const RAW_POINT_SIZE: usize = 64;

/// A public key in serialized SEC1 form.
///
/// The length is implied by the first byte: `0x02`/`0x03` mean 33 bytes,
/// `0x04`/`0x06`/`0x07` mean 65 bytes. The validating accessors check this
/// every time they are called, so a key read off the wire with an
/// inconsistent length is never handed out as valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PubKey {
    data: Vec<u8>,
}

impl PubKey {
    /// Expected key length for a given prefix byte
    pub fn expected_len(prefix: u8) -> Option<usize> {
        match prefix {
            0x02 | 0x03 => Some(COMPRESSED_PUBLIC_KEY_SIZE),
            0x04 | 0x06 | 0x07 => Some(PUBLIC_KEY_SIZE),
            _ => None,
        }
    }

    /// Whether `data` has the length its prefix byte calls for
    pub fn is_valid_size(data: &[u8]) -> bool {
        data.first()
            .and_then(|prefix| Self::expected_len(*prefix))
            .is_some_and(|len| len == data.len())
    }

    /// Build a key from serialized bytes
    pub fn from_raw(bytes: &[u8]) -> Result<Self> {
        let mut key = Self::default();
        key.set_raw(bytes)?;
        Ok(key)
    }

    /// Replace the key bytes. On failure the key is left empty.
    pub fn set_raw(&mut self, bytes: &[u8]) -> Result<()> {
        if !Self::is_valid_size(bytes) {
            self.data.clear();
            return Err(invalid_size(bytes));
        }
        self.data = bytes.to_vec();
        Ok(())
    }

    /// Serialized key bytes, re-validated on every call
    pub fn to_raw(&self) -> Result<&[u8]> {
        if !Self::is_valid_size(&self.data) {
            return Err(invalid_size(&self.data));
        }
        Ok(&self.data)
    }

    /// Key id: RIPEMD160(SHA256(key))
    pub fn key_id(&self) -> Result<[u8; 20]> {
        Ok(hash160(self.to_raw()?))
    }

    pub fn is_compressed(&self) -> bool {
        self.data.len() == COMPRESSED_PUBLIC_KEY_SIZE
    }

    /// Whether the bytes decode to a point on secp256k1
    pub fn is_fully_valid(&self) -> bool {
        self.to_raw()
            .is_ok_and(|raw| PublicKey::from_slice(raw).is_ok())
    }

    /// Prefix a raw 64-byte point with `0x04`
    pub fn uncompress(point: &[u8]) -> Result<Self> {
        check_point(point)?;
        let mut bytes = Vec::with_capacity(PUBLIC_KEY_SIZE);
        bytes.push(0x04);
        bytes.extend_from_slice(point);
        Self::from_raw(&bytes)
    }

    /// Compressed form of a raw 64-byte point.
    ///
    /// Parity is read straight off the last byte of y, so the point must be
    /// given in canonical (fully reduced) form.
    pub fn compress(point: &[u8]) -> Result<Self> {
        check_point(point)?;
        let mut bytes = Vec::with_capacity(COMPRESSED_PUBLIC_KEY_SIZE);
        bytes.push(if point[RAW_POINT_SIZE - 1] % 2 == 0 { 0x02 } else { 0x03 });
        bytes.extend_from_slice(&point[..32]);
        Self::from_raw(&bytes)
    }

    /// Expand a compressed key to its 65-byte form using curve arithmetic
    pub fn decompress(&self) -> Result<Self> {
        let key = PublicKey::from_slice(self.to_raw()?)
            .map_err(|e| CodecError::InvalidSize(format!("not a curve point: {}", e)))?;
        Self::from_raw(&key.serialize_uncompressed())
    }
}

fn invalid_size(bytes: &[u8]) -> CodecError {
    CodecError::InvalidSize(format!(
        "invalid pubkey size {} for prefix {:?}",
        bytes.len(),
        bytes.first()
    ))
}

fn check_point(point: &[u8]) -> Result<()> {
    if point.len() != RAW_POINT_SIZE {
        return Err(CodecError::InvalidSize(format!(
            "raw point must be {} bytes, got {}",
            RAW_POINT_SIZE,
            point.len()
        )));
    }
    Ok(())
}

impl fmt::Display for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.data))
    }
}

/// Wire form carries an explicit length, so it accepts any byte count.
impl Serializable for PubKey {
    fn pack<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        write_var_bytes(writer, &self.data)
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            data: read_var_bytes(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{Secp256k1, SecretKey};

    fn curve_key(seed: u8) -> PublicKey {
        let secp = Secp256k1::new();
        let secret_key = SecretKey::from_slice(&[seed; 32]).unwrap();
        PublicKey::from_secret_key(&secp, &secret_key)
    }

    fn with_prefix(prefix: u8, len: usize) -> Vec<u8> {
        let mut bytes = vec![0xab; len];
        bytes[0] = prefix;
        bytes
    }

    #[test]
    fn test_size_rules() {
        assert!(PubKey::from_raw(&with_prefix(0x02, 33)).is_ok());
        assert!(PubKey::from_raw(&with_prefix(0x03, 33)).is_ok());
        assert!(PubKey::from_raw(&with_prefix(0x04, 65)).is_ok());
        assert!(PubKey::from_raw(&with_prefix(0x06, 65)).is_ok());
        assert!(PubKey::from_raw(&with_prefix(0x07, 65)).is_ok());

        assert!(matches!(PubKey::from_raw(&with_prefix(0x05, 33)), Err(CodecError::InvalidSize(_))));
        assert!(PubKey::from_raw(&with_prefix(0x02, 65)).is_err());
        assert!(PubKey::from_raw(&with_prefix(0x04, 33)).is_err());
        assert!(PubKey::from_raw(&[]).is_err());
        for prefix in [0x02, 0x03, 0x04, 0x06, 0x07] {
            assert!(PubKey::from_raw(&with_prefix(prefix, 10)).is_err());
        }
    }

    #[test]
    fn test_set_raw_failure_clears() {
        let mut key = PubKey::from_raw(&with_prefix(0x02, 33)).unwrap();
        assert!(key.set_raw(&with_prefix(0x02, 32)).is_err());
        assert!(key.to_raw().is_err());
        assert!(key.key_id().is_err());
    }

    #[test]
    fn test_wire_form_defers_validation() {
        let mut buf = vec![3u8];
        buf.extend_from_slice(&[0x02, 0x01, 0x02]);
        let key = PubKey::deserialize(&buf).unwrap();

        // Decodes fine, but the validating accessors refuse it.
        assert!(matches!(key.to_raw(), Err(CodecError::InvalidSize(_))));
        assert!(!key.is_fully_valid());
        assert_eq!(key.serialize().unwrap(), buf);
    }

    #[test]
    fn test_uncompress_prefixes_point() {
        let point = [0x11u8; 64];
        let key = PubKey::uncompress(&point).unwrap();
        let raw = key.to_raw().unwrap();
        assert_eq!(raw.len(), 65);
        assert_eq!(raw[0], 0x04);
        assert_eq!(&raw[1..], &point[..]);
        assert!(PubKey::uncompress(&point[..63]).is_err());
    }

    #[test]
    fn test_compress_parity() {
        let mut point = [0x22u8; 64];
        point[63] = 0x10;
        assert_eq!(PubKey::compress(&point).unwrap().to_raw().unwrap()[0], 0x02);
        point[63] = 0x11;
        let key = PubKey::compress(&point).unwrap();
        let raw = key.to_raw().unwrap();
        assert_eq!(raw[0], 0x03);
        assert_eq!(&raw[1..], &point[..32]);
        assert!(PubKey::compress(&[0u8; 65]).is_err());
    }

    #[test]
    fn test_compress_uncompress_duality() {
        let point: Vec<u8> = (0u8..64).collect();
        let uncompressed = PubKey::uncompress(&point).unwrap();
        let compressed = PubKey::compress(&uncompressed.to_raw().unwrap()[1..]).unwrap();
        let raw = compressed.to_raw().unwrap();

        let expected_prefix = if point[63] % 2 == 0 { 0x02 } else { 0x03 };
        assert_eq!(raw[0], expected_prefix);
        assert_eq!(&raw[1..], &point[..32]);
    }

    #[test]
    fn test_compress_matches_curve() {
        for seed in [0x01u8, 0x11, 0x42, 0x7f] {
            let curve = curve_key(seed);
            let uncompressed = curve.serialize_uncompressed();

            let key = PubKey::compress(&uncompressed[1..]).unwrap();
            assert_eq!(key.to_raw().unwrap(), &curve.serialize()[..]);
            assert!(key.is_compressed());
            assert!(key.is_fully_valid());

            let expanded = key.decompress().unwrap();
            assert_eq!(expanded.to_raw().unwrap(), &uncompressed[..]);
            assert_eq!(expanded, PubKey::uncompress(&uncompressed[1..]).unwrap());
        }
    }

    #[test]
    fn test_key_id() {
        let curve = curve_key(0x01);
        let key = PubKey::from_raw(&curve.serialize()).unwrap();
        assert_eq!(key.key_id().unwrap(), hash160(&curve.serialize()));
    }

    #[test]
    fn test_not_on_curve() {
        let key = PubKey::from_raw(&with_prefix(0x04, 65)).unwrap();
        assert!(!key.is_fully_valid());
        assert!(key.decompress().is_err());
    }
}
