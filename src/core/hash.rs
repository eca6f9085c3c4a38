// Hashing utilities for Bitcoin

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::core::Hash256;

/// SHA256 double hash (Bitcoin convention)
/// hash256 = SHA256(SHA256(data))
pub fn hash256(data: &[u8]) -> Hash256 {
    Hash256::new(sha256_hash(&sha256_hash(data)))
}

/// Single SHA256 hash
pub fn sha256_hash(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    result
}

/// RIPEMD160(SHA256(data)) - used for key ids and script hashes
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let ripemd = Ripemd160::digest(Sha256::digest(data));
    let mut result = [0u8; 20];
    result.copy_from_slice(&ripemd);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash256_empty() {
        // SHA256d("") in wire order
        let hash = hash256(b"");
        assert_eq!(
            hex::encode(hash.as_bytes()),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn test_hash256_deterministic() {
        let data = b"hello world";
        assert_eq!(hash256(data), hash256(data));
        assert_ne!(hash256(data), hash256(b"hello world!"));
    }

    #[test]
    fn test_sha256_empty() {
        assert_eq!(
            hex::encode(sha256_hash(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash160_empty() {
        assert_eq!(
            hex::encode(hash160(b"")),
            "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"
        );
    }
}
