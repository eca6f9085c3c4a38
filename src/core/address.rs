// Address rendering for output scripts

use bech32::{u5, ToBase32, Variant};

use crate::config::Network;
use super::error::{CodecError, Result};
use super::hash::hash256;

/// Base58Check: version || payload || first 4 bytes of SHA256d
pub fn base58check_encode(version: u8, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 5);
    data.push(version);
    data.extend_from_slice(payload);
    let checksum = hash256(&data);
    data.extend_from_slice(&checksum.as_bytes()[..4]);
    bs58::encode(data).into_string()
}

/// Split a Base58Check string into version byte and payload
pub fn base58check_decode(address: &str) -> Result<(u8, Vec<u8>)> {
    let data = bs58::decode(address)
        .into_vec()
        .map_err(|e| CodecError::Address(format!("bad base58 in '{}': {}", address, e)))?;
    if data.len() < 5 {
        return Err(CodecError::Address(format!("'{}' is too short", address)));
    }

    let (body, checksum) = data.split_at(data.len() - 4);
    if hash256(body).as_bytes()[..4] != *checksum {
        return Err(CodecError::Address(format!("checksum mismatch in '{}'", address)));
    }
    Ok((body[0], body[1..].to_vec()))
}

pub fn p2pkh_address(key_id: &[u8; 20], network: Network) -> String {
    base58check_encode(network.pubkey_hash_prefix(), key_id)
}

pub fn p2sh_address(script_hash: &[u8; 20], network: Network) -> String {
    base58check_encode(network.script_hash_prefix(), script_hash)
}

/// Segwit address: Bech32 for version 0, Bech32m for later versions
pub fn segwit_address(version: u8, program: &[u8], network: Network) -> Result<String> {
    let witness_version =
        u5::try_from_u8(version).map_err(|e| CodecError::Address(e.to_string()))?;
    let variant = if version == 0 { Variant::Bech32 } else { Variant::Bech32m };

    let mut data = Vec::with_capacity(1 + (program.len() * 8).div_ceil(5));
    data.push(witness_version);
    data.extend(program.to_base32());

    bech32::encode(network.bech32_hrp(), data, variant)
        .map_err(|e| CodecError::Address(e.to_string()))
}
