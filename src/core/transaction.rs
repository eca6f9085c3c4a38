// Transaction data structures and the segwit-aware wire codec

use std::io::{self, Read, Write};

use crate::core::{hash256, Hash256, Script, ScriptWitness};
use super::error::{CodecError, Result};
use super::serialize::{
    prealloc, read_i32, read_i64, read_u32, read_u8, read_varint, write_i32, write_i64,
    write_u32, write_u8, write_varint, Serializable,
};
use super::types::{reverse_hex_decode, reverse_hex_encode};

/// Flag bit announcing the witness section
pub const WITNESS_FLAG: u8 = 0x01;

/// Sequence number that opts out of relative lock-time
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// Segwit weight multiplier for non-witness bytes
pub const WITNESS_SCALE_FACTOR: usize = 4;

/// Reference to an output of an earlier transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OutPoint {
    /// Id of the transaction holding the output
    pub hash: Hash256,
    /// Index of the output in that transaction
    pub index: u32,
}

impl OutPoint {
    pub fn new(hash: Hash256, index: u32) -> Self {
        Self { hash, index }
    }

    /// The outpoint carried by coinbase inputs
    pub fn null() -> Self {
        Self {
            hash: Hash256::zero(),
            index: 0xffffffff,
        }
    }

    pub fn is_null(&self) -> bool {
        self.hash.is_zero() && self.index == 0xffffffff
    }
}

impl Serializable for OutPoint {
    fn pack<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        self.hash.pack(writer)?;
        write_u32(writer, self.index)
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            hash: Hash256::unpack(reader)?,
            index: read_u32(reader)?,
        })
    }
}

/// Transaction input - references a previous transaction output
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxIn {
    /// Output being spent
    pub prev_out: OutPoint,
    /// Signature script (scriptSig) - proves ownership
    pub script_sig: Script,
    /// Sequence number (usually 0xffffffff)
    pub sequence: u32,
    /// Witness stack; travels in the transaction's witness section, not here
    pub script_witness: ScriptWitness,
}

impl TxIn {
    /// Create a new transaction input
    pub fn new(prev_out: OutPoint, script_sig: Script) -> Self {
        Self {
            prev_out,
            script_sig,
            sequence: SEQUENCE_FINAL,
            script_witness: ScriptWitness::default(),
        }
    }

    /// Create a coinbase input (for mining rewards)
    pub fn coinbase(script_sig: Script) -> Self {
        Self::new(OutPoint::null(), script_sig)
    }

    /// Check if this is a coinbase input
    pub fn is_coinbase(&self) -> bool {
        self.prev_out.is_null()
    }
}

impl Serializable for TxIn {
    fn pack<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        self.prev_out.pack(writer)?;
        self.script_sig.pack(writer)?;
        write_u32(writer, self.sequence)
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            prev_out: OutPoint::unpack(reader)?,
            script_sig: Script::unpack(reader)?,
            sequence: read_u32(reader)?,
            script_witness: ScriptWitness::default(),
        })
    }
}

/// Transaction output - specifies amount and recipient
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxOut {
    /// Amount in satoshis; not range-checked here
    pub value: i64,
    /// Public key script (scriptPubKey) - conditions for spending
    pub script_pubkey: Script,
}

impl TxOut {
    /// Create a new transaction output
    pub fn new(value: i64, script_pubkey: Script) -> Self {
        Self {
            value,
            script_pubkey,
        }
    }
}

impl Serializable for TxOut {
    fn pack<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        write_i64(writer, self.value)?;
        self.script_pubkey.pack(writer)
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            value: read_i64(reader)?,
            script_pubkey: Script::unpack(reader)?,
        })
    }
}

/// Transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction version
    pub version: i32,
    /// Transaction inputs, in wire order
    pub vin: Vec<TxIn>,
    /// Transaction outputs, in wire order
    pub vout: Vec<TxOut>,
    /// Lock time (block height or timestamp when tx becomes valid)
    pub lock_time: u32,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl Transaction {
    /// Create a new version 1 transaction with lock time 0
    pub fn new(vin: Vec<TxIn>, vout: Vec<TxOut>) -> Self {
        Self {
            version: 1,
            vin,
            vout,
            lock_time: 0,
        }
    }

    /// Create a coinbase transaction (mining reward)
    pub fn coinbase(script_sig: Script, output: TxOut) -> Self {
        Self::new(vec![TxIn::coinbase(script_sig)], vec![output])
    }

    /// Check if this is a coinbase transaction
    pub fn is_coinbase(&self) -> bool {
        self.vin.len() == 1 && self.vin[0].is_coinbase()
    }

    /// True iff any input carries a non-empty witness stack
    pub fn has_witness(&self) -> bool {
        self.vin.iter().any(|input| !input.script_witness.is_empty())
    }

    /// Serialize without marker, flag or witness section
    pub fn pack_no_witness<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        self.encode(writer, false)
    }

    fn encode<W: Write + ?Sized>(&self, writer: &mut W, with_witness: bool) -> Result<()> {
        write_i32(writer, self.version)?;

        if with_witness {
            // Empty input list as marker, then the flag byte
            write_varint(writer, 0)?;
            write_u8(writer, WITNESS_FLAG)?;
        }

        pack_list(writer, &self.vin)?;
        pack_list(writer, &self.vout)?;

        if with_witness {
            // One stack per input, empty ones included
            for input in &self.vin {
                input.script_witness.pack(writer)?;
            }
        }

        write_u32(writer, self.lock_time)
    }

    /// Parse what follows a zero-length input list: flag byte, the real
    /// input and output lists, then one witness stack per input.
    fn unpack_extended<R: Read + ?Sized>(reader: &mut R) -> Result<(Vec<TxIn>, Vec<TxOut>)> {
        let mut flags = read_u8(reader)?;
        if flags == 0 {
            log::debug!("rejecting transaction: zero inputs followed by a 0x00 flag byte");
            return Err(CodecError::MalformedTransaction(
                "zero-length input list without witness flag".to_string(),
            ));
        }

        let mut vin = Vec::new();
        let mut vout = Vec::new();
        if flags & WITNESS_FLAG != 0 {
            vin = unpack_list::<_, TxIn>(reader)?;
            vout = unpack_list::<_, TxOut>(reader)?;
            for input in vin.iter_mut() {
                input.script_witness = ScriptWitness::unpack(reader)?;
            }
            flags ^= WITNESS_FLAG;
            log::trace!(
                "decoded witness section: {} inputs, {} outputs",
                vin.len(),
                vout.len()
            );
        }

        if flags != 0 {
            log::debug!("rejecting transaction: unknown flag bits 0x{:02x}", flags);
            return Err(CodecError::UnknownTransactionOption(flags));
        }
        Ok((vin, vout))
    }

    /// Transaction id: SHA256d of the witness-stripped serialization
    pub fn txid(&self) -> Result<Hash256> {
        let mut buf = Vec::new();
        self.pack_no_witness(&mut buf)?;
        Ok(hash256(&buf))
    }

    /// Witness transaction id: SHA256d of the full serialization.
    /// Equals `txid` when there is no witness data.
    pub fn wtxid(&self) -> Result<Hash256> {
        Ok(hash256(&self.serialize()?))
    }

    /// Size in bytes without witness data
    pub fn base_size(&self) -> Result<usize> {
        let mut counter = ByteCounter(0);
        self.pack_no_witness(&mut counter)?;
        Ok(counter.0)
    }

    /// Size in bytes of the full serialization
    pub fn total_size(&self) -> Result<usize> {
        let mut counter = ByteCounter(0);
        self.pack(&mut counter)?;
        Ok(counter.0)
    }

    /// Weight units: base size x3 plus total size
    pub fn weight(&self) -> Result<usize> {
        Ok(self.base_size()? * (WITNESS_SCALE_FACTOR - 1) + self.total_size()?)
    }

    /// Virtual size: weight / 4, rounded up
    pub fn vsize(&self) -> Result<usize> {
        Ok(self.weight()?.div_ceil(WITNESS_SCALE_FACTOR))
    }

    /// Hex of the serialization in display (byte-reversed) order
    pub fn to_hex(&self) -> Result<String> {
        Ok(reverse_hex_encode(&self.serialize()?))
    }

    /// Parse hex produced by [`Transaction::to_hex`]; a leading `0x` is allowed
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        Self::deserialize(&reverse_hex_decode(hex_str)?)
    }

    /// Hex of the serialization in wire order
    pub fn to_raw_hex(&self) -> Result<String> {
        Ok(hex::encode(self.serialize()?))
    }

    /// Parse wire-order hex
    pub fn from_raw_hex(hex_str: &str) -> Result<Self> {
        Self::deserialize(&hex::decode(hex_str)?)
    }
}

impl Serializable for Transaction {
    fn pack<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        self.encode(writer, self.has_witness())
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let version = read_i32(reader)?;

        // A zero count here is the segwit marker, not an empty input list.
        let candidate = unpack_list::<_, TxIn>(reader)?;
        let (vin, vout) = if candidate.is_empty() {
            Self::unpack_extended(reader)?
        } else {
            let vout = unpack_list::<_, TxOut>(reader)?;
            (candidate, vout)
        };

        let lock_time = read_u32(reader)?;

        Ok(Self {
            version,
            vin,
            vout,
            lock_time,
        })
    }
}

fn pack_list<W: Write + ?Sized, T: Serializable>(writer: &mut W, items: &[T]) -> Result<()> {
    write_varint(writer, items.len() as u64)?;
    for item in items {
        item.pack(writer)?;
    }
    Ok(())
}

fn unpack_list<R: Read + ?Sized, T: Serializable>(reader: &mut R) -> Result<Vec<T>> {
    let count = read_varint(reader)?;
    let mut items = Vec::with_capacity(prealloc(count));
    for _ in 0..count {
        items.push(T::unpack(reader)?);
    }
    Ok(items)
}

/// Write sink that only counts bytes
struct ByteCounter(usize);

impl Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
