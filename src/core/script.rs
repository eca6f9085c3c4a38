// Bitcoin scripts, witness stacks and output classification

use std::fmt;
use std::io::{Read, Write};

use crate::config::Network;
use super::address::{p2pkh_address, p2sh_address, segwit_address};
use super::error::{CodecError, Result};
use super::pubkey::PubKey;
use super::serialize::{prealloc, read_var_bytes, read_varint, write_var_bytes, write_varint, Serializable};

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;

/// Value of OP_1..OP_16
fn small_int(op: u8) -> Option<u8> {
    (OP_1..=OP_16).contains(&op).then(|| op - OP_1 + 1)
}

fn small_int_op(n: u8) -> u8 {
    OP_1 + n - 1
}

/// A spending-condition program (scriptSig or scriptPubKey)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Parse plain (not reversed) hex
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        Ok(Self(hex::decode(hex_str)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Plain hex of the script bytes
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Append a single opcode
    pub fn push_opcode(&mut self, op: u8) -> &mut Self {
        self.0.push(op);
        self
    }

    /// Append a data push using the smallest push opcode that fits
    pub fn push_slice(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();
        match len {
            0..=0x4b => self.0.push(len as u8),
            0x4c..=0xff => self.0.extend_from_slice(&[OP_PUSHDATA1, len as u8]),
            0x100..=0xffff => {
                self.0.push(OP_PUSHDATA2);
                self.0.extend_from_slice(&(len as u16).to_le_bytes());
            }
            _ => {
                self.0.push(OP_PUSHDATA4);
                self.0.extend_from_slice(&(len as u32).to_le_bytes());
            }
        }
        self.0.extend_from_slice(data);
        self
    }

    /// Create a P2PKH scriptPubKey
    /// OP_DUP OP_HASH160 <pubKeyHash> OP_EQUALVERIFY OP_CHECKSIG
    pub fn p2pkh(key_id: &[u8; 20]) -> Self {
        let mut script = Self::new();
        script
            .push_opcode(OP_DUP)
            .push_opcode(OP_HASH160)
            .push_slice(key_id)
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_CHECKSIG);
        script
    }

    /// OP_HASH160 <scriptHash> OP_EQUAL
    pub fn p2sh(script_hash: &[u8; 20]) -> Self {
        let mut script = Self::new();
        script.push_opcode(OP_HASH160).push_slice(script_hash).push_opcode(OP_EQUAL);
        script
    }

    /// OP_0 <keyId>
    pub fn p2wpkh(key_id: &[u8; 20]) -> Self {
        let mut script = Self::new();
        script.push_opcode(OP_0).push_slice(key_id);
        script
    }

    /// OP_0 <sha256(witnessScript)>
    pub fn p2wsh(script_hash: &[u8; 32]) -> Self {
        let mut script = Self::new();
        script.push_opcode(OP_0).push_slice(script_hash);
        script
    }

    /// <pubkey> OP_CHECKSIG
    pub fn p2pk(key: &PubKey) -> Result<Self> {
        let mut script = Self::new();
        script.push_slice(key.to_raw()?).push_opcode(OP_CHECKSIG);
        Ok(script)
    }

    /// OP_m <pubkey>... OP_n OP_CHECKMULTISIG
    pub fn multisig(required: u8, keys: &[PubKey]) -> Result<Self> {
        let total = keys.len();
        if required == 0 || required as usize > total || total > 16 {
            return Err(CodecError::InvalidScript(format!(
                "cannot build {}-of-{} multisig",
                required, total
            )));
        }
        let mut script = Self::new();
        script.push_opcode(small_int_op(required));
        for key in keys {
            script.push_slice(key.to_raw()?);
        }
        script.push_opcode(small_int_op(total as u8)).push_opcode(OP_CHECKMULTISIG);
        Ok(script)
    }

    /// OP_RETURN <data>
    pub fn op_return(data: &[u8]) -> Self {
        let mut script = Self::new();
        script.push_opcode(OP_RETURN).push_slice(data);
        script
    }

    /// Create a P2PKH scriptSig
    /// <signature> <pubkey>
    pub fn p2pkh_script_sig(signature: &[u8], key: &PubKey) -> Result<Self> {
        let mut script = Self::new();
        script.push_slice(signature).push_slice(key.to_raw()?);
        Ok(script)
    }

    /// Iterate over the script's opcodes and data pushes
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions { data: &self.0, pos: 0 }
    }

    /// Witness version and program, if this is a witness output
    pub fn witness_program(&self) -> Option<(u8, &[u8])> {
        let b = &self.0;
        if b.len() < 4 || b.len() > 42 || b[1] as usize + 2 != b.len() {
            return None;
        }
        let version = match b[0] {
            OP_0 => 0,
            op => small_int(op)?,
        };
        Some((version, &b[2..]))
    }

    fn is_push_only(instructions: Instructions<'_>) -> bool {
        instructions.into_iter().all(|ins| match ins {
            Ok(Instruction::Push(_)) => true,
            Ok(Instruction::Op(op)) => op <= OP_16,
            Err(_) => false,
        })
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serializable for Script {
    fn pack<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        write_var_bytes(writer, &self.0)
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Ok(Self(read_var_bytes(reader)?))
    }
}

/// One step of a script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction<'a> {
    /// Data pushed by OP_0, a direct push or OP_PUSHDATA1/2/4
    Push(&'a [u8]),
    /// Any other opcode
    Op(u8),
}

pub struct Instructions<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Instructions<'a> {
    fn advance(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                let slice = &self.data[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => {
                let remaining = self.data.len() - self.pos;
                self.pos = self.data.len();
                Err(CodecError::InvalidScript(format!(
                    "push of {} bytes with only {} left",
                    n, remaining
                )))
            }
        }
    }

    fn read_len(&mut self, width: usize) -> Result<usize> {
        let bytes = self.advance(width)?;
        let mut buf = [0u8; 4];
        buf[..width].copy_from_slice(bytes);
        Ok(u32::from_le_bytes(buf) as usize)
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let op = *self.data.get(self.pos)?;
        self.pos += 1;

        let len = match op {
            OP_0 => return Some(Ok(Instruction::Push(&[]))),
            0x01..=0x4b => Ok(op as usize),
            OP_PUSHDATA1 => self.read_len(1),
            OP_PUSHDATA2 => self.read_len(2),
            OP_PUSHDATA4 => self.read_len(4),
            _ => return Some(Ok(Instruction::Op(op))),
        };
        Some(len.and_then(|n| self.advance(n)).map(Instruction::Push))
    }
}

/// Ordered witness stack attached to one input
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ScriptWitness {
    stack: Vec<Vec<u8>>,
}

impl ScriptWitness {
    pub fn new(stack: Vec<Vec<u8>>) -> Self {
        Self { stack }
    }

    pub fn push(&mut self, item: Vec<u8>) {
        self.stack.push(item);
    }

    pub fn stack(&self) -> &[Vec<u8>] {
        &self.stack
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

impl Serializable for ScriptWitness {
    fn pack<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        write_varint(writer, self.stack.len() as u64)?;
        for item in &self.stack {
            write_var_bytes(writer, item)?;
        }
        Ok(())
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let count = read_varint(reader)?;
        let mut stack = Vec::with_capacity(prealloc(count));
        for _ in 0..count {
            stack.push(read_var_bytes(reader)?);
        }
        Ok(Self { stack })
    }
}

/// Standard output templates, named as Bitcoin Core names them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptType {
    NonStandard,
    PubKey,
    PubKeyHash,
    ScriptHash,
    MultiSig,
    NullData,
    WitnessV0KeyHash,
    WitnessV0ScriptHash,
    WitnessV1Taproot,
    WitnessUnknown,
}

impl ScriptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptType::NonStandard => "nonstandard",
            ScriptType::PubKey => "pubkey",
            ScriptType::PubKeyHash => "pubkeyhash",
            ScriptType::ScriptHash => "scripthash",
            ScriptType::MultiSig => "multisig",
            ScriptType::NullData => "nulldata",
            ScriptType::WitnessV0KeyHash => "witness_v0_keyhash",
            ScriptType::WitnessV0ScriptHash => "witness_v0_scripthash",
            ScriptType::WitnessV1Taproot => "witness_v1_taproot",
            ScriptType::WitnessUnknown => "witness_unknown",
        }
    }

    /// Templates that pay to exactly one address
    pub fn is_single_destination(&self) -> bool {
        matches!(
            self,
            ScriptType::PubKey
                | ScriptType::PubKeyHash
                | ScriptType::ScriptHash
                | ScriptType::WitnessV0KeyHash
                | ScriptType::WitnessV0ScriptHash
                | ScriptType::WitnessV1Taproot
                | ScriptType::WitnessUnknown
        )
    }

    /// Templates that list several keys
    pub fn is_multi_destination(&self) -> bool {
        matches!(self, ScriptType::MultiSig)
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Matched template together with the data needed to render addresses
enum Solution<'a> {
    NonStandard,
    PubKey(PubKey),
    PubKeyHash(&'a [u8; 20]),
    ScriptHash(&'a [u8; 20]),
    MultiSig { required: u8, keys: Vec<PubKey> },
    NullData,
    Witness { version: u8, program: &'a [u8] },
}

fn solve(script: &Script) -> Solution<'_> {
    let b = script.as_bytes();

    if b.len() == 23 && b[0] == OP_HASH160 && b[1] == 20 && b[22] == OP_EQUAL {
        if let Ok(hash) = <&[u8; 20]>::try_from(&b[2..22]) {
            return Solution::ScriptHash(hash);
        }
    }

    if let Some((version, program)) = script.witness_program() {
        return Solution::Witness { version, program };
    }

    if b.first() == Some(&OP_RETURN) {
        let mut rest = script.instructions();
        rest.next();
        if Script::is_push_only(rest) {
            return Solution::NullData;
        }
    }

    if b.len() == 25
        && b[0] == OP_DUP
        && b[1] == OP_HASH160
        && b[2] == 20
        && b[23] == OP_EQUALVERIFY
        && b[24] == OP_CHECKSIG
    {
        if let Ok(hash) = <&[u8; 20]>::try_from(&b[3..23]) {
            return Solution::PubKeyHash(hash);
        }
    }

    let Ok(instructions) = script.instructions().collect::<Result<Vec<_>>>() else {
        return Solution::NonStandard;
    };

    match instructions.as_slice() {
        [Instruction::Push(key), Instruction::Op(OP_CHECKSIG)] => match PubKey::from_raw(key) {
            Ok(key) => Solution::PubKey(key),
            Err(_) => Solution::NonStandard,
        },
        [Instruction::Op(m), middle @ .., Instruction::Op(n), Instruction::Op(OP_CHECKMULTISIG)] => {
            solve_multisig(*m, middle, *n).unwrap_or(Solution::NonStandard)
        }
        _ => Solution::NonStandard,
    }
}

fn solve_multisig<'a>(m: u8, middle: &[Instruction<'_>], n: u8) -> Option<Solution<'a>> {
    let required = small_int(m)?;
    let total = small_int(n)?;
    if required > total || middle.len() != total as usize {
        return None;
    }
    let keys = middle
        .iter()
        .map(|ins| match ins {
            Instruction::Push(key) => PubKey::from_raw(key).ok(),
            Instruction::Op(_) => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(Solution::MultiSig { required, keys })
}

impl Solution<'_> {
    fn script_type(&self) -> ScriptType {
        match self {
            Solution::NonStandard => ScriptType::NonStandard,
            Solution::PubKey(_) => ScriptType::PubKey,
            Solution::PubKeyHash(_) => ScriptType::PubKeyHash,
            Solution::ScriptHash(_) => ScriptType::ScriptHash,
            Solution::MultiSig { .. } => ScriptType::MultiSig,
            Solution::NullData => ScriptType::NullData,
            Solution::Witness { version: 0, program } if program.len() == 20 => {
                ScriptType::WitnessV0KeyHash
            }
            Solution::Witness { version: 0, program } if program.len() == 32 => {
                ScriptType::WitnessV0ScriptHash
            }
            // Version 0 only defines 20 and 32 byte programs.
            Solution::Witness { version: 0, .. } => ScriptType::NonStandard,
            Solution::Witness { version: 1, program } if program.len() == 32 => {
                ScriptType::WitnessV1Taproot
            }
            Solution::Witness { .. } => ScriptType::WitnessUnknown,
        }
    }
}

/// Classify an output script
pub fn classify(script: &Script) -> ScriptType {
    solve(script).script_type()
}

/// Where an output pays to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Exactly one address
    Single { script_type: ScriptType, address: String },
    /// Bare multisig: one P2PKH address per listed key
    Multi { script_type: ScriptType, required: u8, addresses: Vec<String> },
    /// Nothing addressable (null data, non-standard, or unrenderable)
    NoAddress { script_type: ScriptType },
}

impl Destination {
    pub fn script_type(&self) -> ScriptType {
        match self {
            Destination::Single { script_type, .. }
            | Destination::Multi { script_type, .. }
            | Destination::NoAddress { script_type } => *script_type,
        }
    }

    pub fn addresses(&self) -> Vec<&str> {
        match self {
            Destination::Single { address, .. } => vec![address.as_str()],
            Destination::Multi { addresses, .. } => addresses.iter().map(String::as_str).collect(),
            Destination::NoAddress { .. } => Vec::new(),
        }
    }
}

/// Classify an output script and render its addresses for `network`
pub fn extract_destination(script: &Script, network: Network) -> Destination {
    let solution = solve(script);
    let script_type = solution.script_type();

    let single = |address: Result<String>| match address {
        Ok(address) => Destination::Single { script_type, address },
        Err(e) => {
            log::debug!("no address for {} output: {}", script_type, e);
            Destination::NoAddress { script_type }
        }
    };

    match solution {
        Solution::PubKey(key) => single(key.key_id().map(|id| p2pkh_address(&id, network))),
        Solution::PubKeyHash(hash) => single(Ok(p2pkh_address(hash, network))),
        Solution::ScriptHash(hash) => single(Ok(p2sh_address(hash, network))),
        Solution::Witness { version, program } if script_type != ScriptType::NonStandard => {
            single(segwit_address(version, program, network))
        }
        Solution::MultiSig { required, keys } => {
            let addresses = keys
                .iter()
                .map(|key| key.key_id().map(|id| p2pkh_address(&id, network)))
                .collect::<Result<Vec<_>>>();
            match addresses {
                Ok(addresses) => Destination::Multi { script_type, required, addresses },
                Err(_) => Destination::NoAddress { script_type },
            }
        }
        Solution::Witness { .. } | Solution::NullData | Solution::NonStandard => {
            Destination::NoAddress { script_type }
        }
    }
}
