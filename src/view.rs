// Display-oriented projection of a transaction

use serde::Serialize;

use crate::config::Network;
use crate::core::script::{extract_destination, Destination};
use crate::core::{Result, Transaction, TxIn, TxOut};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutPointPrintable {
    /// Display-order hex; empty for the all-zero coinbase hash
    pub hash: String,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxInPrintable {
    pub prev_out: OutPointPrintable,
    pub script_sig: String,
    pub sequence: u32,
    pub script_witness: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxOutPrintable {
    pub value: i64,
    pub script_pubkey: String,
    /// Single address, comma-joined multisig addresses, or empty
    pub address: String,
    pub script_type: String,
}

/// Read-only rendering of a transaction for humans and JSON output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxPrintable {
    pub txid: String,
    pub version: i32,
    pub vin: Vec<TxInPrintable>,
    pub vout: Vec<TxOutPrintable>,
    pub lock_time: u32,
}

impl TxPrintable {
    pub fn new(tx: &Transaction, network: Network) -> Result<Self> {
        Ok(Self {
            txid: tx.txid()?.to_hex(),
            version: tx.version,
            vin: tx.vin.iter().map(TxInPrintable::from).collect(),
            vout: tx
                .vout
                .iter()
                .map(|output| TxOutPrintable::new(output, network))
                .collect(),
            lock_time: tx.lock_time,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&TxIn> for TxInPrintable {
    fn from(input: &TxIn) -> Self {
        let hash = if input.prev_out.hash.is_zero() {
            String::new()
        } else {
            input.prev_out.hash.to_hex()
        };

        Self {
            prev_out: OutPointPrintable {
                hash,
                index: input.prev_out.index,
            },
            script_sig: input.script_sig.to_hex(),
            sequence: input.sequence,
            script_witness: input
                .script_witness
                .stack()
                .iter()
                .map(hex::encode)
                .collect(),
        }
    }
}

impl TxOutPrintable {
    pub fn new(output: &TxOut, network: Network) -> Self {
        let destination = extract_destination(&output.script_pubkey, network);
        let address = match &destination {
            Destination::Single { address, .. } => address.clone(),
            Destination::Multi { addresses, .. } => addresses.join(","),
            Destination::NoAddress { .. } => String::new(),
        };

        Self {
            value: output.value,
            script_pubkey: output.script_pubkey.to_hex(),
            address,
            script_type: destination.script_type().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Hash256, OutPoint, PubKey, Script, ScriptWitness};
    use secp256k1::{PublicKey, Secp256k1, SecretKey};

    fn generator_key() -> PubKey {
        let secp = Secp256k1::new();
        let mut one = [0u8; 32];
        one[31] = 1;
        let secret_key = SecretKey::from_slice(&one).unwrap();
        PubKey::from_raw(&PublicKey::from_secret_key(&secp, &secret_key).serialize()).unwrap()
    }

    #[test]
    fn test_coinbase_view() {
        let tx = Transaction::coinbase(Script::new(), TxOut::new(5_000_000_000, Script::new()));
        let view = TxPrintable::new(&tx, Network::Mainnet).unwrap();

        assert_eq!(view.txid, "12d9670a57d494ef1c68731357868862b4ed5871b71942e5b607d8e62e2412eb");
        assert_eq!(view.version, 1);
        assert_eq!(view.lock_time, 0);
        assert_eq!(view.vin[0].prev_out.hash, "");
        assert_eq!(view.vin[0].prev_out.index, 0xffffffff);
        assert_eq!(view.vin[0].script_sig, "");
        assert!(view.vin[0].script_witness.is_empty());
        assert_eq!(view.vout[0].value, 5_000_000_000);
        assert_eq!(view.vout[0].address, "");
        assert_eq!(view.vout[0].script_type, "nonstandard");
    }

    #[test]
    fn test_spend_view() {
        let key = generator_key();
        let key_id = key.key_id().unwrap();
        let prev = Hash256::from_hex(&format!("{}01", "00".repeat(31))).unwrap();

        let mut input = TxIn::new(OutPoint::new(prev, 3), Script::from_bytes(vec![0xab, 0xcd]));
        input.script_witness = ScriptWitness::new(vec![vec![0x30, 0x45], Vec::new()]);

        let outputs = vec![
            TxOut::new(1_000, Script::p2wpkh(&key_id)),
            TxOut::new(2_000, Script::multisig(1, &[key.clone(), key.decompress().unwrap()]).unwrap()),
            TxOut::new(0, Script::op_return(b"hi")),
        ];
        let tx = Transaction::new(vec![input], outputs);
        let view = TxPrintable::new(&tx, Network::Mainnet).unwrap();

        assert_eq!(view.vin[0].prev_out.hash, prev.to_hex());
        assert_eq!(view.vin[0].script_sig, "abcd");
        assert_eq!(view.vin[0].script_witness, vec!["3045".to_string(), String::new()]);

        assert_eq!(view.vout[0].address, "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");
        assert_eq!(view.vout[0].script_type, "witness_v0_keyhash");

        let joined: Vec<&str> = view.vout[1].address.split(',').collect();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0], "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH");
        assert_eq!(view.vout[1].script_type, "multisig");

        assert_eq!(view.vout[2].address, "");
        assert_eq!(view.vout[2].script_type, "nulldata");
        assert_eq!(view.vout[2].script_pubkey, "6a026869");
    }

    #[test]
    fn test_network_changes_addresses() {
        let tx = Transaction::new(
            vec![TxIn::default()],
            vec![TxOut::new(1, Script::p2wpkh(&[0x75; 20]))],
        );
        let main = TxPrintable::new(&tx, Network::Mainnet).unwrap();
        let test = TxPrintable::new(&tx, Network::Testnet).unwrap();
        assert!(main.vout[0].address.starts_with("bc1q"));
        assert!(test.vout[0].address.starts_with("tb1q"));
    }

    #[test]
    fn test_json_rendering() {
        let tx = Transaction::coinbase(Script::new(), TxOut::new(50, Script::p2pkh(&[0x75; 20])));
        let json = TxPrintable::new(&tx, Network::Mainnet).unwrap().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], 1);
        assert_eq!(value["vin"][0]["prev_out"]["hash"], "");
        assert_eq!(value["vout"][0]["value"], 50);
        assert_eq!(value["vout"][0]["script_type"], "pubkeyhash");
        assert!(value["vout"][0]["address"].as_str().unwrap().starts_with('1'));
    }
}
