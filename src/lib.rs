// Bitcoin transaction codec with segregated witness support

pub mod config;
pub mod core;
pub mod view;

// Re-exports for convenience
pub use config::Network;
pub use self::core::{
    CodecError, Hash256, OutPoint, PubKey, Script, ScriptWitness, Serializable, Transaction,
    TxIn, TxOut,
};
pub use view::TxPrintable;
