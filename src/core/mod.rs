// Core protocol data structures and their wire codec

mod error;
mod types;
mod serialize;
mod hash;
mod pubkey;
mod address;
mod transaction;
pub mod script;

pub use error::{CodecError, Result};
pub use types::*;
pub use serialize::*;
pub use hash::*;
pub use pubkey::*;
pub use address::*;
pub use transaction::*;
pub use script::{Script, ScriptWitness, ScriptType, Destination};
