//! Key custody and address encoding
//!
//! The ledger only ever talks to a `KeyStore`. `Wallet` is the in-memory
//! secp256k1 implementation used by the node and the CLI.

pub mod keystore;
#[allow(clippy::module_inception)]
pub mod wallet;

pub use keystore::KeyStore;
pub use wallet::{
    convert_address, hash_pub_key, locking_key_from_address, validate_address, Wallet,
    ADDRESS_CHECK_SUM_LEN,
};
