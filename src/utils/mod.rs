//! Utility functions and helpers
//!
//! Hashing, signatures, encodings and the clock used throughout the ledger.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    base58_decode, base58_encode, current_timestamp, ecdsa_secp256k1_sign_digest,
    ecdsa_secp256k1_verify, hash160, hex_decode, hex_encode, new_key_pair, public_key_of,
    ripemd160_digest, sha256_digest, sha256d_digest,
};

pub use serialization::{encoded_size, serialize};
