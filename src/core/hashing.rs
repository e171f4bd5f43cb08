//! Canonical hashing of headers and transactions
//!
//! Every identity in the ledger is a double SHA-256 over a fixed-order string
//! rendering of the entity's fields. The block's aggregate root is a flat digest
//! over the concatenated transaction hashes, not a binary tree.

use crate::core::{BlockHeader, Transaction};
use crate::utils::{hex_encode, sha256d_digest};

/// Header fields in order: version, previous hash, aggregate root, timestamp, bits, nonce
pub fn header_preimage(header: &BlockHeader) -> String {
    format!(
        "{:08x}{}{}{:016x}{:08x}{:016x}",
        header.get_version(),
        header.get_previous_hash(),
        header.get_aggregate_root(),
        header.get_timestamp(),
        header.get_bits(),
        header.get_nonce()
    )
}

/// Raw 32-byte double hash of a header, the value compared against the target
pub fn header_digest(header: &BlockHeader) -> Vec<u8> {
    sha256d_digest(header_preimage(header).as_bytes())
}

pub fn hash_header(header: &BlockHeader) -> String {
    hex_encode(&header_digest(header))
}

/// Version, then inputs as (previous hash ‖ index ‖ proof)*, outputs as (value ‖ key)*, then lock-time
pub fn transaction_preimage(tx: &Transaction) -> String {
    let mut preimage = format!("{:08x}", tx.get_version());
    for input in tx.get_inputs() {
        preimage.push_str(input.get_previous_hash());
        preimage.push_str(&format!("{:08x}", input.get_index()));
        preimage.push_str(input.get_unlocking_proof());
    }
    for output in tx.get_outputs() {
        preimage.push_str(&format!("{:016x}", output.get_value()));
        preimage.push_str(output.get_locking_key());
    }
    preimage.push_str(&format!("{:016x}", tx.get_lock_time()));
    preimage
}

pub fn hash_transaction(tx: &Transaction) -> String {
    hex_encode(&sha256d_digest(transaction_preimage(tx).as_bytes()))
}

/// Double hash over the concatenation of all transaction hashes in block order
pub fn aggregate_root(transactions: &[Transaction]) -> String {
    let concatenated: String = transactions.iter().map(hash_transaction).collect();
    hex_encode(&sha256d_digest(concatenated.as_bytes()))
}
