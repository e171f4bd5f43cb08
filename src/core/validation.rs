//! Transaction validation
//!
//! Structural, cryptographic and economic checks of a single transaction against
//! a UTXO snapshot, plus the cross-transaction double-spend check.

use crate::core::transaction::TX_VERSION;
use crate::core::monetary::BLOCK_SUBSIDY;
use crate::core::{Transaction, TxInput};
use crate::error::{BlockchainError, Result};
use crate::storage::{OutPoint, UnspentOutput, UtxoSet};
use crate::utils::{ecdsa_secp256k1_verify, hash160, hex_decode, hex_encode};
use log::warn;
use std::collections::HashSet;

/// Hex length of a 65-byte uncompressed secp256k1 public key
pub const PUBLIC_KEY_HEX_LEN: usize = 130;

/// Hex length of a double SHA-256 digest
pub const HASH_HEX_LEN: usize = 64;

pub struct TransactionValidator;

impl TransactionValidator {
    pub fn validate_structure(tx: &Transaction) -> Result<()> {
        if tx.get_version() != TX_VERSION {
            return Err(BlockchainError::Structural(format!(
                "unsupported transaction version {}",
                tx.get_version()
            )));
        }
        for input in tx.get_inputs() {
            if input.get_previous_hash().len() != HASH_HEX_LEN
                || !is_lower_hex(input.get_previous_hash())
            {
                return Err(BlockchainError::Structural(format!(
                    "invalid previous hash in input: {}",
                    input.get_previous_hash()
                )));
            }
            if input.get_unlocking_proof().is_empty() || !is_lower_hex(input.get_unlocking_proof())
            {
                return Err(BlockchainError::Structural(
                    "unlocking proof must be non-empty hex".to_string(),
                ));
            }
        }
        for output in tx.get_outputs() {
            if output.get_locking_key().is_empty() || !is_lower_hex(output.get_locking_key()) {
                return Err(BlockchainError::Structural(format!(
                    "invalid locking key in output: {}",
                    output.get_locking_key()
                )));
            }
        }
        tx.get_output_value()?;
        Ok(())
    }

    pub fn resolve_input<'a>(input: &TxInput, utxo_set: &'a UtxoSet) -> Result<&'a UnspentOutput> {
        utxo_set
            .get(&input.outpoint())
            .ok_or_else(|| BlockchainError::UnresolvedInput {
                tx_hash: input.get_previous_hash().to_string(),
                index: input.get_index(),
            })
    }

    /// Checks the embedded signature against the canonical preimage and that the
    /// embedded public key hashes to the resolved output's locking key.
    pub fn verify_signature(
        tx: &Transaction,
        input_index: usize,
        resolved: &UnspentOutput,
    ) -> Result<()> {
        let input = tx.get_inputs().get(input_index).ok_or_else(|| {
            BlockchainError::Structural(format!("input index {input_index} out of range"))
        })?;
        let proof = input.get_unlocking_proof();
        if proof.len() <= PUBLIC_KEY_HEX_LEN {
            return Err(BlockchainError::InvalidSignature(
                "unlocking proof too short".to_string(),
            ));
        }
        let (signature_hex, public_key_hex) = proof.split_at(proof.len() - PUBLIC_KEY_HEX_LEN);
        let signature = hex_decode(signature_hex)
            .map_err(|_| BlockchainError::InvalidSignature("signature is not hex".to_string()))?;
        let public_key = hex_decode(public_key_hex)
            .map_err(|_| BlockchainError::InvalidSignature("public key is not hex".to_string()))?;

        let digest = tx.signing_digest(resolved.get_locking_key())?;
        if !ecdsa_secp256k1_verify(&public_key, &signature, &digest) {
            return Err(BlockchainError::InvalidSignature(format!(
                "signature check failed for input {}:{}",
                input.get_previous_hash(),
                input.get_index()
            )));
        }

        if hex_encode(&hash160(&public_key)) != resolved.get_locking_key() {
            return Err(BlockchainError::InvalidSignature(format!(
                "public key does not own {}:{}",
                input.get_previous_hash(),
                input.get_index()
            )));
        }
        Ok(())
    }

    pub fn validate_semantics(tx: &Transaction, utxo_set: &UtxoSet) -> Result<()> {
        Self::validate_structure(tx)?;
        if tx.is_coinbase() {
            return Err(BlockchainError::Structural(
                "transaction has no inputs".to_string(),
            ));
        }
        Self::detect_conflicts(std::slice::from_ref(tx))?;

        let mut input_value = 0u64;
        for (idx, input) in tx.get_inputs().iter().enumerate() {
            let resolved = Self::resolve_input(input, utxo_set)?;
            Self::verify_signature(tx, idx, resolved)?;
            input_value = input_value
                .checked_add(resolved.get_value())
                .ok_or_else(|| BlockchainError::Structural("Input value overflow".to_string()))?;
        }

        let output_value = tx.get_output_value()?;
        if input_value != output_value {
            warn!(
                "Transaction {} does not balance: inputs={input_value}, outputs={output_value}",
                tx.hash()
            );
            return Err(BlockchainError::ValueMismatch {
                inputs: input_value,
                outputs: output_value,
            });
        }
        Ok(())
    }

    pub fn validate_coinbase(tx: &Transaction) -> Result<()> {
        Self::validate_structure(tx)?;
        if !tx.get_inputs().is_empty() {
            return Err(BlockchainError::InvalidCoinbase(
                "coinbase must have no inputs".to_string(),
            ));
        }
        if tx.get_outputs().len() != 1 {
            return Err(BlockchainError::InvalidCoinbase(format!(
                "coinbase must have exactly one output, found {}",
                tx.get_outputs().len()
            )));
        }
        let value = tx.get_outputs()[0].get_value();
        if value != BLOCK_SUBSIDY {
            return Err(BlockchainError::InvalidCoinbase(format!(
                "coinbase pays {value}, subsidy is {BLOCK_SUBSIDY}"
            )));
        }
        Ok(())
    }

    /// No (previous hash, index) pair may appear in more than one input across `transactions`
    pub fn detect_conflicts(transactions: &[Transaction]) -> Result<()> {
        let mut seen: HashSet<OutPoint> = HashSet::new();
        for input in transactions.iter().flat_map(|tx| tx.get_inputs()) {
            if !seen.insert(input.outpoint()) {
                return Err(BlockchainError::DoubleSpend {
                    tx_hash: input.get_previous_hash().to_string(),
                    index: input.get_index(),
                });
            }
        }
        Ok(())
    }
}

fn is_lower_hex(s: &str) -> bool {
    s.len() % 2 == 0 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
