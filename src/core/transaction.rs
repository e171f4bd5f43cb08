use crate::core::hashing::hash_transaction;
use crate::core::monetary::BLOCK_SUBSIDY;
use crate::error::{BlockchainError, Result};
use crate::storage::{OutPoint, UtxoSet};
use crate::utils::{hex_encode, serialize};
use crate::wallet::KeyStore;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const TX_VERSION: u32 = 1;

/// Lock-time of a transaction that has not been placed in a block yet
pub const LOCK_TIME_UNSET: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TxInput {
    previous_hash: String,
    index: u32,
    /// hex(DER signature) followed by hex(uncompressed public key)
    unlocking_proof: String,
}

impl TxInput {
    pub fn new(previous_hash: String, index: u32, unlocking_proof: String) -> TxInput {
        TxInput {
            previous_hash,
            index,
            unlocking_proof,
        }
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_index(&self) -> u32 {
        self.index
    }

    pub fn get_unlocking_proof(&self) -> &str {
        self.unlocking_proof.as_str()
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.previous_hash.clone(), self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TxOutput {
    value: u64,
    locking_key: String,
}

impl TxOutput {
    pub fn new(value: u64, locking_key: String) -> TxOutput {
        TxOutput { value, locking_key }
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_locking_key(&self) -> &str {
        self.locking_key.as_str()
    }

    pub fn is_locked_with_key(&self, locking_key: &str) -> bool {
        self.locking_key == locking_key
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    version: u32,
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
    lock_time: u64,
}

impl Transaction {
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>, lock_time: u64) -> Transaction {
        Transaction {
            version: TX_VERSION,
            inputs,
            outputs,
            lock_time,
        }
    }

    /// Coinbase paying the block subsidy to `locking_key`
    pub fn new_coinbase(locking_key: &str) -> Transaction {
        Transaction::new(
            vec![],
            vec![TxOutput::new(BLOCK_SUBSIDY, locking_key.to_string())],
            LOCK_TIME_UNSET,
        )
    }

    /// Builds and signs a transaction paying `amount` to `receiver` from the
    /// key store's own outputs, skipping outputs already spent by `pool`.
    pub fn new_utxo_transaction(
        keystore: &dyn KeyStore,
        receiver: &str,
        amount: u64,
        utxo_set: &UtxoSet,
        pool: &[Transaction],
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(BlockchainError::Structural(
                "Amount must be positive".to_string(),
            ));
        }

        let own_key = keystore.locking_key_for_self();
        let in_pool: HashSet<OutPoint> = pool
            .iter()
            .flat_map(|tx| tx.inputs.iter().map(TxInput::outpoint))
            .collect();

        let mut accumulated = 0u64;
        let mut inputs = vec![];
        for utxo in utxo_set.find_by_locking_key(&own_key) {
            if accumulated >= amount {
                break;
            }
            if in_pool.contains(&utxo.outpoint()) {
                continue;
            }
            accumulated = accumulated.saturating_add(utxo.get_value());
            inputs.push(TxInput::new(
                utxo.get_tx_hash().to_string(),
                utxo.get_output_index(),
                own_key.clone(),
            ));
        }

        if accumulated < amount {
            return Err(BlockchainError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let mut outputs = vec![TxOutput::new(amount, receiver.to_string())];
        let change = accumulated - amount;
        if change > 0 {
            outputs.push(TxOutput::new(change, own_key.clone()));
        }

        let mut tx = Transaction::new(inputs, outputs, LOCK_TIME_UNSET);
        tx.sign(keystore)?;
        info!(
            "Built transaction {} spending {} inputs for {amount} to {receiver}",
            tx.hash(),
            tx.inputs.len()
        );
        Ok(tx)
    }

    /// Every input carries the same proof because the signing preimage is
    /// shared by all inputs locked to the key store's own key.
    pub fn sign(&mut self, keystore: &dyn KeyStore) -> Result<()> {
        let digest = self.signing_digest(&keystore.locking_key_for_self())?;
        let signature = keystore.sign(&digest)?;
        let proof = format!(
            "{}{}",
            hex_encode(&signature),
            hex_encode(&keystore.public_key())
        );
        for input in self.inputs.iter_mut() {
            input.unlocking_proof = proof.clone();
        }
        debug!("Signed {} inputs", self.inputs.len());
        Ok(())
    }

    /// Hash of a copy where every unlocking proof is replaced with
    /// `locking_key` and the lock-time is reset to the unset sentinel.
    pub fn signing_hash(&self, locking_key: &str) -> String {
        let copy = Transaction {
            version: self.version,
            inputs: self
                .inputs
                .iter()
                .map(|input| {
                    TxInput::new(
                        input.previous_hash.clone(),
                        input.index,
                        locking_key.to_string(),
                    )
                })
                .collect(),
            outputs: self.outputs.clone(),
            lock_time: LOCK_TIME_UNSET,
        };
        copy.hash()
    }

    pub fn signing_digest(&self, locking_key: &str) -> Result<Vec<u8>> {
        crate::utils::hex_decode(&self.signing_hash(locking_key))
    }

    pub fn with_lock_time(mut self, lock_time: u64) -> Transaction {
        self.lock_time = lock_time;
        self
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn hash(&self) -> String {
        hash_transaction(self)
    }

    pub fn get_version(&self) -> u32 {
        self.version
    }

    pub fn get_inputs(&self) -> &[TxInput] {
        self.inputs.as_slice()
    }

    pub fn get_outputs(&self) -> &[TxOutput] {
        self.outputs.as_slice()
    }

    pub fn get_lock_time(&self) -> u64 {
        self.lock_time
    }

    pub fn get_output_value(&self) -> Result<u64> {
        let mut total = 0u64;
        for output in &self.outputs {
            total = total
                .checked_add(output.get_value())
                .ok_or_else(|| BlockchainError::Structural("Output value overflow".to_string()))?;
        }
        Ok(total)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UnspentOutput;
    use crate::wallet::Wallet;

    fn funded(wallet: &Wallet, values: &[u64]) -> UtxoSet {
        UtxoSet::from_outputs(values.iter().enumerate().map(|(i, value)| {
            UnspentOutput::new(
                format!("{:064x}", i + 1),
                0,
                1,
                *value,
                wallet.locking_key_for_self(),
            )
        }))
    }

    #[test]
    fn test_coinbase_shape() {
        let tx = Transaction::new_coinbase("aa");
        assert!(tx.is_coinbase());
        assert_eq!(tx.get_outputs().len(), 1);
        assert_eq!(tx.get_outputs()[0].get_value(), BLOCK_SUBSIDY);
        assert_eq!(tx.get_lock_time(), LOCK_TIME_UNSET);
    }

    #[test]
    fn test_signing_hash_ignores_proofs_and_lock_time() {
        let tx = Transaction::new(
            vec![TxInput::new("11".repeat(32), 0, "signature".to_string())],
            vec![TxOutput::new(5, "22".repeat(20))],
            99,
        );
        let resigned = Transaction::new(
            vec![TxInput::new("11".repeat(32), 0, "other".to_string())],
            vec![TxOutput::new(5, "22".repeat(20))],
            7,
        );
        assert_ne!(tx.hash(), resigned.hash());
        assert_eq!(tx.signing_hash("key"), resigned.signing_hash("key"));
        assert_ne!(tx.signing_hash("key"), tx.signing_hash("another key"));
    }

    #[test]
    fn test_new_utxo_transaction_with_change() {
        let sender = Wallet::new();
        let receiver = Wallet::new();
        let utxo_set = funded(&sender, &[30, 30]);

        let tx = Transaction::new_utxo_transaction(
            &sender,
            &receiver.locking_key_for_self(),
            45,
            &utxo_set,
            &[],
        )
        .unwrap();

        assert_eq!(tx.get_inputs().len(), 2);
        assert_eq!(tx.get_outputs()[0].get_value(), 45);
        assert!(tx.get_outputs()[0].is_locked_with_key(&receiver.locking_key_for_self()));
        assert_eq!(tx.get_outputs()[1].get_value(), 15);
        assert!(tx.get_outputs()[1].is_locked_with_key(&sender.locking_key_for_self()));
        assert_eq!(tx.get_lock_time(), LOCK_TIME_UNSET);
    }

    #[test]
    fn test_new_utxo_transaction_exact_amount_has_no_change() {
        let sender = Wallet::new();
        let utxo_set = funded(&sender, &[30]);

        let tx = Transaction::new_utxo_transaction(&sender, "ff", 30, &utxo_set, &[]).unwrap();
        assert_eq!(tx.get_outputs().len(), 1);
    }

    #[test]
    fn test_new_utxo_transaction_insufficient_funds() {
        let sender = Wallet::new();
        let utxo_set = funded(&sender, &[10, 5]);

        let result = Transaction::new_utxo_transaction(&sender, "ff", 16, &utxo_set, &[]);
        assert_eq!(
            result.unwrap_err(),
            BlockchainError::InsufficientFunds {
                required: 16,
                available: 15
            }
        );
    }

    #[test]
    fn test_new_utxo_transaction_skips_outputs_spent_in_pool() {
        let sender = Wallet::new();
        let utxo_set = funded(&sender, &[10, 10]);

        let first = Transaction::new_utxo_transaction(&sender, "ff", 10, &utxo_set, &[]).unwrap();
        let second =
            Transaction::new_utxo_transaction(&sender, "ff", 10, &utxo_set, &[first.clone()])
                .unwrap();
        assert_ne!(
            first.get_inputs()[0].outpoint(),
            second.get_inputs()[0].outpoint()
        );

        let third = Transaction::new_utxo_transaction(
            &sender,
            "ff",
            10,
            &utxo_set,
            &[first, second],
        );
        assert!(matches!(
            third,
            Err(BlockchainError::InsufficientFunds { available: 0, .. })
        ));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let sender = Wallet::new();
        let utxo_set = funded(&sender, &[10]);
        let result = Transaction::new_utxo_transaction(&sender, "ff", 0, &utxo_set, &[]);
        assert!(matches!(result, Err(BlockchainError::Structural(_))));
    }
}
