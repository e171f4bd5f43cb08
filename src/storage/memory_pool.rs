use crate::core::{Transaction, TransactionValidator};
use crate::error::{BlockchainError, Result};
use crate::storage::{OutPoint, UtxoSet};
use log::{debug, info};
use std::collections::HashSet;

/// Validated transactions waiting for a block, in arrival order.
///
/// Callers serialise access; the ledger and the pool are mutated under one lock.
#[derive(Debug, Clone, Default)]
pub struct MemoryPool {
    transactions: Vec<Transaction>,
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool::default()
    }

    /// Admits `tx` if it is valid against `utxo_set` and spends nothing
    /// another pooled transaction already spends.
    pub fn add(&mut self, tx: Transaction, utxo_set: &UtxoSet) -> Result<()> {
        TransactionValidator::validate_semantics(&tx, utxo_set)?;

        let pooled = self.spent_outpoints();
        if let Some(input) = tx
            .get_inputs()
            .iter()
            .find(|input| pooled.contains(&input.outpoint()))
        {
            return Err(BlockchainError::ConflictingInput {
                tx_hash: input.get_previous_hash().to_string(),
                index: input.get_index(),
            });
        }
        debug_assert!(
            !self.contains(&tx.hash()),
            "pool entry outputs would collide with an existing entry"
        );

        info!("Added transaction {} to the pool", tx.hash());
        self.transactions.push(tx);
        Ok(())
    }

    /// Drops every transaction that references an input missing from
    /// `utxo_set` and returns the dropped entries.
    pub fn prune(&mut self, utxo_set: &UtxoSet) -> Vec<Transaction> {
        let (kept, removed): (Vec<Transaction>, Vec<Transaction>) =
            self.transactions.drain(..).partition(|tx| {
                tx.get_inputs()
                    .iter()
                    .all(|input| utxo_set.contains(&input.outpoint()))
            });
        self.transactions = kept;
        if !removed.is_empty() {
            debug!(
                "Pruned {} transactions, {} remain",
                removed.len(),
                self.transactions.len()
            );
        }
        removed
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn contains(&self, tx_hash: &str) -> bool {
        self.transactions.iter().any(|tx| tx.hash() == tx_hash)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    fn spent_outpoints(&self) -> HashSet<OutPoint> {
        self.transactions
            .iter()
            .flat_map(|tx| tx.get_inputs().iter().map(|input| input.outpoint()))
            .collect()
    }
}
