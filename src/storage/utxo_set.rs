use crate::core::{Transaction, TransactionValidator};
use crate::error::{BlockchainError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Key of an unspent output: the creating transaction and the output position
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    tx_hash: String,
    index: u32,
}

impl OutPoint {
    pub fn new(tx_hash: String, index: u32) -> OutPoint {
        OutPoint { tx_hash, index }
    }

    pub fn get_tx_hash(&self) -> &str {
        self.tx_hash.as_str()
    }

    pub fn get_index(&self) -> u32 {
        self.index
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    tx_hash: String,
    output_index: u32,
    block_height: u64,
    value: u64,
    locking_key: String,
}

impl UnspentOutput {
    pub fn new(
        tx_hash: String,
        output_index: u32,
        block_height: u64,
        value: u64,
        locking_key: String,
    ) -> UnspentOutput {
        UnspentOutput {
            tx_hash,
            output_index,
            block_height,
            value,
            locking_key,
        }
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.tx_hash.clone(), self.output_index)
    }

    pub fn get_tx_hash(&self) -> &str {
        self.tx_hash.as_str()
    }

    pub fn get_output_index(&self) -> u32 {
        self.output_index
    }

    pub fn get_block_height(&self) -> u64 {
        self.block_height
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_locking_key(&self) -> &str {
        self.locking_key.as_str()
    }
}

/// Immutable snapshot of every unspent output, keyed by outpoint.
///
/// Snapshots are never patched in place: `apply` builds a successor and leaves
/// `self` untouched, so a rejected batch cannot leave a partial state behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSet {
    outputs: BTreeMap<OutPoint, UnspentOutput>,
}

impl UtxoSet {
    pub fn new() -> UtxoSet {
        UtxoSet::default()
    }

    pub fn from_outputs(outputs: impl IntoIterator<Item = UnspentOutput>) -> UtxoSet {
        UtxoSet {
            outputs: outputs
                .into_iter()
                .map(|output| (output.outpoint(), output))
                .collect(),
        }
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&UnspentOutput> {
        self.outputs.get(outpoint)
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.outputs.contains_key(outpoint)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnspentOutput> {
        self.outputs.values()
    }

    pub fn to_vec(&self) -> Vec<UnspentOutput> {
        self.outputs.values().cloned().collect()
    }

    /// Outputs owned by `locking_key`, in outpoint order
    pub fn find_by_locking_key(&self, locking_key: &str) -> Vec<&UnspentOutput> {
        self.outputs
            .values()
            .filter(|output| output.locking_key == locking_key)
            .collect()
    }

    pub fn balance(&self, locking_key: &str) -> u64 {
        self.find_by_locking_key(locking_key)
            .iter()
            .fold(0u64, |total, output| total.saturating_add(output.value))
    }

    /// Applies one block's transactions, coinbase first, at `block_height`.
    ///
    /// Every non-coinbase transaction is checked against this snapshot as it
    /// was before the batch, so transactions in one block cannot spend each
    /// other's outputs and the result does not depend on their order.
    pub fn apply(&self, transactions: &[Transaction], block_height: u64) -> Result<UtxoSet> {
        let (coinbase, rest) = transactions.split_first().ok_or_else(|| {
            BlockchainError::Structural("batch must start with a coinbase".to_string())
        })?;
        TransactionValidator::validate_coinbase(coinbase)?;
        TransactionValidator::detect_conflicts(transactions)?;
        for tx in rest {
            TransactionValidator::validate_semantics(tx, self)?;
        }

        let consumed: HashSet<_> = rest
            .iter()
            .flat_map(|tx| tx.get_inputs().iter().map(|input| input.outpoint()))
            .collect();
        let mut outputs: BTreeMap<OutPoint, UnspentOutput> = self
            .outputs
            .iter()
            .filter(|(outpoint, _)| !consumed.contains(*outpoint))
            .map(|(outpoint, output)| (outpoint.clone(), output.clone()))
            .collect();

        for tx in transactions {
            let tx_hash = tx.hash();
            for (index, output) in tx.get_outputs().iter().enumerate() {
                let created = UnspentOutput::new(
                    tx_hash.clone(),
                    index as u32,
                    block_height,
                    output.get_value(),
                    output.get_locking_key().to_string(),
                );
                let outpoint = created.outpoint();
                if outputs.contains_key(&outpoint) {
                    return Err(BlockchainError::DuplicateOutput {
                        tx_hash,
                        index: index as u32,
                    });
                }
                outputs.insert(outpoint, created);
            }
        }

        debug!(
            "Applied {} transactions at height {block_height}: {} spent, {} unspent outputs",
            transactions.len(),
            consumed.len(),
            outputs.len()
        );
        Ok(UtxoSet { outputs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BLOCK_SUBSIDY;
    use crate::testnet::{fund, signed_transaction, wallet_from_seed};
    use crate::wallet::KeyStore;

    #[test]
    fn test_apply_coinbase_only() {
        let utxo_set = UtxoSet::new()
            .apply(&[Transaction::new_coinbase("aa")], 0)
            .unwrap();
        assert_eq!(utxo_set.len(), 1);
        assert_eq!(utxo_set.balance("aa"), BLOCK_SUBSIDY);
        assert_eq!(utxo_set.iter().next().unwrap().get_block_height(), 0);
    }

    #[test]
    fn test_apply_spend_moves_value() {
        let alice = wallet_from_seed(1);
        let bob = wallet_from_seed(2);
        let (utxo_set, outpoint) = fund(&alice, 100);
        let tx = signed_transaction(
            &alice,
            &[outpoint.clone()],
            &[(60, bob.locking_key_for_self()), (40, alice.locking_key_for_self())],
        );

        let next = utxo_set
            .apply(&[Transaction::new_coinbase("cc"), tx], 5)
            .unwrap();
        assert!(!next.contains(&outpoint));
        assert_eq!(next.balance(&bob.locking_key_for_self()), 60);
        assert_eq!(next.balance(&alice.locking_key_for_self()), 40);
        assert_eq!(next.balance("cc"), BLOCK_SUBSIDY);
        // The prior snapshot is untouched
        assert!(utxo_set.contains(&outpoint));
    }

    #[test]
    fn test_missing_coinbase_rejected() {
        let alice = wallet_from_seed(1);
        let (utxo_set, outpoint) = fund(&alice, 100);
        let tx = signed_transaction(&alice, &[outpoint], &[(100, alice.locking_key_for_self())]);

        assert!(matches!(
            utxo_set.apply(&[tx], 1),
            Err(BlockchainError::InvalidCoinbase(_))
        ));
        assert!(utxo_set.apply(&[], 1).is_err());
    }

    #[test]
    fn test_batch_cannot_spend_its_own_outputs() {
        let alice = wallet_from_seed(1);
        let bob = wallet_from_seed(2);
        let (utxo_set, outpoint) = fund(&alice, 100);
        let first = signed_transaction(&alice, &[outpoint], &[(100, bob.locking_key_for_self())]);
        let chained = signed_transaction(
            &bob,
            &[OutPoint::new(first.hash(), 0)],
            &[(100, alice.locking_key_for_self())],
        );

        let err = utxo_set
            .apply(&[Transaction::new_coinbase("cc"), first, chained], 1)
            .unwrap_err();
        assert!(matches!(err, BlockchainError::UnresolvedInput { .. }));
    }

    #[test]
    fn test_duplicate_output_reported() {
        let coinbase = Transaction::new_coinbase("aa");
        let utxo_set = UtxoSet::new().apply(&[coinbase.clone()], 0).unwrap();
        assert!(matches!(
            utxo_set.apply(&[coinbase], 1),
            Err(BlockchainError::DuplicateOutput { index: 0, .. })
        ));
    }

    #[test]
    fn test_find_by_locking_key_in_key_order() {
        let outputs = (1..=3).rev().map(|i| {
            UnspentOutput::new(format!("{i:064x}"), 0, 0, i as u64, "aa".to_string())
        });
        let utxo_set = UtxoSet::from_outputs(outputs);
        let values: Vec<u64> = utxo_set
            .find_by_locking_key("aa")
            .iter()
            .map(|output| output.get_value())
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert!(utxo_set.find_by_locking_key("bb").is_empty());
    }
}
