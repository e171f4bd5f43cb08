//! Test utilities for ledger testing

use crate::core::{
    Block, BlockTemplate, DifficultyAdjustment, MiningOutcome, ProofOfWork, Transaction, TxInput,
    TxOutput, GENESIS_BLOCK,
};
use crate::network::Transport;
use crate::node::Node;
use crate::storage::{OutPoint, UnspentOutput, UtxoSet};
use crate::utils::current_timestamp;
use crate::wallet::{KeyStore, Wallet};
use std::sync::{Arc, Mutex};

/// Deterministic wallet; `seed` must be non-zero
pub fn wallet_from_seed(seed: u8) -> Wallet {
    Wallet::from_secret_bytes(&[seed; 32]).unwrap()
}

/// Snapshot holding a single output of `value` owned by `wallet`
pub fn fund(wallet: &Wallet, value: u64) -> (UtxoSet, OutPoint) {
    let output = UnspentOutput::new("11".repeat(32), 0, 0, value, wallet.locking_key_for_self());
    let outpoint = output.outpoint();
    (UtxoSet::from_outputs([output]), outpoint)
}

/// Spends `inputs` into `outputs`, signed by `wallet`
pub fn signed_transaction(
    wallet: &Wallet,
    inputs: &[OutPoint],
    outputs: &[(u64, String)],
) -> Transaction {
    let mut tx = Transaction::new(
        inputs
            .iter()
            .map(|outpoint| {
                TxInput::new(
                    outpoint.get_tx_hash().to_string(),
                    outpoint.get_index(),
                    String::new(),
                )
            })
            .collect(),
        outputs
            .iter()
            .map(|(value, key)| TxOutput::new(*value, key.clone()))
            .collect(),
        0,
    );
    tx.sign(wallet).unwrap();
    tx
}

/// Mines `transactions` on top of `predecessor` at the predecessor's bits
pub fn mine_block(predecessor: &Block, transactions: Vec<Transaction>) -> Block {
    mine_block_with_bits(predecessor, predecessor.get_bits(), transactions)
}

/// Mines `transactions` on top of `predecessor` at the given bits
pub fn mine_block_with_bits(predecessor: &Block, bits: u32, transactions: Vec<Transaction>) -> Block {
    let template = BlockTemplate::new(predecessor, bits, transactions, current_timestamp().unwrap());
    match ProofOfWork::new(template).run(|| false).unwrap() {
        MiningOutcome::Found(block) => block,
        MiningOutcome::Cancelled => unreachable!("stop signal never raised"),
    }
}

/// Genesis followed by `length` coinbase-only blocks paying `locking_key`,
/// each mined at the bits the chain before it requires
pub fn mine_chain(length: usize, locking_key: &str) -> Vec<Block> {
    let mut chain = vec![GENESIS_BLOCK.clone()];
    for _ in 0..length {
        let bits = DifficultyAdjustment::next_bits(&chain).unwrap();
        let block = mine_block_with_bits(
            chain.last().unwrap(),
            bits,
            vec![Transaction::new_coinbase(locking_key)],
        );
        chain.push(block);
    }
    chain
}

/// Transport that records every broadcast for later inspection
#[derive(Default)]
pub struct RecordingTransport {
    pub blocks: Mutex<Vec<Block>>,
    pub pools: Mutex<Vec<Vec<Transaction>>>,
}

impl Transport for RecordingTransport {
    fn broadcast_latest_block(&self, block: &Block) {
        self.blocks.lock().unwrap().push(block.clone());
    }

    fn broadcast_pool(&self, pool: &[Transaction]) {
        self.pools.lock().unwrap().push(pool.to_vec());
    }
}

/// In-memory node owned by `wallet_from_seed(seed)`, with a recording transport
pub fn test_node(seed: u8) -> (Arc<Node>, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let node = Node::new(Arc::new(wallet_from_seed(seed)), transport.clone()).unwrap();
    (Arc::new(node), transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BlockValidator;

    #[test]
    fn test_mine_chain_links() {
        let chain = mine_chain(3, "aa");
        assert_eq!(chain.len(), 4);
        for pair in chain.windows(2) {
            BlockValidator::is_valid_successor(&pair[1], &pair[0], pair[0].get_bits()).unwrap();
            assert!(pair[1].get_timestamp() > pair[0].get_timestamp());
        }
    }

    #[test]
    fn test_seeded_wallets_differ() {
        assert_ne!(
            wallet_from_seed(1).locking_key_for_self(),
            wallet_from_seed(2).locking_key_for_self()
        );
    }
}
