use crate::core::{
    Block, BlockTemplate, BlockValidator, DifficultyAdjustment, ForkChoice, ForkChoiceOutcome,
    Transaction, GENESIS_BLOCK,
};
use crate::error::{BlockchainError, Result};
use crate::storage::UtxoSet;
use log::info;
use num_bigint::BigUint;

/// What happened to a candidate chain offered to the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainDecision {
    Replaced,
    Kept,
    Rejected(BlockchainError),
}

/// Owner of the canonical chain and the UTXO snapshot it produces.
///
/// Both are replaced together on every successful append or reorg and are
/// never modified on failure.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    chain: Vec<Block>,
    utxo_set: UtxoSet,
}

impl LedgerStore {
    /// Ledger holding only the genesis block
    pub fn new() -> Result<LedgerStore> {
        LedgerStore::from_chain(vec![GENESIS_BLOCK.clone()])
    }

    /// Imports a whole chain after replaying it from genesis
    pub fn from_chain(chain: Vec<Block>) -> Result<LedgerStore> {
        let utxo_set = ForkChoice::replay(&chain)?;
        Ok(LedgerStore { chain, utxo_set })
    }

    /// Validates `block` against the current head and the difficulty it must
    /// be mined at and, on success, extends the chain
    pub fn append(&mut self, block: Block) -> Result<()> {
        let height = self.chain.len() as u64;
        let bits = self.next_bits()?;
        let utxo_set = BlockValidator::accept(&block, self.head(), bits, &self.utxo_set, height)?;
        self.chain.push(block);
        self.utxo_set = utxo_set;
        Ok(())
    }

    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> ChainDecision {
        match ForkChoice::evaluate(&candidate, &self.chain) {
            ForkChoiceOutcome::Adopt(utxo_set) => {
                info!(
                    "Replacing chain of {} blocks with chain of {} blocks",
                    self.chain.len(),
                    candidate.len()
                );
                self.chain = candidate;
                self.utxo_set = utxo_set;
                ChainDecision::Replaced
            }
            ForkChoiceOutcome::Keep => ChainDecision::Kept,
            ForkChoiceOutcome::Reject(e) => ChainDecision::Rejected(e),
        }
    }

    pub fn next_bits(&self) -> Result<u32> {
        DifficultyAdjustment::next_bits(&self.chain)
    }

    /// Template for the next block with `transactions` (coinbase first)
    pub fn block_template(&self, transactions: Vec<Transaction>, now: u64) -> Result<BlockTemplate> {
        Ok(BlockTemplate::new(
            self.head(),
            self.next_bits()?,
            transactions,
            now,
        ))
    }

    pub fn head(&self) -> &Block {
        // The chain always starts with genesis
        &self.chain[self.chain.len() - 1]
    }

    /// Height of the head block, genesis being 0
    pub fn height(&self) -> u64 {
        self.chain.len() as u64 - 1
    }

    pub fn chain(&self) -> &[Block] {
        self.chain.as_slice()
    }

    pub fn utxo_set(&self) -> &UtxoSet {
        &self.utxo_set
    }

    pub fn accumulated_difficulty(&self) -> BigUint {
        DifficultyAdjustment::accumulated_difficulty(&self.chain)
    }

    pub fn find_block(&self, hash: &str) -> Option<&Block> {
        self.chain.iter().find(|block| block.hash() == hash)
    }

    pub fn find_transaction(&self, tx_hash: &str) -> Option<&Transaction> {
        self.chain
            .iter()
            .flat_map(|block| block.get_transactions())
            .find(|tx| tx.hash() == tx_hash)
    }
}
