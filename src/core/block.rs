use crate::core::hashing::{aggregate_root, hash_header};
use crate::core::validation::{TransactionValidator, HASH_HEX_LEN};
use crate::core::{ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::UtxoSet;
use crate::utils::{encoded_size, serialize};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Magic tag carried by every block
pub const BLOCK_MAGIC: u32 = 0xD9B4_BEF9;

/// Header format version
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct BlockHeader {
    version: u32,
    previous_hash: String,
    aggregate_root: String,
    timestamp: u64,
    bits: u32,
    nonce: u64,
}

impl BlockHeader {
    pub fn new(
        previous_hash: String,
        aggregate_root: String,
        timestamp: u64,
        bits: u32,
        nonce: u64,
    ) -> BlockHeader {
        BlockHeader {
            version: FORMAT_VERSION,
            previous_hash,
            aggregate_root,
            timestamp,
            bits,
            nonce,
        }
    }

    /// Copy of this header with a different timestamp and nonce, used by the search loop
    pub fn with_search_state(&self, timestamp: u64, nonce: u64) -> BlockHeader {
        BlockHeader {
            timestamp,
            nonce,
            ..self.clone()
        }
    }

    pub fn hash(&self) -> String {
        hash_header(self)
    }

    pub fn get_version(&self) -> u32 {
        self.version
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_aggregate_root(&self) -> &str {
        self.aggregate_root.as_str()
    }

    pub fn get_timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn get_bits(&self) -> u32 {
        self.bits
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    magic: u32,
    size: u64,
    header: BlockHeader,
    tx_count: u32,
    transactions: Vec<Transaction>,
}

impl Block {
    /// Wraps a finished header and its transactions, filling in magic, size and count
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Result<Block> {
        let size = Self::content_size(&header, &transactions)?;
        let tx_count = u32::try_from(transactions.len())
            .map_err(|_| BlockchainError::Structural("too many transactions".to_string()))?;
        Ok(Block {
            magic: BLOCK_MAGIC,
            size,
            header,
            tx_count,
            transactions,
        })
    }

    #[allow(clippy::ptr_arg)]
    fn content_size(header: &BlockHeader, transactions: &Vec<Transaction>) -> Result<u64> {
        Ok(encoded_size(header)? + encoded_size(transactions)?)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    /// Identity of the block, the double hash of its header
    pub fn hash(&self) -> String {
        self.header.hash()
    }

    pub fn get_magic(&self) -> u32 {
        self.magic
    }

    pub fn get_size(&self) -> u64 {
        self.size
    }

    pub fn get_header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn get_tx_count(&self) -> u32 {
        self.tx_count
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_previous_hash(&self) -> &str {
        self.header.get_previous_hash()
    }

    pub fn get_timestamp(&self) -> u64 {
        self.header.get_timestamp()
    }

    pub fn get_bits(&self) -> u32 {
        self.header.get_bits()
    }

    /// Recomputes the flat aggregate root and compares it with the header's
    pub fn verify_aggregate_root(&self) -> bool {
        aggregate_root(&self.transactions) == self.header.get_aggregate_root()
    }
}

/// Everything the miner needs except the winning nonce
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    previous_hash: String,
    aggregate_root: String,
    timestamp: u64,
    bits: u32,
    transactions: Vec<Transaction>,
}

impl BlockTemplate {
    /// Stamps every transaction's lock-time with a timestamp strictly after
    /// the predecessor's, then fixes the aggregate root over the stamped set.
    pub fn new(
        predecessor: &Block,
        bits: u32,
        transactions: Vec<Transaction>,
        now: u64,
    ) -> BlockTemplate {
        let timestamp = now.max(predecessor.get_timestamp().saturating_add(1));
        let transactions: Vec<Transaction> = transactions
            .into_iter()
            .map(|tx| tx.with_lock_time(timestamp))
            .collect();
        BlockTemplate {
            previous_hash: predecessor.hash(),
            aggregate_root: aggregate_root(&transactions),
            timestamp,
            bits,
            transactions,
        }
    }

    /// Header at the template timestamp, which every lock-time already carries
    pub fn header(&self, nonce: u64) -> BlockHeader {
        BlockHeader::new(
            self.previous_hash.clone(),
            self.aggregate_root.clone(),
            self.timestamp,
            self.bits,
            nonce,
        )
    }

    pub fn into_block(self, header: BlockHeader) -> Result<Block> {
        Block::new(header, self.transactions)
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn get_bits(&self) -> u32 {
        self.bits
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }
}

/// Progress of one candidate block through validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStage {
    Received,
    StructureChecked,
    LinkChecked,
    PowChecked,
    TransactionsApplied,
    Accepted,
}

impl fmt::Display for BlockStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            BlockStage::Received => "received",
            BlockStage::StructureChecked => "structure checked",
            BlockStage::LinkChecked => "link checked",
            BlockStage::PowChecked => "proof-of-work checked",
            BlockStage::TransactionsApplied => "transactions applied",
            BlockStage::Accepted => "accepted",
        };
        write!(f, "{name}")
    }
}

pub struct BlockValidator;

impl BlockValidator {
    pub fn is_structurally_valid(block: &Block) -> Result<()> {
        if block.magic != BLOCK_MAGIC {
            return Err(BlockchainError::Structural(format!(
                "bad magic {:#010x}",
                block.magic
            )));
        }
        if block.header.version != FORMAT_VERSION {
            return Err(BlockchainError::Structural(format!(
                "unsupported header version {}",
                block.header.version
            )));
        }
        if block.header.previous_hash.len() != HASH_HEX_LEN {
            return Err(BlockchainError::Structural(
                "previous hash must be a 64 character digest".to_string(),
            ));
        }
        if block.transactions.is_empty() {
            return Err(BlockchainError::Structural(
                "block must contain at least one transaction".to_string(),
            ));
        }
        if block.tx_count as usize != block.transactions.len() {
            return Err(BlockchainError::Structural(format!(
                "transaction count {} does not match {} transactions",
                block.tx_count,
                block.transactions.len()
            )));
        }
        let size = Block::content_size(&block.header, &block.transactions)?;
        if block.size != size {
            return Err(BlockchainError::Structural(format!(
                "declared size {} does not match encoded size {size}",
                block.size
            )));
        }
        if !block.verify_aggregate_root() {
            return Err(BlockchainError::Structural(
                "aggregate root does not match transactions".to_string(),
            ));
        }
        for tx in &block.transactions {
            TransactionValidator::validate_structure(tx)?;
        }
        Ok(())
    }

    /// Structure, then hash link to `predecessor`, then proof-of-work at
    /// `expected_bits`, the difficulty the chain up to `predecessor` requires
    pub fn is_valid_successor(
        block: &Block,
        predecessor: &Block,
        expected_bits: u32,
    ) -> Result<()> {
        Self::is_structurally_valid(block)?;
        Self::check_link(block, predecessor)?;
        Self::check_proof_of_work(block, expected_bits)
    }

    fn check_proof_of_work(block: &Block, expected_bits: u32) -> Result<()> {
        if block.get_bits() != expected_bits {
            return Err(BlockchainError::InvalidProofOfWork(format!(
                "block declares bits {:#010x} where {expected_bits:#010x} is required",
                block.get_bits()
            )));
        }
        ProofOfWork::check(block.get_header())
    }

    fn check_link(block: &Block, predecessor: &Block) -> Result<()> {
        let expected = predecessor.hash();
        if block.get_previous_hash() != expected {
            return Err(BlockchainError::InvalidPredecessorLink {
                expected,
                actual: block.get_previous_hash().to_string(),
            });
        }
        Ok(())
    }

    /// Runs a block through every stage against `predecessor` and the UTXO
    /// snapshot it leaves behind, returning the snapshot after the block.
    /// The input snapshot is never modified.
    pub fn accept(
        block: &Block,
        predecessor: &Block,
        expected_bits: u32,
        utxo_set: &UtxoSet,
        height: u64,
    ) -> Result<UtxoSet> {
        let mut stage = BlockStage::Received;
        let result = Self::advance(block, predecessor, expected_bits, utxo_set, height, &mut stage);
        match &result {
            Ok(_) => info!("Block {} at height {height} {stage}", block.hash()),
            Err(e) => warn!(
                "Block {} rejected after stage '{stage}': {e}",
                block.hash()
            ),
        }
        result
    }

    fn advance(
        block: &Block,
        predecessor: &Block,
        expected_bits: u32,
        utxo_set: &UtxoSet,
        height: u64,
        stage: &mut BlockStage,
    ) -> Result<UtxoSet> {
        Self::is_structurally_valid(block)?;
        *stage = BlockStage::StructureChecked;
        debug!("Block {} {stage}", block.hash());

        Self::check_link(block, predecessor)?;
        *stage = BlockStage::LinkChecked;

        Self::check_proof_of_work(block, expected_bits)?;
        *stage = BlockStage::PowChecked;

        let next = utxo_set.apply(block.get_transactions(), height)?;
        *stage = BlockStage::TransactionsApplied;
        debug!("Block {} {stage}", block.hash());

        *stage = BlockStage::Accepted;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GENESIS_BITS, GENESIS_BLOCK};
    use crate::testnet::{mine_block, wallet_from_seed};
    use crate::wallet::KeyStore;

    fn coinbase_block() -> Block {
        let miner = wallet_from_seed(7);
        mine_block(
            &GENESIS_BLOCK,
            vec![Transaction::new_coinbase(&miner.locking_key_for_self())],
        )
    }

    #[test]
    fn test_new_block_fills_envelope() {
        let block = coinbase_block();
        assert_eq!(block.get_magic(), BLOCK_MAGIC);
        assert_eq!(block.get_tx_count(), 1);
        assert!(block.get_size() > 0);
        assert!(block.verify_aggregate_root());
        BlockValidator::is_structurally_valid(&block).unwrap();
    }

    #[test]
    fn test_template_timestamps_follow_predecessor() {
        let template = BlockTemplate::new(
            &GENESIS_BLOCK,
            GENESIS_BLOCK.get_bits(),
            vec![Transaction::new_coinbase("aa")],
            0,
        );
        assert_eq!(template.get_timestamp(), GENESIS_BLOCK.get_timestamp() + 1);
        assert_eq!(
            template.get_transactions()[0].get_lock_time(),
            template.get_timestamp()
        );
        assert_eq!(template.get_previous_hash(), GENESIS_BLOCK.hash());
    }

    #[test]
    fn test_tx_count_mismatch_is_structural() {
        let mut block = coinbase_block();
        block.tx_count = 2;
        assert!(matches!(
            BlockValidator::is_structurally_valid(&block),
            Err(BlockchainError::Structural(_))
        ));
    }

    #[test]
    fn test_size_and_root_tampering_detected() {
        let mut block = coinbase_block();
        block.size += 1;
        assert!(BlockValidator::is_structurally_valid(&block).is_err());

        let mut block = coinbase_block();
        block.transactions[0] = Transaction::new_coinbase("bb");
        assert!(matches!(
            BlockValidator::is_structurally_valid(&block),
            Err(BlockchainError::Structural(_))
        ));
    }

    #[test]
    fn test_successor_link_checked() {
        let block = coinbase_block();
        BlockValidator::is_valid_successor(&block, &GENESIS_BLOCK, GENESIS_BITS).unwrap();

        let err = BlockValidator::is_valid_successor(&block, &block, GENESIS_BITS).unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidPredecessorLink { .. }));
    }

    #[test]
    fn test_successor_requires_proof_of_work() {
        let block = coinbase_block();
        // Find a nonce whose header misses the target.
        let header = (0u64..)
            .map(|nonce| block.get_header().with_search_state(block.get_timestamp(), nonce))
            .find(|header| ProofOfWork::check(header).is_err())
            .unwrap();
        let unmined = Block::new(header, block.get_transactions().to_vec()).unwrap();

        let err =
            BlockValidator::is_valid_successor(&unmined, &GENESIS_BLOCK, GENESIS_BITS).unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidProofOfWork(_)));
    }

    #[test]
    fn test_declared_bits_must_match_required() {
        // Every hash meets this target, so no search is needed
        let template = BlockTemplate::new(
            &GENESIS_BLOCK,
            0x2200_ffff,
            vec![Transaction::new_coinbase("aa")],
            0,
        );
        let header = template.header(0);
        let cheap = template.into_block(header).unwrap();
        ProofOfWork::check(cheap.get_header()).unwrap();

        let err = BlockValidator::is_valid_successor(&cheap, &GENESIS_BLOCK, GENESIS_BITS)
            .unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidProofOfWork(_)));

        let genesis_utxo = UtxoSet::new()
            .apply(GENESIS_BLOCK.get_transactions(), 0)
            .unwrap();
        assert!(matches!(
            BlockValidator::accept(&cheap, &GENESIS_BLOCK, GENESIS_BITS, &genesis_utxo, 1),
            Err(BlockchainError::InvalidProofOfWork(_))
        ));

        // A harder declaration than required is rejected as well
        let block = coinbase_block();
        assert!(matches!(
            BlockValidator::is_valid_successor(&block, &GENESIS_BLOCK, 0x1f00_ffff),
            Err(BlockchainError::InvalidProofOfWork(_))
        ));
    }

    #[test]
    fn test_accept_returns_new_snapshot_and_keeps_input() {
        let genesis_utxo = UtxoSet::new()
            .apply(GENESIS_BLOCK.get_transactions(), 0)
            .unwrap();
        let block = coinbase_block();

        let next = BlockValidator::accept(&block, &GENESIS_BLOCK, GENESIS_BITS, &genesis_utxo, 1).unwrap();
        assert_eq!(genesis_utxo.len(), 1);
        assert_eq!(next.len(), 2);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(BlockStage::PowChecked.to_string(), "proof-of-work checked");
    }
}
