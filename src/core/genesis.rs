//! The fixed first block every chain must start with

use crate::core::block::{Block, BlockHeader};
use crate::core::hashing::aggregate_root;
use crate::core::Transaction;
use once_cell::sync::Lazy;

/// Locking key credited by the genesis coinbase
pub const GENESIS_LOCKING_KEY: &str = "bb445596938cc933915563c530930da2d2e25d60";

pub const GENESIS_TIMESTAMP: u64 = 0x495F_48B9;

/// Easiest target on the network; also the retarget ceiling
pub const GENESIS_BITS: u32 = 0x2000_ffff;

pub const GENESIS_NONCE: u64 = 0x7C2B_AC1D;

pub static GENESIS_BLOCK: Lazy<Block> = Lazy::new(|| {
    let transactions =
        vec![Transaction::new_coinbase(GENESIS_LOCKING_KEY).with_lock_time(GENESIS_TIMESTAMP)];
    let header = BlockHeader::new(
        "0".repeat(64),
        aggregate_root(&transactions),
        GENESIS_TIMESTAMP,
        GENESIS_BITS,
        GENESIS_NONCE,
    );
    Block::new(header, transactions).expect("genesis block is constant data")
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BlockValidator;

    #[test]
    fn test_genesis_is_stable_and_well_formed() {
        assert_eq!(GENESIS_BLOCK.hash(), GENESIS_BLOCK.clone().hash());
        assert_eq!(GENESIS_BLOCK.get_previous_hash(), "0".repeat(64));
        BlockValidator::is_structurally_valid(&GENESIS_BLOCK).unwrap();
        assert_eq!(
            GENESIS_BLOCK.get_transactions()[0].get_outputs()[0].get_locking_key(),
            GENESIS_LOCKING_KEY
        );
    }
}
