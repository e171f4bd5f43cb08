use crate::core::genesis::GENESIS_BITS;
use crate::core::proof_of_work::{bits_from_target, target_from_bits, work_from_bits};
use crate::core::Block;
use crate::error::{BlockchainError, Result};
use log::info;
use num_bigint::BigUint;

/// Expected seconds between blocks
pub const BLOCK_GENERATION_INTERVAL: u64 = 10;

/// Blocks between retargets
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 10;

/// Difficulty adjustment algorithm for maintaining consistent block times
pub struct DifficultyAdjustment;

impl DifficultyAdjustment {
    /// Bits the block following `chain` must be mined at
    pub fn next_bits(chain: &[Block]) -> Result<u32> {
        let head = chain.last().ok_or_else(|| {
            BlockchainError::Structural("cannot derive bits for an empty chain".to_string())
        })?;
        let next_height = chain.len() as u64;
        if next_height % DIFFICULTY_ADJUSTMENT_INTERVAL != 0
            || next_height <= DIFFICULTY_ADJUSTMENT_INTERVAL
        {
            return Ok(head.get_bits());
        }

        let back = &chain[chain.len() - 1 - DIFFICULTY_ADJUSTMENT_INTERVAL as usize];
        let elapsed = head
            .get_timestamp()
            .saturating_sub(back.get_timestamp())
            .max(1);
        let bits = Self::adjusted_bits(head.get_bits(), elapsed);
        info!(
            "Difficulty adjustment at height {next_height}: {:#010x} -> {bits:#010x} over {elapsed}s",
            head.get_bits()
        );
        Ok(bits)
    }

    /// Scales the target for `bits` by elapsed / expected and clamps it to `[1, pow_limit]`
    pub fn adjusted_bits(bits: u32, elapsed: u64) -> u32 {
        let expected = BLOCK_GENERATION_INTERVAL * DIFFICULTY_ADJUSTMENT_INTERVAL;
        let scaled = target_from_bits(bits) * elapsed / expected;
        let limit = Self::pow_limit();
        let target = if scaled > limit {
            limit
        } else if scaled < BigUint::from(1u8) {
            BigUint::from(1u8)
        } else {
            scaled
        };
        bits_from_target(&target)
    }

    pub fn pow_limit() -> BigUint {
        target_from_bits(GENESIS_BITS)
    }

    pub fn block_difficulty(block: &Block) -> BigUint {
        work_from_bits(block.get_bits())
    }

    /// Sum of per-block difficulty over every block, genesis included
    pub fn accumulated_difficulty(chain: &[Block]) -> BigUint {
        chain.iter().map(Self::block_difficulty).sum()
    }
}
