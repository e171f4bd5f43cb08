//! Whole-chain replay and the longest-accumulated-work rule
//!
//! `ForkChoice::replay` is the single routine that rebuilds a UTXO snapshot
//! from genesis. Both chain import and candidate evaluation go through it.

use crate::core::{Block, BlockValidator, DifficultyAdjustment, GENESIS_BLOCK};
use crate::error::{BlockchainError, Result};
use crate::storage::UtxoSet;
use log::{debug, info, warn};

/// Result of comparing a candidate chain against the canonical one
#[derive(Debug)]
pub enum ForkChoiceOutcome {
    /// Candidate is valid and strictly heavier; carries its replayed snapshot
    Adopt(UtxoSet),
    /// Candidate is valid but does not outweigh the current chain
    Keep,
    Reject(BlockchainError),
}

pub struct ForkChoice;

impl ForkChoice {
    /// Validates `chain` from the fixed genesis block and returns the UTXO set it produces
    pub fn replay(chain: &[Block]) -> Result<UtxoSet> {
        let genesis = chain.first().ok_or(BlockchainError::InvalidGenesis)?;
        if *genesis != *GENESIS_BLOCK {
            return Err(BlockchainError::InvalidGenesis);
        }

        let mut utxo_set = UtxoSet::new().apply(genesis.get_transactions(), 0)?;
        for height in 1..chain.len() {
            let (predecessor, block) = (&chain[height - 1], &chain[height]);
            let bits = DifficultyAdjustment::next_bits(&chain[..height])?;
            BlockValidator::is_valid_successor(block, predecessor, bits)?;
            utxo_set = utxo_set.apply(block.get_transactions(), height as u64)?;
        }
        debug!(
            "Replayed {} blocks into {} unspent outputs",
            chain.len(),
            utxo_set.len()
        );
        Ok(utxo_set)
    }

    pub fn evaluate(candidate: &[Block], current: &[Block]) -> ForkChoiceOutcome {
        let utxo_set = match Self::replay(candidate) {
            Ok(utxo_set) => utxo_set,
            Err(e) => {
                warn!("Rejected candidate chain of {} blocks: {e}", candidate.len());
                return ForkChoiceOutcome::Reject(e);
            }
        };

        let candidate_work = DifficultyAdjustment::accumulated_difficulty(candidate);
        let current_work = DifficultyAdjustment::accumulated_difficulty(current);
        if candidate_work > current_work {
            info!(
                "Candidate chain of {} blocks outweighs current chain of {}",
                candidate.len(),
                current.len()
            );
            ForkChoiceOutcome::Adopt(utxo_set)
        } else {
            debug!(
                "Candidate chain of {} blocks does not outweigh current chain of {}",
                candidate.len(),
                current.len()
            );
            ForkChoiceOutcome::Keep
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BlockTemplate, Transaction, GENESIS_BITS};
    use crate::testnet::mine_chain;

    #[test]
    fn test_replay_genesis_only() {
        let utxo_set = ForkChoice::replay(&[GENESIS_BLOCK.clone()]).unwrap();
        assert_eq!(utxo_set.len(), 1);
    }

    #[test]
    fn test_replay_rejects_foreign_genesis() {
        assert!(matches!(
            ForkChoice::replay(&[]),
            Err(BlockchainError::InvalidGenesis)
        ));

        let chain = mine_chain(2, "aa");
        let foreign = chain[1..].to_vec();
        assert!(matches!(
            ForkChoice::replay(&foreign),
            Err(BlockchainError::InvalidGenesis)
        ));
    }

    #[test]
    fn test_heavier_candidate_adopted() {
        let current = mine_chain(1, "aa");
        let candidate = mine_chain(2, "bb");
        match ForkChoice::evaluate(&candidate, &current) {
            ForkChoiceOutcome::Adopt(utxo_set) => assert_eq!(utxo_set.len(), 3),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_equal_work_kept() {
        let current = mine_chain(1, "aa");
        let candidate = mine_chain(1, "bb");
        assert!(matches!(
            ForkChoice::evaluate(&candidate, &current),
            ForkChoiceOutcome::Keep
        ));
    }

    #[test]
    fn test_broken_link_rejected() {
        let current = vec![GENESIS_BLOCK.clone()];
        let mut candidate = mine_chain(2, "aa");
        let other = mine_chain(2, "bb");
        candidate[2] = other[2].clone();
        assert!(matches!(
            ForkChoice::evaluate(&candidate, &current),
            ForkChoiceOutcome::Reject(BlockchainError::InvalidPredecessorLink { .. })
        ));
    }

    #[test]
    fn test_replay_follows_retarget_schedule() {
        // Quick blocks, so the first full window raises the difficulty
        let chain = mine_chain(20, "aa");
        assert_ne!(chain[20].get_bits(), GENESIS_BITS);
        ForkChoice::replay(&chain).unwrap();

        // The same block mined at the carried-forward bits is off schedule
        let mut stale_bits = chain.clone();
        stale_bits[20] = crate::testnet::mine_block(
            &chain[19],
            vec![Transaction::new_coinbase("aa")],
        );
        assert_eq!(stale_bits[20].get_bits(), GENESIS_BITS);
        assert!(matches!(
            ForkChoice::replay(&stale_bits),
            Err(BlockchainError::InvalidProofOfWork(_))
        ));
    }

    #[test]
    fn test_cheap_bits_chain_rejected() {
        let mut candidate = vec![GENESIS_BLOCK.clone()];
        for _ in 0..3 {
            let template = BlockTemplate::new(
                candidate.last().unwrap(),
                0x2200_ffff,
                vec![Transaction::new_coinbase("aa")],
                0,
            );
            let header = template.header(0);
            candidate.push(template.into_block(header).unwrap());
        }
        assert!(matches!(
            ForkChoice::evaluate(&candidate, &[GENESIS_BLOCK.clone()]),
            ForkChoiceOutcome::Reject(BlockchainError::InvalidProofOfWork(_))
        ));
    }

    #[test]
    fn test_invalid_coinbase_rejected() {
        let bad = crate::testnet::mine_block(
            &GENESIS_BLOCK,
            vec![Transaction::new(
                vec![],
                vec![crate::core::TxOutput::new(1, "aa".to_string())],
                0,
            )],
        );
        let candidate = vec![GENESIS_BLOCK.clone(), bad];
        assert!(matches!(
            ForkChoice::evaluate(&candidate, &[GENESIS_BLOCK.clone()]),
            ForkChoiceOutcome::Reject(BlockchainError::InvalidCoinbase(_))
        ));
    }
}
