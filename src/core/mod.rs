//! Core ledger functionality
//!
//! Blocks, transactions, canonical hashing, validation, proof-of-work,
//! difficulty retargeting and fork choice.

pub mod block;
pub mod difficulty;
pub mod fork_choice;
pub mod genesis;
pub mod hashing;
pub mod monetary;
pub mod proof_of_work;
pub mod transaction;
pub mod validation;

pub use block::{Block, BlockHeader, BlockStage, BlockTemplate, BlockValidator, BLOCK_MAGIC};
pub use difficulty::{
    DifficultyAdjustment, BLOCK_GENERATION_INTERVAL, DIFFICULTY_ADJUSTMENT_INTERVAL,
};
pub use fork_choice::{ForkChoice, ForkChoiceOutcome};
pub use genesis::{GENESIS_BITS, GENESIS_BLOCK, GENESIS_LOCKING_KEY};
pub use hashing::{aggregate_root, hash_header, hash_transaction};
pub use monetary::{BLOCK_SUBSIDY, UNITS_PER_COIN};
pub use proof_of_work::{
    bits_from_target, target_from_bits, work_from_bits, MiningOutcome, ProofOfWork, NONCE_BASE,
};
pub use transaction::{Transaction, TxInput, TxOutput};
pub use validation::TransactionValidator;
