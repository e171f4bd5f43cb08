//! # UTXO Chain
//!
//! An in-memory, peer-replicated ledger: blocks of transactions moving value
//! between pay-to-key-hash outputs, secured by proof-of-work with periodic
//! difficulty retargeting and a heaviest-chain fork choice.
//!
//! ## Layout
//! - `core/`: transactions, blocks, canonical hashing, validation, mining,
//!   difficulty and fork choice
//! - `storage/`: the UTXO snapshot, the transaction pool and the ledger store
//! - `wallet/`: the `KeyStore` seam, a secp256k1 wallet and addresses
//! - `network/`: the `Transport` seam and peer messages
//! - `node/`: the control surface and the background miner
//! - `config/`: defaults, TOML file and environment settings
//! - `utils/`: hashing, signatures, encodings and the clock
//! - `cli/`: argument parsing for the binary
//!
//! Every validation entry point returns `Result<_, BlockchainError>`. Ledger
//! state is only replaced as a whole, never patched after a failed check.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod node;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{Config, GLOBAL_CONFIG};
pub use core::{
    Block, BlockHeader, BlockStage, BlockTemplate, BlockValidator, DifficultyAdjustment,
    ForkChoice, ForkChoiceOutcome, MiningOutcome, ProofOfWork, Transaction, TransactionValidator,
    TxInput, TxOutput, BLOCK_SUBSIDY, GENESIS_BLOCK,
};
pub use error::{BlockchainError, Result};
pub use network::{LoggingTransport, Package, Transport};
pub use node::{Miner, MinerHandle, Node};
pub use storage::{ChainDecision, LedgerStore, MemoryPool, OutPoint, UnspentOutput, UtxoSet};
pub use wallet::{
    convert_address, locking_key_from_address, validate_address, KeyStore, Wallet,
};
