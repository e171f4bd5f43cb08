//! Ledger state
//!
//! The UTXO snapshot, the pool of pending transactions and the store that
//! owns the canonical chain. Everything is held in memory.

pub mod ledger;
pub mod memory_pool;
pub mod utxo_set;

pub use ledger::{ChainDecision, LedgerStore};
pub use memory_pool::MemoryPool;
pub use utxo_set::{OutPoint, UnspentOutput, UtxoSet};
