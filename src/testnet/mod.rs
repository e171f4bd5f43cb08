//! Shared helpers for the crate's unit tests
//!
//! Seeded wallets, funded snapshots, a quick miner on the easy genesis target
//! and a transport that records broadcasts.

pub mod test_utils;

pub use test_utils::*;
