//! Command-line interface
//!
//! Argument parsing for the `utxo-chain` binary.

pub mod commands;

pub use commands::{Command, Opt};
