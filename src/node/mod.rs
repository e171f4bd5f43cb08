//! Node control surface and background mining

pub mod miner;
#[allow(clippy::module_inception)]
pub mod node;

pub use miner::{Miner, MinerHandle};
pub use node::Node;
