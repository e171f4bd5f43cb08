use crate::core::{Block, Transaction};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Messages exchanged between peers, JSON encoded on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Package {
    LatestBlock {
        addr_from: String,
        block: Block,
    },
    Transaction {
        addr_from: String,
        transaction: Transaction,
    },
    Pool {
        addr_from: String,
        transactions: Vec<Transaction>,
    },
    Chain {
        addr_from: String,
        blocks: Vec<Block>,
    },
}

impl Package {
    pub fn addr_from(&self) -> &str {
        match self {
            Package::LatestBlock { addr_from, .. }
            | Package::Transaction { addr_from, .. }
            | Package::Pool { addr_from, .. }
            | Package::Chain { addr_from, .. } => addr_from,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> Result<Package> {
        Ok(serde_json::from_str(data)?)
    }
}
