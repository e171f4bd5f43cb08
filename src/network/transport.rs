use crate::core::{Block, Transaction};
use crate::network::Package;
use log::{info, warn};

/// Outbound side of peer communication.
///
/// Called by the node after an accepted mutation, outside any ledger lock.
/// Implementations schedule their own I/O.
pub trait Transport: Send + Sync {
    fn broadcast_latest_block(&self, block: &Block);

    fn broadcast_pool(&self, pool: &[Transaction]);
}

/// Transport with no peers; encodes each broadcast and logs it
pub struct LoggingTransport {
    node_addr: String,
}

impl LoggingTransport {
    pub fn new(node_addr: String) -> LoggingTransport {
        LoggingTransport { node_addr }
    }

    pub fn get_node_addr(&self) -> &str {
        self.node_addr.as_str()
    }

    fn publish(&self, pkg: &Package, what: &str) {
        match pkg.to_json() {
            Ok(json) => info!("{} broadcasting {what} ({} bytes)", self.node_addr, json.len()),
            Err(e) => warn!("{} failed to encode {what}: {e}", self.node_addr),
        }
    }
}

impl Transport for LoggingTransport {
    fn broadcast_latest_block(&self, block: &Block) {
        let pkg = Package::LatestBlock {
            addr_from: self.node_addr.clone(),
            block: block.clone(),
        };
        self.publish(&pkg, &format!("block {}", block.hash()));
    }

    fn broadcast_pool(&self, pool: &[Transaction]) {
        let pkg = Package::Pool {
            addr_from: self.node_addr.clone(),
            transactions: pool.to_vec(),
        };
        self.publish(&pkg, &format!("pool of {} transactions", pool.len()));
    }
}
