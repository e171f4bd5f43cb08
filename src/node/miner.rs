use crate::node::Node;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Pause after a failed attempt before searching again
const ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// Background proof-of-work search bound to one node
pub struct Miner;

impl Miner {
    /// Starts mining on a dedicated thread. The search restarts on every head
    /// change and runs until the returned handle is stopped or dropped.
    pub fn spawn(node: Arc<Node>) -> MinerHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let mined = Arc::new(AtomicU64::new(0));
        let join = {
            let stop = stop.clone();
            let mined = mined.clone();
            thread::spawn(move || {
                info!("Miner started for {}", node.get_locking_key());
                while !stop.load(Ordering::Relaxed) {
                    match node.mine_once(&stop) {
                        Ok(Some(_)) => {
                            mined.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(None) => debug!("Miner restarting on new head"),
                        Err(e) => {
                            warn!("Mining attempt failed: {e}");
                            thread::sleep(ERROR_BACKOFF);
                        }
                    }
                }
                info!("Miner stopped");
            })
        };
        MinerHandle {
            stop,
            mined,
            join: Some(join),
        }
    }
}

pub struct MinerHandle {
    stop: Arc<AtomicBool>,
    mined: Arc<AtomicU64>,
    join: Option<JoinHandle<()>>,
}

impl MinerHandle {
    pub fn blocks_mined(&self) -> u64 {
        self.mined.load(Ordering::Relaxed)
    }

    /// Signals the search to stop and waits for the thread to exit
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!("Miner thread panicked");
            }
        }
    }
}

impl Drop for MinerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ForkChoice;
    use crate::testnet::test_node;
    use std::time::Instant;

    #[test]
    fn test_miner_extends_chain_until_stopped() {
        let (node, _) = test_node(1);
        let mut handle = Miner::spawn(node.clone());

        let deadline = Instant::now() + Duration::from_secs(30);
        while node.get_height().unwrap() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        handle.stop();

        let height = node.get_height().unwrap();
        assert!(height >= 3);
        assert_eq!(handle.blocks_mined(), height);
        ForkChoice::replay(&node.get_chain().unwrap()).unwrap();

        thread::sleep(Duration::from_millis(50));
        assert_eq!(node.get_height().unwrap(), height);
    }
}
