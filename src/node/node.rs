use crate::core::{Block, BlockTemplate, MiningOutcome, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::network::{Package, Transport};
use crate::storage::{ChainDecision, LedgerStore, MemoryPool, UtxoSet};
use crate::utils::current_timestamp;
use crate::wallet::KeyStore;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

struct NodeState {
    ledger: LedgerStore,
    pool: MemoryPool,
}

/// Control surface over one in-memory ledger and its transaction pool.
///
/// All writes (append, reorg, pool admission) take the same write lock, so
/// they never interleave. Reads return owned copies. `head_epoch` increases
/// every time the head changes and is what a running search watches.
pub struct Node {
    state: RwLock<NodeState>,
    head_epoch: AtomicU64,
    keystore: Arc<dyn KeyStore>,
    transport: Arc<dyn Transport>,
}

impl Node {
    pub fn new(keystore: Arc<dyn KeyStore>, transport: Arc<dyn Transport>) -> Result<Node> {
        Node::with_ledger(LedgerStore::new()?, keystore, transport)
    }

    /// Node starting from an imported chain, replayed from genesis
    pub fn from_chain(
        chain: Vec<Block>,
        keystore: Arc<dyn KeyStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Node> {
        Node::with_ledger(LedgerStore::from_chain(chain)?, keystore, transport)
    }

    fn with_ledger(
        ledger: LedgerStore,
        keystore: Arc<dyn KeyStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Node> {
        Ok(Node {
            state: RwLock::new(NodeState {
                ledger,
                pool: MemoryPool::new(),
            }),
            head_epoch: AtomicU64::new(0),
            keystore,
            transport,
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, NodeState>> {
        self.state
            .read()
            .map_err(|e| BlockchainError::Lock(format!("node state poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, NodeState>> {
        self.state
            .write()
            .map_err(|e| BlockchainError::Lock(format!("node state poisoned: {e}")))
    }

    /// Must be called with the write lock held
    fn head_changed(&self) {
        self.head_epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub fn head_epoch(&self) -> u64 {
        self.head_epoch.load(Ordering::SeqCst)
    }

    pub fn get_locking_key(&self) -> String {
        self.keystore.locking_key_for_self()
    }

    pub fn get_chain(&self) -> Result<Vec<Block>> {
        Ok(self.read()?.ledger.chain().to_vec())
    }

    pub fn get_height(&self) -> Result<u64> {
        Ok(self.read()?.ledger.height())
    }

    pub fn get_latest_block(&self) -> Result<Block> {
        Ok(self.read()?.ledger.head().clone())
    }

    pub fn get_utxo_snapshot(&self) -> Result<UtxoSet> {
        Ok(self.read()?.ledger.utxo_set().clone())
    }

    pub fn get_mempool_snapshot(&self) -> Result<Vec<Transaction>> {
        Ok(self.read()?.pool.transactions().to_vec())
    }

    pub fn get_balance(&self, locking_key: &str) -> Result<u64> {
        Ok(self.read()?.ledger.utxo_set().balance(locking_key))
    }

    pub fn get_block(&self, hash: &str) -> Result<Option<Block>> {
        Ok(self.read()?.ledger.find_block(hash).cloned())
    }

    /// Looks in the chain first, then the pool
    pub fn find_transaction(&self, tx_hash: &str) -> Result<Option<Transaction>> {
        let state = self.read()?;
        if let Some(tx) = state.ledger.find_transaction(tx_hash) {
            return Ok(Some(tx.clone()));
        }
        Ok(state
            .pool
            .transactions()
            .iter()
            .find(|tx| tx.hash() == tx_hash)
            .cloned())
    }

    /// Spends the local identity's outputs to `receiver` and admits the result to the pool
    pub fn build_and_submit_transaction(&self, receiver: &str, amount: u64) -> Result<Transaction> {
        let (tx, pool) = {
            let mut state = self.write()?;
            let NodeState { ledger, pool } = &mut *state;
            let tx = Transaction::new_utxo_transaction(
                self.keystore.as_ref(),
                receiver,
                amount,
                ledger.utxo_set(),
                pool.transactions(),
            )?;
            pool.add(tx.clone(), ledger.utxo_set())?;
            (tx, pool.transactions().to_vec())
        };
        self.transport.broadcast_pool(&pool);
        Ok(tx)
    }

    /// Admits a transaction received from a peer or caller
    pub fn submit_transaction(&self, tx: Transaction) -> Result<()> {
        let pool = {
            let mut state = self.write()?;
            let NodeState { ledger, pool } = &mut *state;
            if let Err(e) = pool.add(tx.clone(), ledger.utxo_set()) {
                warn!("Rejected transaction {}: {e}", tx.hash());
                return Err(e);
            }
            pool.transactions().to_vec()
        };
        self.transport.broadcast_pool(&pool);
        Ok(())
    }

    /// Admits a batch, typically a peer's pool, skipping entries that fail
    /// admission. The pool is broadcast once if anything was admitted.
    pub fn submit_transactions(&self, transactions: Vec<Transaction>) -> Result<usize> {
        let (admitted, pool) = {
            let mut state = self.write()?;
            let NodeState { ledger, pool } = &mut *state;
            let mut admitted = 0;
            for tx in transactions {
                let hash = tx.hash();
                match pool.add(tx, ledger.utxo_set()) {
                    Ok(()) => admitted += 1,
                    Err(e) => debug!("Skipped transaction {hash}: {e}"),
                }
            }
            (admitted, pool.transactions().to_vec())
        };
        if admitted > 0 {
            self.transport.broadcast_pool(&pool);
        }
        Ok(admitted)
    }

    /// Appends a block that extends the current head
    pub fn submit_block(&self, block: Block) -> Result<()> {
        {
            let mut state = self.write()?;
            state.ledger.append(block.clone())?;
            let NodeState { ledger, pool } = &mut *state;
            pool.prune(ledger.utxo_set());
            self.head_changed();
        }
        self.transport.broadcast_latest_block(&block);
        Ok(())
    }

    /// Offers a whole competing chain to fork choice
    pub fn submit_candidate_chain(&self, chain: Vec<Block>) -> Result<ChainDecision> {
        let (decision, head) = {
            let mut state = self.write()?;
            let decision = state.ledger.replace_chain(chain);
            if decision == ChainDecision::Replaced {
                let NodeState { ledger, pool } = &mut *state;
                pool.prune(ledger.utxo_set());
                self.head_changed();
            }
            (decision, state.ledger.head().clone())
        };
        if decision == ChainDecision::Replaced {
            self.transport.broadcast_latest_block(&head);
        }
        Ok(decision)
    }

    /// Dispatches an inbound peer message to the matching entry point
    pub fn handle_package(&self, pkg: Package) -> Result<()> {
        debug!("Received package from {}", pkg.addr_from());
        match pkg {
            Package::LatestBlock { block, .. } => self.handle_block(block),
            Package::Transaction { transaction, .. } => self.submit_transaction(transaction),
            Package::Pool { transactions, .. } => self.submit_transactions(transactions).map(|_| ()),
            Package::Chain { blocks, .. } => self.submit_candidate_chain(blocks).map(|_| ()),
        }
    }

    fn handle_block(&self, block: Block) -> Result<()> {
        let head = self.get_latest_block()?;
        if block.hash() == head.hash() {
            return Ok(());
        }
        if block.get_previous_hash() == head.hash() {
            return self.submit_block(block);
        }
        // Not a direct successor: the peer is on another branch and must send its whole chain
        info!(
            "Block {} does not extend head {}, waiting for full chain",
            block.hash(),
            head.hash()
        );
        Ok(())
    }

    /// One mining attempt on the current head.
    ///
    /// Returns `None` when the search was cancelled by `should_stop`, the head
    /// moved during the search, or the block lost a race to the write lock.
    pub fn mine_once(&self, should_stop: &AtomicBool) -> Result<Option<Block>> {
        let (epoch, template) = self.next_template()?;
        self.mine_template(epoch, template, should_stop)
    }

    /// Template over the current head and pool, with the epoch it was built at
    fn next_template(&self) -> Result<(u64, BlockTemplate)> {
        let state = self.read()?;
        let mut transactions = vec![Transaction::new_coinbase(
            &self.keystore.locking_key_for_self(),
        )];
        transactions.extend(state.pool.transactions().iter().cloned());
        let template = state
            .ledger
            .block_template(transactions, current_timestamp()?)?;
        Ok((self.head_epoch(), template))
    }

    fn mine_template(
        &self,
        epoch: u64,
        template: BlockTemplate,
        should_stop: &AtomicBool,
    ) -> Result<Option<Block>> {
        let outcome = ProofOfWork::new(template)
            .run(|| should_stop.load(Ordering::Relaxed) || self.head_epoch() != epoch)?;
        match outcome {
            MiningOutcome::Found(block) => self.commit_mined(epoch, block),
            MiningOutcome::Cancelled => Ok(None),
        }
    }

    /// Appends a freshly mined block unless the head moved since `epoch`
    fn commit_mined(&self, epoch: u64, block: Block) -> Result<Option<Block>> {
        {
            let mut state = self.write()?;
            if self.head_epoch() != epoch {
                debug!("Discarding block {} mined on a stale head", block.hash());
                return Ok(None);
            }
            state.ledger.append(block.clone())?;
            let NodeState { ledger, pool } = &mut *state;
            pool.prune(ledger.utxo_set());
            self.head_changed();
        }
        info!("Mined block {}", block.hash());
        self.transport.broadcast_latest_block(&block);
        Ok(Some(block))
    }

    /// Mines until a block lands on the chain, restarting whenever the head moves
    pub fn mine_next_block(&self) -> Result<Block> {
        let never = AtomicBool::new(false);
        loop {
            if let Some(block) = self.mine_once(&never)? {
                return Ok(block);
            }
            debug!("Head moved during mining, restarting");
        }
    }
}
