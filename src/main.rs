use clap::Parser;
use log::{error, info, warn};
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use utxo_chain::core::monetary::conversions::format_units;
use utxo_chain::{
    Command, KeyStore, LoggingTransport, Miner, Node, Opt, Wallet, GENESIS_BLOCK, GLOBAL_CONFIG,
};

const STATUS_INTERVAL: Duration = Duration::from_secs(5);

fn main() {
    env_logger::builder()
        .filter_level(GLOBAL_CONFIG.log_level_filter())
        .init();
    if let Some(e) = GLOBAL_CONFIG.get_file_error() {
        warn!("Ignoring config file: {e}");
    }

    let opt = Opt::parse();
    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn new_node(wallet: Arc<Wallet>) -> utxo_chain::Result<Arc<Node>> {
    let transport = Arc::new(LoggingTransport::new(GLOBAL_CONFIG.get_node_addr()));
    Ok(Arc::new(Node::new(wallet, transport)?))
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::PrintGenesis => {
            println!("Genesis hash: {}", GENESIS_BLOCK.hash());
            println!("{}", serde_json::to_string_pretty(&*GENESIS_BLOCK)?);
        }
        Command::Mine { blocks } => {
            let wallet = Arc::new(Wallet::new());
            let node = new_node(wallet.clone())?;
            println!("Mining {blocks} blocks to {}", wallet.get_address());
            for _ in 0..blocks {
                let block = node.mine_next_block()?;
                println!(
                    "Height {}: {} (bits {:#010x})",
                    node.get_height()?,
                    block.hash(),
                    block.get_bits()
                );
            }
            let balance = node.get_balance(&wallet.locking_key_for_self())?;
            println!("Balance of {}: {}", wallet.get_address(), format_units(balance));
        }
        Command::Demo { amount } => {
            let sender = Arc::new(Wallet::new());
            let receiver = Wallet::new();
            let node = new_node(sender.clone())?;

            node.mine_next_block()?;
            let tx = node.build_and_submit_transaction(&receiver.locking_key_for_self(), amount)?;
            println!("Submitted transaction {}", tx.hash());
            let block = node.mine_next_block()?;
            println!(
                "Confirmed in block {} with {} transactions",
                block.hash(),
                block.get_tx_count()
            );

            for (name, wallet) in [("sender", sender.as_ref()), ("receiver", &receiver)] {
                let balance = node.get_balance(&wallet.locking_key_for_self())?;
                println!("{name} {}: {}", wallet.get_address(), format_units(balance));
            }
        }
        Command::StartNode { seconds } => {
            let wallet = Arc::new(Wallet::new());
            let node = new_node(wallet.clone())?;
            info!(
                "Node {} started for {}",
                GLOBAL_CONFIG.get_node_addr(),
                wallet.get_address()
            );
            let mut miner = GLOBAL_CONFIG
                .is_mining()
                .then(|| Miner::spawn(node.clone()));

            let started = Instant::now();
            let deadline = seconds.map(|s| started + Duration::from_secs(s));
            while deadline.map_or(true, |d| Instant::now() < d) {
                thread::sleep(STATUS_INTERVAL.min(
                    deadline.map_or(STATUS_INTERVAL, |d| d.saturating_duration_since(Instant::now())),
                ));
                info!(
                    "Height {}, {} pooled transactions",
                    node.get_height()?,
                    node.get_mempool_snapshot()?.len()
                );
            }
            if let Some(miner) = miner.as_mut() {
                miner.stop();
                println!("Mined {} blocks", miner.blocks_mined());
            }
        }
    }
    Ok(())
}
