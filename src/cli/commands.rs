use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "utxo-chain", about = "In-memory proof-of-work UTXO ledger")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "printgenesis", about = "Print the fixed genesis block")]
    PrintGenesis,
    #[command(name = "mine", about = "Mine blocks on a fresh in-memory node")]
    Mine {
        #[arg(help = "Number of blocks to mine")]
        blocks: u64,
    },
    #[command(
        name = "demo",
        about = "Mine a block, send AMOUNT to a second wallet and confirm it"
    )]
    Demo {
        #[arg(help = "Amount to send (in base units)")]
        amount: u64,
    },
    #[command(name = "startnode", about = "Start an in-memory node")]
    StartNode {
        #[arg(long, help = "Stop after this many seconds instead of running forever")]
        seconds: Option<u64>,
    },
}
