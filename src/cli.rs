//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "evm-airdrop")]
#[command(about = "Batch airdrop and balance collection for EVM chains", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config.toml")]
    pub config: PathBuf,

    /// Override the RPC endpoint URL from the configuration
    #[arg(short, long, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// Save the run report as JSON
    #[arg(long)]
    pub save_report: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Airdrop ERC-20 tokens through the distributor contract
    AirdropToken(AirdropArgs),

    /// Airdrop the native coin through the distributor contract
    AirdropCoin(AirdropArgs),

    /// Sweep token balances from a list of keys to the destination
    CollectToken(CollectArgs),

    /// Sweep native balances from a list of keys to the destination
    CollectCoin(CollectArgs),

    /// Show name, symbol, decimals and total supply of a token
    TokenInfo {
        /// Token address (defaults to airdrop.token)
        #[arg(short, long)]
        token: Option<String>,
    },

    /// Parse a list file and print its summary without touching the chain
    CheckList {
        /// List file
        #[arg(short, long)]
        list: PathBuf,

        /// Expected list layout
        #[arg(short, long, value_enum, default_value = "amounts")]
        kind: ListKind,

        /// Decimals used to scale amounts
        #[arg(short, long, default_value = "18")]
        decimals: u8,
    },
}

#[derive(Debug, clap::Args)]
pub struct AirdropArgs {
    /// Recipient list, `address,amount` per line
    #[arg(short, long)]
    pub list: PathBuf,

    /// Treat the list as bare addresses and give each this amount
    #[arg(short, long)]
    pub fixed_amount: Option<String>,

    /// Drop recipients that are contract accounts
    #[arg(long)]
    pub skip_contracts: bool,
}

#[derive(Debug, clap::Args)]
pub struct CollectArgs {
    /// Secret key list, one key per line
    #[arg(short, long)]
    pub keys: PathBuf,

    /// File the swept keys are appended to
    #[arg(short, long)]
    pub audit: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListKind {
    /// `address,amount`
    Amounts,
    /// bare `address`
    Addresses,
    /// `address,count`
    Counts,
}
