//! evm-airdrop - batch airdrop and balance collection CLI

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use evm_batch_airdrop::amount::{format_units_trimmed, parse_units_truncated};
use evm_batch_airdrop::cli::{AirdropArgs, Cli, CollectArgs, Command, ListKind};
use evm_batch_airdrop::{
    Address, AppConfig, AuditLog, BalanceSweeper, BatchDispatcher, ChainSession, ListReader, ProviderConfig,
    Recipient, RpcChainClient,
};

const NATIVE_DECIMALS: u8 = 18;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match &cli.command {
        Command::CheckList { list, kind, decimals } => check_list(list, *kind, *decimals),
        Command::AirdropToken(args) => airdrop(&cli, args, true).await,
        Command::AirdropCoin(args) => airdrop(&cli, args, false).await,
        Command::CollectToken(args) => collect(&cli, args, true).await,
        Command::CollectCoin(args) => collect(&cli, args, false).await,
        Command::TokenInfo { token } => token_info(&cli, token.as_deref()).await,
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    AppConfig::load(&cli.config).with_context(|| format!("Failed to load config from {}", cli.config.display()))
}

fn connect(cli: &Cli, config: &AppConfig, rpc_url: &str) -> Result<ChainSession> {
    let rpc_url = cli.rpc_url.clone().unwrap_or_else(|| rpc_url.to_string());
    info!("Connecting to {}", rpc_url);

    let client = RpcChainClient::new(ProviderConfig { rpc_url }).context("Failed to create RPC client")?;
    Ok(ChainSession::new(Arc::new(client))
        .with_retry(config.retry.policy())
        .with_receipts(config.receipt.policy()))
}

async fn airdrop(cli: &Cli, args: &AirdropArgs, token_flow: bool) -> Result<()> {
    let config = load_config(cli)?;
    let airdrop = config.airdrop()?;
    airdrop.validate().context("Invalid [airdrop] configuration")?;

    let session = connect(cli, &config, &airdrop.rpc_url)?;
    let token = if token_flow { Some(airdrop.token_address()?) } else { None };

    let decimals = match (token, airdrop.token_decimals) {
        (None, _) => NATIVE_DECIMALS,
        (Some(_), Some(decimals)) => decimals,
        (Some(token), None) => session
            .erc20_decimals(token)
            .await
            .context("Failed to read token decimals")?,
    };

    let mut recipients = match &args.fixed_amount {
        Some(amount) => {
            let amount = parse_units_truncated(amount, decimals)
                .filter(|a| !a.is_zero())
                .ok_or_else(|| anyhow!("Invalid fixed amount '{}'", amount))?;
            let addresses = ListReader::read_addresses(&args.list)
                .with_context(|| format!("Failed to read {}", args.list.display()))?;
            Recipient::with_fixed_amount(addresses, amount)
        }
        None => ListReader::read_recipients(&args.list, decimals)
            .with_context(|| format!("Failed to read {}", args.list.display()))?,
    };

    if args.skip_contracts {
        recipients = drop_contract_recipients(&session, recipients).await?;
    }

    let dispatcher = BatchDispatcher::new(session, airdrop.signer()?, airdrop.dispatch_settings()?);
    info!("Airdrop sender: {}", dispatcher.sender());

    let report = match token {
        Some(token) => dispatcher.airdrop_tokens(token, &recipients).await,
        None => dispatcher.airdrop_coins(&recipients).await,
    }
    .context("Airdrop aborted")?;

    info!(
        "Airdropped {} to {} recipients in {} transactions",
        format_units_trimmed(report.total_amount, decimals),
        report.recipients,
        report.batches.len()
    );
    emit_report(cli, &report)
}

async fn drop_contract_recipients(session: &ChainSession, recipients: Vec<Recipient>) -> Result<Vec<Recipient>> {
    let addresses = recipients.iter().map(|r| r.address).collect();
    let kept: HashSet<Address> = session
        .retain_externally_owned(addresses)
        .await
        .context("Failed to check recipient code")?
        .into_iter()
        .collect();
    Ok(recipients.into_iter().filter(|r| kept.contains(&r.address)).collect())
}

async fn collect(cli: &Cli, args: &CollectArgs, token_flow: bool) -> Result<()> {
    let config = load_config(cli)?;
    let collect = config.collect()?;
    collect.validate().context("Invalid [collect] configuration")?;

    let keys = ListReader::read_secret_keys(&args.keys)
        .with_context(|| format!("Failed to read {}", args.keys.display()))?;
    if keys.is_empty() {
        warn!("No keys in {}", args.keys.display());
    }

    let session = connect(cli, &config, &collect.rpc_url)?;
    let sweeper = BalanceSweeper::new(session, AuditLog::new(&args.audit), collect.sweep_settings()?);

    let report = if token_flow {
        sweeper.collect_tokens(collect.token_address()?, &keys).await
    } else {
        sweeper.collect_coins(&keys).await
    }
    .context("Collect aborted")?;

    info!(
        "Swept {} of {} accounts ({} below gas floor)",
        report.swept.len(),
        report.scanned,
        report.skipped
    );
    emit_report(cli, &report)
}

async fn token_info(cli: &Cli, token: Option<&str>) -> Result<()> {
    let config = load_config(cli)?;

    let (rpc_url, default_token) = match (&config.airdrop, &config.collect) {
        (Some(a), _) => (a.rpc_url.clone(), a.token.clone()),
        (None, Some(c)) => (c.rpc_url.clone(), c.token.clone()),
        (None, None) => bail!("Configuration has neither [airdrop] nor [collect] section"),
    };
    let token = token
        .map(str::to_string)
        .or(default_token)
        .ok_or_else(|| anyhow!("No token given and none configured"))?;
    let token = Address::from_str(token.trim()).with_context(|| format!("Invalid token address '{}'", token))?;

    let session = connect(cli, &config, &rpc_url)?;
    let name = session.erc20_name(token).await?;
    let symbol = session.erc20_symbol(token).await?;
    let decimals = session.erc20_decimals(token).await?;
    let total_supply = session.erc20_total_supply(token).await?;

    println!("Token:        {}", token);
    println!("Name:         {}", name);
    println!("Symbol:       {}", symbol);
    println!("Decimals:     {}", decimals);
    println!("Total supply: {}", format_units_trimmed(total_supply, decimals));
    Ok(())
}

fn check_list(list: &Path, kind: ListKind, decimals: u8) -> Result<()> {
    let context = || format!("Failed to parse {}", list.display());
    match kind {
        ListKind::Amounts => {
            let recipients = ListReader::read_recipients(list, decimals).with_context(context)?;
            println!("{} recipients", recipients.len());
        }
        ListKind::Addresses => {
            let addresses = ListReader::read_addresses(list).with_context(context)?;
            println!("{} valid addresses", addresses.len());
        }
        ListKind::Counts => {
            let entries = ListReader::read_count_recipients(list).with_context(context)?;
            let total: u64 = entries.iter().map(|e| e.count).sum();
            println!("{} holders, {} items", entries.len(), total);
        }
    }
    Ok(())
}

fn emit_report<T: Serialize>(cli: &Cli, report: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    if let Some(path) = &cli.save_report {
        std::fs::write(path, &json).with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report saved to {}", path.display());
    } else {
        println!("{}", json);
    }
    Ok(())
}
