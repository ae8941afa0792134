//! Batched token and coin distribution through the airdrop contract

use alloy::primitives::{Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::amount::checked_total;
use crate::batch::{plan_batches, Batch};
use crate::chain::ChainSession;
use crate::contract::{encode_airdrop_eth, encode_airdrop_token, encode_approve_max, APPROVE_GAS_LIMIT};
use crate::error::{AirdropError, Result};
use crate::list_reader::Recipient;
use crate::provider::TxReceipt;
use crate::transaction::TransactionIntent;

/// Where the next nonce comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceDiscipline {
    /// Fetch once, then increment after every confirmed transaction
    #[default]
    Local,
    /// Ask the node for the pending nonce before every transaction
    Refetch,
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub distributor: Address,
    pub gas_limit: u64,
    /// Gas price (in Wei)
    pub gas_price: u128,
    pub batch_size: usize,
    pub nonce_mode: NonceDiscipline,
    /// Send `approve(distributor, MAX)` when the allowance is short
    pub approve: bool,
}

/// One confirmed distribution transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub tx_hash: B256,
    pub amount: U256,
    pub gas_used: u64,
    pub block_number: Option<u64>,
}

/// Summary of an airdrop run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub chain_id: u64,
    pub sender: Address,
    pub recipients: usize,
    pub total_amount: U256,
    pub approval_tx: Option<B256>,
    pub batches: Vec<BatchOutcome>,
}

/// Nonce source for one run
struct NonceTracker {
    mode: NonceDiscipline,
    next: Option<u64>,
}

impl NonceTracker {
    fn new(mode: NonceDiscipline) -> Self {
        Self { mode, next: None }
    }

    async fn current(&mut self, session: &ChainSession, account: Address) -> Result<u64> {
        match (self.mode, self.next) {
            (NonceDiscipline::Local, Some(nonce)) => Ok(nonce),
            _ => {
                let nonce = session.nonce(account).await?;
                self.next = Some(nonce);
                Ok(nonce)
            }
        }
    }

    fn confirmed(&mut self) {
        self.next = self.next.map(|n| n + 1);
    }
}

/// Sends airdrop batches from one funding account
pub struct BatchDispatcher {
    session: ChainSession,
    signer: PrivateKeySigner,
    settings: DispatchSettings,
}

impl BatchDispatcher {
    pub fn new(session: ChainSession, signer: PrivateKeySigner, settings: DispatchSettings) -> Self {
        Self {
            session,
            signer,
            settings,
        }
    }

    pub fn sender(&self) -> Address {
        self.signer.address()
    }

    /// Distribute ERC-20 `token` through `airdropToken`.
    pub async fn airdrop_tokens(&self, token: Address, recipients: &[Recipient]) -> Result<DispatchReport> {
        let (chain_id, total, batches) = self.preflight(recipients).await?;
        let mut report = self.empty_report(chain_id, recipients.len(), total);
        if recipients.is_empty() {
            info!("Recipient list is empty, nothing to airdrop");
            return Ok(report);
        }

        let sender = self.sender();
        let balance = self.session.erc20_balance_of(token, sender).await?;
        info!("Sender {} token balance: {}", sender, balance);
        if balance < total {
            return Err(AirdropError::InsufficientBalance {
                asset: format!("token {}", token),
                required: total,
                available: balance,
            });
        }

        let mut nonces = NonceTracker::new(self.settings.nonce_mode);

        let allowance = self
            .session
            .erc20_allowance(token, sender, self.settings.distributor)
            .await?;
        if allowance < total {
            if !self.settings.approve {
                return Err(AirdropError::InsufficientAllowance {
                    required: total,
                    available: allowance,
                });
            }
            info!("Allowance {} below total {}, approving distributor", allowance, total);
            let nonce = nonces.current(&self.session, sender).await?;
            let intent = TransactionIntent::call(
                nonce,
                token,
                encode_approve_max(self.settings.distributor),
                APPROVE_GAS_LIMIT,
                self.settings.gas_price,
            );
            let receipt = self.send_and_confirm(&intent, chain_id, "approve").await?;
            nonces.confirmed();
            report.approval_tx = Some(receipt.transaction_hash);
        } else {
            debug!("Allowance {} covers total {}", allowance, total);
        }

        for batch in &batches {
            let (accounts, amounts) = batch.columns(recipients);
            let input = encode_airdrop_token(token, accounts, amounts)?;
            let nonce = nonces.current(&self.session, sender).await?;
            let intent = TransactionIntent::call(
                nonce,
                self.settings.distributor,
                input,
                self.settings.gas_limit,
                self.settings.gas_price,
            );

            let outcome = self.send_batch(batch, &intent, chain_id, batch.total(recipients), batches.len()).await?;
            nonces.confirmed();
            report.batches.push(outcome);
        }

        info!("Token airdrop finished: {} batches, {} recipients", report.batches.len(), report.recipients);
        Ok(report)
    }

    /// Distribute the native coin through `airdropETH`.
    pub async fn airdrop_coins(&self, recipients: &[Recipient]) -> Result<DispatchReport> {
        let (chain_id, total, batches) = self.preflight(recipients).await?;
        let mut report = self.empty_report(chain_id, recipients.len(), total);
        if recipients.is_empty() {
            info!("Recipient list is empty, nothing to airdrop");
            return Ok(report);
        }

        let sender = self.sender();
        let max_gas = U256::from(batches.len())
            .saturating_mul(U256::from(self.settings.gas_limit))
            .saturating_mul(U256::from(self.settings.gas_price));
        let required = total.saturating_add(max_gas);

        let balance = self.session.balance(sender).await?;
        info!("Sender {} balance: {} (required with gas: {})", sender, balance, required);
        if balance < required {
            return Err(AirdropError::InsufficientBalance {
                asset: "native".to_string(),
                required,
                available: balance,
            });
        }

        let mut nonces = NonceTracker::new(self.settings.nonce_mode);
        for batch in &batches {
            let (accounts, amounts) = batch.columns(recipients);
            let value = batch.total(recipients);
            let input = encode_airdrop_eth(accounts, amounts)?;
            let nonce = nonces.current(&self.session, sender).await?;
            let intent = TransactionIntent {
                nonce,
                to: self.settings.distributor,
                value,
                gas_limit: self.settings.gas_limit,
                gas_price: self.settings.gas_price,
                input,
            };

            let outcome = self.send_batch(batch, &intent, chain_id, value, batches.len()).await?;
            nonces.confirmed();
            report.batches.push(outcome);
        }

        info!("Coin airdrop finished: {} batches, {} recipients", report.batches.len(), report.recipients);
        Ok(report)
    }

    async fn preflight(&self, recipients: &[Recipient]) -> Result<(u64, U256, Vec<Batch>)> {
        if self.settings.batch_size == 0 {
            return Err(AirdropError::Configuration("batch_size must be positive".to_string()));
        }
        if let Some(index) = recipients.iter().position(|r| r.amount.is_zero()) {
            return Err(AirdropError::InvalidAmount {
                index,
                value: "0".to_string(),
            });
        }

        let chain_id = self.session.chain_id().await?;
        let total = checked_total(recipients.iter().map(|r| &r.amount))
            .ok_or_else(|| AirdropError::Encoding("Recipient total overflows uint256".to_string()))?;
        let batches = plan_batches(recipients.len(), self.settings.batch_size);

        info!(
            "Chain {}: {} recipients, total {}, {} batches of up to {}",
            chain_id,
            recipients.len(),
            total,
            batches.len(),
            self.settings.batch_size
        );
        Ok((chain_id, total, batches))
    }

    fn empty_report(&self, chain_id: u64, recipients: usize, total_amount: U256) -> DispatchReport {
        DispatchReport {
            chain_id,
            sender: self.sender(),
            recipients,
            total_amount,
            approval_tx: None,
            batches: Vec::new(),
        }
    }

    async fn send_batch(
        &self,
        batch: &Batch,
        intent: &TransactionIntent,
        chain_id: u64,
        amount: U256,
        batch_count: usize,
    ) -> Result<BatchOutcome> {
        let description = format!("batch {}/{} [{}..{}]", batch.index + 1, batch_count, batch.start, batch.last());
        let receipt = self.send_and_confirm(intent, chain_id, &description).await?;

        Ok(BatchOutcome {
            index: batch.index,
            start: batch.start,
            end: batch.end,
            tx_hash: receipt.transaction_hash,
            amount,
            gas_used: receipt.gas_used,
            block_number: receipt.block_number,
        })
    }

    async fn send_and_confirm(&self, intent: &TransactionIntent, chain_id: u64, description: &str) -> Result<TxReceipt> {
        let tx_hash = self.session.broadcast(intent, &self.signer, chain_id).await?;
        info!("Sent {} tx {} with nonce {}", description, tx_hash, intent.nonce);

        self.session
            .wait_for_success(tx_hash, description)
            .await
            .inspect_err(|e| warn!("Stopping airdrop at {}: {}", description, e))
    }
}
