//! Retrying session over a [`ChainClient`]

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::contract::{decode_return, IERC20};
use crate::error::{AirdropError, Result};
use crate::provider::{ChainClient, TxReceipt};
use crate::retry::RetryPolicy;
use crate::transaction::TransactionIntent;

/// How receipts are polled after broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptPolicy {
    pub poll_interval: Duration,
    /// `None` waits until the receipt shows up or the endpoint keeps failing
    pub timeout: Option<Duration>,
    /// Consecutive failed receipt queries tolerated before giving up
    pub max_query_errors: u32,
}

impl Default for ReceiptPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            timeout: None,
            max_query_errors: 8,
        }
    }
}

/// Client handle, time source and retry policies shared by one run
#[derive(Clone)]
pub struct ChainSession {
    client: Arc<dyn ChainClient>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    receipts: ReceiptPolicy,
}

impl ChainSession {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self {
            client,
            clock: Arc::new(SystemClock),
            retry: RetryPolicy::default(),
            receipts: ReceiptPolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_receipts(mut self, receipts: ReceiptPolicy) -> Self {
        self.receipts = receipts;
        self
    }

    pub async fn chain_id(&self) -> Result<u64> {
        self.retry
            .run(self.clock.as_ref(), "eth_chainId", || self.client.chain_id())
            .await
    }

    pub async fn nonce(&self, account: Address) -> Result<u64> {
        let nonce = self
            .retry
            .run(self.clock.as_ref(), "eth_getTransactionCount", || self.client.nonce(account))
            .await?;
        debug!("{} next nonce: {}", account, nonce);
        Ok(nonce)
    }

    pub async fn balance(&self, account: Address) -> Result<U256> {
        self.retry
            .run(self.clock.as_ref(), "eth_getBalance", || self.client.balance(account))
            .await
    }

    pub async fn code(&self, account: Address) -> Result<Bytes> {
        self.retry
            .run(self.clock.as_ref(), "eth_getCode", || self.client.code(account))
            .await
    }

    /// Read-only contract call decoded as `C`'s return type.
    pub async fn read<C: SolCall>(&self, to: Address, call: &C) -> Result<C::Return> {
        let data: Bytes = call.abi_encode().into();
        let output = self
            .retry
            .run(self.clock.as_ref(), C::SIGNATURE, || self.client.call(to, data.clone()))
            .await?;
        decode_return::<C>(&output)
    }

    pub async fn erc20_name(&self, token: Address) -> Result<String> {
        self.read(token, &IERC20::nameCall {}).await
    }

    pub async fn erc20_symbol(&self, token: Address) -> Result<String> {
        self.read(token, &IERC20::symbolCall {}).await
    }

    pub async fn erc20_decimals(&self, token: Address) -> Result<u8> {
        self.read(token, &IERC20::decimalsCall {}).await
    }

    pub async fn erc20_total_supply(&self, token: Address) -> Result<U256> {
        self.read(token, &IERC20::totalSupplyCall {}).await
    }

    pub async fn erc20_balance_of(&self, token: Address, owner: Address) -> Result<U256> {
        self.read(token, &IERC20::balanceOfCall { owner }).await
    }

    pub async fn erc20_allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        self.read(token, &IERC20::allowanceCall { owner, spender }).await
    }

    /// Sign `intent` and submit it once; rejected broadcasts are not retried.
    pub async fn broadcast(
        &self,
        intent: &TransactionIntent,
        signer: &PrivateKeySigner,
        chain_id: u64,
    ) -> Result<B256> {
        let signed = intent.sign(signer, chain_id)?;
        let accepted = self
            .client
            .send_raw_transaction(signed.raw)
            .await
            .map_err(|e| AirdropError::Broadcast {
                tx_hash: signed.hash,
                message: e.to_string(),
            })?;

        if accepted != signed.hash {
            warn!("Node reported hash {} for locally computed {}", accepted, signed.hash);
        }
        Ok(signed.hash)
    }

    /// Poll until the receipt of `tx_hash` shows success.
    ///
    /// A missing receipt counts as pending. Query errors are logged and polled
    /// again; more than `max_query_errors` in a row fail with
    /// [`AirdropError::TransientRpc`]. A reverted receipt fails with
    /// [`AirdropError::TransactionFailed`]. Once the receipt timeout has
    /// elapsed no further query is made and the wait fails with
    /// [`AirdropError::Timeout`].
    pub async fn wait_for_success(&self, tx_hash: B256, description: &str) -> Result<TxReceipt> {
        let started = self.clock.now();
        let max_errors = self.receipts.max_query_errors;
        let mut consecutive_errors = 0u32;

        loop {
            match self.client.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    if receipt.success {
                        info!(
                            "{} tx {} confirmed in block {:?}",
                            description, tx_hash, receipt.block_number
                        );
                        return Ok(receipt);
                    }
                    warn!("{} tx {} execution failed", description, tx_hash);
                    return Err(AirdropError::TransactionFailed {
                        tx_hash,
                        description: description.to_string(),
                    });
                }
                Ok(None) => {
                    consecutive_errors = 0;
                    info!("Waiting for {} tx {} to confirm...", description, tx_hash);
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!("Get {} tx {} receipt error: {}", description, tx_hash, e);
                    if consecutive_errors > max_errors {
                        return Err(AirdropError::TransientRpc {
                            operation: "eth_getTransactionReceipt".to_string(),
                            attempts: consecutive_errors,
                            last_error: e.to_string(),
                        });
                    }
                }
            }

            self.clock.sleep(self.receipts.poll_interval).await;

            let waited = self.clock.now().saturating_duration_since(started);
            if let Some(timeout) = self.receipts.timeout {
                if waited >= timeout {
                    warn!("Receipt of {} tx {} timed out", description, tx_hash);
                    return Err(AirdropError::Timeout { tx_hash, waited });
                }
            }
        }
    }

    /// Drop addresses that hold contract code.
    pub async fn retain_externally_owned(&self, accounts: Vec<Address>) -> Result<Vec<Address>> {
        let total = accounts.len();
        let mut kept = Vec::with_capacity(total);

        for (i, account) in accounts.into_iter().enumerate() {
            debug!("Checking code of address {} / {}", i + 1, total);
            if self.code(account).await?.is_empty() {
                kept.push(account);
            } else {
                info!("{} is a contract address, skipping", account);
            }
        }

        info!("Externally owned accounts: {} / {}", kept.len(), total);
        Ok(kept)
    }
}
