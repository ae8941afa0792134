//! Chain client trait and its JSON-RPC implementation

use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AirdropError, Result};

/// Outcome of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    /// `true` when the receipt status is 1
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// The chain operations a run needs. Every method is a single RPC round trip;
/// transport failures come back as [`AirdropError::Rpc`].
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;

    /// Pending transaction count of `account`
    async fn nonce(&self, account: Address) -> Result<u64>;

    async fn balance(&self, account: Address) -> Result<U256>;

    async fn code(&self, account: Address) -> Result<Bytes>;

    /// Read-only `eth_call` against the latest block
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256>;

    /// `Ok(None)` while the transaction is not mined yet
    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>>;
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// RPC endpoint URL (HTTP)
    pub rpc_url: String,
}

/// Alloy HTTP provider behind [`ChainClient`]
#[derive(Clone)]
pub struct RpcChainClient {
    provider: DynProvider,
}

impl RpcChainClient {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let http_url: reqwest::Url = config
            .rpc_url
            .parse()
            .map_err(|e| AirdropError::Configuration(format!("Invalid RPC URL: {}", e)))?;

        // Nonce, gas and chain id are set explicitly on every intent.
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_http(http_url)
            .erased();

        Ok(Self { provider })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| AirdropError::Rpc(format!("eth_chainId: {}", e)))
    }

    async fn nonce(&self, account: Address) -> Result<u64> {
        self.provider
            .get_transaction_count(account)
            .pending()
            .await
            .map_err(|e| AirdropError::Rpc(format!("eth_getTransactionCount({}): {}", account, e)))
    }

    async fn balance(&self, account: Address) -> Result<U256> {
        self.provider
            .get_balance(account)
            .await
            .map_err(|e| AirdropError::Rpc(format!("eth_getBalance({}): {}", account, e)))
    }

    async fn code(&self, account: Address) -> Result<Bytes> {
        self.provider
            .get_code_at(account)
            .await
            .map_err(|e| AirdropError::Rpc(format!("eth_getCode({}): {}", account, e)))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let request = TransactionRequest::default().to(to).input(data.into());
        self.provider
            .call(request)
            .await
            .map_err(|e| AirdropError::Rpc(format!("eth_call({}): {}", to, e)))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256> {
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| AirdropError::Rpc(format!("eth_sendRawTransaction: {}", e)))?;
        let hash = *pending.tx_hash();
        debug!("Node accepted transaction {}", hash);
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| AirdropError::Rpc(format!("eth_getTransactionReceipt({}): {}", hash, e)))?;

        Ok(receipt.map(|r| TxReceipt {
            transaction_hash: r.transaction_hash,
            success: r.status(),
            block_number: r.block_number,
            gas_used: r.gas_used,
        }))
    }
}
