//! Batch airdrop and balance collection for Ethereum-compatible chains
//!
//! Two workflows, both strictly sequential:
//!
//! - **Airdrop**: one funding account pays many recipients in batches through an
//!   on-chain distributor (`airdropToken` / `airdropETH`).
//! - **Collect**: many source keys send their token or coin balance to one
//!   destination account.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use evm_batch_airdrop::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = RpcChainClient::new(ProviderConfig {
//!         rpc_url: "http://localhost:8545".to_string(),
//!     })?;
//!     let session = ChainSession::new(Arc::new(client));
//!
//!     let recipients = ListReader::read_recipients("holders.csv", 18)?;
//!     let signer = "0x..."
//!         .parse::<PrivateKeySigner>()
//!         .map_err(|_| AirdropError::InvalidSecretKey { index: 0 })?;
//!
//!     let dispatcher = BatchDispatcher::new(session, signer, DispatchSettings {
//!         distributor: "0x..."
//!             .parse::<Address>()
//!             .map_err(|e| AirdropError::Configuration(e.to_string()))?,
//!         gas_limit: 3_000_000,
//!         gas_price: 5_000_000_000,
//!         batch_size: 200,
//!         nonce_mode: NonceDiscipline::Local,
//!         approve: true,
//!     });
//!
//!     let report = dispatcher.airdrop_coins(&recipients).await?;
//!     println!("{} batches sent", report.batches.len());
//!     Ok(())
//! }
//! ```

pub mod amount;
pub mod audit;
pub mod batch;
pub mod chain;
pub mod cli;
pub mod clock;
pub mod config;
pub mod contract;
pub mod dispatcher;
pub mod error;
pub mod list_reader;
pub mod provider;
pub mod retry;
pub mod sweeper;
pub mod transaction;

// Re-export commonly used types
pub use audit::AuditLog;
pub use batch::{plan_batches, Batch};
pub use chain::{ChainSession, ReceiptPolicy};
pub use clock::{Clock, SystemClock};
pub use config::{AirdropConfig, AppConfig, CollectConfig};
pub use dispatcher::{BatchDispatcher, BatchOutcome, DispatchReport, DispatchSettings, NonceDiscipline};
pub use error::{AirdropError, Result};
pub use list_reader::{CountRecipient, ListReader, Recipient, SweepKey};
pub use provider::{ChainClient, ProviderConfig, RpcChainClient, TxReceipt};
pub use retry::RetryPolicy;
pub use sweeper::{BalanceSweeper, SweepOutcome, SweepReport, SweepSettings};
pub use transaction::{SignedTransaction, TransactionIntent};

// Re-export Alloy types for convenience
pub use alloy::primitives::{Address, Bytes, B256, U256};
pub use alloy::signers::local::PrivateKeySigner;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::audit::AuditLog;
    pub use crate::chain::{ChainSession, ReceiptPolicy};
    pub use crate::dispatcher::{BatchDispatcher, DispatchSettings, NonceDiscipline};
    pub use crate::error::{AirdropError, Result};
    pub use crate::list_reader::{ListReader, Recipient, SweepKey};
    pub use crate::provider::{ChainClient, ProviderConfig, RpcChainClient};
    pub use crate::retry::RetryPolicy;
    pub use crate::sweeper::{BalanceSweeper, SweepSettings};
    pub use alloy::primitives::{Address, U256};
    pub use alloy::signers::local::PrivateKeySigner;
}
