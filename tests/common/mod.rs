//! In-memory chain and virtual clock shared by the integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;

use evm_batch_airdrop::contract::{IAirdrop, IERC20};
use evm_batch_airdrop::{
    AirdropError, ChainClient, ChainSession, Clock, ReceiptPolicy, Result, RetryPolicy, SweepKey,
    TransactionIntent, TxReceipt,
};

pub const CHAIN_ID: u64 = 97;

/// A transaction the fake node accepted
#[derive(Debug, Clone)]
pub struct SentTx {
    pub hash: B256,
    pub sender: Address,
    pub intent: TransactionIntent,
}

impl SentTx {
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.intent.input.get(..4).and_then(|s| s.try_into().ok())
    }
}

#[derive(Debug, Clone)]
struct TokenMeta {
    name: String,
    symbol: String,
    decimals: u8,
}

#[derive(Default)]
struct ChainState {
    native: HashMap<Address, U256>,
    tokens: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    meta: HashMap<Address, TokenMeta>,
    nonces: HashMap<Address, u64>,
    code: HashMap<Address, Bytes>,
    sent: Vec<SentTx>,
    reverted: HashSet<usize>,
    reject_sends: bool,
    never_mine: bool,
    pending_polls: u32,
    pending_left: HashMap<B256, u32>,
    failures: HashMap<&'static str, u32>,
    calls: HashMap<&'static str, u32>,
}

/// Minimal EVM-ish state machine behind [`ChainClient`]
#[derive(Default)]
pub struct FakeChain {
    state: Mutex<ChainState>,
}

impl FakeChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_native(&self, account: Address, amount: U256) {
        self.state.lock().unwrap().native.insert(account, amount);
    }

    pub fn native(&self, account: Address) -> U256 {
        self.state.lock().unwrap().native.get(&account).copied().unwrap_or_default()
    }

    pub fn add_token(&self, token: Address, symbol: &str, decimals: u8) {
        self.state.lock().unwrap().meta.insert(
            token,
            TokenMeta {
                name: format!("{} Token", symbol),
                symbol: symbol.to_string(),
                decimals,
            },
        );
    }

    pub fn set_token_balance(&self, token: Address, owner: Address, amount: U256) {
        self.state.lock().unwrap().tokens.insert((token, owner), amount);
    }

    pub fn token_balance(&self, token: Address, owner: Address) -> U256 {
        self.state.lock().unwrap().tokens.get(&(token, owner)).copied().unwrap_or_default()
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.state.lock().unwrap().allowances.insert((token, owner, spender), amount);
    }

    pub fn set_nonce(&self, account: Address, nonce: u64) {
        self.state.lock().unwrap().nonces.insert(account, nonce);
    }

    pub fn set_code(&self, account: Address, code: &[u8]) {
        self.state.lock().unwrap().code.insert(account, Bytes::copy_from_slice(code));
    }

    /// Mark the `index`-th accepted transaction (0-based) as reverted.
    pub fn revert_tx(&self, index: usize) {
        self.state.lock().unwrap().reverted.insert(index);
    }

    pub fn reject_sends(&self) {
        self.state.lock().unwrap().reject_sends = true;
    }

    pub fn never_mine(&self) {
        self.state.lock().unwrap().never_mine = true;
    }

    /// Every receipt reports pending `polls` times before it shows up.
    pub fn pending_polls(&self, polls: u32) {
        self.state.lock().unwrap().pending_polls = polls;
    }

    /// Fail the next `times` calls of `method` with a transport error.
    pub fn fail_next(&self, method: &'static str, times: u32) {
        self.state.lock().unwrap().failures.insert(method, times);
    }

    pub fn calls(&self, method: &'static str) -> u32 {
        self.state.lock().unwrap().calls.get(method).copied().unwrap_or_default()
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.state.lock().unwrap().sent.clone()
    }

    fn enter(&self, method: &'static str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(method).or_default() += 1;
        if let Some(left) = state.failures.get_mut(method) {
            if *left > 0 {
                *left -= 1;
                return Err(AirdropError::Rpc(format!("{}: connection reset", method)));
            }
        }
        Ok(())
    }
}

impl ChainState {
    fn execute(&mut self, sender: Address, intent: &TransactionIntent) {
        let to = intent.to;
        let input = &intent.input;

        if input.is_empty() {
            self.debit(sender, intent.value);
            *self.native.entry(to).or_default() += intent.value;
            return;
        }

        let selector: [u8; 4] = match input.get(..4).and_then(|s| s.try_into().ok()) {
            Some(selector) => selector,
            None => return,
        };

        if selector == IERC20::approveCall::SELECTOR {
            if let Ok(call) = IERC20::approveCall::abi_decode(input) {
                self.allowances.insert((to, sender, call.spender), call.value);
            }
        } else if selector == IERC20::transferCall::SELECTOR {
            if let Ok(call) = IERC20::transferCall::abi_decode(input) {
                self.move_tokens(to, sender, call.to, call.value);
            }
        } else if selector == IAirdrop::airdropTokenCall::SELECTOR {
            if let Ok(call) = IAirdrop::airdropTokenCall::abi_decode(input) {
                for (account, amount) in call.accounts.iter().zip(&call.amounts) {
                    self.move_tokens(call.token, sender, *account, *amount);
                }
            }
        } else if selector == IAirdrop::airdropETHCall::SELECTOR {
            if let Ok(call) = IAirdrop::airdropETHCall::abi_decode(input) {
                self.debit(sender, intent.value);
                for (account, amount) in call.accounts.iter().zip(&call.amounts) {
                    *self.native.entry(*account).or_default() += *amount;
                }
            }
        }
    }

    fn debit(&mut self, account: Address, amount: U256) {
        let balance = self.native.entry(account).or_default();
        *balance = balance.saturating_sub(amount);
    }

    fn move_tokens(&mut self, token: Address, from: Address, to: Address, amount: U256) {
        let balance = self.tokens.entry((token, from)).or_default();
        *balance = balance.saturating_sub(amount);
        *self.tokens.entry((token, to)).or_default() += amount;
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn chain_id(&self) -> Result<u64> {
        self.enter("chain_id")?;
        Ok(CHAIN_ID)
    }

    async fn nonce(&self, account: Address) -> Result<u64> {
        self.enter("nonce")?;
        Ok(self.state.lock().unwrap().nonces.get(&account).copied().unwrap_or_default())
    }

    async fn balance(&self, account: Address) -> Result<U256> {
        self.enter("balance")?;
        Ok(self.native(account))
    }

    async fn code(&self, account: Address) -> Result<Bytes> {
        self.enter("code")?;
        Ok(self.state.lock().unwrap().code.get(&account).cloned().unwrap_or_default())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        self.enter("call")?;
        let state = self.state.lock().unwrap();
        let meta = state.meta.get(&to).cloned();

        let output = if data.starts_with(&IERC20::balanceOfCall::SELECTOR) {
            let call = IERC20::balanceOfCall::abi_decode(&data).map_err(|e| AirdropError::Rpc(e.to_string()))?;
            (state.tokens.get(&(to, call.owner)).copied().unwrap_or_default(),).abi_encode_params()
        } else if data.starts_with(&IERC20::allowanceCall::SELECTOR) {
            let call = IERC20::allowanceCall::abi_decode(&data).map_err(|e| AirdropError::Rpc(e.to_string()))?;
            let key = (to, call.owner, call.spender);
            (state.allowances.get(&key).copied().unwrap_or_default(),).abi_encode_params()
        } else if data.starts_with(&IERC20::decimalsCall::SELECTOR) {
            (U256::from(meta.map(|m| m.decimals).unwrap_or(18)),).abi_encode_params()
        } else if data.starts_with(&IERC20::symbolCall::SELECTOR) {
            (meta.map(|m| m.symbol).unwrap_or_default(),).abi_encode_params()
        } else if data.starts_with(&IERC20::nameCall::SELECTOR) {
            (meta.map(|m| m.name).unwrap_or_default(),).abi_encode_params()
        } else if data.starts_with(&IERC20::totalSupplyCall::SELECTOR) {
            let supply = state
                .tokens
                .iter()
                .filter(|((token, _), _)| *token == to)
                .fold(U256::ZERO, |acc, (_, v)| acc + *v);
            (supply,).abi_encode_params()
        } else {
            return Err(AirdropError::Rpc("execution reverted".to_string()));
        };
        Ok(output.into())
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256> {
        self.enter("send_raw_transaction")?;
        let (intent, sender) = TransactionIntent::decode_signed(&raw)?;

        let mut state = self.state.lock().unwrap();
        if state.reject_sends {
            return Err(AirdropError::Rpc("insufficient funds for gas * price + value".to_string()));
        }
        let expected = state.nonces.get(&sender).copied().unwrap_or_default();
        if intent.nonce != expected {
            return Err(AirdropError::Rpc(format!("nonce mismatch: expected {}, got {}", expected, intent.nonce)));
        }
        state.nonces.insert(sender, expected + 1);

        let hash = keccak256(&raw);
        let index = state.sent.len();
        if !state.reverted.contains(&index) {
            state.execute(sender, &intent);
        }
        let polls = state.pending_polls;
        state.pending_left.insert(hash, polls);
        state.sent.push(SentTx { hash, sender, intent });
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>> {
        self.enter("transaction_receipt")?;
        let mut state = self.state.lock().unwrap();
        if state.never_mine {
            return Ok(None);
        }
        if let Some(left) = state.pending_left.get_mut(&hash) {
            if *left > 0 {
                *left -= 1;
                return Ok(None);
            }
        }

        let Some(index) = state.sent.iter().position(|tx| tx.hash == hash) else {
            return Ok(None);
        };
        Ok(Some(TxReceipt {
            transaction_hash: hash,
            success: !state.reverted.contains(&index),
            block_number: Some(index as u64 + 1),
            gas_used: 21_000,
        }))
    }
}

/// Virtual time: `sleep` advances `now` instantly.
pub struct ManualClock {
    start: Instant,
    elapsed: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            start: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        *self.elapsed.lock().unwrap() += duration;
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(1),
        multiplier: 2,
    }
}

pub fn session(chain: &Arc<FakeChain>, clock: &Arc<ManualClock>) -> ChainSession {
    session_with_receipts(chain, clock, ReceiptPolicy::default())
}

pub fn session_with_receipts(chain: &Arc<FakeChain>, clock: &Arc<ManualClock>, receipts: ReceiptPolicy) -> ChainSession {
    ChainSession::new(chain.clone())
        .with_clock(clock.clone())
        .with_retry(fast_retry())
        .with_receipts(receipts)
}

pub fn addr(n: u8) -> Address {
    Address::with_last_byte(n)
}

pub fn sweep_key() -> SweepKey {
    let signer = PrivateKeySigner::random();
    SweepKey {
        secret: signer.to_bytes().to_string(),
        signer,
    }
}
