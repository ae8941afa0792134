mod common;

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;

use common::{addr, session, sweep_key, FakeChain, ManualClock};
use evm_batch_airdrop::contract::{IERC20, NATIVE_TRANSFER_GAS, TRANSFER_GAS_LIMIT};
use evm_batch_airdrop::{AirdropError, AuditLog, BalanceSweeper, SweepSettings};

const GAS_PRICE: u128 = 2_000_000_000;

fn destination() -> Address {
    addr(0xee)
}

fn fee() -> U256 {
    U256::from(NATIVE_TRANSFER_GAS) * U256::from(GAS_PRICE)
}

fn audit_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_coin_sweep_skips_gas_floor_and_sends_remainder() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit").join("swept.txt");

    let empty = sweep_key();
    let dust = sweep_key();
    let rich = sweep_key();
    let one_ether = U256::from(10u64).pow(U256::from(18u64));

    let chain = FakeChain::new();
    chain.set_native(dust.address(), fee());
    chain.set_native(rich.address(), one_ether);
    let clock = ManualClock::new();

    let sweeper = BalanceSweeper::new(
        session(&chain, &clock),
        AuditLog::new(&audit_path),
        SweepSettings::new(destination(), GAS_PRICE),
    );
    let report = sweeper
        .collect_coins(&[empty.clone(), dust.clone(), rich.clone()])
        .await
        .unwrap();

    assert_eq!(report.scanned, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.swept.len(), 1);
    assert_eq!(report.total_collected, one_ether - fee());

    let sent = chain.sent();
    assert_eq!(sent.len(), 1);
    let tx = &sent[0];
    assert_eq!(tx.sender, rich.address());
    assert_eq!(tx.intent.to, destination());
    assert_eq!(tx.intent.value, one_ether - fee());
    assert_eq!(tx.intent.gas_limit, NATIVE_TRANSFER_GAS);
    assert_eq!(tx.intent.gas_price, GAS_PRICE);
    assert!(tx.intent.input.is_empty());

    assert_eq!(audit_lines(&audit_path), vec![rich.secret.clone()]);
    assert_eq!(chain.native(destination()), one_ether - fee());
}

#[tokio::test]
async fn test_token_sweep_transfers_full_balances() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("swept.txt");
    let token = addr(0xaa);

    let first = sweep_key();
    let empty = sweep_key();
    let second = sweep_key();

    let chain = FakeChain::new();
    chain.add_token(token, "USDT", 6);
    chain.set_token_balance(token, first.address(), U256::from(1_500_000u64));
    chain.set_token_balance(token, second.address(), U256::from(42u64));
    chain.set_nonce(second.address(), 3);
    let clock = ManualClock::new();

    let sweeper = BalanceSweeper::new(
        session(&chain, &clock),
        AuditLog::new(&audit_path),
        SweepSettings::new(destination(), GAS_PRICE),
    );
    let report = sweeper
        .collect_tokens(token, &[first.clone(), empty.clone(), second.clone()])
        .await
        .unwrap();

    assert_eq!(report.scanned, 3);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.total_collected, U256::from(1_500_042u64));

    let sent = chain.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].sender, first.address());
    assert_eq!(sent[1].sender, second.address());
    assert_eq!(sent[1].intent.nonce, 3);

    for tx in &sent {
        assert_eq!(tx.intent.to, token);
        assert_eq!(tx.intent.gas_limit, TRANSFER_GAS_LIMIT);
        assert_eq!(tx.intent.value, U256::ZERO);
        let call = IERC20::transferCall::abi_decode(&tx.intent.input).unwrap();
        assert_eq!(call.to, destination());
    }

    assert_eq!(audit_lines(&audit_path), vec![first.secret.clone(), second.secret.clone()]);
    assert_eq!(chain.token_balance(token, destination()), U256::from(1_500_042u64));
}

#[tokio::test]
async fn test_key_is_recorded_before_submission() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("swept.txt");

    let key = sweep_key();
    let chain = FakeChain::new();
    chain.set_native(key.address(), U256::from(10u64).pow(U256::from(17u64)));
    chain.reject_sends();
    let clock = ManualClock::new();

    let sweeper = BalanceSweeper::new(
        session(&chain, &clock),
        AuditLog::new(&audit_path),
        SweepSettings::new(destination(), GAS_PRICE),
    );
    let err = sweeper.collect_coins(std::slice::from_ref(&key)).await.unwrap_err();

    assert!(matches!(err, AirdropError::Broadcast { .. }));
    assert_eq!(audit_lines(&audit_path), vec![key.secret.clone()]);
}

#[tokio::test]
async fn test_reverted_sweep_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let token = addr(0xaa);
    let keys = [sweep_key(), sweep_key(), sweep_key()];

    let chain = FakeChain::new();
    chain.add_token(token, "DAI", 18);
    for key in &keys {
        chain.set_token_balance(token, key.address(), U256::from(100u64));
    }
    chain.revert_tx(0);
    let clock = ManualClock::new();

    let sweeper = BalanceSweeper::new(
        session(&chain, &clock),
        AuditLog::new(dir.path().join("swept.txt")),
        SweepSettings::new(destination(), GAS_PRICE),
    );
    let err = sweeper.collect_tokens(token, &keys).await.unwrap_err();

    assert!(matches!(err, AirdropError::TransactionFailed { .. }));
    assert_eq!(chain.sent().len(), 1);
}
