//! ERC-20 and distributor contract bindings

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::error::{AirdropError, Result};

/// Gas limit used for `approve`
pub const APPROVE_GAS_LIMIT: u64 = 60_000;

/// Default gas limit used for ERC-20 `transfer`
pub const TRANSFER_GAS_LIMIT: u64 = 60_000;

/// Gas consumed by a plain value transfer
pub const NATIVE_TRANSFER_GAS: u64 = 21_000;

sol! {
    #[allow(missing_docs)]
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
        function transfer(address to, uint256 value) external returns (bool);
    }
}

sol! {
    #[allow(missing_docs)]
    interface IAirdrop {
        function airdropToken(address token, address[] accounts, uint256[] amounts) external;
        function airdropETH(address[] accounts, uint256[] amounts) external payable;
    }
}

/// Calldata for `airdropToken(token, accounts, amounts)`.
pub fn encode_airdrop_token(token: Address, accounts: Vec<Address>, amounts: Vec<U256>) -> Result<Bytes> {
    ensure_same_length(&accounts, &amounts)?;
    Ok(IAirdrop::airdropTokenCall { token, accounts, amounts }.abi_encode().into())
}

/// Calldata for `airdropETH(accounts, amounts)`.
pub fn encode_airdrop_eth(accounts: Vec<Address>, amounts: Vec<U256>) -> Result<Bytes> {
    ensure_same_length(&accounts, &amounts)?;
    Ok(IAirdrop::airdropETHCall { accounts, amounts }.abi_encode().into())
}

/// Calldata approving `spender` for the maximum amount.
pub fn encode_approve_max(spender: Address) -> Bytes {
    IERC20::approveCall { spender, value: U256::MAX }.abi_encode().into()
}

pub fn encode_transfer(to: Address, value: U256) -> Bytes {
    IERC20::transferCall { to, value }.abi_encode().into()
}

/// Decode the return data of a read-only call.
pub fn decode_return<C: SolCall>(data: &[u8]) -> Result<C::Return> {
    C::abi_decode_returns(data)
        .map_err(|e| AirdropError::Decoding(format!("Failed to decode {} result: {}", C::SIGNATURE, e)))
}

fn ensure_same_length(accounts: &[Address], amounts: &[U256]) -> Result<()> {
    if accounts.len() != amounts.len() {
        return Err(AirdropError::LengthMismatch {
            accounts: accounts.len(),
            amounts: amounts.len(),
        });
    }
    Ok(())
}
