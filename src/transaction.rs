//! Transaction building and signing

use alloy::consensus::transaction::SignerRecoverable;
use alloy::consensus::{SignableTransaction, Transaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::{Decodable2718, Encodable2718};
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use serde::{Deserialize, Serialize};

use crate::error::{AirdropError, Result};

/// Everything needed to sign one legacy transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIntent {
    pub nonce: u64,
    pub to: Address,
    /// Value to send (in Wei)
    pub value: U256,
    pub gas_limit: u64,
    /// Gas price (in Wei)
    pub gas_price: u128,
    pub input: Bytes,
}

/// Signed, EIP-2718 encoded transaction ready for `eth_sendRawTransaction`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub hash: B256,
    pub raw: Bytes,
}

impl TransactionIntent {
    /// Contract call carrying no value.
    pub fn call(nonce: u64, to: Address, input: Bytes, gas_limit: u64, gas_price: u128) -> Self {
        Self {
            nonce,
            to,
            value: U256::ZERO,
            gas_limit,
            gas_price,
            input,
        }
    }

    /// Plain value transfer.
    pub fn transfer(nonce: u64, to: Address, value: U256, gas_limit: u64, gas_price: u128) -> Self {
        Self {
            nonce,
            to,
            value,
            gas_limit,
            gas_price,
            input: Bytes::new(),
        }
    }

    /// Sign as an EIP-155 legacy transaction.
    pub fn sign(&self, signer: &PrivateKeySigner, chain_id: u64) -> Result<SignedTransaction> {
        let mut tx = TxLegacy {
            chain_id: Some(chain_id),
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: TxKind::Call(self.to),
            value: self.value,
            input: self.input.clone(),
        };

        let signature = signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| AirdropError::Signing(format!("Failed to sign transaction: {}", e)))?;

        let envelope = TxEnvelope::from(tx.into_signed(signature));
        Ok(SignedTransaction {
            hash: *envelope.tx_hash(),
            raw: envelope.encoded_2718().into(),
        })
    }

    /// Decode a raw signed transaction back into its intent and recovered sender.
    pub fn decode_signed(raw: &[u8]) -> Result<(Self, Address)> {
        let envelope = TxEnvelope::decode_2718(&mut &raw[..])
            .map_err(|e| AirdropError::Decoding(format!("Invalid raw transaction: {}", e)))?;

        let sender = envelope
            .recover_signer()
            .map_err(|e| AirdropError::Signing(format!("Failed to recover signer: {}", e)))?;

        let to = envelope
            .to()
            .ok_or_else(|| AirdropError::Decoding("Contract creation is not an intent".to_string()))?;

        let intent = Self {
            nonce: envelope.nonce(),
            to,
            value: envelope.value(),
            gas_limit: envelope.gas_limit(),
            gas_price: envelope.gas_price().unwrap_or_default(),
            input: envelope.input().clone(),
        };
        Ok((intent, sender))
    }
}
