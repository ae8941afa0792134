//! Line-oriented recipient, address and key list parsing

use std::path::Path;
use std::str::FromStr;

use alloy::primitives::{hex, Address, U256};
use alloy::signers::local::PrivateKeySigner;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::amount::{format_units_trimmed, parse_units_truncated};
use crate::error::{AirdropError, Result};

/// One airdrop payout in base units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub address: Address,
    pub amount: U256,
}

impl Recipient {
    pub fn new(address: Address, amount: U256) -> Self {
        Self { address, amount }
    }

    /// Pair up parallel account and amount vectors.
    pub fn zip(accounts: Vec<Address>, amounts: Vec<U256>) -> Result<Vec<Self>> {
        if accounts.len() != amounts.len() {
            return Err(AirdropError::LengthMismatch {
                accounts: accounts.len(),
                amounts: amounts.len(),
            });
        }
        Ok(accounts
            .into_iter()
            .zip(amounts)
            .map(|(address, amount)| Self { address, amount })
            .collect())
    }

    /// Give every address the same amount.
    pub fn with_fixed_amount(addresses: Vec<Address>, amount: U256) -> Vec<Self> {
        addresses
            .into_iter()
            .map(|address| Self { address, amount })
            .collect()
    }
}

/// Integer-count entry, e.g. number of NFTs per holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRecipient {
    pub address: Address,
    pub count: u64,
}

/// Secret key as listed in the keys file, with its derived signer
#[derive(Clone)]
pub struct SweepKey {
    pub secret: String,
    pub signer: PrivateKeySigner,
}

impl SweepKey {
    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

impl std::fmt::Debug for SweepKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SweepKey")
            .field("address", &self.signer.address())
            .finish_non_exhaustive()
    }
}

pub struct ListReader;

impl ListReader {
    /// Read an `address,amount` list, converting decimal amounts to base units.
    pub fn read_recipients<P: AsRef<Path>>(path: P, decimals: u8) -> Result<Vec<Recipient>> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_recipients(&text, decimals)
    }

    pub fn parse_recipients(text: &str, decimals: u8) -> Result<Vec<Recipient>> {
        let mut recipients = Vec::new();
        let mut total = U256::ZERO;

        for (index, record) in records(text)? {
            let address = parse_address(index, field(&record, 0))?;
            let raw_amount = field(&record, 1);
            let amount = parse_units_truncated(raw_amount, decimals)
                .filter(|amount| !amount.is_zero())
                .ok_or_else(|| AirdropError::InvalidAmount {
                    index,
                    value: raw_amount.to_string(),
                })?;

            total = total.checked_add(amount).ok_or_else(|| AirdropError::InvalidAmount {
                index,
                value: raw_amount.to_string(),
            })?;
            recipients.push(Recipient { address, amount });
        }

        info!(
            "Read {} recipients, total amount: {}",
            recipients.len(),
            format_units_trimmed(total, decimals)
        );
        Ok(recipients)
    }

    /// Read a bare address list, skipping malformed lines.
    pub fn read_addresses<P: AsRef<Path>>(path: P) -> Result<Vec<Address>> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_addresses(&text)
    }

    pub fn parse_addresses(text: &str) -> Result<Vec<Address>> {
        let mut addresses = Vec::new();
        let mut seen = 0usize;

        for (index, record) in records(text)? {
            seen += 1;
            match parse_address(index, field(&record, 0)) {
                Ok(address) => addresses.push(address),
                Err(_) => warn!("Address at index {} is invalid, skipping", index),
            }
        }

        info!("Valid addresses: {} / {}", addresses.len(), seen);
        Ok(addresses)
    }

    /// Read an `address,count` list with positive integer counts.
    pub fn read_count_recipients<P: AsRef<Path>>(path: P) -> Result<Vec<CountRecipient>> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_count_recipients(&text)
    }

    pub fn parse_count_recipients(text: &str) -> Result<Vec<CountRecipient>> {
        let mut entries = Vec::new();
        let mut total: u64 = 0;

        for (index, record) in records(text)? {
            let address = parse_address(index, field(&record, 0))?;
            let raw_count = field(&record, 1);
            let count = raw_count
                .parse::<u64>()
                .ok()
                .filter(|count| *count > 0)
                .ok_or_else(|| AirdropError::InvalidAmount {
                    index,
                    value: raw_count.to_string(),
                })?;

            total = total.saturating_add(count);
            entries.push(CountRecipient { address, count });
        }

        info!("Read {} entries, total count: {}", entries.len(), total);
        Ok(entries)
    }

    /// Read secret keys, one per line; extra comma-separated columns are ignored.
    pub fn read_secret_keys<P: AsRef<Path>>(path: P) -> Result<Vec<SweepKey>> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_secret_keys(&text)
    }

    pub fn parse_secret_keys(text: &str) -> Result<Vec<SweepKey>> {
        let mut keys = Vec::new();

        for (index, record) in records(text)? {
            let secret: String = field(&record, 0)
                .chars()
                .filter(|c| *c != '\r' && *c != '\t')
                .collect();
            let signer = PrivateKeySigner::from_str(&secret)
                .map_err(|_| AirdropError::InvalidSecretKey { index })?;
            keys.push(SweepKey { secret, signer });
        }

        info!("Read {} secret keys", keys.len());
        Ok(keys)
    }
}

/// Non-blank records paired with their 0-based line index.
fn records(text: &str) -> Result<Vec<(usize, StringRecord)>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut out = Vec::new();
    for (ordinal, result) in reader.records().enumerate() {
        let record = result.map_err(|e| AirdropError::Decoding(format!("Malformed list line: {}", e)))?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let index = record
            .position()
            .map(|p| p.line().saturating_sub(1) as usize)
            .unwrap_or(ordinal);
        out.push((index, record));
    }
    Ok(out)
}

fn field(record: &StringRecord, i: usize) -> &str {
    record.get(i).map(str::trim).unwrap_or("")
}

fn parse_address(index: usize, raw: &str) -> Result<Address> {
    let invalid = || AirdropError::InvalidAddress {
        index,
        value: raw.to_string(),
    };

    // Optional 0x/0X prefix, then exactly 40 hex digits; checksum casing is not enforced.
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let bytes = hex::decode(digits).map_err(|_| invalid())?;
    Ok(Address::from_slice(&bytes))
}
