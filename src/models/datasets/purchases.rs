use alloy_primitives::Address;
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use serde::Serialize;

use crate::models::datasets::logs::TransferEvent;
use crate::models::datasets::transactions::ContractTransaction;
use crate::utils::format_address;

pub const TRANSACTION_TYPE_CARD_PURCHASE: &str = "card_purchase";

/// A transfer into a settlement address joined with the metadata of the
/// transaction that carried it.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRecord {
    pub transaction_hash: String,
    pub timestamp: DateTime<Utc>,
    pub block_number: u64,
    pub user_wallet: Address,
    pub settlement_address: Address,
    pub amount: f64,
    pub token_address: Address,
    pub token_symbol: String,
    pub gas_used: u64,
    pub gas_price: u128,
}

/// Logical identity of a purchase. Hashes are compared lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PurchaseKey {
    pub transaction_hash: String,
    pub settlement_address: Address,
    pub token_address: Address,
}

impl PurchaseRecord {
    pub fn from_transfer(tx: &ContractTransaction, transfer: &TransferEvent) -> Self {
        Self {
            transaction_hash: tx.hash.clone(),
            timestamp: tx.timestamp,
            block_number: tx.block_number,
            user_wallet: transfer.from_address,
            settlement_address: transfer.to_address,
            amount: transfer.amount,
            token_address: transfer.token_address,
            token_symbol: transfer.symbol.clone(),
            gas_used: tx.gas_used,
            gas_price: tx.gas_price,
        }
    }

    pub fn key(&self) -> PurchaseKey {
        PurchaseKey {
            transaction_hash: self.transaction_hash.to_lowercase(),
            settlement_address: self.settlement_address,
            token_address: self.token_address,
        }
    }
}

/////////////////////////////////// Dataset Rows ///////////////////////////////////////
// Column names are consumed by the reputation scoring engine and must not change.
// Keep in sync with the field order of `PurchaseRow`.
pub const PURCHASE_COLUMNS: [&str; 15] = [
    "transaction_hash",
    "timestamp",
    "block_number",
    "user_wallet",
    "settlement_address",
    "amount",
    "token_address",
    "token_symbol",
    "transaction_type",
    "gas_used",
    "gas_price",
    "date",
    "hour",
    "day_of_week",
    "is_weekend",
];

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRow {
    pub transaction_hash: String,
    pub timestamp: DateTime<Utc>,
    pub block_number: u64,
    pub user_wallet: String,
    pub settlement_address: String,
    pub amount: f64,
    pub token_address: String,
    pub token_symbol: String,
    pub transaction_type: &'static str,
    pub gas_used: u64,
    pub gas_price: u128,
    // Derived columns
    pub date: NaiveDate,
    pub hour: u32,
    pub day_of_week: u32, // Monday = 0
    pub is_weekend: bool,
}

impl From<&PurchaseRecord> for PurchaseRow {
    fn from(record: &PurchaseRecord) -> Self {
        let day_of_week = record.timestamp.weekday().num_days_from_monday();
        Self {
            transaction_hash: record.transaction_hash.clone(),
            timestamp: record.timestamp,
            block_number: record.block_number,
            user_wallet: format_address(&record.user_wallet),
            settlement_address: format_address(&record.settlement_address),
            amount: record.amount,
            token_address: format_address(&record.token_address),
            token_symbol: record.token_symbol.clone(),
            transaction_type: TRANSACTION_TYPE_CARD_PURCHASE,
            gas_used: record.gas_used,
            gas_price: record.gas_price,
            date: record.timestamp.date_naive(),
            hour: record.timestamp.hour(),
            day_of_week,
            is_weekend: day_of_week >= 5,
        }
    }
}

/// Progress metadata attached to a checkpoint snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{U256, address};

    fn sample_transaction() -> ContractTransaction {
        ContractTransaction {
            hash: "0xABCDEF".to_string(),
            // Saturday 2025-06-28 14:05:00 UTC
            timestamp: DateTime::from_timestamp(1_751_119_500, 0).unwrap(),
            from_address: address!("0x1111111111111111111111111111111111111111"),
            to_address: Some(address!("0x9dd23A4a0845f10d65D293776B792af1131c7B30")),
            block_number: 20_000_000,
            gas_used: 51_234,
            gas_price: 70_000_000,
            input: "0x".to_string(),
        }
    }

    fn sample_transfer() -> TransferEvent {
        TransferEvent {
            from_address: address!("0x2222222222222222222222222222222222222222"),
            to_address: address!("0xf344192b9146132fC0e997D1666dC1531Bf8F7Cd"),
            token_address: address!("0x176211869cA2b568f2A7D4EE941E073a821EE1ff"),
            raw_amount: U256::from(12_500_000u64),
            amount: 12.5,
            symbol: "USDC".to_string(),
            decimals: 6,
        }
    }

    #[test]
    fn test_record_joins_transaction_metadata() {
        let record = PurchaseRecord::from_transfer(&sample_transaction(), &sample_transfer());
        assert_eq!(record.transaction_hash, "0xABCDEF");
        assert_eq!(record.block_number, 20_000_000);
        assert_eq!(record.user_wallet, sample_transfer().from_address);
        assert_eq!(record.settlement_address, sample_transfer().to_address);
        assert_eq!(record.gas_used, 51_234);
        assert_eq!(record.token_symbol, "USDC");
    }

    #[test]
    fn test_key_ignores_hash_case() {
        let record = PurchaseRecord::from_transfer(&sample_transaction(), &sample_transfer());
        let mut other = record.clone();
        other.transaction_hash = "0xabcdef".to_string();
        assert_eq!(record.key(), other.key());
    }

    #[test]
    fn test_row_uses_lowercase_addresses_and_derived_columns() {
        let record = PurchaseRecord::from_transfer(&sample_transaction(), &sample_transfer());
        let row = PurchaseRow::from(&record);
        assert_eq!(
            row.settlement_address,
            "0xf344192b9146132fc0e997d1666dc1531bf8f7cd"
        );
        assert_eq!(row.transaction_type, "card_purchase");
        assert_eq!(row.hour, 14);
        assert_eq!(row.day_of_week, 5);
        assert!(row.is_weekend);
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2025, 6, 28).unwrap());
    }
}
