use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

////////////////////////////////////// RPC Data ////////////////////////////////////////
// One log entry from an eth_getTransactionReceipt response, kept exactly as received
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawLogEntry {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
}

impl RawLogEntry {
    pub fn new(address: &str, topics: &[&str], data: &str) -> Self {
        Self {
            address: address.to_string(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            data: data.to_string(),
        }
    }
}

/////////////////////////////////// Decoded Data ///////////////////////////////////////
#[derive(Debug, Clone, PartialEq)]
pub struct TransferEvent {
    pub from_address: Address,
    pub to_address: Address,
    pub token_address: Address,
    pub raw_amount: U256,
    pub amount: f64,
    pub symbol: String,
    pub decimals: u8,
}
