use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::Deserialize;

////////////////////////////////////// RPC Data ////////////////////////////////////////
////////////////////////////// module=account&action=txlist ////////////////////////////
// Every numeric field arrives as a decimal string
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransactionData {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub time_stamp: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub block_number: String,
    #[serde(default)]
    pub gas_used: String,
    #[serde(default)]
    pub gas_price: String,
    #[serde(default)]
    pub input: String,
}

/////////////////////////////////// Parsed Data ////////////////////////////////////////
#[derive(Debug, Clone, PartialEq)]
pub struct ContractTransaction {
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub from_address: Address,
    pub to_address: Option<Address>, // None for contract creation
    pub block_number: u64,
    pub gas_used: u64,
    pub gas_price: u128,
    pub input: String,
}
