use alloy_primitives::{Address, U256};

use crate::collector::tokens::TokenRegistry;
use crate::models::datasets::logs::{RawLogEntry, TransferEvent};
use crate::utils::strip_hex_prefix;

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

const ADDRESS_HEX_LEN: usize = 40;

pub struct EventDecoder {
    registry: TokenRegistry,
}

impl EventDecoder {
    pub fn new(registry: TokenRegistry) -> Self {
        Self { registry }
    }

    /// Decode every transfer event in one receipt, in log order. Entries that
    /// are not transfers, or that cannot be parsed, are skipped.
    pub fn decode(&self, logs: &[RawLogEntry]) -> Vec<TransferEvent> {
        logs.iter()
            .filter_map(|log| self.decode_entry(log))
            .collect()
    }

    pub fn decode_entry(&self, log: &RawLogEntry) -> Option<TransferEvent> {
        if !is_transfer(log) || log.topics.len() < 3 {
            return None;
        }

        let from_address = topic_to_address(&log.topics[1])?;
        let to_address = topic_to_address(&log.topics[2])?;
        let token_address = log.address.parse::<Address>().ok()?;

        let raw_amount = parse_amount(&log.data);
        let token = self.registry.resolve(&token_address);
        let amount = if raw_amount > U256::ZERO {
            to_human_amount(raw_amount, token.decimals)
        } else {
            0.0
        };

        Some(TransferEvent {
            from_address,
            to_address,
            token_address,
            raw_amount,
            amount,
            symbol: token.symbol,
            decimals: token.decimals,
        })
    }
}

fn is_transfer(log: &RawLogEntry) -> bool {
    log.topics
        .first()
        .is_some_and(|topic| topic.eq_ignore_ascii_case(TRANSFER_TOPIC))
}

/// Indexed addresses are left-padded to 32 bytes; the low-order 20 bytes are
/// the address.
fn topic_to_address(topic: &str) -> Option<Address> {
    let hex = strip_hex_prefix(topic);
    let start = hex.len().checked_sub(ADDRESS_HEX_LEN)?;
    hex.get(start..)?.parse::<Address>().ok()
}

/// Big-endian hex integer. Empty or undecodable data counts as zero.
fn parse_amount(data: &str) -> U256 {
    let hex = strip_hex_prefix(data.trim());
    if hex.is_empty() {
        return U256::ZERO;
    }
    U256::from_str_radix(hex, 16).unwrap_or(U256::ZERO)
}

fn to_human_amount(raw_amount: U256, decimals: u8) -> f64 {
    raw_amount.to_string().parse::<f64>().unwrap_or(0.0) / 10f64.powi(i32::from(decimals))
}
