use alloy_primitives::Address;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::collector::decoder::TRANSFER_TOPIC;
use crate::explorer::ExplorerApi;
use crate::models::datasets::logs::RawLogEntry;
use crate::models::datasets::transactions::RpcTransactionData;
use crate::models::errors::ExplorerError;

type ReceiptResponse = Result<Option<Vec<RawLogEntry>>, ExplorerError>;

/// Scripted explorer. The last scripted receipt for a hash repeats, so a
/// transaction can be fetched by discovery and again by the main pass.
/// Unscripted receipts come back empty; an exhausted list script returns no
/// transactions.
#[derive(Default)]
pub(crate) struct FakeExplorer {
    listings: Mutex<VecDeque<Result<Vec<RpcTransactionData>, ExplorerError>>>,
    receipts: Mutex<HashMap<String, VecDeque<ReceiptResponse>>>,
    pub list_calls: AtomicUsize,
    pub receipt_calls: AtomicUsize,
}

impl FakeExplorer {
    pub fn push_listing(&self, response: Result<Vec<RpcTransactionData>, ExplorerError>) {
        self.listings.lock().unwrap().push_back(response);
    }

    pub fn push_receipt(&self, tx_hash: &str, response: ReceiptResponse) {
        self.receipts
            .lock()
            .unwrap()
            .entry(tx_hash.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn receipt_calls(&self) -> usize {
        self.receipt_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExplorerApi for FakeExplorer {
    async fn transaction_list(
        &self,
        _address: &Address,
    ) -> Result<Vec<RpcTransactionData>, ExplorerError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.listings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> ReceiptResponse {
        self.receipt_calls.fetch_add(1, Ordering::SeqCst);
        self.receipts
            .lock()
            .unwrap()
            .get_mut(tx_hash)
            .and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
            .unwrap_or_else(|| Ok(Some(Vec::new())))
    }
}

pub(crate) fn pad_address(address: &Address) -> String {
    format!("0x{:0>64}", crate::utils::strip_hex_prefix(&format!("{address:#x}")))
}

pub(crate) fn transfer_log(token: Address, from: Address, to: Address, amount: u64) -> RawLogEntry {
    RawLogEntry {
        address: format!("{token:#x}"),
        topics: vec![
            TRANSFER_TOPIC.to_string(),
            pad_address(&from),
            pad_address(&to),
        ],
        data: format!("0x{amount:064x}"),
    }
}

pub(crate) fn rpc_transaction(hash: &str, timestamp: u64) -> RpcTransactionData {
    RpcTransactionData {
        hash: hash.to_string(),
        time_stamp: timestamp.to_string(),
        from: "0x1111111111111111111111111111111111111111".to_string(),
        to: "0x9dd23a4a0845f10d65d293776b792af1131c7b30".to_string(),
        block_number: "20000000".to_string(),
        gas_used: "51234".to_string(),
        gas_price: "70000000".to_string(),
        input: "0x".to_string(),
    }
}
