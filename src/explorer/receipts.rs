use tracing::{debug, warn};

use crate::explorer::ExplorerContext;
use crate::models::datasets::logs::RawLogEntry;
use crate::utils::retry::{RetryConfig, retry};

const RECEIPT_ATTEMPTS: u32 = 3;
const RECEIPT_RETRY_DELAY_MS: u64 = 1_000;

/// Fetches transaction receipts. Never fails: a receipt that cannot be
/// retrieved is reported as having no logs.
pub struct ReceiptFetcher {
    ctx: ExplorerContext,
    retry_config: RetryConfig,
}

impl ReceiptFetcher {
    pub fn new(ctx: ExplorerContext) -> Self {
        Self {
            ctx,
            retry_config: RetryConfig::fixed(RECEIPT_ATTEMPTS, RECEIPT_RETRY_DELAY_MS),
        }
    }

    pub async fn fetch_receipt(&self, tx_hash: &str) -> Vec<RawLogEntry> {
        let result = retry(
            || {
                self.ctx.call(
                    "eth_getTransactionReceipt",
                    self.ctx.api.transaction_receipt(tx_hash),
                )
            },
            &self.retry_config,
            "get_transaction_receipt",
            |_| self.ctx.stats.record_retry(),
        )
        .await;

        match result {
            Ok(Some(logs)) => logs,
            Ok(None) => {
                debug!("No receipt for {}", tx_hash);
                self.ctx.stats.record_receipt_missing();
                Vec::new()
            }
            Err(e) => {
                warn!(
                    "All retry attempts failed for {}, returning empty list: {}",
                    tx_hash, e
                );
                self.ctx.stats.record_receipt_exhausted();
                Vec::new()
            }
        }
    }
}
