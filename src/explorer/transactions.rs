use alloy_primitives::Address;
use chrono::DateTime;
use tracing::{info, warn};

use crate::explorer::ExplorerContext;
use crate::models::datasets::transactions::{ContractTransaction, RpcTransactionData};
use crate::models::errors::ExplorerError;
use crate::utils::retry::{RetryConfig, retry};
use crate::utils::{format_address, parse_decimal_u64};

const LIST_ATTEMPTS: u32 = 3;
const LIST_BASE_DELAY_MS: u64 = 1_000;

/// Lists every transaction touching a contract, most recent first. Failures
/// degrade to an empty list.
pub struct TransactionLister {
    ctx: ExplorerContext,
    retry_config: RetryConfig,
}

impl TransactionLister {
    pub fn new(ctx: ExplorerContext) -> Self {
        Self {
            ctx,
            retry_config: RetryConfig::doubling(LIST_ATTEMPTS, LIST_BASE_DELAY_MS),
        }
    }

    pub async fn list_all(&self, contract_address: &Address) -> Vec<ContractTransaction> {
        info!(
            "Fetching contract transactions for {} (rate limited)...",
            format_address(contract_address)
        );

        let result = retry(
            || {
                self.ctx
                    .call("txlist", self.ctx.api.transaction_list(contract_address))
            },
            &self.retry_config,
            "get_contract_transactions",
            |_| self.ctx.stats.record_retry(),
        )
        .await;

        let raw = match result {
            Ok(raw) => raw,
            Err(ExplorerError::Api { message }) => {
                warn!("API Error: {}", message);
                self.ctx.stats.record_listing_failed();
                return Vec::new();
            }
            Err(e) => {
                warn!("All retry attempts failed for contract transactions: {}", e);
                self.ctx.stats.record_listing_failed();
                return Vec::new();
            }
        };

        let received = raw.len();
        let transactions: Vec<ContractTransaction> =
            raw.into_iter().filter_map(parse_transaction).collect();

        let malformed = received - transactions.len();
        if malformed > 0 {
            warn!("Skipped {} malformed transaction entries", malformed);
            self.ctx.stats.record_malformed_transactions(malformed as u64);
        }

        transactions
    }
}

/// Hash, sender, timestamp and block are required; gas figures fall back to
/// zero. A non-empty but invalid `to` is treated as malformed.
pub(crate) fn parse_transaction(raw: RpcTransactionData) -> Option<ContractTransaction> {
    if raw.hash.is_empty() {
        return None;
    }

    let timestamp = parse_decimal_u64(&raw.time_stamp)
        .and_then(|ts| DateTime::from_timestamp(i64::try_from(ts).ok()?, 0))?;
    let block_number = parse_decimal_u64(&raw.block_number)?;
    let from_address = raw.from.parse::<Address>().ok()?;
    let to_address = if raw.to.is_empty() {
        None
    } else {
        Some(raw.to.parse::<Address>().ok()?)
    };

    Some(ContractTransaction {
        hash: raw.hash,
        timestamp,
        from_address,
        to_address,
        block_number,
        gas_used: parse_decimal_u64(&raw.gas_used).unwrap_or(0),
        gas_price: raw.gas_price.trim().parse::<u128>().unwrap_or(0),
        input: raw.input,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::testing::{FakeExplorer, rpc_transaction};
    use crate::models::common::ThrottleConfig;
    use crate::utils::rate_limiter::Throttle;
    use alloy_primitives::address;
    use std::sync::Arc;
    use tokio::time::{Duration, Instant};

    const CONTRACT: Address = address!("0x9dd23A4a0845f10d65D293776B792af1131c7B30");

    fn lister(api: Arc<FakeExplorer>) -> (TransactionLister, ExplorerContext) {
        let ctx = ExplorerContext::new(
            api,
            Arc::new(Throttle::new(&ThrottleConfig::default(), None)),
            None,
        );
        (TransactionLister::new(ctx.clone()), ctx)
    }

    #[test]
    fn test_parse_transaction_fields() {
        let tx = parse_transaction(rpc_transaction("0xabc", 1_751_119_500)).unwrap();
        assert_eq!(tx.hash, "0xabc");
        assert_eq!(tx.timestamp.timestamp(), 1_751_119_500);
        assert_eq!(tx.block_number, 20_000_000);
        assert_eq!(tx.gas_used, 51_234);
        assert_eq!(tx.gas_price, 70_000_000);
        assert_eq!(tx.to_address, Some(CONTRACT));
    }

    #[test]
    fn test_parse_transaction_rejects_missing_required_fields() {
        let mut raw = rpc_transaction("0xabc", 1);
        raw.block_number = "not-a-number".to_string();
        assert!(parse_transaction(raw).is_none());

        assert!(parse_transaction(rpc_transaction("", 1)).is_none());

        let mut raw = rpc_transaction("0xabc", 1);
        raw.to = String::new();
        raw.gas_used = String::new();
        let tx = parse_transaction(raw).unwrap();
        assert_eq!(tx.to_address, None);
        assert_eq!(tx.gas_used, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_preserves_order_and_skips_malformed() {
        let api = Arc::new(FakeExplorer::default());
        api.push_listing(Ok(vec![
            rpc_transaction("0x03", 3),
            rpc_transaction("", 2),
            rpc_transaction("0x01", 1),
        ]));

        let (lister, ctx) = lister(api.clone());
        let txs = lister.list_all(&CONTRACT).await;
        let hashes: Vec<_> = txs.iter().map(|tx| tx.hash.as_str()).collect();
        assert_eq!(hashes, vec!["0x03", "0x01"]);
        assert_eq!(ctx.stats.snapshot().malformed_transactions, 1);
        assert_eq!(ctx.throttle.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_rejection_returns_empty_without_retry() {
        let api = Arc::new(FakeExplorer::default());
        api.push_listing(Err(ExplorerError::Api {
            message: "NOTOK".to_string(),
        }));
        api.push_listing(Ok(vec![rpc_transaction("0x01", 1)]));

        let (lister, ctx) = lister(api.clone());
        assert!(lister.list_all(&CONTRACT).await.is_empty());
        assert_eq!(api.list_calls(), 1);

        let stats = ctx.stats.snapshot();
        assert_eq!(stats.api_rejections, 1);
        assert_eq!(stats.listings_failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_back_off_exponentially() {
        let api = Arc::new(FakeExplorer::default());
        api.push_listing(Err(ExplorerError::Timeout("connect".to_string())));
        api.push_listing(Err(ExplorerError::Timeout("read".to_string())));
        api.push_listing(Ok(vec![rpc_transaction("0x01", 1)]));

        let (lister, _ctx) = lister(api.clone());
        let start = Instant::now();
        let txs = lister.list_all(&CONTRACT).await;
        assert_eq!(txs.len(), 1);
        assert_eq!(api.list_calls(), 3);
        // 1s then 2s of backoff
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_return_empty() {
        let api = Arc::new(FakeExplorer::default());
        for _ in 0..3 {
            api.push_listing(Err(ExplorerError::Transport("reset".to_string())));
        }

        let (lister, ctx) = lister(api.clone());
        assert!(lister.list_all(&CONTRACT).await.is_empty());
        assert_eq!(api.list_calls(), 3);
        assert_eq!(ctx.stats.snapshot().listings_failed, 1);
    }
}
