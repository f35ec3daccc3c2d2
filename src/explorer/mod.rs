pub mod etherscan;
pub mod receipts;
pub mod transactions;

#[cfg(test)]
pub(crate) mod testing;

use alloy_primitives::Address;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

use crate::metrics::{FetchStats, Metrics};
use crate::models::datasets::logs::RawLogEntry;
use crate::models::datasets::transactions::RpcTransactionData;
use crate::models::errors::ExplorerError;
use crate::utils::rate_limiter::Throttle;

pub use etherscan::EtherscanClient;
pub use receipts::ReceiptFetcher;
pub use transactions::TransactionLister;

/// The two read-only queries the collector issues against a block explorer.
#[async_trait]
pub trait ExplorerApi: Send + Sync {
    /// Every transaction touching `address`, most recent first.
    async fn transaction_list(
        &self,
        address: &Address,
    ) -> Result<Vec<RpcTransactionData>, ExplorerError>;

    /// Log entries of a transaction receipt, or `None` when the explorer has no
    /// receipt for the hash (e.g. not indexed yet).
    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<Vec<RawLogEntry>>, ExplorerError>;
}

/// Shared plumbing for every explorer call: one throttle for the whole run,
/// outcome counters and optional metrics.
#[derive(Clone)]
pub struct ExplorerContext {
    pub api: Arc<dyn ExplorerApi>,
    pub throttle: Arc<Throttle>,
    pub stats: Arc<FetchStats>,
    pub metrics: Option<Arc<Metrics>>,
}

impl ExplorerContext {
    pub fn new(
        api: Arc<dyn ExplorerApi>,
        throttle: Arc<Throttle>,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            api,
            throttle,
            stats: Arc::new(FetchStats::default()),
            metrics,
        }
    }

    /// Issue a single request once the throttle grants it. Retries come back
    /// through here, so every attempt counts toward the periodic cooldowns.
    pub(crate) async fn call<T, Fut>(
        &self,
        method: &'static str,
        request: Fut,
    ) -> Result<T, ExplorerError>
    where
        Fut: Future<Output = Result<T, ExplorerError>>,
    {
        self.throttle.acquire().await;
        self.stats.record_call();

        let start = Instant::now();
        let result = request.await;

        if let Some(metrics) = &self.metrics {
            metrics.record_api_call(method, start.elapsed().as_secs_f64(), result.is_err());
        }
        if let Err(e) = &result {
            self.stats.record_error(e);
        }

        result
    }
}
