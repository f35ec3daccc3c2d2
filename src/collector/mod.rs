pub mod decision;
pub mod decoder;
pub mod discovery;
pub mod tokens;

use alloy_primitives::Address;
use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::collector::decision::ContinueDecision;
use crate::collector::decoder::EventDecoder;
use crate::collector::discovery::{DiscoveryCandidate, SettlementDiscovery, SettlementSet};
use crate::collector::tokens::TokenRegistry;
use crate::explorer::{ExplorerContext, ReceiptFetcher, TransactionLister};
use crate::metrics::{FetchStatsSnapshot, Metrics};
use crate::models::common::{CollectionConfig, Config};
use crate::models::datasets::purchases::{Progress, PurchaseRecord};
use crate::models::datasets::transactions::ContractTransaction;
use crate::storage::{Artifact, PurchaseSink};
use crate::utils::format_address;

/// Summary of a collection run, attached to every outcome.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub total_transactions: usize,
    pub processed_transactions: usize,
    pub settlement_addresses: usize,
    pub discovered_addresses: Vec<Address>,
    pub candidates: Vec<DiscoveryCandidate>,
    pub api_calls: u64,
    pub checkpoints_written: usize,
    pub checkpoint_failures: usize,
    pub elapsed_secs: f64,
    pub fetch_stats: FetchStatsSnapshot,
}

#[derive(Debug)]
pub enum CollectionOutcome {
    /// Purchases were found, deduplicated and exported.
    Completed {
        artifact: Artifact,
        records: Vec<PurchaseRecord>,
        report: RunReport,
    },
    /// The run finished normally without a single purchase.
    NoPurchases { report: RunReport },
    /// The operator declined to continue after an empty first checkpoint.
    /// `checkpoint` is `None` only if writing it failed.
    Halted {
        checkpoint: Option<Artifact>,
        report: RunReport,
    },
}

impl CollectionOutcome {
    pub fn report(&self) -> &RunReport {
        match self {
            CollectionOutcome::Completed { report, .. }
            | CollectionOutcome::NoPurchases { report }
            | CollectionOutcome::Halted { report, .. } => report,
        }
    }
}

/// Counters that only live for one run.
#[derive(Default)]
struct RunProgress {
    total: usize,
    processed: usize,
    candidates: Vec<DiscoveryCandidate>,
    checkpoints_written: usize,
    checkpoint_failures: usize,
}

/// Drives one collection run: list, discover, decode and filter, finalize.
pub struct Collector {
    contract_address: Address,
    auto_discover: bool,
    settings: CollectionConfig,
    ctx: ExplorerContext,
    lister: TransactionLister,
    fetcher: ReceiptFetcher,
    decoder: EventDecoder,
    discovery: SettlementDiscovery,
    settlements: SettlementSet,
    metrics: Option<Arc<Metrics>>,
}

impl Collector {
    pub fn new(config: &Config, ctx: ExplorerContext) -> Self {
        let settings = config.collection.clone();
        Self {
            contract_address: config.contract_address,
            auto_discover: config.auto_discover,
            discovery: SettlementDiscovery::new(
                settings.discovery_min_occurrences,
                settings.discovery_max_new,
            ),
            settings,
            lister: TransactionLister::new(ctx.clone()),
            fetcher: ReceiptFetcher::new(ctx.clone()),
            decoder: EventDecoder::new(TokenRegistry::new(&config.tokens)),
            settlements: SettlementSet::new(config.known_settlements.clone()),
            metrics: ctx.metrics.clone(),
            ctx,
        }
    }

    /// Run to completion. Only the final export can fail; every fetch or
    /// decode problem has already degraded to an empty result.
    pub async fn run(
        mut self,
        sink: &mut dyn PurchaseSink,
        decision: &mut dyn ContinueDecision,
    ) -> Result<CollectionOutcome> {
        let start = Instant::now();
        let mut progress = RunProgress::default();

        // List
        let transactions = self.lister.list_all(&self.contract_address).await;
        progress.total = transactions.len();
        info!("Found {} contract transactions", progress.total);

        if transactions.is_empty() {
            warn!("No transactions found for the card contract");
            return Ok(CollectionOutcome::NoPurchases {
                report: self.report(&progress, start),
            });
        }

        // Discover
        if self.auto_discover {
            let sample_size = self.settings.discovery_sample_size.min(transactions.len());
            progress.candidates = self
                .discovery
                .discover(
                    &transactions[..sample_size],
                    &self.fetcher,
                    &self.decoder,
                    &mut self.settlements,
                )
                .await;
        }
        self.settlements.freeze();

        info!(
            "Tracking {} settlement addresses: {}",
            self.settlements.len(),
            self.settlements
                .iter()
                .map(format_address)
                .collect::<Vec<_>>()
                .join(", ")
        );
        if self.settlements.is_empty() {
            warn!("No settlement addresses to match against, no purchases can be found");
        }

        // Decode & filter
        info!(
            "Processing {} transactions at {:.1} calls/second...",
            progress.total,
            self.ctx.throttle.max_calls_per_second()
        );

        let mut records: Vec<PurchaseRecord> = Vec::new();
        for tx in &transactions {
            let found = self.collect_purchases(tx, &mut records).await;
            progress.processed += 1;

            if let Some(metrics) = &self.metrics {
                metrics
                    .transactions_processed
                    .add(1, &metrics.chain_labels());
                if found > 0 {
                    metrics
                        .purchases_found
                        .add(found as u64, &metrics.chain_labels());
                }
            }

            if progress.processed % self.settings.progress_interval == 0 {
                log_progress(&progress, records.len(), start.elapsed());
            }

            if progress.processed % self.settings.checkpoint_interval != 0 {
                continue;
            }

            let snapshot = Progress {
                processed: progress.processed,
                total: progress.total,
            };
            let checkpoint = self.write_checkpoint(sink, &records, snapshot, &mut progress);

            let first_checkpoint = progress.processed == self.settings.checkpoint_interval;
            if first_checkpoint && records.is_empty() {
                warn!(
                    "No card purchases found in the first {} transactions",
                    progress.processed
                );
                if !decision.confirm_continue(snapshot) {
                    info!(
                        "Collection halted after {} of {} transactions",
                        progress.processed, progress.total
                    );
                    return Ok(CollectionOutcome::Halted {
                        checkpoint,
                        report: self.report(&progress, start),
                    });
                }
            }
        }

        // Finalize
        if records.is_empty() {
            info!("No card purchases found");
            return Ok(CollectionOutcome::NoPurchases {
                report: self.report(&progress, start),
            });
        }

        let found = records.len();
        let records = dedupe(records);
        if records.len() < found {
            info!("Removed {} duplicate purchases", found - records.len());
        }

        let artifact = sink.export(&records)?;
        info!(
            "Collection complete: {} purchases from {} transactions",
            records.len(),
            progress.processed
        );

        Ok(CollectionOutcome::Completed {
            artifact,
            records,
            report: self.report(&progress, start),
        })
    }

    /// Append the purchases carried by `tx` and return how many were found.
    async fn collect_purchases(
        &self,
        tx: &ContractTransaction,
        records: &mut Vec<PurchaseRecord>,
    ) -> usize {
        let logs = self.fetcher.fetch_receipt(&tx.hash).await;
        let before = records.len();
        records.extend(
            self.decoder
                .decode(&logs)
                .iter()
                .filter(|transfer| self.settlements.contains(&transfer.to_address))
                .map(|transfer| PurchaseRecord::from_transfer(tx, transfer)),
        );
        records.len() - before
    }

    fn write_checkpoint(
        &self,
        sink: &mut dyn PurchaseSink,
        records: &[PurchaseRecord],
        snapshot: Progress,
        progress: &mut RunProgress,
    ) -> Option<Artifact> {
        match sink.write_checkpoint(records, snapshot) {
            Ok(artifact) => {
                progress.checkpoints_written += 1;
                if let Some(metrics) = &self.metrics {
                    metrics.checkpoints_written.add(1, &metrics.chain_labels());
                }
                Some(artifact)
            }
            Err(e) => {
                error!(
                    "Failed to write checkpoint at {}/{}: {:#}",
                    snapshot.processed, snapshot.total, e
                );
                progress.checkpoint_failures += 1;
                None
            }
        }
    }

    fn report(&self, progress: &RunProgress, start: Instant) -> RunReport {
        RunReport {
            total_transactions: progress.total,
            processed_transactions: progress.processed,
            settlement_addresses: self.settlements.len(),
            discovered_addresses: self.settlements.discovered().to_vec(),
            candidates: progress.candidates.clone(),
            api_calls: self.ctx.throttle.call_count(),
            checkpoints_written: progress.checkpoints_written,
            checkpoint_failures: progress.checkpoint_failures,
            elapsed_secs: start.elapsed().as_secs_f64(),
            fetch_stats: self.ctx.stats.snapshot(),
        }
    }
}

/// Keep the first record for each (hash, settlement, token) key.
pub fn dedupe(records: Vec<PurchaseRecord>) -> Vec<PurchaseRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.key()))
        .collect()
}

fn log_progress(progress: &RunProgress, found: usize, elapsed: Duration) {
    let per_tx = elapsed.as_secs_f64() / progress.processed as f64;
    let remaining = progress.total.saturating_sub(progress.processed);
    info!(
        "Progress: {}/{} transactions ({:.1}%), {} purchases found, elapsed {:.0}s, ETA {:.0}s",
        progress.processed,
        progress.total,
        progress.processed as f64 / progress.total as f64 * 100.0,
        found,
        elapsed.as_secs_f64(),
        per_tx * remaining as f64
    );
}
