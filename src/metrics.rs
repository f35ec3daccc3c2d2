use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info};

use axum::{Router, routing::get};
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, MeterProvider};
use opentelemetry_sdk::metrics::{MetricError, SdkMeterProvider};
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;

pub struct Metrics {
    registry: Arc<prometheus::Registry>,
    _provider: SdkMeterProvider,
    pub chain_name: String,

    // Collection metrics
    pub transactions_processed: Counter<u64>,
    pub purchases_found: Counter<u64>,
    pub checkpoints_written: Counter<u64>,

    // Explorer API metrics
    pub api_requests: Counter<u64>,
    pub api_errors: Counter<u64>,
    pub api_latency: Histogram<f64>,

    // Throttle metrics
    pub throttle_pauses: Counter<u64>,
}

impl Metrics {
    pub fn new(chain_name: String) -> Result<Self, MetricError> {
        // Create a new prometheus registry
        let registry = prometheus::Registry::new();

        // Configure OpenTelemetry to use this registry
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()?;

        // Set up a meter to create instruments
        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        let meter = provider.meter("collector_metrics");

        let transactions_processed = meter
            .u64_counter("collector_transactions_processed")
            .with_description("Total number of contract transactions decoded")
            .build();

        let purchases_found = meter
            .u64_counter("collector_purchases_found")
            .with_description("Transfers into a settlement address")
            .build();

        let checkpoints_written = meter
            .u64_counter("collector_checkpoints_written")
            .with_description("Number of checkpoint snapshots persisted")
            .build();

        let api_requests = meter
            .u64_counter("collector_api_requests")
            .with_description("Number of explorer API requests made")
            .build();

        let api_errors = meter
            .u64_counter("collector_api_errors")
            .with_description("Number of explorer API errors encountered")
            .build();

        let api_latency = meter
            .f64_histogram("collector_api_latency")
            .with_description("Explorer API request latency")
            .with_boundaries(vec![0.05, 0.1, 0.2, 0.3, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0])
            .with_unit("s")
            .build();

        let throttle_pauses = meter
            .u64_counter("collector_throttle_pauses")
            .with_description("Extended cooldown pauses taken by the throttle")
            .build();

        Ok(Self {
            registry: Arc::new(registry),
            _provider: provider,
            chain_name,
            transactions_processed,
            purchases_found,
            checkpoints_written,
            api_requests,
            api_errors,
            api_latency,
            throttle_pauses,
        })
    }

    pub fn record_api_call(&self, method: &'static str, latency_secs: f64, failed: bool) {
        let labels = [
            KeyValue::new("chain", self.chain_name.clone()),
            KeyValue::new("method", method),
        ];
        self.api_requests.add(1, &labels);
        self.api_latency.record(latency_secs, &labels);
        if failed {
            self.api_errors.add(1, &labels);
        }
    }

    pub fn chain_labels(&self) -> [KeyValue; 1] {
        [KeyValue::new("chain", self.chain_name.clone())]
    }

    pub async fn start_metrics_server(&self, addr: &str, port: u16) -> Result<()> {
        let addr = format!("{addr}:{port}").parse::<SocketAddr>()?;
        let registry = self.registry.clone();

        let app = Router::new().route("/metrics", get(move || metrics_handler(registry.clone())));

        // Determine the access URL based on the binding address. Only used for logging.
        let access_url = if addr.ip().to_string() == "0.0.0.0" {
            format!("http://localhost:{port}/metrics")
        } else {
            format!("http://{}:{port}/metrics", addr.ip())
        };

        info!(
            "Starting metrics server - binding to {} (accessible at {})",
            addr, access_url
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;

        // Spawn the server in a separate task
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Metrics server stopped: {}", e);
            }
        });

        Ok(())
    }
}

async fn metrics_handler(registry: Arc<prometheus::Registry>) -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Outcome counters for the fetch layer. Every degrade-to-empty path bumps one
/// of these so an empty dataset can be told apart from a run where every
/// request failed.
#[derive(Debug, Default)]
pub struct FetchStats {
    api_calls: AtomicU64,
    retries: AtomicU64,
    timeouts: AtomicU64,
    transport_failures: AtomicU64,
    api_rejections: AtomicU64,
    receipts_exhausted: AtomicU64,
    receipts_missing: AtomicU64,
    listings_failed: AtomicU64,
    malformed_transactions: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchStatsSnapshot {
    pub api_calls: u64,
    pub retries: u64,
    pub timeouts: u64,
    pub transport_failures: u64,
    pub api_rejections: u64,
    pub receipts_exhausted: u64,
    pub receipts_missing: u64,
    pub listings_failed: u64,
    pub malformed_transactions: u64,
}

impl FetchStats {
    pub fn record_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, error: &crate::models::errors::ExplorerError) {
        use crate::models::errors::ExplorerError;
        let counter = match error {
            ExplorerError::Timeout(_) => &self.timeouts,
            ExplorerError::Transport(_) | ExplorerError::Decode(_) => &self.transport_failures,
            ExplorerError::Api { .. } => &self.api_rejections,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_receipt_exhausted(&self) {
        self.receipts_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_receipt_missing(&self) {
        self.receipts_missing.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_listing_failed(&self) {
        self.listings_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed_transactions(&self, count: u64) {
        self.malformed_transactions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FetchStatsSnapshot {
        FetchStatsSnapshot {
            api_calls: self.api_calls.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            api_rejections: self.api_rejections.load(Ordering::Relaxed),
            receipts_exhausted: self.receipts_exhausted.load(Ordering::Relaxed),
            receipts_missing: self.receipts_missing.load(Ordering::Relaxed),
            listings_failed: self.listings_failed.load(Ordering::Relaxed),
            malformed_transactions: self.malformed_transactions.load(Ordering::Relaxed),
        }
    }
}
