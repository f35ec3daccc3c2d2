use anyhow::{Result, anyhow};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

use card_spend_indexer::collector::decision::ConsolePrompt;
use card_spend_indexer::collector::{CollectionOutcome, Collector};
use card_spend_indexer::explorer::{EtherscanClient, ExplorerContext};
use card_spend_indexer::metrics::Metrics;
use card_spend_indexer::storage::CsvSink;
use card_spend_indexer::utils::{format_address, load_config, rate_limiter::Throttle};

const DEFAULT_CONFIG_PATH: &str = "config.yml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    println!();
    info!("=========================== INITIALIZING ===========================");

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = match load_config(&config_path) {
        Ok(config) => {
            info!("Config loaded successfully from {}", config_path);
            config
        }
        Err(e) => {
            error!("Failed to load config: {}", e);
            return Err(anyhow!(e));
        }
    };

    info!("Chain: {} ({})", config.chain_name, config.chain_id);
    info!("Card contract: {}", format_address(&config.contract_address));

    // Initialize optional metrics
    let metrics = if config.metrics.enabled {
        let metrics = Arc::new(Metrics::new(config.chain_name.clone())?);
        metrics
            .start_metrics_server(&config.metrics.address, config.metrics.port)
            .await?;
        Some(metrics)
    } else {
        info!("Metrics are disabled");
        None
    };

    let client = EtherscanClient::new(&config.explorer, config.chain_id, &config.api_key)?;
    let throttle = Arc::new(Throttle::new(&config.throttle, metrics.clone()));
    let ctx = ExplorerContext::new(Arc::new(client), throttle, metrics);

    let mut sink = CsvSink::new(&config.output_dir, config.file_prefix.clone());
    let mut prompt = ConsolePrompt::stdin();

    println!();
    info!("======================== STARTING COLLECTION =======================");

    let outcome = Collector::new(&config, ctx)
        .run(&mut sink, &mut prompt)
        .await?;

    println!();
    info!("============================= SUMMARY ==============================");

    let report = outcome.report();
    info!(
        "Processed {}/{} transactions with {} API calls in {:.1}s",
        report.processed_transactions,
        report.total_transactions,
        report.api_calls,
        report.elapsed_secs
    );
    info!(
        "Settlement addresses tracked: {} ({} discovered)",
        report.settlement_addresses,
        report.discovered_addresses.len()
    );
    info!("Fetch stats: {}", serde_json::to_string(&report.fetch_stats)?);

    match &outcome {
        CollectionOutcome::Completed {
            artifact, records, ..
        } => {
            info!(
                "Collected {} card purchases into {}",
                records.len(),
                artifact.path.display()
            );
        }
        CollectionOutcome::NoPurchases { .. } => {
            info!("No card purchases found");
        }
        CollectionOutcome::Halted { checkpoint, .. } => match checkpoint {
            Some(artifact) => info!(
                "Collection halted, partial data in {}",
                artifact.path.display()
            ),
            None => info!("Collection halted before a checkpoint could be saved"),
        },
    }

    Ok(())
}
