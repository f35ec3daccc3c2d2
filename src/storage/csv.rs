use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::models::datasets::purchases::{PURCHASE_COLUMNS, Progress, PurchaseRecord, PurchaseRow};
use crate::storage::{Artifact, PurchaseSink};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Writes each snapshot to its own timestamped CSV file under `output_dir`.
pub struct CsvSink {
    output_dir: PathBuf,
    prefix: String,
}

impl CsvSink {
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.into(),
        }
    }

    fn write(&self, file_name: String, records: &[PurchaseRecord]) -> Result<Artifact> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory {}", self.output_dir.display())
        })?;

        let path = self.output_dir.join(file_name);
        let mut writer = ::csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        // serde only emits the header alongside the first row
        if records.is_empty() {
            writer.write_record(PURCHASE_COLUMNS)?;
        }
        for record in records {
            writer.serialize(PurchaseRow::from(record))?;
        }
        writer.flush()?;

        Ok(Artifact {
            path,
            rows: records.len(),
        })
    }
}

impl PurchaseSink for CsvSink {
    fn write_checkpoint(
        &mut self,
        records: &[PurchaseRecord],
        progress: Progress,
    ) -> Result<Artifact> {
        let file_name = format!(
            "{}_preliminary_{}of{}_{}.csv",
            self.prefix,
            progress.processed,
            progress.total,
            Utc::now().format(TIMESTAMP_FORMAT)
        );
        let artifact = self.write(file_name, records)?;
        info!(
            "Checkpoint saved: {} ({} purchases)",
            artifact.path.display(),
            artifact.rows
        );
        Ok(artifact)
    }

    fn export(&mut self, records: &[PurchaseRecord]) -> Result<Artifact> {
        let file_name = format!(
            "{}_complete_spending_{}.csv",
            self.prefix,
            Utc::now().format(TIMESTAMP_FORMAT)
        );
        let artifact = self.write(file_name, records)?;
        info!(
            "Data saved to {} ({} purchases)",
            artifact.path.display(),
            artifact.rows
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use chrono::DateTime;

    fn record(hash: &str) -> PurchaseRecord {
        PurchaseRecord {
            transaction_hash: hash.to_string(),
            timestamp: DateTime::from_timestamp(1_751_119_500, 0).unwrap(),
            block_number: 20_000_000,
            user_wallet: Address::repeat_byte(0x22),
            settlement_address: Address::repeat_byte(0xf3),
            amount: 12.5,
            token_address: Address::repeat_byte(0x17),
            token_symbol: "USDC".to_string(),
            gas_used: 51_234,
            gas_price: 70_000_000,
        }
    }

    fn file_name(artifact: &Artifact) -> String {
        artifact
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_checkpoint_name_and_contents() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path().join("data"), "metamask_card");

        let artifact = sink
            .write_checkpoint(
                &[record("0x01"), record("0x02")],
                Progress {
                    processed: 50,
                    total: 120,
                },
            )
            .unwrap();

        assert_eq!(artifact.rows, 2);
        assert!(file_name(&artifact).starts_with("metamask_card_preliminary_50of120_"));
        assert!(file_name(&artifact).ends_with(".csv"));

        let contents = fs::read_to_string(&artifact.path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next().unwrap(), PURCHASE_COLUMNS.join(","));
        let first = lines.next().unwrap();
        assert!(first.starts_with("0x01,"));
        assert!(first.contains(",card_purchase,"));
        assert!(first.contains(&format!("{:#x}", Address::repeat_byte(0xf3))));
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn test_empty_checkpoint_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path(), "card");

        let artifact = sink
            .write_checkpoint(
                &[],
                Progress {
                    processed: 50,
                    total: 60,
                },
            )
            .unwrap();

        assert_eq!(artifact.rows, 0);
        let contents = fs::read_to_string(&artifact.path).unwrap();
        assert_eq!(contents.trim_end(), PURCHASE_COLUMNS.join(","));
    }

    #[test]
    fn test_export_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path(), "metamask_card");
        let artifact = sink.export(&[record("0x01")]).unwrap();
        assert!(file_name(&artifact).starts_with("metamask_card_complete_spending_"));
        assert_eq!(artifact.rows, 1);
    }
}
