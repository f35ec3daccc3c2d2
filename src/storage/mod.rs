pub mod csv;

use anyhow::Result;
use std::path::PathBuf;

use crate::models::datasets::purchases::{Progress, PurchaseRecord};

pub use self::csv::CsvSink;

/// A persisted, self-contained snapshot of purchase records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub rows: usize,
}

/// Destination for checkpoint snapshots and the final dataset. Every call
/// writes a complete artifact; nothing is appended.
pub trait PurchaseSink: Send {
    fn write_checkpoint(&mut self, records: &[PurchaseRecord], progress: Progress)
    -> Result<Artifact>;

    fn export(&mut self, records: &[PurchaseRecord]) -> Result<Artifact>;
}
