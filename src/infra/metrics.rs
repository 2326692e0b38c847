// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records the training loss to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:      zero-based epoch index
//   - loss:       full-batch MSE on the training sequence
//   - perplexity: exp(loss), the value plotted in
//                 train_perplexity.svg
//
// Output file: <results_dir>/metrics.csv
//
// Example CSV output:
//   epoch,loss,perplexity
//   0,0.142310,1.152930
//   1,0.120544,1.128110
//   ...
//
// The file is recreated at the start of every run so it always
// matches the plots next to it.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub loss:       f64,
    pub perplexity: f64,
}

impl EpochMetrics {
    pub fn from_loss(epoch: usize, loss: f64) -> Self {
        Self { epoch, loss, perplexity: loss.exp() }
    }
}

/// Appends epoch metrics to `metrics.csv`.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create `dir` if needed and start a fresh CSV with its header.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create results directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "epoch,loss,perplexity")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{},{:.6},{:.6}", m.epoch, m.loss, m.perplexity)?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
