// ============================================================
// Layer 6 — Results Store
// ============================================================
// Owns the results directory of one run and the plain-text
// artifacts written next to the charts:
//
//   run_config.json — the resolved TrainConfig, pretty JSON
//   drift.csv       — truth and prediction per drift time
//
// drift.csv is in long format, one row per (elapsed, t, batch):
//   elapsed,t,batch,truth,prediction
//   0,0,0,0.500000,0.497012
//   ...
// Channel 0 only; the synthetic signal has one channel.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::drift::DriftObservation;
use crate::domain::sequence::SequenceArray;

pub struct ResultsStore {
    dir: PathBuf,
}

impl ResultsStore {
    /// Create the directory (and parents) if it doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create results directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save the run configuration as pretty JSON.
    pub fn save_config<T: Serialize>(&self, cfg: &T) -> Result<PathBuf> {
        let path = self.dir.join("run_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(path)
    }

    pub fn save_drift(&self, truth: &SequenceArray, drift: &[DriftObservation]) -> Result<PathBuf> {
        let path = self.dir.join("drift.csv");
        let file = fs::File::create(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;
        let mut w = BufWriter::new(file);

        writeln!(w, "elapsed,t,batch,truth,prediction")?;
        for obs in drift {
            let pred = &obs.prediction;
            for t in 0..pred.steps() {
                for b in 0..pred.batch_size() {
                    writeln!(
                        w,
                        "{},{},{},{:.6},{:.6}",
                        obs.elapsed, t, b, truth.get(t, b, 0), pred.get(t, b, 0),
                    )?;
                }
            }
        }
        w.flush()?;

        tracing::debug!("Saved {} drift observations to '{}'", drift.len(), path.display());
        Ok(path)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Cfg {
        epochs: usize,
        lr:     f64,
    }

    #[test]
    fn test_creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultsStore::new(dir.path().join("results/RNN")).unwrap();
        assert!(store.dir().is_dir());
    }

    #[test]
    fn test_config_is_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultsStore::new(dir.path()).unwrap();
        let cfg = Cfg { epochs: 100, lr: 0.05 };
        let path = store.save_config(&cfg).unwrap();

        let json = fs::read_to_string(path).unwrap();
        assert!(json.contains('\n'));
        assert_eq!(serde_json::from_str::<Cfg>(&json).unwrap(), cfg);
    }

    #[test]
    fn test_drift_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultsStore::new(dir.path()).unwrap();
        let truth = SequenceArray::new([2, 2, 1], vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        let drift = vec![
            DriftObservation::new(0.0, truth.clone()),
            DriftObservation::new(1e5, SequenceArray::zeros([2, 2, 1])),
        ];
        let path = store.save_drift(&truth, &drift).unwrap();

        let csv = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 1 + 2 * 4);
        assert_eq!(lines[2], "0,0,1,0.200000,0.200000");
        assert_eq!(lines[8], "100000,1,1,0.400000,0.000000");
    }
}
