// ============================================================
// Layer 2 — DatasetUseCase
// ============================================================
// Synthesizes the training sequence without training anything
// and writes it as CSV for inspection:
//
//   t,batch,input,target
//   0,0,0.500000,0.550120
//   ...

use std::{
    fs,
    io::{BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};

use crate::data::synth::SequenceDatasetBuilder;
use crate::domain::sequence::SequenceSample;
use crate::ml::analog::NoiseSource;

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub seq_len:    usize,
    pub batch_size: usize,
    pub noise:      f64,
    pub seed:       Option<u64>,
    pub out:        PathBuf,
}

pub struct DatasetUseCase {
    config: DatasetConfig,
}

impl DatasetUseCase {
    pub fn new(config: DatasetConfig) -> Self {
        Self { config }
    }

    /// Build the dataset and write it to `out`, creating parent
    /// directories as needed.
    pub fn execute(&self) -> Result<SequenceSample> {
        let cfg = &self.config;
        let sample = SequenceDatasetBuilder::new(cfg.seq_len, cfg.batch_size)
            .with_noise(cfg.noise)
            .build(NoiseSource::from_seed(cfg.seed).rng())?;

        if let Some(parent) = cfg.out.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
        }
        let file = fs::File::create(&cfg.out)
            .with_context(|| format!("Cannot create '{}'", cfg.out.display()))?;
        let mut w = BufWriter::new(file);

        writeln!(w, "t,batch,input,target")?;
        let [steps, batch, _] = sample.shape();
        for t in 0..steps {
            for b in 0..batch {
                writeln!(
                    w,
                    "{},{},{:.6},{:.6}",
                    t, b, sample.input.get(t, b, 0), sample.target.get(t, b, 0),
                )?;
            }
        }
        w.flush()?;

        tracing::info!("Wrote {} rows to '{}'", steps * batch, cfg.out.display());
        Ok(sample)
    }
}
