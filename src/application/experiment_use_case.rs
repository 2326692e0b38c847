// ============================================================
// Layer 2 — ExperimentUseCase
// ============================================================
// Orchestrates one full hardware-aware training experiment:
//
//   Step 1: Validate config and prepare results dir  (Layer 6 - infra)
//   Step 2: Synthesize the shifted sine dataset      (Layer 4 - data)
//   Step 3: Build the analog RNN                     (Layer 5 - ml)
//   Step 4: Train for exactly `epochs` epochs        (Layer 5 - ml)
//   Step 5: Evaluate in inference mode               (Layer 5 - ml)
//   Step 6: Sweep conductance drift over time        (Layer 5 - ml)
//   Step 7: Render charts, save drift data           (Layer 6 - infra)

use std::path::PathBuf;

use anyhow::Result;
use burn::module::AutodiffModule;
use serde::{Deserialize, Serialize};

use crate::data::{batcher::SequenceBatcher, synth::SequenceDatasetBuilder};
use crate::domain::{
    drift::{ExperimentReport, DRIFT_TIMES},
    error::{self, ExperimentError},
    traits::ResultRenderer,
};
use crate::infra::{metrics::MetricsLogger, renderer::SvgRenderer, results::ResultsStore};
use crate::ml::{
    analog::{AnalogContext, AnalogTileConfig, NoiseSource},
    backend::{default_device, InnerBackend, TrainBackend},
    evaluator::{drift_sweep, evaluate},
    model::{AnalogRnnNetworkConfig, Direction, InputStage},
    recurrent::CellKind,
    trainer::train_loop,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob of one experiment run. Saved next to the results as
// run_config.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub seq_len:       usize,
    pub batch_size:    usize,
    pub epochs:        usize,
    pub lr:            f64,
    pub embed_size:    usize,
    pub hidden_size:   usize,
    pub num_layers:    usize,
    pub dropout:       f64,
    /// Upper bound of the uniform noise added to input and target
    pub noise:         f64,
    pub cell:          CellKind,
    pub embedding:     bool,
    pub bidirectional: bool,
    pub tile:          AnalogTileConfig,
    pub seed:          Option<u64>,
    pub results_dir:   PathBuf,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            seq_len:       501,
            batch_size:    5,
            epochs:        100,
            lr:            0.05,
            embed_size:    20,
            hidden_size:   50,
            num_layers:    1,
            dropout:       0.0,
            noise:         0.0,
            cell:          CellKind::Vanilla,
            embedding:     true,
            bidirectional: true,
            tile:          AnalogTileConfig::default(),
            seed:          None,
            results_dir:   PathBuf::from("results/RNN"),
        }
    }
}

impl TrainConfig {
    /// Scalar in, scalar out.
    pub const FEATURES: usize = 1;

    pub fn dataset_builder(&self) -> SequenceDatasetBuilder {
        SequenceDatasetBuilder::new(self.seq_len, self.batch_size).with_noise(self.noise)
    }

    pub fn model_config(&self) -> AnalogRnnNetworkConfig {
        let input_stage = if self.embedding {
            InputStage::Embedding { size: self.embed_size }
        } else {
            InputStage::Direct
        };
        let direction = if self.bidirectional {
            Direction::Bidirectional
        } else {
            Direction::Unidirectional
        };

        AnalogRnnNetworkConfig::new(Self::FEATURES, self.hidden_size, Self::FEATURES, self.cell)
            .with_input_stage(input_stage)
            .with_direction(direction)
            .with_num_layers(self.num_layers)
            .with_dropout(self.dropout)
    }

    pub fn validate(&self) -> error::Result<()> {
        self.dataset_builder().validate()?;

        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(ExperimentError::invalid_config(format!("lr must be positive, got {}", self.lr)));
        }
        if self.hidden_size == 0 {
            return Err(ExperimentError::invalid_config("hidden_size must be at least 1"));
        }
        if self.embedding && self.embed_size == 0 {
            return Err(ExperimentError::invalid_config("embed_size must be at least 1"));
        }
        if self.num_layers == 0 {
            return Err(ExperimentError::invalid_config("num_layers must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ExperimentError::invalid_config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        self.tile.validate()
    }
}

/// The report plus the files written for it.
#[derive(Debug)]
pub struct ExperimentRun {
    pub report:    ExperimentReport,
    pub artifacts: Vec<PathBuf>,
}

// ─── ExperimentUseCase ────────────────────────────────────────────────────────
pub struct ExperimentUseCase {
    config: TrainConfig,
}

impl ExperimentUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Run the experiment and draw SVG charts into the results dir.
    pub fn execute(&self) -> Result<ExperimentRun> {
        let renderer = SvgRenderer::new(&self.config.results_dir);
        self.execute_with(&renderer)
    }

    pub fn execute_with(&self, renderer: &dyn ResultRenderer) -> Result<ExperimentRun> {
        let cfg = &self.config;

        // ── Step 1: Validate and prepare the results directory ────────────────
        cfg.validate()?;
        let store = ResultsStore::new(&cfg.results_dir)?;
        let mut artifacts = vec![store.save_config(cfg)?];
        let metrics = MetricsLogger::new(store.dir())?;
        artifacts.push(metrics.csv_path().to_path_buf());

        // ── Step 2: Dataset ───────────────────────────────────────────────────
        // One seeded source feeds dataset noise, weight init and tile noise
        let mut noise = NoiseSource::from_seed(cfg.seed);
        let sample = cfg.dataset_builder().build(noise.rng())?;
        tracing::info!("Synthesized dataset with shape {:?}", sample.shape());

        // ── Step 3: Model ─────────────────────────────────────────────────────
        let device = default_device();
        let batch  = SequenceBatcher::<TrainBackend>::new(device.clone()).batch(&sample);
        let model  = cfg.model_config().init::<TrainBackend>(&device, &mut noise);
        tracing::info!(
            "Model ready: {:?} cell, hidden={}, embedding={}, bidirectional={}",
            cfg.cell, cfg.hidden_size, cfg.embedding, cfg.bidirectional,
        );

        // ── Step 4: Train ─────────────────────────────────────────────────────
        let mut ctx = AnalogContext::new(cfg.tile, noise);
        let outcome = train_loop(cfg, model, &batch, &mut ctx, Some(&metrics))?;

        // ── Step 5: Evaluate ──────────────────────────────────────────────────
        // valid() drops autodiff and disables dropout
        let mut model = outcome.model.valid();
        let batch     = SequenceBatcher::<InnerBackend>::new(device).batch(&sample);
        let baseline  = evaluate(&model, &batch, &mut ctx)?;

        // ── Step 6: Drift sweep ───────────────────────────────────────────────
        let drift = drift_sweep(&mut model, &batch, &DRIFT_TIMES, &mut ctx)?;

        // ── Step 7: Render and save ───────────────────────────────────────────
        let report = ExperimentReport {
            losses: outcome.losses,
            truth:  sample.target,
            baseline,
            drift,
        };
        artifacts.extend(renderer.render(&report)?);
        artifacts.push(store.save_drift(&report.truth, &report.drift)?);

        tracing::info!("Results written to '{}'", store.dir().display());
        Ok(ExperimentRun { report, artifacts })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Renderer that only counts calls.
    struct CountingRenderer {
        calls: Cell<usize>,
    }

    impl ResultRenderer for CountingRenderer {
        fn render(&self, _report: &ExperimentReport) -> Result<Vec<PathBuf>> {
            self.calls.set(self.calls.get() + 1);
            Ok(Vec::new())
        }
    }

    fn small_config(dir: &std::path::Path) -> TrainConfig {
        TrainConfig {
            seq_len:     41,
            batch_size:  2,
            epochs:      2,
            embed_size:  3,
            hidden_size: 4,
            seed:        Some(3),
            results_dir: dir.to_path_buf(),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_defaults_match_reference_experiment() {
        let cfg = TrainConfig::default();
        assert_eq!((cfg.seq_len, cfg.batch_size, cfg.epochs), (501, 5, 100));
        assert_eq!((cfg.embed_size, cfg.hidden_size, cfg.num_layers), (20, 50, 1));
        assert_eq!(cfg.lr, 0.05);
        assert!(cfg.embedding && cfg.bidirectional);
        assert_eq!(cfg.results_dir, PathBuf::from("results/RNN"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_model_config_follows_flags() {
        let cfg = TrainConfig { embedding: false, bidirectional: false, ..TrainConfig::default() };
        let net = cfg.model_config();
        assert_eq!(net.input_stage, InputStage::Direct);
        assert_eq!(net.direction, Direction::Unidirectional);

        let net = TrainConfig::default().model_config();
        assert_eq!(net.input_stage, InputStage::Embedding { size: 20 });
        assert_eq!(net.direction, Direction::Bidirectional);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = TrainConfig { seq_len: 1, ..TrainConfig::default() };
        assert_eq!(cfg.validate(), Err(ExperimentError::InvalidSequenceLength { seq_len: 1 }));

        let cfg = TrainConfig { lr: 0.0, ..TrainConfig::default() };
        assert!(matches!(cfg.validate(), Err(ExperimentError::InvalidConfig { .. })));

        let cfg = TrainConfig { dropout: 1.0, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg = TrainConfig { seed: Some(9), cell: CellKind::Gru, ..TrainConfig::default() };
        let json = serde_json::to_string(&cfg).unwrap();
        assert_eq!(serde_json::from_str::<TrainConfig>(&json).unwrap(), cfg);
    }

    #[test]
    fn test_invalid_config_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { seq_len: 0, ..small_config(&dir.path().join("out")) };
        assert!(ExperimentUseCase::new(cfg).execute().is_err());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_end_to_end_run() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = CountingRenderer { calls: Cell::new(0) };
        let run = ExperimentUseCase::new(small_config(dir.path()))
            .execute_with(&renderer)
            .unwrap();

        assert_eq!(renderer.calls.get(), 1);
        assert_eq!(run.report.losses.len(), 2);
        assert_eq!(run.report.truth.shape(), [40, 2, 1]);
        assert_eq!(run.report.baseline.prediction.shape(), [40, 2, 1]);
        assert_eq!(run.report.drift.len(), DRIFT_TIMES.len());
        for name in ["run_config.json", "metrics.csv", "drift.csv"] {
            assert!(dir.path().join(name).is_file(), "{name} missing");
        }
    }

    #[test]
    fn test_svg_run_writes_charts() {
        let dir = tempfile::tempdir().unwrap();
        let run = ExperimentUseCase::new(small_config(dir.path())).execute().unwrap();
        for name in ["train_perplexity.svg", "test.svg", "drift.svg"] {
            assert!(run.artifacts.contains(&dir.path().join(name)));
        }
    }
}
