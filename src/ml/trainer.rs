// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full-batch hardware-aware training: every epoch is one
// forward pass over the whole sequence from the zero state,
// MSE against the shifted target, one backward pass and one
// AnalogSgd step (SGD update, then tile clipping).
//
// Key Burn 0.20 insight:
//   - Gradients are returned by loss.backward() per step, so
//     there is nothing to zero between epochs
//   - optim.step() takes the model by value and returns the
//     updated one
//
// No validation split, early stopping or LR schedule.

use anyhow::Result;
use burn::{optim::GradientsParams, prelude::*, tensor::backend::AutodiffBackend};

use crate::application::experiment_use_case::TrainConfig;
use crate::data::batcher::SequenceBatch;
use crate::domain::error::ExperimentError;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::analog::AnalogContext;
use crate::ml::model::AnalogRnnNetwork;
use crate::ml::optim::analog_sgd;

/// The trained model and the per-epoch training loss.
pub struct TrainingOutcome<B: AutodiffBackend> {
    pub model:  AnalogRnnNetwork<B>,
    pub losses: Vec<f64>,
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:     &TrainConfig,
    model:   AnalogRnnNetwork<B>,
    batch:   &SequenceBatch<B>,
    ctx:     &mut AnalogContext,
    metrics: Option<&MetricsLogger>,
) -> Result<TrainingOutcome<B>> {
    let mut model  = model;
    let mut optim  = analog_sgd::<B>(cfg.tile.clip_value);
    let mut losses = Vec::with_capacity(cfg.epochs);

    ctx.train();
    tracing::info!(
        "Training for {} epochs, lr={}, clip={:?}",
        cfg.epochs, cfg.lr, cfg.tile.clip_value,
    );

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 0..cfg.epochs {
        let (loss, _) = model.forward_loss(batch, ctx);
        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

        if !loss_val.is_finite() {
            return Err(ExperimentError::NonFiniteLoss { epoch, loss: loss_val }.into());
        }

        // Backward pass + SGD update + clipping
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step(cfg.lr, model, grads);

        let perplexity = loss_val.exp();
        tracing::info!("Epoch = {}: Train Perplexity = {:.6}", epoch, perplexity);

        if let Some(logger) = metrics {
            logger.log(&EpochMetrics { epoch, loss: loss_val, perplexity })?;
        }
        losses.push(loss_val);
    }

    tracing::info!("Training complete!");
    Ok(TrainingOutcome { model, losses })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{batcher::SequenceBatcher, synth::SequenceDatasetBuilder};
    use crate::ml::analog::{AnalogTileConfig, NoiseSource};
    use crate::ml::model::AnalogRnnNetworkConfig;
    use crate::ml::recurrent::CellKind;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn small_config(epochs: usize) -> TrainConfig {
        TrainConfig {
            seq_len:     41,
            batch_size:  2,
            epochs,
            hidden_size: 6,
            embed_size:  3,
            ..TrainConfig::default()
        }
    }

    fn setup(
        cfg: &TrainConfig,
    ) -> (AnalogRnnNetwork<TestBackend>, SequenceBatch<TestBackend>, AnalogContext) {
        let device = Default::default();
        let mut noise = NoiseSource::seeded(7);
        let sample = SequenceDatasetBuilder::new(cfg.seq_len, cfg.batch_size)
            .build(noise.rng())
            .unwrap();
        let batch = SequenceBatcher::<TestBackend>::new(Default::default()).batch(&sample);
        let model = cfg.model_config().init(&device, &mut noise);
        (model, batch, AnalogContext::new(cfg.tile, noise))
    }

    #[test]
    fn test_records_one_finite_loss_per_epoch() {
        let cfg = small_config(3);
        let (model, batch, mut ctx) = setup(&cfg);
        let outcome = train_loop(&cfg, model, &batch, &mut ctx, None).unwrap();
        assert_eq!(outcome.losses.len(), 3);
        assert!(outcome.losses.iter().all(|l| l.is_finite() && *l >= 0.0));
    }

    #[test]
    fn test_zero_epochs_returns_untouched_model() {
        let cfg = small_config(0);
        let (model, batch, mut ctx) = setup(&cfg);
        let before = model.decoder.weight.val().into_data().to_vec::<f32>().unwrap();
        let outcome = train_loop(&cfg, model, &batch, &mut ctx, None).unwrap();
        assert!(outcome.losses.is_empty());
        let after = outcome.model.decoder.weight.val().into_data().to_vec::<f32>().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_ideal_training_reduces_loss() {
        let cfg = TrainConfig {
            tile: AnalogTileConfig::ideal(),
            cell: CellKind::Lstm,
            ..small_config(30)
        };
        let (model, batch, mut ctx) = setup(&cfg);
        let outcome = train_loop(&cfg, model, &batch, &mut ctx, None).unwrap();
        let first = outcome.losses[0];
        let last  = *outcome.losses.last().unwrap();
        assert!(last < first, "loss went from {first} to {last}");
    }

    #[test]
    fn test_metrics_rows_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        let cfg = small_config(2);
        let (model, batch, mut ctx) = setup(&cfg);
        train_loop(&cfg, model, &batch, &mut ctx, Some(&logger)).unwrap();

        let csv = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_network_config_is_built_from_train_config() {
        let cfg = small_config(1);
        let net: AnalogRnnNetworkConfig = cfg.model_config();
        assert_eq!(net.hidden_size, 6);
        assert_eq!(net.cell, CellKind::Vanilla);
    }
}
