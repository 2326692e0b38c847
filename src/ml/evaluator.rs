// ============================================================
// Layer 5 — Evaluation and Drift Sweep
// ============================================================
// Runs on the inner (non-autodiff) backend: the caller hands in
// `model.valid()`, which also turns dropout off. The analog
// context is switched to inference here so training-only weight
// modifiers and drop-connect stop.

use anyhow::Result;
use burn::{
    nn::loss::{MseLoss, Reduction},
    prelude::*,
};

use crate::data::batcher::{to_array, SequenceBatch};
use crate::domain::drift::{DriftObservation, Evaluation};
use crate::ml::analog::{AnalogContext, AnalogInference};
use crate::ml::model::AnalogRnnNetwork;

/// Baseline prediction and MSE on `batch`, before any drift.
pub fn evaluate<B: Backend>(
    model: &AnalogRnnNetwork<B>,
    batch: &SequenceBatch<B>,
    ctx:   &mut AnalogContext,
) -> Result<Evaluation> {
    ctx.eval();
    let (prediction, _) = model.forward(batch.input.clone(), None, ctx);
    let loss: f64 = MseLoss::new()
        .forward(prediction.clone(), batch.target.clone(), Reduction::Mean)
        .into_scalar()
        .elem::<f64>();

    tracing::info!("Test Perplexity = {:.6}", loss.exp());
    Ok(Evaluation { prediction: to_array(prediction)?, loss })
}

/// Drift the programmed tiles to each elapsed time in order and
/// predict again. Every drift is relative to programming time.
pub fn drift_sweep<B: Backend>(
    model: &mut AnalogRnnNetwork<B>,
    batch: &SequenceBatch<B>,
    times: &[f64],
    ctx:   &mut AnalogContext,
) -> Result<Vec<DriftObservation>> {
    ctx.eval();
    let mut observations = Vec::with_capacity(times.len());

    for &t_inference in times {
        model.drift_analog_weights(t_inference, ctx);
        let (prediction, _) = model.forward(batch.input.clone(), None, ctx);
        tracing::debug!("Drifted to t = {} s", t_inference);
        observations.push(DriftObservation::new(t_inference, to_array(prediction)?));
    }
    Ok(observations)
}
