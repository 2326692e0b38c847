// ============================================================
// Layer 4 — Synthetic Sequence Dataset
// ============================================================
// Builds the next-step prediction dataset from one periodic
// signal:
//
//   y(x) = sin(x) * cos(x / 2) + 0.5,   x in [0, 8π], L points
//
//   input  = y[0 .. L-1]
//   target = y[1 .. L]        (one step ahead)
//
// A batch of B examples is made by rolling both slices by
// 100 * i samples for element i. Every element is the same
// waveform at a different phase, which gives the recurrent
// layer correlated but distinct examples without a real
// dataset.
//
// Output layout is [time, batch, 1].

use std::f64::consts::PI;

use rand::Rng;

use crate::domain::error::{ExperimentError, Result};
use crate::domain::sequence::{SequenceArray, SequenceSample};

/// Samples by which consecutive batch elements are phase shifted
pub const SHIFT_PER_ELEMENT: usize = 100;

/// Width of the sampled x range
const X_SPAN: f64 = 8.0 * PI;

/// Builder for the phase-shifted sine/cosine dataset.
#[derive(Debug, Clone)]
pub struct SequenceDatasetBuilder {
    seq_len:    usize,
    batch_size: usize,
    noise:      f64,
}

impl SequenceDatasetBuilder {
    pub fn new(seq_len: usize, batch_size: usize) -> Self {
        Self { seq_len, batch_size, noise: 0.0 }
    }

    /// Magnitude of the uniform `[0, noise)` perturbation added to
    /// every input and target value.
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    /// Check the configuration without building anything.
    pub fn validate(&self) -> Result<()> {
        if self.seq_len <= 1 {
            return Err(ExperimentError::InvalidSequenceLength { seq_len: self.seq_len });
        }
        if self.batch_size == 0 {
            return Err(ExperimentError::InvalidBatchSize { batch_size: self.batch_size });
        }
        if !self.noise.is_finite() || self.noise < 0.0 {
            return Err(ExperimentError::invalid_config(format!(
                "noise must be a finite non-negative number, got {}",
                self.noise
            )));
        }
        Ok(())
    }

    /// The noise-free base signal sampled at `seq_len` points.
    fn base_signal(&self) -> Vec<f64> {
        let last = (self.seq_len - 1) as f64;
        (0..self.seq_len)
            .map(|k| {
                let x = X_SPAN * k as f64 / last;
                x.sin() * (0.5 * x).cos() + 0.5
            })
            .collect()
    }

    /// Build the (input, target) pair.
    ///
    /// Fails with `InvalidSequenceLength` when `seq_len <= 1` before
    /// any buffer is allocated.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<SequenceSample> {
        self.validate()?;

        let signal = self.base_signal();
        let steps  = self.seq_len - 1;
        let input_1d  = &signal[..steps];
        let target_1d = &signal[1..];

        let shape = [steps, self.batch_size, 1];
        let mut input  = SequenceArray::zeros(shape);
        let mut target = SequenceArray::zeros(shape);

        for b in 0..self.batch_size {
            // roll by `shift`: out[j] = in[(j - shift) mod steps]
            let shift = (SHIFT_PER_ELEMENT * b) % steps;
            for t in 0..steps {
                let src = (t + steps - shift) % steps;
                input.set(t, b, 0, (input_1d[src] + self.perturbation(rng)) as f32);
                target.set(t, b, 0, (target_1d[src] + self.perturbation(rng)) as f32);
            }
        }

        tracing::debug!(
            "Built dataset: {} steps x {} batch elements (noise={})",
            steps, self.batch_size, self.noise
        );
        Ok(SequenceSample { input, target })
    }

    fn perturbation<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.noise == 0.0 {
            0.0
        } else {
            self.noise * rng.gen::<f64>()
        }
    }
}
