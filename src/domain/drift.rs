use serde::{Deserialize, Serialize};

use crate::domain::sequence::SequenceArray;

/// Elapsed times (seconds since programming) at which the trained
/// network is re-evaluated. Order matters: the sweep runs them in
/// this sequence against the same programmed tiles.
pub const DRIFT_TIMES: [f64; 5] = [0.0, 1.0, 20.0, 1000.0, 1e5];

/// Prediction of the network after drifting for `elapsed` seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftObservation {
    pub elapsed:    f64,
    pub prediction: SequenceArray,
}

impl DriftObservation {
    pub fn new(elapsed: f64, prediction: SequenceArray) -> Self {
        Self { elapsed, prediction }
    }

    /// Legend label used by the renderer, e.g. `t = 1000 s`.
    pub fn label(&self) -> String {
        format!("t = {} s", self.elapsed)
    }
}

/// Baseline inference result taken before any drift is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub prediction: SequenceArray,
    pub loss:       f64,
}

impl Evaluation {
    pub fn perplexity(&self) -> f64 { self.loss.exp() }
}

/// Everything one experiment run produces, handed to the renderer.
#[derive(Debug, Clone)]
pub struct ExperimentReport {
    /// One MSE value per completed epoch, in order
    pub losses:   Vec<f64>,
    pub truth:    SequenceArray,
    pub baseline: Evaluation,
    pub drift:    Vec<DriftObservation>,
}
