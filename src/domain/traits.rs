// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The experiment hands its results to a renderer without
// knowing how images are produced. The plotters-based
// implementation lives in the infra layer; tests can swap in
// a recorder that just counts calls.

use std::path::PathBuf;

use anyhow::Result;
use crate::domain::drift::ExperimentReport;

// ─── ResultRenderer ───────────────────────────────────────────────────────────
/// Anything that can turn an experiment report into image artifacts.
///
/// Implementations:
///   - SvgRenderer → three SVG charts via plotters
pub trait ResultRenderer {
    /// Render the training curve, the baseline test and the drift
    /// sweep. Returns the paths written, in that order.
    fn render(&self, report: &ExperimentReport) -> Result<Vec<PathBuf>>;
}
