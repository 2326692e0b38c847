// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem:
//
//   metrics.rs  — per-epoch loss and perplexity CSV
//
//   results.rs  — the results directory, run_config.json and
//                 drift.csv
//
//   renderer.rs — SvgRenderer, the plotters implementation of
//                 the domain ResultRenderer trait
//
// Reference: Rust Book §9 (Error Handling with anyhow)

/// Training metrics CSV logger
pub mod metrics;

/// SVG charts for training, test and drift
pub mod renderer;

/// Results directory, config and drift data
pub mod results;
