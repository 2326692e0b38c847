// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between "a sequence length and a batch size" and
// tensors the model can consume:
//
//   SequenceDatasetBuilder  → phase-shifted periodic signal
//       │                     as [time, batch, 1] arrays
//       ▼
//   SequenceBatcher         → Burn tensors on the device
//
// The builder is framework-free so its shape and shift
// properties are tested without a backend.

/// Synthesises the next-step prediction dataset
pub mod synth;

/// Converts samples to tensors and model output back to arrays
pub mod batcher;
