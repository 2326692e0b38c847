// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing what an experiment produces:
// sequence arrays, samples, drift observations and errors.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Keeping tensors out of here means the dataset builder, the
// renderer and the metrics logger can all be unit tested
// without a backend.

// Dense [time, batch, channel] arrays and input/target pairs
pub mod sequence;

// Drift sweep checkpoints and observations
pub mod drift;

// Domain error taxonomy
pub mod error;

// Collaborator abstractions (renderer)
pub mod traits;
