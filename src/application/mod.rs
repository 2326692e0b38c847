// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (running an experiment or exporting data).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination

// The full train → evaluate → drift → render workflow
pub mod experiment_use_case;

// Synthetic dataset export
pub mod dataset_use_case;
