// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn framework specific code lives here and in data/batcher.
// The domain and infra layers only see SequenceArrays.
//
// What's in this layer:
//
//   analog/      — simulated analog crossbar tiles: noise source,
//                  tile config, PCM drift model, AnalogLinear
//
//   recurrent.rs — vanilla / LSTM / GRU cells built from analog
//                  projections, stacked and optionally
//                  bidirectional
//
//   model.rs     — the network factory: optional embedding,
//                  recurrent layer, decoder, dropout
//
//   optim.rs     — SGD with tile weight clipping after each step
//
//   trainer.rs   — full-batch training loop, one step per epoch
//
//   evaluator.rs — baseline evaluation and the drift sweep
//
//   backend.rs   — backend type aliases (ndarray or wgpu)
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Analog tile simulation
pub mod analog;

/// Backend and device selection
pub mod backend;

/// Inference-mode evaluation and conductance drift sweep
pub mod evaluator;

/// Four-topology analog RNN network
pub mod model;

/// SGD wrapper that clips tile weights
pub mod optim;

/// Analog recurrent cells and layers
pub mod recurrent;

/// Training loop
pub mod trainer;
