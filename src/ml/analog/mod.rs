// ============================================================
// Layer 5 — Analog Tile Simulation
// ============================================================
// A small simulator for weights stored as conductances on an
// analog crossbar:
//
//   config.rs  — tile non-idealities and the PCM noise model
//                parameters (serde, validated)
//   context.rs — the seeded NoiseSource and the AnalogContext
//                carrying phase (training / inference)
//   pcm.rs     — programming noise, power-law drift and read
//                noise on conductance tensors
//   linear.rs  — AnalogLinear, the one primitive everything
//                else (embedding, recurrent cells, decoder) is
//                built from, and the AnalogInference trait
//
// During training a tile perturbs its weights on every forward
// pass; gradients still flow to the clean weights. For
// inference the weights are programmed once and then drifted
// to a given elapsed time.

pub mod config;
pub mod context;
pub mod linear;
pub mod pcm;

pub use config::{AnalogTileConfig, PcmNoiseModel};
pub use context::{AnalogContext, NoiseSource, Phase};
pub use linear::{AnalogInference, AnalogLinear, AnalogLinearConfig, ProgrammedTile};
