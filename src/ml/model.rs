use burn::{
    nn::{
        loss::{MseLoss, Reduction},
        Dropout, DropoutConfig,
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::data::batcher::SequenceBatch;
use crate::ml::analog::{AnalogContext, AnalogInference, AnalogLinear, AnalogLinearConfig, NoiseSource};
use crate::ml::recurrent::{AnalogRnn, AnalogRnnConfig, CellKind, RnnState};

/// What feeds the recurrent layer: a learned analog projection of
/// the raw input, or the raw input itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputStage {
    Embedding { size: usize },
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Unidirectional,
    Bidirectional,
}

impl Direction {
    pub fn count(self) -> usize {
        match self {
            Direction::Unidirectional => 1,
            Direction::Bidirectional => 2,
        }
    }
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
/// One builder for all four topologies:
/// {embedding, direct} × {unidirectional, bidirectional}.
#[derive(Config, Debug)]
pub struct AnalogRnnNetworkConfig {
    pub input_size:  usize,
    pub hidden_size: usize,
    pub output_size: usize,
    pub cell:        CellKind,
    #[config(default = "InputStage::Direct")]
    pub input_stage: InputStage,
    #[config(default = "Direction::Unidirectional")]
    pub direction:   Direction,
    #[config(default = 1)]
    pub num_layers:  usize,
    #[config(default = 0.0)]
    pub dropout:     f64,
}

impl AnalogRnnNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device, noise: &mut NoiseSource) -> AnalogRnnNetwork<B> {
        let (embedding, rnn_input) = match self.input_stage {
            InputStage::Embedding { size } => (
                Some(AnalogLinearConfig::new(self.input_size, size).init(device, noise)),
                size,
            ),
            InputStage::Direct => (None, self.input_size),
        };

        let rnn = AnalogRnnConfig::new(rnn_input, self.hidden_size, self.cell)
            .with_num_layers(self.num_layers)
            .with_bidirectional(self.direction == Direction::Bidirectional)
            .with_dropout(self.dropout)
            .init(device, noise);

        let decoder = AnalogLinearConfig::new(self.direction.count() * self.hidden_size, self.output_size)
            .init(device, noise);

        AnalogRnnNetwork {
            embedding,
            rnn,
            decoder,
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// optional embedding → dropout → analog RNN → decoder → dropout
#[derive(Module, Debug)]
pub struct AnalogRnnNetwork<B: Backend> {
    pub embedding: Option<AnalogLinear<B>>,
    pub rnn:       AnalogRnn<B>,
    pub decoder:   AnalogLinear<B>,
    pub dropout:   Dropout,
}

impl<B: Backend> AnalogRnnNetwork<B> {
    /// input: [time, batch, input_size] → ([time, batch, output_size], final states)
    pub fn forward(
        &self,
        input: Tensor<B, 3>,
        state: Option<RnnState<B>>,
        ctx:   &mut AnalogContext,
    ) -> (Tensor<B, 3>, RnnState<B>) {
        let x = match &self.embedding {
            Some(embedding) => self.dropout.forward(embedding.forward(input, ctx)),
            None => input,
        };
        let (out, state) = self.rnn.forward(x, state, ctx);
        let out = self.dropout.forward(self.decoder.forward(out, ctx));
        (out, state)
    }

    /// Mean squared error of a zero-state forward pass over the batch.
    pub fn forward_loss(
        &self,
        batch: &SequenceBatch<B>,
        ctx:   &mut AnalogContext,
    ) -> (Tensor<B, 1>, Tensor<B, 3>) {
        let (prediction, _) = self.forward(batch.input.clone(), None, ctx);
        let loss = MseLoss::new().forward(prediction.clone(), batch.target.clone(), Reduction::Mean);
        (loss, prediction)
    }

    pub fn directions(&self) -> usize { self.rnn.directions() }

    pub fn has_embedding(&self) -> bool { self.embedding.is_some() }

    fn tiles_mut(&mut self) -> Vec<&mut AnalogLinear<B>> {
        let mut tiles: Vec<&mut AnalogLinear<B>> = self.embedding.iter_mut().collect();
        tiles.extend(self.rnn.tiles_mut());
        tiles.push(&mut self.decoder);
        tiles
    }

    /// Number of analog tiles in the network
    pub fn tile_count(&mut self) -> usize { self.tiles_mut().len() }

    /// Clamp every tile's trained weights to `[-bound, bound]`.
    pub fn clip_weights(&mut self, bound: f64) {
        for tile in self.tiles_mut() {
            tile.clip_weights(bound);
        }
    }
}

impl<B: Backend> AnalogInference for AnalogRnnNetwork<B> {
    fn program_analog_weights(&mut self, ctx: &mut AnalogContext) {
        for tile in self.tiles_mut() {
            tile.program_analog_weights(ctx);
        }
    }

    fn drift_analog_weights(&mut self, t_inference: f64, ctx: &mut AnalogContext) {
        for tile in self.tiles_mut() {
            tile.drift_analog_weights(t_inference, ctx);
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::analog::AnalogTileConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn ctx() -> AnalogContext {
        AnalogContext::new(AnalogTileConfig::ideal(), NoiseSource::seeded(0))
    }

    fn network(stage: InputStage, direction: Direction) -> AnalogRnnNetwork<TestBackend> {
        AnalogRnnNetworkConfig::new(1, 6, 1, CellKind::Vanilla)
            .with_input_stage(stage)
            .with_direction(direction)
            .init(&Default::default(), &mut NoiseSource::seeded(1))
    }

    #[test]
    fn test_all_four_topologies() {
        let input: Tensor<TestBackend, 3> =
            NoiseSource::seeded(2).uniform([7, 3, 1], 0.0, 1.0, &Default::default());

        for stage in [InputStage::Embedding { size: 4 }, InputStage::Direct] {
            for direction in [Direction::Unidirectional, Direction::Bidirectional] {
                let mut net = network(stage, direction);
                let (out, state) = net.forward(input.clone(), None, &mut ctx());

                assert_eq!(out.dims(), [7, 3, 1]);
                assert_eq!(state.cells.len(), direction.count());
                assert_eq!(net.directions(), direction.count());
                assert_eq!(net.has_embedding(), stage != InputStage::Direct);
                // embedding + 2 per cell + decoder
                let expected = usize::from(net.has_embedding()) + 2 * direction.count() + 1;
                assert_eq!(net.tile_count(), expected);
            }
        }
    }

    #[test]
    fn test_decoder_width_follows_direction() {
        let net = network(InputStage::Direct, Direction::Bidirectional);
        assert_eq!(net.decoder.d_input(), 12);
        let net = network(InputStage::Direct, Direction::Unidirectional);
        assert_eq!(net.decoder.d_input(), 6);
    }

    #[test]
    fn test_embedding_width_feeds_rnn() {
        let net = network(InputStage::Embedding { size: 4 }, Direction::Unidirectional);
        assert_eq!(net.embedding.as_ref().unwrap().d_output(), 4);
        assert_eq!(net.rnn.layers[0].forward_cell.input.d_input(), 4);
    }

    #[test]
    fn test_loss_is_zero_for_perfect_prediction() {
        let net = network(InputStage::Direct, Direction::Unidirectional);
        let input: Tensor<TestBackend, 3> =
            NoiseSource::seeded(3).uniform([5, 2, 1], 0.0, 1.0, &Default::default());
        let mut c = ctx();
        let (target, _) = net.forward(input.clone(), None, &mut c);
        let batch = SequenceBatch { input, target };
        let (loss, _) = net.forward_loss(&batch, &mut c);
        let loss: f32 = loss.into_scalar().elem();
        assert!(loss.abs() < 1e-10);
    }

    #[test]
    fn test_clip_applies_to_every_tile() {
        let mut net = network(InputStage::Embedding { size: 4 }, Direction::Bidirectional);
        net.clip_weights(0.01);
        for tile in net.tiles_mut() {
            let max: f32 = tile.weight.val().abs().max().into_scalar().elem();
            assert!(max <= 0.01 + 1e-7);
        }
    }
}
