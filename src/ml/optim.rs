use std::marker::PhantomData;

use burn::{
    optim::{GradientsParams, Optimizer, SgdConfig},
    tensor::backend::AutodiffBackend,
};

use crate::ml::model::AnalogRnnNetwork;

/// Plain SGD whose post-step hook clips every analog tile.
///
/// The inner optimizer updates the weights; afterwards every tile's
/// trained weights are clamped to `[-clip, clip]`.
pub struct AnalogSgd<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<AnalogRnnNetwork<B>, B>,
{
    inner:    O,
    clip:     Option<f64>,
    _backend: PhantomData<B>,
}

impl<B, O> AnalogSgd<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<AnalogRnnNetwork<B>, B>,
{
    pub fn new(inner: O, clip: Option<f64>) -> Self {
        Self { inner, clip, _backend: PhantomData }
    }

    pub fn clip(&self) -> Option<f64> { self.clip }

    pub fn step(
        &mut self,
        lr:    f64,
        model: AnalogRnnNetwork<B>,
        grads: GradientsParams,
    ) -> AnalogRnnNetwork<B> {
        let mut model = self.inner.step(lr, model, grads);
        if let Some(bound) = self.clip {
            model.clip_weights(bound);
        }
        model
    }
}

/// Vanilla SGD (no momentum, no weight decay) with tile clipping.
pub fn analog_sgd<B: AutodiffBackend>(
    clip: Option<f64>,
) -> AnalogSgd<B, impl Optimizer<AnalogRnnNetwork<B>, B>> {
    AnalogSgd::new(SgdConfig::new().init::<B, AnalogRnnNetwork<B>>(), clip)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::SequenceBatch;
    use crate::ml::analog::{AnalogContext, AnalogTileConfig, NoiseSource};
    use crate::ml::model::{AnalogRnnNetworkConfig, Direction, InputStage};
    use crate::ml::recurrent::CellKind;
    use burn::{
        backend::{Autodiff, NdArray},
        prelude::*,
    };

    type TestBackend = Autodiff<NdArray>;

    fn setup() -> (AnalogRnnNetwork<TestBackend>, SequenceBatch<TestBackend>, AnalogContext) {
        let device = Default::default();
        let mut noise = NoiseSource::seeded(4);
        let model = AnalogRnnNetworkConfig::new(1, 8, 1, CellKind::Vanilla)
            .with_input_stage(InputStage::Embedding { size: 4 })
            .with_direction(Direction::Bidirectional)
            .init(&device, &mut noise);
        let input  = noise.uniform([6, 2, 1], 0.0, 1.0, &device);
        let target = noise.uniform([6, 2, 1], 0.0, 1.0, &device);
        let ctx = AnalogContext::new(AnalogTileConfig::default(), noise);
        (model, SequenceBatch { input, target }, ctx)
    }

    fn max_weight(model: &AnalogRnnNetwork<TestBackend>) -> f32 {
        let mut tiles = vec![&model.decoder];
        tiles.extend(model.embedding.iter());
        for layer in &model.rnn.layers {
            tiles.push(&layer.forward_cell.input);
            tiles.push(&layer.forward_cell.hidden);
        }
        tiles
            .iter()
            .map(|t| t.weight.val().abs().max().into_scalar().elem::<f32>())
            .fold(0.0, f32::max)
    }

    #[test]
    fn test_weights_stay_within_clip_after_step() {
        let (mut model, batch, mut ctx) = setup();
        // huge learning rate so an unclipped step would leave the bound
        let mut optim = analog_sgd::<TestBackend>(Some(0.2));
        for _ in 0..3 {
            let (loss, _) = model.forward_loss(&batch, &mut ctx);
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(100.0, model, grads);
            assert!(max_weight(&model) <= 0.2 + 1e-6);
        }
    }

    #[test]
    fn test_step_changes_weights() {
        let (model, batch, mut ctx) = setup();
        let before = model.decoder.weight.val().into_data().to_vec::<f32>().unwrap();
        let mut optim = analog_sgd::<TestBackend>(None);
        assert_eq!(optim.clip(), None);

        let (loss, _) = model.forward_loss(&batch, &mut ctx);
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        let model = optim.step(0.5, model, grads);
        let after = model.decoder.weight.val().into_data().to_vec::<f32>().unwrap();
        assert_ne!(after, before);
    }
}
