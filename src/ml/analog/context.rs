use burn::{prelude::*, tensor::TensorData};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;

use super::config::AnalogTileConfig;

/// The one random source of an experiment run.
///
/// Weight initialisation, dataset noise and every analog noise draw
/// go through this so a seed makes a run reproducible.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    rng: StdRng,
}

impl NoiseSource {
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    /// Seeded when `seed` is given, otherwise drawn from OS entropy.
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Tensor of i.i.d. samples from `U[low, high)`.
    pub fn uniform<B: Backend, const D: usize>(
        &mut self,
        shape:  [usize; D],
        low:    f64,
        high:   f64,
        device: &B::Device,
    ) -> Tensor<B, D> {
        let n = shape.iter().product();
        let values: Vec<f32> = (0..n)
            .map(|_| self.rng.gen_range(low..high) as f32)
            .collect();
        Tensor::from_data(TensorData::new(values, shape), device)
    }

    /// Tensor of i.i.d. standard normal samples.
    pub fn standard_normal<B: Backend, const D: usize>(
        &mut self,
        shape:  [usize; D],
        device: &B::Device,
    ) -> Tensor<B, D> {
        let n = shape.iter().product();
        let values: Vec<f32> = (0..n)
            .map(|_| {
                let z: f32 = self.rng.sample(StandardNormal);
                z
            })
            .collect();
        Tensor::from_data(TensorData::new(values, shape), device)
    }

    /// Zero-mean Gaussian noise with the given std-dev.
    pub fn normal<B: Backend, const D: usize>(
        &mut self,
        shape:   [usize; D],
        std_dev: f64,
        device:  &B::Device,
    ) -> Tensor<B, D> {
        self.standard_normal(shape, device).mul_scalar(std_dev)
    }

    /// Mask of ones and zeros where each entry is zero with
    /// probability `drop_prob`.
    pub fn keep_mask<B: Backend, const D: usize>(
        &mut self,
        shape:     [usize; D],
        drop_prob: f64,
        device:    &B::Device,
    ) -> Tensor<B, D> {
        let n = shape.iter().product();
        let values: Vec<f32> = (0..n)
            .map(|_| if self.rng.gen::<f64>() < drop_prob { 0.0 } else { 1.0 })
            .collect();
        Tensor::from_data(TensorData::new(values, shape), device)
    }
}

/// Whether tiles behave as during hardware-aware training or as
/// deployed, programmed hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Training,
    Inference,
}

/// Everything an analog tile needs at forward time besides its
/// weights: the shared tile configuration, the phase, and the
/// random source.
///
/// Dropout and autodiff are switched by the backend
/// (`AutodiffModule::valid()`); this switches the analog-specific
/// training perturbations.
#[derive(Debug, Clone)]
pub struct AnalogContext {
    config: AnalogTileConfig,
    phase:  Phase,
    noise:  NoiseSource,
}

impl AnalogContext {
    pub fn new(config: AnalogTileConfig, noise: NoiseSource) -> Self {
        Self { config, phase: Phase::Training, noise }
    }

    pub fn train(&mut self) {
        self.phase = Phase::Training;
    }

    pub fn eval(&mut self) {
        self.phase = Phase::Inference;
    }

    pub fn phase(&self) -> Phase { self.phase }

    pub fn is_training(&self) -> bool { self.phase == Phase::Training }

    pub fn config(&self) -> &AnalogTileConfig { &self.config }

    pub fn noise(&mut self) -> &mut NoiseSource { &mut self.noise }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn values(t: Tensor<TestBackend, 2>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_same_seed_same_draws() {
        let device = Default::default();
        let a = NoiseSource::seeded(11).standard_normal::<TestBackend, 2>([4, 5], &device);
        let b = NoiseSource::seeded(11).standard_normal::<TestBackend, 2>([4, 5], &device);
        assert_eq!(values(a), values(b));
    }

    #[test]
    fn test_uniform_stays_in_range() {
        let device = Default::default();
        let t = NoiseSource::seeded(1).uniform::<TestBackend, 2>([10, 10], -0.5, 0.5, &device);
        assert!(values(t).iter().all(|v| (-0.5..0.5).contains(v)));
    }

    #[test]
    fn test_keep_mask_extremes() {
        let device = Default::default();
        let mut noise = NoiseSource::seeded(2);
        let all = noise.keep_mask::<TestBackend, 2>([3, 3], 0.0, &device);
        assert!(values(all).iter().all(|v| *v == 1.0));
        let mask = noise.keep_mask::<TestBackend, 2>([50, 50], 0.5, &device);
        let kept = values(mask).iter().filter(|v| **v == 1.0).count();
        assert!(kept > 1000 && kept < 1500);
    }

    #[test]
    fn test_phase_toggles() {
        let mut ctx = AnalogContext::new(AnalogTileConfig::default(), NoiseSource::seeded(0));
        assert!(ctx.is_training());
        ctx.eval();
        assert_eq!(ctx.phase(), Phase::Inference);
        ctx.train();
        assert!(ctx.is_training());
    }
}
