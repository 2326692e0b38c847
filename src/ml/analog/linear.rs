use burn::{module::Param, prelude::*};

use super::context::{AnalogContext, NoiseSource};

/// State captured when a tile is programmed for inference.
///
/// The conductance pair and drift exponents are fixed at programming
/// time. Every drift call recomputes the effective weights from these,
/// never from the previous drift result.
#[derive(Module, Debug)]
pub struct ProgrammedTile<B: Backend> {
    /// Trained weights the tile was programmed from
    pub reference: Param<Tensor<B, 2>>,
    pub g_plus:    Param<Tensor<B, 2>>,
    pub g_minus:   Param<Tensor<B, 2>>,
    pub nu_plus:   Param<Tensor<B, 2>>,
    pub nu_minus:  Param<Tensor<B, 2>>,
    /// Largest absolute reference weight, mapped to `g_max`
    pub w_scale:   f32,
    /// Compensation readout right after programming
    pub baseline:  f32,
    /// Output scale currently applied by drift compensation
    pub alpha:     f32,
}

#[derive(Config, Debug)]
pub struct AnalogLinearConfig {
    pub d_input:  usize,
    pub d_output: usize,
    #[config(default = true)]
    pub bias: bool,
}

impl AnalogLinearConfig {
    /// Uniform `±1/√d_input` initialisation.
    pub fn init<B: Backend>(&self, device: &B::Device, noise: &mut NoiseSource) -> AnalogLinear<B> {
        let bound = 1.0 / (self.d_input as f64).sqrt();
        self.init_with_bound(bound, device, noise)
    }

    pub fn init_with_bound<B: Backend>(
        &self,
        bound:  f64,
        device: &B::Device,
        noise:  &mut NoiseSource,
    ) -> AnalogLinear<B> {
        let weight = noise.uniform([self.d_input, self.d_output], -bound, bound, device);
        let bias = self
            .bias
            .then(|| Param::from_tensor(noise.uniform([self.d_output], -bound, bound, device)));
        AnalogLinear {
            weight: Param::from_tensor(weight),
            bias,
            programmed: None,
        }
    }
}

/// Fully connected layer whose weight matrix lives on a simulated
/// analog crossbar. The bias is digital.
#[derive(Module, Debug)]
pub struct AnalogLinear<B: Backend> {
    /// `[d_input, d_output]`
    pub weight:     Param<Tensor<B, 2>>,
    pub bias:       Option<Param<Tensor<B, 1>>>,
    pub programmed: Option<ProgrammedTile<B>>,
}

/// Programming and drift of analog weights.
///
/// Pre: the model is in inference mode (`valid()` and
/// `AnalogContext::eval`). Drift overwrites the effective weights in
/// place; it is not a pure function of the elapsed time because
/// programming noise is drawn once and read noise on every call.
pub trait AnalogInference {
    /// Program the current weights onto the tiles, drawing
    /// programming noise and drift exponents. Reprogramming starts
    /// again from the trained weights, not the drifted ones.
    fn program_analog_weights(&mut self, ctx: &mut AnalogContext);

    /// Set the effective weights to their value `t_inference` seconds
    /// after programming. Programs the tiles first if needed.
    fn drift_analog_weights(&mut self, t_inference: f64, ctx: &mut AnalogContext);
}

impl<B: Backend> AnalogLinear<B> {
    pub fn d_input(&self) -> usize { self.weight.val().dims()[0] }

    pub fn d_output(&self) -> usize { self.weight.val().dims()[1] }

    /// Weights as seen by one forward pass: trained weights plus the
    /// training-time modifier and drop-connect, plus short-term
    /// forward noise in every phase.
    pub fn effective_weight(&self, ctx: &mut AnalogContext) -> Tensor<B, 2> {
        let cfg    = *ctx.config();
        let mut weight = self.weight.val();
        let device = weight.device();
        let dims   = weight.dims();

        if ctx.is_training() {
            if cfg.modifier_std_dev > 0.0 {
                let std_dev = cfg.modifier_std_dev * max_abs(&weight) as f64;
                weight = weight + ctx.noise().normal(dims, std_dev, &device);
            }
            if cfg.drop_connect > 0.0 {
                weight = weight * ctx.noise().keep_mask(dims, cfg.drop_connect, &device);
            }
        }
        if cfg.forward_weight_noise > 0.0 {
            weight = weight + ctx.noise().normal(dims, cfg.forward_weight_noise, &device);
        }
        weight
    }

    /// `x · weight`, rescaled by drift compensation, plus bias.
    /// `x` is `[rows, d_input]`.
    pub fn project(&self, x: Tensor<B, 2>, weight: &Tensor<B, 2>) -> Tensor<B, 2> {
        let mut out = x.matmul(weight.clone());
        if let Some(tile) = &self.programmed {
            if tile.alpha != 1.0 {
                out = out.mul_scalar(tile.alpha);
            }
        }
        match &self.bias {
            Some(bias) => out + bias.val().unsqueeze(),
            None => out,
        }
    }

    /// Apply the layer to the last dimension of `input`.
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>, ctx: &mut AnalogContext) -> Tensor<B, D> {
        let weight = self.effective_weight(ctx);
        let dims   = input.dims();
        let rows: usize = dims[..D - 1].iter().product();

        let out = self.project(input.reshape([rows, dims[D - 1]]), &weight);

        let mut out_dims = dims;
        out_dims[D - 1] = self.d_output();
        out.reshape(out_dims)
    }

    /// Clamp the trained weights to `[-bound, bound]`, keeping them
    /// leaves of the autodiff graph.
    pub fn clip_weights(&mut self, bound: f64) {
        let weight = self.weight.clone();
        self.weight = weight.map(|w| w.clamp(-bound, bound).detach().require_grad());
    }

    fn set_weight(&mut self, value: Tensor<B, 2>) {
        let weight = self.weight.clone();
        self.weight = weight.map(|_| value);
    }

    /// Mean absolute output for an all-ones input, the global drift
    /// compensation readout.
    fn readout(weight: &Tensor<B, 2>) -> f32 {
        let [d_input, _] = weight.dims();
        let ones = Tensor::<B, 2>::ones([1, d_input], &weight.device());
        let value = ones.matmul(weight.clone()).abs().mean().into_scalar().elem::<f32>();
        value.max(1e-4)
    }
}

impl<B: Backend> AnalogInference for AnalogLinear<B> {
    fn program_analog_weights(&mut self, ctx: &mut AnalogContext) {
        let pcm = ctx.config().noise_model;
        let reference = match &self.programmed {
            Some(tile) => tile.reference.val(),
            None => self.weight.val(),
        };

        let w_scale = max_abs(&reference).max(1e-8);
        let (gp_target, gm_target) = pcm.weights_to_conductances(reference.clone(), w_scale);

        let nu_plus  = pcm.generate_drift_coefficients(gp_target.clone(), ctx.noise());
        let nu_minus = pcm.generate_drift_coefficients(gm_target.clone(), ctx.noise());
        let g_plus   = pcm.apply_programming_noise(gp_target, ctx.noise());
        let g_minus  = pcm.apply_programming_noise(gm_target, ctx.noise());

        let programmed = pcm.conductances_to_weights(g_plus.clone(), g_minus.clone(), w_scale);
        let baseline   = Self::readout(&programmed);
        self.set_weight(programmed);

        self.programmed = Some(ProgrammedTile {
            reference: Param::from_tensor(reference),
            g_plus:    Param::from_tensor(g_plus),
            g_minus:   Param::from_tensor(g_minus),
            nu_plus:   Param::from_tensor(nu_plus),
            nu_minus:  Param::from_tensor(nu_minus),
            w_scale,
            baseline,
            alpha: 1.0,
        });
    }

    fn drift_analog_weights(&mut self, t_inference: f64, ctx: &mut AnalogContext) {
        if self.programmed.is_none() {
            self.program_analog_weights(ctx);
        }
        let pcm          = ctx.config().noise_model;
        let compensation = ctx.config().drift_compensation;
        let Some(tile) = &self.programmed else { return };

        let g_plus  = pcm.apply_drift_noise(tile.g_plus.val(), tile.nu_plus.val(), t_inference, ctx.noise());
        let g_minus = pcm.apply_drift_noise(tile.g_minus.val(), tile.nu_minus.val(), t_inference, ctx.noise());
        let drifted = pcm.conductances_to_weights(g_plus, g_minus, tile.w_scale);

        let alpha = if compensation {
            tile.baseline / Self::readout(&drifted)
        } else {
            1.0
        };
        self.set_weight(drifted);
        if let Some(tile) = self.programmed.as_mut() {
            tile.alpha = alpha;
        }
    }
}

fn max_abs<B: Backend>(t: &Tensor<B, 2>) -> f32 {
    t.clone().abs().max().into_scalar().elem::<f32>()
}
