// Statistical PCM device model applied to conductance tensors.
//
// All conductances are non-negative and in µS. A signed weight is
// stored as a differential pair: w ∝ g_plus - g_minus.

use burn::prelude::*;

use super::config::PcmNoiseModel;
use super::context::NoiseSource;

/// Floor for relative conductances before taking a logarithm
const ZERO_CLIP: f32 = 1e-7;

impl PcmNoiseModel {
    /// Split signed weights into a (g_plus, g_minus) pair so that the
    /// largest absolute weight `w_scale` maps to `g_max`.
    pub fn weights_to_conductances<B: Backend>(
        &self,
        weights: Tensor<B, 2>,
        w_scale: f32,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let factor  = self.g_max as f32 / w_scale;
        let g_plus  = weights.clone().clamp_min(0.0).mul_scalar(factor);
        let g_minus = weights.neg().clamp_min(0.0).mul_scalar(factor);
        (g_plus, g_minus)
    }

    pub fn conductances_to_weights<B: Backend>(
        &self,
        g_plus:  Tensor<B, 2>,
        g_minus: Tensor<B, 2>,
        w_scale: f32,
    ) -> Tensor<B, 2> {
        (g_plus - g_minus).mul_scalar(w_scale / self.g_max as f32)
    }

    /// One-shot programming error. The std-dev is a quadratic in the
    /// relative target conductance.
    pub fn apply_programming_noise<B: Backend>(
        &self,
        g_target: Tensor<B, 2>,
        noise:    &mut NoiseSource,
    ) -> Tensor<B, 2> {
        if self.prog_noise_scale == 0.0 {
            return g_target;
        }
        let [c0, c1, c2] = self.prog_coeff;
        let g_rel   = g_target.clone().div_scalar(self.g_max);
        let sig_prog = g_rel
            .clone()
            .powf_scalar(2.0)
            .mul_scalar(c2)
            .add(g_rel.mul_scalar(c1))
            .add_scalar(c0)
            .mul_scalar(self.g_max / 25.0);

        let z = noise.standard_normal(g_target.dims(), &g_target.device());
        (g_target + sig_prog.mul(z).mul_scalar(self.prog_noise_scale)).clamp_min(0.0)
    }

    /// Per-device drift exponents `nu`. Low conductances drift faster.
    pub fn generate_drift_coefficients<B: Backend>(
        &self,
        g_target: Tensor<B, 2>,
        noise:    &mut NoiseSource,
    ) -> Tensor<B, 2> {
        let log_rel = g_target
            .clone()
            .div_scalar(self.g_max)
            .abs()
            .clamp_min(ZERO_CLIP)
            .log();

        let mu_drift  = log_rel.clone().mul_scalar(-0.0155).add_scalar(0.0244).clamp(0.049, 0.1);
        let sig_drift = log_rel.mul_scalar(-0.0125).add_scalar(-0.0059).clamp(0.008, 0.045);

        let z = noise.standard_normal(g_target.dims(), &g_target.device());
        (mu_drift + sig_drift.mul(z)).abs().mul_scalar(self.drift_scale)
    }

    /// Conductances `t_inference` seconds after programming: power-law
    /// decay past `t0`, plus accumulated 1/f read noise.
    pub fn apply_drift_noise<B: Backend>(
        &self,
        g_prog:      Tensor<B, 2>,
        nu:          Tensor<B, 2>,
        t_inference: f64,
        noise:       &mut NoiseSource,
    ) -> Tensor<B, 2> {
        let t = t_inference + self.t0;

        let g_drift = if t > self.t0 {
            let ln_ratio = (t / self.t0).ln();
            g_prog.clone() * nu.mul_scalar(-ln_ratio).exp()
        } else {
            g_prog.clone()
        };

        if self.read_noise_scale == 0.0 || t <= 0.0 {
            return g_drift.clamp_min(0.0);
        }

        let q_s = g_prog
            .abs()
            .div_scalar(self.g_max)
            .powf_scalar(0.65)
            .clamp_min(1e-3)
            .recip()
            .mul_scalar(0.0088)
            .clamp_max(0.2);
        let accumulated = ((t + self.t_read) / (2.0 * self.t_read)).ln().sqrt();

        let z = noise.standard_normal(g_drift.dims(), &g_drift.device());
        let read = g_drift.clone().abs() * q_s * z;
        (g_drift + read.mul_scalar(accumulated * self.read_noise_scale)).clamp_min(0.0)
    }
}
