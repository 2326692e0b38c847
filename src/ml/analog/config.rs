use serde::{Deserialize, Serialize};

use crate::domain::error::{ExperimentError, Result};

/// Non-idealities applied by every analog tile.
///
/// The first four fields act during the forward pass and make
/// training "hardware aware"; `noise_model` and
/// `drift_compensation` are only used once the tiles are programmed
/// for inference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalogTileConfig {
    /// Std-dev of additive Gaussian weight noise on every forward
    /// pass, training and inference alike
    pub forward_weight_noise: f64,

    /// Weights are clamped to `[-clip, clip]` after each update
    pub clip_value: Option<f64>,

    /// Probability of dropping each weight during a training forward
    pub drop_connect: f64,

    /// Std-dev of the training-time weight modifier, relative to the
    /// largest absolute weight of the tile
    pub modifier_std_dev: f64,

    pub noise_model: PcmNoiseModel,

    /// Rescale outputs by a global factor so that the mean readout
    /// of a drifted tile matches its value at programming time
    pub drift_compensation: bool,
}

impl Default for AnalogTileConfig {
    fn default() -> Self {
        Self {
            forward_weight_noise: 0.02,
            clip_value:           Some(1.0),
            drop_connect:         0.03,
            modifier_std_dev:     0.1,
            noise_model:          PcmNoiseModel::default(),
            drift_compensation:   true,
        }
    }
}

impl AnalogTileConfig {
    /// A tile without any stochastic effect. Drift still follows the
    /// power law, but programming and read noise are off, so drifting
    /// for zero seconds reproduces the trained weights.
    pub fn ideal() -> Self {
        Self {
            forward_weight_noise: 0.0,
            drop_connect:         0.0,
            modifier_std_dev:     0.0,
            noise_model: PcmNoiseModel {
                prog_noise_scale: 0.0,
                read_noise_scale: 0.0,
                ..PcmNoiseModel::default()
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        non_negative("forward_weight_noise", self.forward_weight_noise)?;
        non_negative("modifier_std_dev", self.modifier_std_dev)?;
        if !(0.0..1.0).contains(&self.drop_connect) {
            return Err(ExperimentError::invalid_config(format!(
                "drop_connect must be in [0, 1), got {}",
                self.drop_connect
            )));
        }
        if let Some(clip) = self.clip_value {
            positive("clip_value", clip)?;
        }
        self.noise_model.validate()
    }
}

/// Phase-change-memory-like statistical model of programming noise,
/// conductance drift and accumulated read noise.
///
/// Conductances are in µS. Drift follows
/// `g(t) = g_prog * (t / t0)^(-nu)` with a per-device exponent `nu`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PcmNoiseModel {
    /// Conductance mapped to the largest absolute weight
    pub g_max: f64,

    pub prog_noise_scale: f64,
    pub read_noise_scale: f64,
    pub drift_scale:      f64,

    /// Time after programming at which drift starts, seconds
    pub t0: f64,

    /// Duration of one read pulse, seconds
    pub t_read: f64,

    /// Polynomial (constant, linear, quadratic) in `g / g_max` giving
    /// the programming noise std-dev at `g_max = 25 µS`
    pub prog_coeff: [f64; 3],
}

impl Default for PcmNoiseModel {
    fn default() -> Self {
        Self {
            g_max:            25.0,
            prog_noise_scale: 1.0,
            read_noise_scale: 1.0,
            drift_scale:      1.0,
            t0:               20.0,
            t_read:           250.0e-9,
            prog_coeff:       [0.26348, 1.9650, -1.1731],
        }
    }
}

impl PcmNoiseModel {
    pub fn validate(&self) -> Result<()> {
        positive("g_max", self.g_max)?;
        positive("t0", self.t0)?;
        positive("t_read", self.t_read)?;
        non_negative("prog_noise_scale", self.prog_noise_scale)?;
        non_negative("read_noise_scale", self.read_noise_scale)?;
        non_negative("drift_scale", self.drift_scale)
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ExperimentError::invalid_config(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ExperimentError::invalid_config(format!(
            "{name} must be finite and positive, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AnalogTileConfig::default().validate().is_ok());
        assert!(AnalogTileConfig::ideal().validate().is_ok());
    }

    #[test]
    fn test_ideal_disables_every_noise_source() {
        let ideal = AnalogTileConfig::ideal();
        assert_eq!(ideal.forward_weight_noise, 0.0);
        assert_eq!(ideal.drop_connect, 0.0);
        assert_eq!(ideal.modifier_std_dev, 0.0);
        assert_eq!(ideal.noise_model.prog_noise_scale, 0.0);
        assert_eq!(ideal.noise_model.read_noise_scale, 0.0);
        assert_eq!(ideal.clip_value, Some(1.0));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let cfg = AnalogTileConfig { drop_connect: 1.0, ..Default::default() };
        assert!(cfg.validate().is_err());

        let cfg = AnalogTileConfig { clip_value: Some(0.0), ..Default::default() };
        assert!(cfg.validate().is_err());

        let cfg = AnalogTileConfig { forward_weight_noise: f64::NAN, ..Default::default() };
        assert!(cfg.validate().is_err());

        let mut cfg = AnalogTileConfig::default();
        cfg.noise_model.t0 = -1.0;
        assert!(cfg.validate().is_err());
    }
}
