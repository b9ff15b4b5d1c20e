//! Waveform conditioning: noise gate followed by peak normalization.
//!
//! Operates on one channel at a time. Both steps are plain sample-wise
//! transforms; no frequency-domain filtering is involved.

use voxtrim_common::config::PipelineConfig;

/// Applies the noise gate and peak normalization to a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformConditioner {
    gate_threshold: f32,
    gate_attenuation: f32,
    target_peak: f32,
}

impl Default for WaveformConditioner {
    fn default() -> Self {
        Self::new(0.01, 0.1, 0.95)
    }
}

impl WaveformConditioner {
    /// Create a conditioner with explicit gate and peak settings.
    pub fn new(gate_threshold: f32, gate_attenuation: f32, target_peak: f32) -> Self {
        Self {
            gate_threshold,
            gate_attenuation,
            target_peak,
        }
    }

    /// Build a conditioner from pipeline settings.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.noise_gate_threshold,
            config.noise_gate_attenuation,
            config.target_peak,
        )
    }

    /// Gate then normalize `channel`, reusing its allocation.
    ///
    /// The output always has the same length as the input. A silent
    /// channel comes back untouched.
    pub fn condition(&self, mut channel: Vec<f32>) -> Vec<f32> {
        apply_noise_gate(&mut channel, self.gate_threshold, self.gate_attenuation);
        normalize_peak(&mut channel, self.target_peak);
        channel
    }
}

/// Attenuate every sample whose magnitude is below `threshold`.
pub fn apply_noise_gate(channel: &mut [f32], threshold: f32, attenuation: f32) {
    for sample in channel.iter_mut() {
        if sample.abs() < threshold {
            *sample *= attenuation;
        }
    }
}

/// Scale `channel` so its loudest sample reaches `target_peak`.
///
/// Silent channels are left as-is.
pub fn normalize_peak(channel: &mut [f32], target_peak: f32) {
    let max = peak(channel);
    if max == 0.0 {
        return;
    }

    // f64 keeps the factor finite for subnormal peaks.
    let factor = f64::from(target_peak) / f64::from(max);
    for sample in channel.iter_mut() {
        // Clamp absorbs floating-point overshoot past full scale.
        *sample = (f64::from(*sample) * factor).clamp(-1.0, 1.0) as f32;
    }
}

/// Largest absolute sample value, `0.0` for an empty channel.
pub fn peak(channel: &[f32]) -> f32 {
    channel
        .iter()
        .fold(0.0f32, |max, sample| max.max(sample.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_attenuates_only_quiet_samples() {
        let mut channel = vec![0.005, -0.005, 0.01, -0.5, 0.0];
        apply_noise_gate(&mut channel, 0.01, 0.1);

        assert!((channel[0] - 0.0005).abs() < 1e-9);
        assert!((channel[1] + 0.0005).abs() < 1e-9);
        // Threshold itself is not gated.
        assert_eq!(channel[2], 0.01);
        assert_eq!(channel[3], -0.5);
        assert_eq!(channel[4], 0.0);
    }

    #[test]
    fn test_normalize_reaches_target_peak() {
        let mut channel = vec![0.25, -0.5, 0.1];
        normalize_peak(&mut channel, 0.95);

        assert!((peak(&channel) - 0.95).abs() < 1e-6);
        assert!((channel[1] + 0.95).abs() < 1e-6);
        assert!((channel[0] - 0.475).abs() < 1e-6);
    }

    #[test]
    fn test_condition_constant_half_amplitude() {
        let conditioner = WaveformConditioner::default();
        let out = conditioner.condition(vec![0.5; 1000]);

        assert_eq!(out.len(), 1000);
        for sample in out {
            assert!((sample - 0.95).abs() < 1e-6);
        }
    }

    #[test]
    fn test_silent_channel_is_untouched() {
        let conditioner = WaveformConditioner::default();
        let out = conditioner.condition(vec![0.0; 64]);
        assert_eq!(out, vec![0.0; 64]);
    }

    #[test]
    fn test_empty_channel() {
        let conditioner = WaveformConditioner::default();
        assert!(conditioner.condition(Vec::new()).is_empty());
        assert_eq!(peak(&[]), 0.0);
    }

    #[test]
    fn test_quiet_channel_is_gated_before_normalizing() {
        // Everything sits under the gate, so the gate scales all samples
        // equally and normalization restores the shape at full target.
        let conditioner = WaveformConditioner::default();
        let out = conditioner.condition(vec![0.004, -0.002]);

        assert!((out[0] - 0.95).abs() < 1e-5);
        assert!((out[1] + 0.475).abs() < 1e-5);
    }

    #[test]
    fn test_from_config_uses_pipeline_settings() {
        let config = PipelineConfig {
            target_peak: 0.5,
            ..Default::default()
        };
        let conditioner = WaveformConditioner::from_config(&config);
        let out = conditioner.condition(vec![0.2, -0.8]);
        assert!((peak(&out) - 0.5).abs() < 1e-6);
    }
}
