use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Tunable weights and thresholds for multimodal fusion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FusionConfig {
    /// Modality weights; must sum to 1.0
    pub facial_weight: f64,
    pub voice_weight: f64,

    /// Added when both modalities report the same label (result capped at 1.0)
    pub agreement_bonus: f64,

    /// Readings below this (after ageing) do not take part in fusion
    pub min_usable_confidence: f64,

    /// Readings younger than this keep their full confidence
    pub fresh_for_ms: u64,

    /// Readings older than this are treated as missing
    pub max_reading_age_ms: u64,

    /// Number of fusion candidates the smoother votes over
    pub smoothing_window: usize,

    pub tick_interval_ms: u64,

    /// Consecutive sample failures before a modality is flagged degraded
    pub degraded_after_failures: u32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            facial_weight: 0.6,
            voice_weight: 0.4,
            agreement_bonus: 0.15,
            min_usable_confidence: 0.3,
            fresh_for_ms: 2_000,
            max_reading_age_ms: 5_000,
            smoothing_window: 5,
            tick_interval_ms: 1_000,
            degraded_after_failures: 3,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights_in_range = (0.0..=1.0).contains(&self.facial_weight)
            && (0.0..=1.0).contains(&self.voice_weight);
        let weights_sum = self.facial_weight + self.voice_weight;
        if !weights_in_range || (weights_sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::InvalidWeights {
                facial: self.facial_weight,
                voice: self.voice_weight,
            });
        }

        for (name, value) in [
            ("agreement_bonus", self.agreement_bonus),
            ("min_usable_confidence", self.min_usable_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }

        if self.smoothing_window == 0 {
            return Err(ConfigError::InvalidWindow);
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidDuration {
                name: "tick_interval_ms",
            });
        }
        if self.max_reading_age_ms == 0 || self.fresh_for_ms > self.max_reading_age_ms {
            return Err(ConfigError::InvalidDuration {
                name: "max_reading_age_ms",
            });
        }

        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = FusionConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.facial_weight + config.voice_weight - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let config = FusionConfig {
            facial_weight: 0.7,
            voice_weight: 0.4,
            ..FusionConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidWeights {
                facial: 0.7,
                voice: 0.4
            })
        );
    }

    #[test]
    fn rejects_negative_weight_even_if_sum_is_one() {
        let config = FusionConfig {
            facial_weight: 1.2,
            voice_weight: -0.2,
            ..FusionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWeights { .. })));
    }

    #[test]
    fn rejects_empty_window_and_bad_thresholds() {
        let window = FusionConfig {
            smoothing_window: 0,
            ..FusionConfig::default()
        };
        assert_eq!(window.validate(), Err(ConfigError::InvalidWindow));

        let threshold = FusionConfig {
            min_usable_confidence: 1.5,
            ..FusionConfig::default()
        };
        assert!(matches!(
            threshold.validate(),
            Err(ConfigError::InvalidThreshold { name: "min_usable_confidence", .. })
        ));
    }
}
