use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{emotion::LabelMap, error::ConfigError};

/// Cadence and label translation for one modality adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdapterConfig {
    pub sample_interval_ms: u64,

    /// A sample running longer than this counts as a failed tick.
    pub sample_timeout_ms: u64,

    /// How long `stop()` waits for the loop to release the device.
    pub stop_grace_ms: u64,

    pub label_map: LabelMap,
}

impl AdapterConfig {
    pub fn facial() -> Self {
        Self {
            sample_interval_ms: 1_000,
            label_map: LabelMap::facial_default(),
            ..Self::default()
        }
    }

    pub fn voice() -> Self {
        Self {
            sample_interval_ms: 2_000,
            label_map: LabelMap::voice_default(),
            ..Self::default()
        }
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::InvalidDuration {
                name: "sample_interval_ms",
            });
        }
        if self.sample_timeout_ms == 0 {
            return Err(ConfigError::InvalidDuration {
                name: "sample_timeout_ms",
            });
        }
        Ok(())
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 1_000,
            sample_timeout_ms: 10_000,
            stop_grace_ms: 2_000,
            label_map: LabelMap::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SensingConfig {
    pub facial: AdapterConfig,
    pub voice: AdapterConfig,
}

impl Default for SensingConfig {
    fn default() -> Self {
        Self {
            facial: AdapterConfig::facial(),
            voice: AdapterConfig::voice(),
        }
    }
}

impl SensingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.facial.validate()?;
        self.voice.validate()
    }
}
