use thiserror::Error;

use crate::emotion::{EmotionLabel, ModalityKind};

/// Failures raised by a modality adapter or its classifier.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SensingError {
    /// The adapter could not acquire its device (camera, microphone).
    #[error("{modality} adapter unavailable: {reason}")]
    AdapterUnavailable {
        modality: ModalityKind,
        reason: String,
    },

    /// The most recent sampling tick failed. Absorbed by fusion as "no reading".
    #[error("{modality} sample failed ({consecutive} in a row): {reason}")]
    TransientReadFailure {
        modality: ModalityKind,
        consecutive: u32,
        reason: String,
    },
}

/// Invalid engine configuration. These are programmer errors and are fatal at startup.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("modality weights must be in [0, 1] and sum to 1.0 (facial={facial}, voice={voice})")]
    InvalidWeights { facial: f64, voice: f64 },

    #[error("{name} must be within [0, 1], got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("smoothing window must hold at least one entry")]
    InvalidWindow,

    #[error("{name} must be positive")]
    InvalidDuration { name: &'static str },

    #[error("{name} must hold at least one entry")]
    InvalidCapacity { name: &'static str },

    #[error("cooldown for '{emotion}' is out of range: {secs}s")]
    InvalidCooldown { emotion: EmotionLabel, secs: u64 },

    #[error("no intervention rule for emotion '{0}'")]
    MissingRule(EmotionLabel),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EmotionError {
    #[error("unknown emotion label '{0}'")]
    UnknownLabel(String),

    #[error("confidence must be a finite number, got {0}")]
    InvalidConfidence(f64),
}
