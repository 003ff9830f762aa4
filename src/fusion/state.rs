use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::emotion::{EmotionLabel, EmotionReading};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModalityHealth {
    pub consecutive_failures: u32,
    /// Set once failures reach the configured threshold; fusion carries on without it.
    pub degraded: bool,
}

/// Latest fused estimate plus the per-modality inputs that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FusedState {
    pub emotion: EmotionLabel,
    pub confidence: f64,
    pub facial: Option<EmotionReading>,
    pub voice: Option<EmotionReading>,
    pub facial_health: ModalityHealth,
    pub voice_health: ModalityHealth,
    /// `None` until the first fusion tick.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for FusedState {
    fn default() -> Self {
        Self {
            emotion: EmotionLabel::Neutral,
            confidence: 0.0,
            facial: None,
            voice: None,
            facial_health: ModalityHealth::default(),
            voice_health: ModalityHealth::default(),
            updated_at: None,
        }
    }
}

impl FusedState {
    pub fn current(&self) -> (EmotionLabel, f64) {
        (self.emotion, self.confidence)
    }

    pub fn any_degraded(&self) -> bool {
        self.facial_health.degraded || self.voice_health.degraded
    }
}
