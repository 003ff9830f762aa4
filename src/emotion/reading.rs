use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EmotionLabel;
use crate::error::EmotionError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModalityKind {
    Facial,
    Voice,
}

impl ModalityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModalityKind::Facial => "facial",
            ModalityKind::Voice => "voice",
        }
    }
}

impl fmt::Display for ModalityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classification produced by a modality adapter. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionReading {
    pub label: EmotionLabel,
    pub confidence: f64,
    pub source: ModalityKind,
    pub observed_at: DateTime<Utc>,
}

impl EmotionReading {
    /// Builds a reading, clamping the confidence into `[0, 1]`.
    pub fn new(
        label: EmotionLabel,
        confidence: f64,
        source: ModalityKind,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, EmotionError> {
        if !confidence.is_finite() {
            return Err(EmotionError::InvalidConfidence(confidence));
        }

        Ok(Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
            source,
            observed_at,
        })
    }

    /// Age of the reading at `now`; readings stamped in the future are treated as fresh.
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.observed_at).max(chrono::Duration::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_confidence() {
        let now = Utc::now();
        let high = EmotionReading::new(EmotionLabel::Bored, 1.4, ModalityKind::Voice, now).unwrap();
        let low = EmotionReading::new(EmotionLabel::Bored, -0.2, ModalityKind::Voice, now).unwrap();
        assert_eq!(high.confidence, 1.0);
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn rejects_nan_confidence() {
        let result = EmotionReading::new(EmotionLabel::Bored, f64::NAN, ModalityKind::Facial, Utc::now());
        assert!(matches!(result, Err(EmotionError::InvalidConfidence(_))));
    }

    #[test]
    fn future_readings_have_zero_age() {
        let now = Utc::now();
        let reading = EmotionReading::new(
            EmotionLabel::Curious,
            0.5,
            ModalityKind::Facial,
            now + chrono::Duration::seconds(3),
        )
        .unwrap();
        assert_eq!(reading.age_at(now), chrono::Duration::zero());
    }
}
