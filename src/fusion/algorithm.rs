use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::emotion::{EmotionLabel, EmotionReading};
use crate::fusion::config::FusionConfig;

/// Confidence retained by a reading that has just reached `max_reading_age_ms`.
const STALE_CONFIDENCE_FLOOR: f64 = 0.5;

/// Result of fusing one tick's readings, before smoothing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FusionCandidate {
    pub emotion: EmotionLabel,
    pub confidence: f64,
}

impl FusionCandidate {
    pub fn neutral() -> Self {
        Self {
            emotion: EmotionLabel::Neutral,
            confidence: 0.0,
        }
    }
}

/// Fuse the latest facial and voice readings using weighted scoring with an agreement bonus.
pub fn fuse_readings(
    facial: Option<&EmotionReading>,
    voice: Option<&EmotionReading>,
    now: DateTime<Utc>,
    config: &FusionConfig,
) -> FusionCandidate {
    let facial = facial.and_then(|r| usable_confidence(r, now, config).map(|c| (r.label, c)));
    let voice = voice.and_then(|r| usable_confidence(r, now, config).map(|c| (r.label, c)));

    match (facial, voice) {
        (None, None) => FusionCandidate::neutral(),
        (Some((emotion, confidence)), None) | (None, Some((emotion, confidence))) => {
            FusionCandidate {
                emotion,
                confidence,
            }
        }
        (Some(facial), Some(voice)) => score_both(facial, voice, config),
    }
}

/// Only the two reported labels can score above zero, so the argmax is between them.
/// Exact ties go to the facial label.
fn score_both(
    (facial_label, facial_conf): (EmotionLabel, f64),
    (voice_label, voice_conf): (EmotionLabel, f64),
    config: &FusionConfig,
) -> FusionCandidate {
    let score = |label: EmotionLabel| -> f64 {
        let mut total = 0.0;
        if facial_label == label {
            total += config.facial_weight * facial_conf;
        }
        if voice_label == label {
            total += config.voice_weight * voice_conf;
        }
        if facial_label == label && voice_label == label {
            total += config.agreement_bonus;
        }
        total.min(1.0)
    };

    let facial_score = score(facial_label);
    let voice_score = score(voice_label);

    if voice_score > facial_score {
        FusionCandidate {
            emotion: voice_label,
            confidence: voice_score,
        }
    } else {
        FusionCandidate {
            emotion: facial_label,
            confidence: facial_score,
        }
    }
}

/// Confidence a reading still carries at `now`, or `None` if it is too old or too weak.
///
/// Within `fresh_for_ms` the confidence is untouched; after that it decays linearly to
/// `STALE_CONFIDENCE_FLOOR` of its value at `max_reading_age_ms`, beyond which the
/// reading is dropped.
pub fn usable_confidence(
    reading: &EmotionReading,
    now: DateTime<Utc>,
    config: &FusionConfig,
) -> Option<f64> {
    let age_ms = u64::try_from(reading.age_at(now).num_milliseconds()).unwrap_or(0);
    if age_ms > config.max_reading_age_ms {
        return None;
    }

    let factor = if age_ms <= config.fresh_for_ms {
        1.0
    } else {
        let span = (config.max_reading_age_ms - config.fresh_for_ms) as f64;
        let overdue = (age_ms - config.fresh_for_ms) as f64;
        1.0 - (1.0 - STALE_CONFIDENCE_FLOOR) * (overdue / span)
    };

    let confidence = reading.confidence * factor;
    (confidence >= config.min_usable_confidence).then_some(confidence)
}
