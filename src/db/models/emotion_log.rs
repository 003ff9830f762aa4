use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{emotion::EmotionLabel, fusion::FusedState};

/// One persisted snapshot of the fused emotion and the modality readings behind it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionLog {
    pub id: Option<i64>,
    pub session_id: String,
    pub emotion: EmotionLabel,
    pub confidence: f64,
    pub source: String,
    pub facial_emotion: Option<EmotionLabel>,
    pub facial_confidence: Option<f64>,
    pub voice_emotion: Option<EmotionLabel>,
    pub voice_confidence: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl EmotionLog {
    pub const FUSED_SOURCE: &'static str = "fused";

    pub fn from_state(session_id: &str, state: &FusedState, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            session_id: session_id.to_string(),
            emotion: state.emotion,
            confidence: state.confidence,
            source: Self::FUSED_SOURCE.to_string(),
            facial_emotion: state.facial.as_ref().map(|r| r.label),
            facial_confidence: state.facial.as_ref().map(|r| r.confidence),
            voice_emotion: state.voice.as_ref().map(|r| r.label),
            voice_confidence: state.voice.as_ref().map(|r| r.confidence),
            timestamp,
        }
    }
}
