use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{adaptive::Intervention, emotion::EmotionLabel};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterventionLog {
    pub id: Option<i64>,
    pub session_id: String,
    pub emotion_log_id: Option<i64>,
    pub emotion: EmotionLabel,
    pub intervention_type: String,
    pub content: Option<String>,
    pub silent: bool,
    pub timestamp: DateTime<Utc>,
    /// Learner feedback, recorded after the fact.
    pub was_helpful: Option<bool>,
}

impl InterventionLog {
    pub fn from_intervention(
        session_id: &str,
        emotion_log_id: Option<i64>,
        intervention: &Intervention,
    ) -> Self {
        Self {
            id: None,
            session_id: session_id.to_string(),
            emotion_log_id,
            emotion: intervention.emotion,
            intervention_type: intervention.intervention_type.clone(),
            content: intervention.content.clone(),
            silent: intervention.silent,
            timestamp: intervention.triggered_at,
            was_helpful: None,
        }
    }
}
