use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    adaptive::{Intervention, SessionStats},
    db::models::StudySession,
    emotion::EmotionLabel,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionSummary {
    pub session: StudySession,
    pub stats: SessionStats,
    pub minutes_studied: u32,
}

/// Broadcast to every subscriber of a [`super::StudySessionController`].
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Started {
        session: StudySession,
    },
    /// Heartbeat carrying the fused state sampled on each session tick.
    EmotionUpdated {
        session_id: String,
        emotion: EmotionLabel,
        confidence: f64,
        degraded: bool,
        at: DateTime<Utc>,
    },
    Intervention {
        session_id: String,
        /// `None` if the intervention could not be persisted.
        intervention_id: Option<i64>,
        intervention: Intervention,
    },
    Ended {
        summary: SessionSummary,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptive::InterventionRules;

    #[test]
    fn events_serialize_with_snake_case_keys_throughout() {
        let now = Utc::now();
        let session = StudySession::begin(Some("optics".into()), now);
        let summary = SessionSummary {
            session: session.clone(),
            stats: SessionStats::new(now),
            minutes_studied: 12,
        };

        let ended = serde_json::to_value(SessionEvent::Ended { summary }).unwrap();
        assert_eq!(ended["type"], "ended");
        assert_eq!(ended["summary"]["minutes_studied"], 12);
        assert_eq!(ended["summary"]["session"]["status"], "running");
        assert!(ended["summary"]["session"]["started_at"].is_string());
        assert_eq!(ended["summary"]["stats"]["total_interventions"], 0);

        let rules = InterventionRules::default();
        let intervention = Intervention::from_rule(
            EmotionLabel::Confused,
            0.8,
            rules.get(EmotionLabel::Confused),
            0,
            now,
        );
        let fired = serde_json::to_value(SessionEvent::Intervention {
            session_id: session.id.clone(),
            intervention_id: Some(7),
            intervention,
        })
        .unwrap();
        assert_eq!(fired["type"], "intervention");
        assert_eq!(fired["session_id"], session.id.as_str());
        assert_eq!(fired["intervention"]["intervention_type"], "hint");

        let update = serde_json::to_value(SessionEvent::EmotionUpdated {
            session_id: session.id,
            emotion: EmotionLabel::Focused,
            confidence: 0.6,
            degraded: false,
            at: now,
        })
        .unwrap();
        assert_eq!(update["type"], "emotion_updated");
        assert_eq!(update["emotion"], "focused");
    }
}
