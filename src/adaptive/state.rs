use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rules::{InterventionRule, Priority};
use crate::emotion::EmotionLabel;

/// A triggered intervention, ready for the interface to render.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intervention {
    pub emotion: EmotionLabel,
    pub intervention_type: String,
    pub priority: Priority,
    /// `None` for silent interventions.
    pub content: Option<String>,
    pub actions: Vec<String>,
    pub silent: bool,
    pub confidence: f64,
    pub topic: Option<String>,
    pub triggered_at: DateTime<Utc>,
}

impl Intervention {
    pub(crate) fn from_rule(
        emotion: EmotionLabel,
        confidence: f64,
        rule: &InterventionRule,
        fired: u32,
        triggered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            emotion,
            intervention_type: rule.intervention_type.clone(),
            priority: rule.priority,
            content: rule.content_template(fired).map(str::to_string),
            actions: rule.actions.clone(),
            silent: rule.silent,
            confidence,
            topic: None,
            triggered_at,
        }
    }
}

/// What the session boundary knows about the learner's current study context.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InterventionContext {
    pub topic: Option<String>,
    pub minutes_studying: Option<u32>,
}

/// Last trigger time per emotion. "Cooling" vs "idle" is derived from it on read.
#[derive(Debug, Clone, Default)]
pub struct CooldownState {
    last_triggered: HashMap<EmotionLabel, DateTime<Utc>>,
}

impl CooldownState {
    pub fn last_triggered(&self, emotion: EmotionLabel) -> Option<DateTime<Utc>> {
        self.last_triggered.get(&emotion).copied()
    }

    pub fn remaining(
        &self,
        emotion: EmotionLabel,
        cooldown: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Option<chrono::Duration> {
        let last = self.last_triggered(emotion)?;
        let remaining = cooldown.checked_sub(&(now - last))?;
        (remaining > chrono::Duration::zero()).then_some(remaining)
    }

    pub fn mark(&mut self, emotion: EmotionLabel, at: DateTime<Utc>) {
        self.last_triggered.insert(emotion, at);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStats {
    pub intervention_counts: BTreeMap<EmotionLabel, u32>,
    pub total_interventions: u32,
    pub session_started_at: DateTime<Utc>,
}

impl SessionStats {
    pub fn new(session_started_at: DateTime<Utc>) -> Self {
        Self {
            intervention_counts: EmotionLabel::ALL.into_iter().map(|label| (label, 0)).collect(),
            total_interventions: 0,
            session_started_at,
        }
    }

    pub fn count(&self, emotion: EmotionLabel) -> u32 {
        self.intervention_counts.get(&emotion).copied().unwrap_or(0)
    }

    pub(crate) fn record(&mut self, emotion: EmotionLabel) {
        *self.intervention_counts.entry(emotion).or_insert(0) += 1;
        self.total_interventions += 1;
    }

    /// Emotion that triggered the most interventions, if any did.
    pub fn most_frequent(&self) -> Option<EmotionLabel> {
        self.intervention_counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .max_by_key(|(_, count)| **count)
            .map(|(label, _)| *label)
    }
}
