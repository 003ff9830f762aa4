use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{
    rules::InterventionRules,
    state::{CooldownState, Intervention, InterventionContext, SessionStats},
};
use crate::{emotion::EmotionLabel, error::ConfigError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Fused states below this never trigger an intervention.
    pub min_actionable_confidence: f64,
    /// Past this many minutes, break/simplify messages acknowledge the effort.
    pub long_session_minutes: u32,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            min_actionable_confidence: 0.4,
            long_session_minutes: 45,
        }
    }
}

impl AdaptiveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_actionable_confidence) {
            return Err(ConfigError::InvalidThreshold {
                name: "min_actionable_confidence",
                value: self.min_actionable_confidence,
            });
        }
        Ok(())
    }
}

struct AdaptiveState {
    cooldowns: CooldownState,
    stats: SessionStats,
    log: Vec<Intervention>,
}

impl AdaptiveState {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            cooldowns: CooldownState::default(),
            stats: SessionStats::new(now),
            log: Vec::new(),
        }
    }
}

/// Maps fused emotions to interventions with per-emotion cooldowns and session statistics.
#[derive(Clone)]
pub struct AdaptiveEngine {
    rules: Arc<InterventionRules>,
    config: AdaptiveConfig,
    state: Arc<Mutex<AdaptiveState>>,
}

impl AdaptiveEngine {
    pub fn new(rules: InterventionRules, config: AdaptiveConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            rules: Arc::new(rules),
            config,
            state: Arc::new(Mutex::new(AdaptiveState::fresh(Utc::now()))),
        })
    }

    pub fn rules(&self) -> &InterventionRules {
        &self.rules
    }

    fn lock_state(&self) -> MutexGuard<'_, AdaptiveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_intervention(&self, emotion: EmotionLabel, confidence: f64) -> Option<Intervention> {
        self.get_intervention_at(emotion, confidence, Utc::now())
    }

    pub fn get_intervention_at(
        &self,
        emotion: EmotionLabel,
        confidence: f64,
        now: DateTime<Utc>,
    ) -> Option<Intervention> {
        self.get_intervention_with_context_at(emotion, confidence, &InterventionContext::default(), now)
    }

    pub fn get_intervention_with_context(
        &self,
        emotion: EmotionLabel,
        confidence: f64,
        context: &InterventionContext,
    ) -> Option<Intervention> {
        self.get_intervention_with_context_at(emotion, confidence, context, Utc::now())
    }

    /// Returns `None` for low-confidence states and for emotions still cooling down;
    /// neither case touches cooldowns or statistics.
    pub fn get_intervention_with_context_at(
        &self,
        emotion: EmotionLabel,
        confidence: f64,
        context: &InterventionContext,
        now: DateTime<Utc>,
    ) -> Option<Intervention> {
        // Written so that NaN is never actionable.
        if !(confidence >= self.config.min_actionable_confidence) {
            debug!(
                "no intervention for {emotion}: confidence {confidence:.2} below {:.2}",
                self.config.min_actionable_confidence
            );
            return None;
        }

        let rule = self.rules.get(emotion);
        let mut state = self.lock_state();

        if let Some(remaining) = state.cooldowns.remaining(emotion, rule.cooldown(), now) {
            debug!(
                "no intervention for {emotion}: cooling down for another {}s",
                remaining.num_seconds()
            );
            return None;
        }

        let fired = state.stats.count(emotion);
        let mut intervention = Intervention::from_rule(emotion, confidence, rule, fired, now);
        self.apply_context(&mut intervention, context);

        state.cooldowns.mark(emotion, now);
        state.stats.record(emotion);
        state.log.push(intervention.clone());

        info!(
            "intervention {} for {emotion} ({confidence:.2}), #{} this session",
            intervention.intervention_type,
            fired + 1
        );
        Some(intervention)
    }

    fn apply_context(&self, intervention: &mut Intervention, context: &InterventionContext) {
        if intervention.intervention_type == "hint" {
            intervention.topic = context.topic.clone();
        }

        let Some(minutes) = context.minutes_studying else {
            return;
        };
        let wants_note = matches!(intervention.intervention_type.as_str(), "simplify" | "break");
        if minutes > self.config.long_session_minutes && wants_note {
            if let Some(content) = intervention.content.as_mut() {
                content.push_str(&format!(
                    "\n(You've been studying for {minutes} minutes. That's real dedication!)"
                ));
            }
        }
    }

    /// `true` if an intervention for `emotion` may fire now.
    pub fn check_cooldown(&self, emotion: EmotionLabel) -> bool {
        self.check_cooldown_at(emotion, Utc::now())
    }

    pub fn check_cooldown_at(&self, emotion: EmotionLabel, now: DateTime<Utc>) -> bool {
        self.cooldown_remaining_at(emotion, now).is_none()
    }

    pub fn cooldown_remaining(&self, emotion: EmotionLabel) -> Option<chrono::Duration> {
        self.cooldown_remaining_at(emotion, Utc::now())
    }

    pub fn cooldown_remaining_at(
        &self,
        emotion: EmotionLabel,
        now: DateTime<Utc>,
    ) -> Option<chrono::Duration> {
        let rule = self.rules.get(emotion);
        self.lock_state().cooldowns.remaining(emotion, rule.cooldown(), now)
    }

    pub fn get_session_stats(&self) -> SessionStats {
        self.lock_state().stats.clone()
    }

    /// Interventions fired since the session started, oldest first.
    pub fn session_log(&self) -> Vec<Intervention> {
        self.lock_state().log.clone()
    }

    /// Starts a new session: counts, log and cooldown memory are all dropped.
    pub fn reset_session(&self) {
        self.reset_session_at(Utc::now());
    }

    pub fn reset_session_at(&self, now: DateTime<Utc>) {
        *self.lock_state() = AdaptiveState::fresh(now);
        info!("adaptive session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn engine() -> AdaptiveEngine {
        AdaptiveEngine::new(InterventionRules::default(), AdaptiveConfig::default()).unwrap()
    }

    #[test]
    fn cooldown_suppresses_repeat_until_elapsed() {
        let engine = engine();
        let start = Utc::now();
        let cooldown = engine.rules().get(EmotionLabel::Frustrated).cooldown_secs as i64;

        let first = engine.get_intervention_at(EmotionLabel::Frustrated, 0.9, start);
        assert!(first.is_some());
        assert_eq!(
            engine.lock_state().cooldowns.last_triggered(EmotionLabel::Frustrated),
            Some(start)
        );

        let second = engine.get_intervention_at(EmotionLabel::Frustrated, 0.9, start + Duration::seconds(5));
        assert!(second.is_none());

        let third = engine.get_intervention_at(
            EmotionLabel::Frustrated,
            0.9,
            start + Duration::seconds(cooldown),
        );
        assert!(third.is_some());
        assert_eq!(engine.get_session_stats().count(EmotionLabel::Frustrated), 2);
    }

    #[test]
    fn low_confidence_never_mutates_state() {
        let engine = engine();
        let now = Utc::now();
        let before = engine.get_session_stats();

        for _ in 0..3 {
            assert!(engine.get_intervention_at(EmotionLabel::Curious, 0.2, now).is_none());
        }

        assert_eq!(engine.get_session_stats(), before);
        assert!(engine.check_cooldown_at(EmotionLabel::Curious, now));
        assert!(engine.session_log().is_empty());
    }

    #[test]
    fn nan_confidence_is_treated_as_too_low() {
        let engine = engine();
        assert!(engine.get_intervention(EmotionLabel::Bored, f64::NAN).is_none());
        assert_eq!(engine.get_session_stats().total_interventions, 0);
    }

    #[test]
    fn cooldowns_are_per_emotion() {
        let engine = engine();
        let now = Utc::now();
        assert!(engine.get_intervention_at(EmotionLabel::Confused, 0.8, now).is_some());
        assert!(engine.get_intervention_at(EmotionLabel::Bored, 0.8, now).is_some());
        assert!(engine.get_intervention_at(EmotionLabel::Confused, 0.8, now).is_none());

        let stats = engine.get_session_stats();
        assert_eq!(stats.total_interventions, 2);
        assert_eq!(stats.count(EmotionLabel::Confused), 1);
        assert_eq!(stats.count(EmotionLabel::Bored), 1);
    }

    #[test]
    fn reset_clears_counts_and_cooldowns() {
        let engine = engine();
        let now = Utc::now();
        assert!(engine.get_intervention_at(EmotionLabel::Anxious, 0.7, now).is_some());
        assert!(!engine.check_cooldown_at(EmotionLabel::Anxious, now));

        engine.reset_session_at(now);

        let stats = engine.get_session_stats();
        assert_eq!(stats.total_interventions, 0);
        assert!(stats.intervention_counts.values().all(|count| *count == 0));
        assert!(engine.check_cooldown_at(EmotionLabel::Anxious, now));
        assert!(engine.get_intervention_at(EmotionLabel::Anxious, 0.7, now).is_some());
    }

    #[test]
    fn messages_rotate_across_triggers() {
        let engine = engine();
        let start = Utc::now();
        let first = engine
            .get_intervention_at(EmotionLabel::Curious, 0.9, start)
            .unwrap();
        let second = engine
            .get_intervention_at(EmotionLabel::Curious, 0.9, start + Duration::seconds(20))
            .unwrap();
        assert_ne!(first.content, second.content);
        assert_eq!(engine.session_log().len(), 2);
    }

    #[test]
    fn silent_rules_fire_without_content() {
        let engine = engine();
        let focused = engine
            .get_intervention_at(EmotionLabel::Focused, 0.9, Utc::now())
            .unwrap();
        assert!(focused.silent);
        assert_eq!(focused.content, None);
        assert_eq!(focused.intervention_type, "suppress");
    }

    #[test]
    fn context_adds_topic_and_long_session_note() {
        let engine = engine();
        let now = Utc::now();
        let context = InterventionContext {
            topic: Some("linear algebra".into()),
            minutes_studying: Some(50),
        };

        let hint = engine
            .get_intervention_with_context_at(EmotionLabel::Confused, 0.8, &context, now)
            .unwrap();
        assert_eq!(hint.topic.as_deref(), Some("linear algebra"));

        let rest = engine
            .get_intervention_with_context_at(EmotionLabel::Frustrated, 0.8, &context, now)
            .unwrap();
        assert_eq!(rest.topic, None);
        assert!(rest.content.unwrap().contains("50 minutes"));

        let short = InterventionContext {
            topic: None,
            minutes_studying: Some(10),
        };
        let calm = engine
            .get_intervention_with_context_at(EmotionLabel::Overwhelmed, 0.8, &short, now)
            .unwrap();
        assert!(!calm.content.unwrap().contains("minutes"));
    }

    #[test]
    fn longest_cooldown_keeps_emotion_suppressed() {
        let mut table: std::collections::BTreeMap<EmotionLabel, crate::adaptive::InterventionRule> =
            InterventionRules::default().into();
        table.get_mut(&EmotionLabel::Bored).unwrap().cooldown_secs = (i64::MAX / 1_000) as u64;
        let engine = AdaptiveEngine::new(
            InterventionRules::new(table).unwrap(),
            AdaptiveConfig::default(),
        )
        .unwrap();

        let now = Utc::now();
        assert!(engine.get_intervention_at(EmotionLabel::Bored, 0.9, now).is_some());
        let later = now + Duration::days(365);
        assert!(engine.cooldown_remaining_at(EmotionLabel::Bored, later).is_some());
        assert!(engine.get_intervention_at(EmotionLabel::Bored, 0.9, later).is_none());
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let config = AdaptiveConfig {
            min_actionable_confidence: -0.1,
            ..AdaptiveConfig::default()
        };
        assert!(AdaptiveEngine::new(InterventionRules::default(), config).is_err());
    }
}
