use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{emotion::EmotionLabel, error::ConfigError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// How the interface should respond to one emotion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterventionRule {
    pub intervention_type: String,
    pub priority: Priority,
    /// Rotated through as the rule keeps firing within a session.
    #[serde(default)]
    pub templates: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    pub cooldown_secs: u64,
    /// Silent rules are tracked but show nothing to the learner.
    #[serde(default)]
    pub silent: bool,
}

impl InterventionRule {
    fn new(intervention_type: &str, priority: Priority, cooldown_secs: u64) -> Self {
        Self {
            intervention_type: intervention_type.to_string(),
            priority,
            templates: Vec::new(),
            actions: Vec::new(),
            cooldown_secs,
            silent: false,
        }
    }

    fn templates(mut self, templates: &[&str]) -> Self {
        self.templates = templates.iter().map(|t| t.to_string()).collect();
        self
    }

    fn actions(mut self, actions: &[&str]) -> Self {
        self.actions = actions.iter().map(|a| a.to_string()).collect();
        self
    }

    fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Template for the `fired`-th trigger of this rule; `None` for silent or empty rules.
    pub fn content_template(&self, fired: u32) -> Option<&str> {
        if self.silent || self.templates.is_empty() {
            return None;
        }
        let index = fired as usize % self.templates.len();
        Some(self.templates[index].as_str())
    }

    /// `None` when `cooldown_secs` does not fit a `chrono::Duration`.
    fn try_cooldown(&self) -> Option<chrono::Duration> {
        i64::try_from(self.cooldown_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }

    pub fn cooldown(&self) -> chrono::Duration {
        // Tables are validated on construction, so the fallback is unreachable in practice.
        self.try_cooldown().unwrap_or_else(chrono::Duration::max_value)
    }
}

/// Read-only emotion → rule table. Every label must have a rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    try_from = "BTreeMap<EmotionLabel, InterventionRule>",
    into = "BTreeMap<EmotionLabel, InterventionRule>"
)]
pub struct InterventionRules {
    rules: BTreeMap<EmotionLabel, InterventionRule>,
}

impl From<InterventionRules> for BTreeMap<EmotionLabel, InterventionRule> {
    fn from(table: InterventionRules) -> Self {
        table.rules
    }
}

impl TryFrom<BTreeMap<EmotionLabel, InterventionRule>> for InterventionRules {
    type Error = ConfigError;

    fn try_from(rules: BTreeMap<EmotionLabel, InterventionRule>) -> Result<Self, Self::Error> {
        if let Some(missing) = EmotionLabel::ALL
            .into_iter()
            .find(|label| !rules.contains_key(label))
        {
            return Err(ConfigError::MissingRule(missing));
        }
        if let Some((emotion, rule)) = rules.iter().find(|(_, rule)| rule.try_cooldown().is_none()) {
            return Err(ConfigError::InvalidCooldown {
                emotion: *emotion,
                secs: rule.cooldown_secs,
            });
        }
        Ok(Self { rules })
    }
}

impl InterventionRules {
    pub fn new(rules: BTreeMap<EmotionLabel, InterventionRule>) -> Result<Self, ConfigError> {
        Self::try_from(rules)
    }

    pub fn get(&self, emotion: EmotionLabel) -> &InterventionRule {
        // Construction guarantees an entry for every label.
        &self.rules[&emotion]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EmotionLabel, &InterventionRule)> {
        self.rules.iter()
    }
}

impl Default for InterventionRules {
    fn default() -> Self {
        use EmotionLabel::*;
        use Priority::*;

        let rules = BTreeMap::from([
            (
                Confused,
                InterventionRule::new("hint", High, 30)
                    .templates(&[
                        "Looks like this part is tricky. Want a hint?",
                        "Let's split this into smaller steps.",
                        "Here is a simpler way to look at this idea.",
                        "Try working through just the first piece on its own.",
                        "A good place to start is with a worked example.",
                    ])
                    .actions(&["show_hint", "simplify_content", "show_example"]),
            ),
            (
                Overwhelmed,
                InterventionRule::new("simplify", High, 45)
                    .templates(&[
                        "That's a lot at once. Let's narrow it down.",
                        "You don't need all of it right now.",
                        "Let's stick to the core idea for the moment.",
                        "One step at a time is plenty.",
                        "Here are just the key points.",
                    ])
                    .actions(&["reduce_content", "highlight_key_points", "suggest_break"]),
            ),
            (
                Frustrated,
                InterventionRule::new("break", High, 60)
                    .templates(&[
                        "Being stuck is normal. How about a two-minute break?",
                        "Stepping away for a moment often helps. Take a slow breath.",
                        "You've been pushing hard. A short pause can reset things.",
                        "Let's take a quick breather together.",
                        "Everyone who knows this once found it hard too.",
                    ])
                    .actions(&["suggest_break", "show_encouragement", "offer_alternative_topic"]),
            ),
            (
                Bored,
                InterventionRule::new("challenge", Medium, 40)
                    .templates(&[
                        "Up for a challenge? Let's make this more interesting.",
                        "Quick quiz: can you solve this one?",
                        "Here's a puzzle built on what you just covered.",
                        "Let's try a harder example.",
                        "Can you explain this idea in your own words?",
                    ])
                    .actions(&["show_quiz", "increase_difficulty", "gamify_content"]),
            ),
            (
                Curious,
                InterventionRule::new("explore", Medium, 20)
                    .templates(&[
                        "Here's something related you might enjoy.",
                        "Want to go deeper? Take a look at this.",
                        "A related fact worth knowing:",
                        "Here's a more advanced angle on the same idea.",
                        "This connects to another topic in an interesting way.",
                    ])
                    .actions(&["show_deep_dive", "suggest_related_topics", "show_advanced_content"]),
            ),
            (
                Anxious,
                InterventionRule::new("reassure", High, 45)
                    .templates(&[
                        "You're doing fine. There's no rush.",
                        "Going at your own pace is the right pace.",
                        "Not knowing everything yet is part of learning.",
                        "You've already made progress. Let's build on it.",
                        "Slow breath. You can do this.",
                    ])
                    .actions(&["show_encouragement", "reduce_pressure", "show_progress"]),
            ),
            (
                Confident,
                InterventionRule::new("encourage", Low, 60)
                    .templates(&[
                        "Great momentum. Keep going!",
                        "Solid understanding. Ready for more?",
                        "You've got this down. Want to try something harder?",
                        "Nice progress, your grasp of this is strong.",
                        "Try teaching this back to lock it in.",
                    ])
                    .actions(&["increase_difficulty", "suggest_next_topic", "minimal_interruption"]),
            ),
            (
                Focused,
                InterventionRule::new("suppress", Low, 600)
                    .actions(&["suppress_notifications", "track_focus_duration"])
                    .silent(),
            ),
            (
                Neutral,
                InterventionRule::new("observe", Low, 300)
                    .actions(&["track_state"])
                    .silent(),
            ),
        ]);

        Self { rules }
    }
}
