use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::EmotionError;

/// Canonical emotion taxonomy shared by every modality.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Confused,
    Frustrated,
    Bored,
    Curious,
    Anxious,
    Confident,
    Overwhelmed,
    Focused,
    Neutral,
}

impl Default for EmotionLabel {
    fn default() -> Self {
        EmotionLabel::Neutral
    }
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 9] = [
        EmotionLabel::Confused,
        EmotionLabel::Frustrated,
        EmotionLabel::Bored,
        EmotionLabel::Curious,
        EmotionLabel::Anxious,
        EmotionLabel::Confident,
        EmotionLabel::Overwhelmed,
        EmotionLabel::Focused,
        EmotionLabel::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Confused => "confused",
            EmotionLabel::Frustrated => "frustrated",
            EmotionLabel::Bored => "bored",
            EmotionLabel::Curious => "curious",
            EmotionLabel::Anxious => "anxious",
            EmotionLabel::Confident => "confident",
            EmotionLabel::Overwhelmed => "overwhelmed",
            EmotionLabel::Focused => "focused",
            EmotionLabel::Neutral => "neutral",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = EmotionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        EmotionLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == normalized)
            .ok_or_else(|| EmotionError::UnknownLabel(value.to_string()))
    }
}

/// Translates a classifier's own vocabulary into [`EmotionLabel`].
///
/// Explicit entries win over canonical names, so a facial model's `neutral`
/// can be read as `focused`. Names that are neither mapped nor canonical are
/// rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct LabelMap {
    entries: HashMap<String, EmotionLabel>,
}

impl LabelMap {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, EmotionLabel)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(raw, label)| (raw.into().to_ascii_lowercase(), label))
                .collect(),
        }
    }

    /// DeepFace-style facial expression classes.
    pub fn facial_default() -> Self {
        Self::new([
            ("angry", EmotionLabel::Frustrated),
            ("disgust", EmotionLabel::Frustrated),
            ("fear", EmotionLabel::Anxious),
            ("happy", EmotionLabel::Confident),
            ("sad", EmotionLabel::Overwhelmed),
            ("surprise", EmotionLabel::Curious),
            ("neutral", EmotionLabel::Focused),
        ])
    }

    /// Voice sentiment classes.
    pub fn voice_default() -> Self {
        Self::new([
            ("positive", EmotionLabel::Confident),
            ("negative", EmotionLabel::Frustrated),
            ("calm", EmotionLabel::Focused),
        ])
    }

    pub fn translate(&self, raw: &str) -> Result<EmotionLabel, EmotionError> {
        let key = raw.trim().to_ascii_lowercase();
        match self.entries.get(&key) {
            Some(label) => Ok(*label),
            None => key.parse(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
