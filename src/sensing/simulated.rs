use anyhow::{bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::classifier::{Classifier, RawSample};

/// Knobs for a classifier that stands in for a real camera or microphone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationProfile {
    /// Raw labels in the simulated model's own vocabulary.
    pub vocabulary: Vec<String>,
    /// Index into `vocabulary` that comes up more often than the rest.
    pub dominant: usize,
    /// Chance that a sample returns the dominant label.
    pub dominance: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
    /// Chance that a sample fails outright.
    pub failure_rate: f64,
    /// Simulate a missing device.
    pub device_available: bool,
}

impl SimulationProfile {
    pub fn facial() -> Self {
        Self {
            vocabulary: ["neutral", "happy", "sad", "angry", "fear", "surprise", "disgust"]
                .into_iter()
                .map(String::from)
                .collect(),
            ..Self::default()
        }
    }

    pub fn voice() -> Self {
        Self {
            vocabulary: ["calm", "positive", "negative", "bored", "confused", "anxious"]
                .into_iter()
                .map(String::from)
                .collect(),
            ..Self::default()
        }
    }
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            vocabulary: vec!["neutral".into()],
            dominant: 0,
            dominance: 0.6,
            min_confidence: 0.35,
            max_confidence: 0.95,
            failure_rate: 0.05,
            device_available: true,
        }
    }
}

pub struct SimulatedClassifier {
    profile: SimulationProfile,
    rng: StdRng,
    open: bool,
}

impl SimulatedClassifier {
    pub fn new(profile: SimulationProfile) -> Self {
        Self {
            profile,
            rng: StdRng::from_entropy(),
            open: false,
        }
    }

    pub fn seeded(profile: SimulationProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: StdRng::seed_from_u64(seed),
            open: false,
        }
    }
}

impl Classifier for SimulatedClassifier {
    fn open(&mut self) -> Result<()> {
        if !self.profile.device_available {
            bail!("simulated device not present");
        }
        if self.profile.vocabulary.is_empty() {
            bail!("simulation profile has an empty vocabulary");
        }
        self.open = true;
        Ok(())
    }

    fn sample(&mut self) -> Result<RawSample> {
        if !self.open {
            bail!("device is closed");
        }
        if self.rng.gen_bool(self.profile.failure_rate.clamp(0.0, 1.0)) {
            bail!("simulated capture glitch");
        }

        let vocabulary = &self.profile.vocabulary;
        let index = if self.rng.gen_bool(self.profile.dominance.clamp(0.0, 1.0)) {
            self.profile.dominant.min(vocabulary.len() - 1)
        } else {
            self.rng.gen_range(0..vocabulary.len())
        };

        let low = self.profile.min_confidence.clamp(0.0, 1.0);
        let high = self.profile.max_confidence.clamp(low, 1.0);
        let confidence = if high > low {
            self.rng.gen_range(low..high)
        } else {
            low
        };

        Ok(RawSample::new(vocabulary[index].clone(), confidence))
    }

    fn close(&mut self) {
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::LabelMap;

    #[test]
    fn sampling_requires_open_device() {
        let mut classifier = SimulatedClassifier::seeded(SimulationProfile::facial(), 7);
        assert!(classifier.sample().is_err());
        classifier.open().unwrap();
        classifier.close();
        assert!(classifier.sample().is_err());
    }

    #[test]
    fn missing_device_fails_to_open() {
        let profile = SimulationProfile {
            device_available: false,
            ..SimulationProfile::voice()
        };
        assert!(SimulatedClassifier::seeded(profile, 1).open().is_err());
    }

    #[test]
    fn samples_stay_in_vocabulary_and_range() {
        let profile = SimulationProfile {
            failure_rate: 0.0,
            ..SimulationProfile::voice()
        };
        let map = LabelMap::voice_default();
        let mut classifier = SimulatedClassifier::seeded(profile.clone(), 42);
        classifier.open().unwrap();

        for _ in 0..200 {
            let sample = classifier.sample().unwrap();
            assert!(profile.vocabulary.contains(&sample.label));
            assert!(sample.confidence >= profile.min_confidence);
            assert!(sample.confidence < profile.max_confidence);
            assert!(map.translate(&sample.label).is_ok());
        }
    }
}
