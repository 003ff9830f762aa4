use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use super::algorithm::FusionCandidate;
use crate::emotion::EmotionLabel;

#[derive(Debug, Clone, Copy)]
struct HistoryEntry {
    emotion: EmotionLabel,
    confidence: f64,
    at: DateTime<Utc>,
}

/// Last N fusion candidates; the emitted emotion is a confidence-weighted vote over them.
#[derive(Debug, Clone)]
pub struct SmoothingHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

#[derive(Default)]
struct Tally {
    weight: f64,
    count: usize,
    latest: Option<DateTime<Utc>>,
    // Position of the label's most recent entry, for same-timestamp ties.
    latest_index: usize,
}

impl SmoothingHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Appends a candidate (evicting the oldest past capacity) and returns the smoothed result.
    pub fn push(&mut self, candidate: FusionCandidate, at: DateTime<Utc>) -> FusionCandidate {
        self.entries.push_back(HistoryEntry {
            emotion: candidate.emotion,
            confidence: candidate.confidence,
            at,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.smoothed().unwrap_or(candidate)
    }

    /// Label with the highest summed confidence over the window; ties go to the label
    /// seen most recently. Confidence is the mean over that label's entries.
    pub fn smoothed(&self) -> Option<FusionCandidate> {
        let mut tallies: HashMap<EmotionLabel, Tally> = HashMap::new();
        for (index, entry) in self.entries.iter().enumerate() {
            let tally = tallies.entry(entry.emotion).or_default();
            tally.weight += entry.confidence;
            tally.count += 1;
            if tally.latest.map_or(true, |latest| entry.at >= latest) {
                tally.latest = Some(entry.at);
                tally.latest_index = index;
            }
        }

        tallies
            .into_iter()
            .max_by(|(_, a), (_, b)| {
                a.weight
                    .total_cmp(&b.weight)
                    .then_with(|| a.latest.cmp(&b.latest))
                    .then_with(|| a.latest_index.cmp(&b.latest_index))
            })
            .map(|(emotion, tally)| FusionCandidate {
                emotion,
                confidence: (tally.weight / tally.count as f64).clamp(0.0, 1.0),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn candidate(emotion: EmotionLabel, confidence: f64) -> FusionCandidate {
        FusionCandidate { emotion, confidence }
    }

    #[test]
    fn majority_suppresses_single_frame_flicker() {
        let start = Utc::now();
        let mut history = SmoothingHistory::new(3);
        history.push(candidate(EmotionLabel::Bored, 0.6), start);
        history.push(candidate(EmotionLabel::Bored, 0.6), start + Duration::seconds(1));
        let out = history.push(candidate(EmotionLabel::Curious, 0.7), start + Duration::seconds(2));

        assert_eq!(out.emotion, EmotionLabel::Bored);
        assert!((out.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn oldest_entries_are_evicted() {
        let start = Utc::now();
        let mut history = SmoothingHistory::new(3);
        history.push(candidate(EmotionLabel::Bored, 0.9), start);
        for i in 1..=3 {
            history.push(candidate(EmotionLabel::Focused, 0.5), start + Duration::seconds(i));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.smoothed().unwrap().emotion, EmotionLabel::Focused);
    }

    #[test]
    fn ties_go_to_most_recent_label() {
        let start = Utc::now();
        let mut history = SmoothingHistory::new(4);
        history.push(candidate(EmotionLabel::Anxious, 0.5), start);
        let out = history.push(candidate(EmotionLabel::Confident, 0.5), start + Duration::seconds(1));
        assert_eq!(out.emotion, EmotionLabel::Confident);
    }

    #[test]
    fn confidence_is_mean_of_winning_label() {
        let start = Utc::now();
        let mut history = SmoothingHistory::new(5);
        history.push(candidate(EmotionLabel::Confused, 0.9), start);
        history.push(candidate(EmotionLabel::Bored, 0.4), start + Duration::seconds(1));
        let out = history.push(candidate(EmotionLabel::Confused, 0.5), start + Duration::seconds(2));
        assert_eq!(out.emotion, EmotionLabel::Confused);
        assert!((out.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn all_neutral_window_reports_neutral_zero() {
        let start = Utc::now();
        let mut history = SmoothingHistory::new(3);
        history.push(FusionCandidate::neutral(), start);
        let out = history.push(FusionCandidate::neutral(), start + Duration::seconds(1));
        assert_eq!(out, FusionCandidate::neutral());
    }
}
