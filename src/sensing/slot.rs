use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    emotion::{EmotionReading, ModalityKind},
    error::SensingError,
};

#[derive(Debug, Default)]
struct SlotState {
    reading: Option<EmotionReading>,
    consecutive_failures: u32,
    last_error: Option<String>,
}

/// Single most-recent reading shared between a sampling loop and its readers.
///
/// Only the newest value matters, so writers replace and readers clone under a
/// lock that is never held across an await or a classifier call.
#[derive(Debug, Clone)]
pub struct ReadingSlot {
    modality: ModalityKind,
    inner: Arc<Mutex<SlotState>>,
}

impl ReadingSlot {
    pub fn new(modality: ModalityKind) -> Self {
        Self {
            modality,
            inner: Arc::new(Mutex::new(SlotState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn publish(&self, reading: EmotionReading) {
        let mut guard = self.lock();
        guard.reading = Some(reading);
        guard.consecutive_failures = 0;
        guard.last_error = None;
    }

    /// Records a failed sampling tick and returns the failure streak length.
    /// The last good reading stays in place.
    pub fn record_failure(&self, reason: impl Into<String>) -> u32 {
        let mut guard = self.lock();
        guard.consecutive_failures = guard.consecutive_failures.saturating_add(1);
        guard.last_error = Some(reason.into());
        guard.consecutive_failures
    }

    /// Latest reading, or the pending failure if the most recent tick failed.
    pub fn load(&self) -> Result<Option<EmotionReading>, SensingError> {
        let guard = self.lock();
        match &guard.last_error {
            Some(reason) if guard.consecutive_failures > 0 => {
                Err(SensingError::TransientReadFailure {
                    modality: self.modality,
                    consecutive: guard.consecutive_failures,
                    reason: reason.clone(),
                })
            }
            _ => Ok(guard.reading.clone()),
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    pub fn clear(&self) {
        *self.lock() = SlotState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionLabel;
    use chrono::Utc;

    fn reading(label: EmotionLabel) -> EmotionReading {
        EmotionReading::new(label, 0.8, ModalityKind::Voice, Utc::now()).unwrap()
    }

    #[test]
    fn empty_slot_has_no_reading() {
        let slot = ReadingSlot::new(ModalityKind::Voice);
        assert_eq!(slot.load(), Ok(None));
    }

    #[test]
    fn failure_masks_reading_until_next_publish() {
        let slot = ReadingSlot::new(ModalityKind::Voice);
        slot.publish(reading(EmotionLabel::Bored));

        assert_eq!(slot.record_failure("mic glitch"), 1);
        assert_eq!(slot.record_failure("mic glitch"), 2);
        match slot.load() {
            Err(SensingError::TransientReadFailure { consecutive, .. }) => assert_eq!(consecutive, 2),
            other => panic!("expected transient failure, got {other:?}"),
        }

        slot.publish(reading(EmotionLabel::Curious));
        assert_eq!(slot.consecutive_failures(), 0);
        assert_eq!(slot.load().unwrap().unwrap().label, EmotionLabel::Curious);
    }

    #[test]
    fn clones_share_the_same_slot() {
        let slot = ReadingSlot::new(ModalityKind::Facial);
        let writer = slot.clone();
        writer.publish(reading(EmotionLabel::Anxious));
        assert_eq!(slot.load().unwrap().unwrap().label, EmotionLabel::Anxious);

        slot.clear();
        assert_eq!(writer.load(), Ok(None));
    }
}
