use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One classification in the classifier's own vocabulary, before label translation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawSample {
    pub label: String,
    pub confidence: f64,
}

impl RawSample {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// A device-backed emotion recognizer (webcam expression model, microphone prosody model).
///
/// All methods block; the adapter calls them from `spawn_blocking`.
pub trait Classifier: Send + 'static {
    /// Acquire the device. Failure makes the adapter unavailable.
    fn open(&mut self) -> Result<()>;

    /// Capture and classify one sample.
    fn sample(&mut self) -> Result<RawSample>;

    /// Release the device. Must tolerate being called when already closed.
    fn close(&mut self);
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn sample(&mut self) -> Result<RawSample> {
        (**self).sample()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
