pub mod label;
pub mod reading;

pub use label::{EmotionLabel, LabelMap};
pub use reading::{EmotionReading, ModalityKind};
