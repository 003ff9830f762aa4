pub mod emotion_log;
pub mod intervention_log;
pub mod study_session;

pub use emotion_log::EmotionLog;
pub use intervention_log::InterventionLog;
pub use study_session::{StudySession, StudySessionStatus};
