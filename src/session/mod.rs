pub mod config;
pub mod controller;
pub mod state;

pub use config::SessionConfig;
pub use controller::{recover_incomplete_session, StudySessionController};
pub use state::{SessionEvent, SessionSummary};
