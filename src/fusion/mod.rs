pub mod algorithm;
pub mod config;
pub mod engine;
pub mod smoothing;
pub mod state;

pub use algorithm::{fuse_readings, FusionCandidate};
pub use config::FusionConfig;
pub use engine::FusionEngine;
pub use state::{FusedState, ModalityHealth};
