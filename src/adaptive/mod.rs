pub mod engine;
pub mod rules;
pub mod state;

pub use engine::{AdaptiveConfig, AdaptiveEngine};
pub use rules::{InterventionRule, InterventionRules, Priority};
pub use state::{CooldownState, Intervention, InterventionContext, SessionStats};
