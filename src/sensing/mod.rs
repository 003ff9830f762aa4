pub mod classifier;
pub mod config;
pub mod controller;
mod loop_worker;
pub mod simulated;
pub mod slot;

pub use classifier::{Classifier, RawSample};
pub use config::{AdapterConfig, SensingConfig};
pub use controller::ModalityAdapter;
pub use simulated::{SimulatedClassifier, SimulationProfile};
pub use slot::ReadingSlot;
