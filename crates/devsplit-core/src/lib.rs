pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod ownership;
pub mod path;
pub mod progress;
pub mod records;
pub mod state;
pub mod tree;

pub use config::AppConfig;
pub use engine::{DeviceEngine, DeviceSummary, PlanOutcome};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
