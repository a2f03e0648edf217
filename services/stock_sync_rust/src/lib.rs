pub mod config;
pub mod orchestrator;

pub use config::Config;
pub use orchestrator::{Orchestrator, RunSummary, SyncFailure, SyncTarget};
