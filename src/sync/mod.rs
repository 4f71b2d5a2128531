//! The price synchronization engine

pub mod config;
pub mod report;
pub mod scheduler;

pub use config::SyncConfig;
pub use report::{CycleReport, SyncError};
pub use scheduler::Scheduler;
