//! The batch generation pipeline.
//!
//! Builds the (project × template) task matrix, subtracts completed work,
//! and drives each remaining task through the ordered generation stages
//! with rate limiting, checkpointing, and isolated per-task failure.

pub mod config;
mod controller;
mod executor;
mod matrix;
mod rate_limit;
mod stats;

pub use config::{ConfigError, PipelineConfig};
pub use controller::{LifecycleController, LifecycleState, RunReport};
pub use executor::{PipelineExecutor, TaskOutcome};
pub use matrix::{GenerationTask, TaskMatrixBuilder};
pub use rate_limit::RateLimiter;
pub use stats::{RunStats, TaskFailure};
