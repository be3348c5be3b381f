//! Project and template catalogs.
//!
//! Catalogs are supplied externally as JSON files and are immutable for the
//! duration of a pipeline run.

mod loader;
mod types;

pub use loader::{load_projects, load_templates};
pub use types::{ParseTaskIdError, Project, TaskId, Template};
