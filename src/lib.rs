//! docforge: batch document generation over project/template catalogs.
//!
//! The pipeline enumerates the cross product of a project catalog and a
//! template catalog, runs each pair through an ordered sequence of LLM
//! generation stages, and persists one record per completed pair. Progress
//! is checkpointed to a JSON snapshot so an interrupted or crashed run can
//! resume without repeating completed work.

pub mod catalog;
pub mod cli;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod store;

pub use error::{CatalogError, LlmError, StoreError};
