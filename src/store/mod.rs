//! Persistence: the record store for finished output and the progress
//! store for resumable checkpoints.

mod progress;
mod record;

pub use progress::ProgressStore;
pub use record::{RecordStore, RecordStoreStats, SqliteRecordStore, TaskRecord};
