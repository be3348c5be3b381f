//! Durable progress tracking for resumable runs.
//!
//! The snapshot is a single JSON blob overwritten wholesale on each flush
//! and re-read in full at startup. Corrupt or missing files load as empty
//! progress; a restart must never fail because of a damaged checkpoint.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::TaskId;
use crate::error::StoreError;

/// On-disk form of the snapshot. Unknown fields are tolerated so older
/// binaries can read files written by newer ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProgressSnapshot {
    completed_task_ids: Vec<String>,
    cursor: u64,
}

/// Owned registry of completed tasks, flushed periodically and on shutdown.
///
/// Single-writer by design: the lifecycle controller is the only mutator,
/// so no locking is needed.
pub struct ProgressStore {
    path: PathBuf,
    completed: HashSet<TaskId>,
    cursor: u64,
    dirty: bool,
}

impl ProgressStore {
    /// Load the last-persisted snapshot, or start empty if the file is
    /// missing or unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let snapshot = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<ProgressSnapshot>(&raw) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Progress file is corrupt, starting with empty progress"
                    );
                    ProgressSnapshot::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ProgressSnapshot::default(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Progress file is unreadable, starting with empty progress"
                );
                ProgressSnapshot::default()
            }
        };

        let mut completed = HashSet::new();
        for raw_id in &snapshot.completed_task_ids {
            match raw_id.parse::<TaskId>() {
                Ok(id) => {
                    completed.insert(id);
                }
                Err(e) => {
                    tracing::warn!(id = raw_id.as_str(), error = %e, "Skipping malformed task id");
                }
            }
        }

        tracing::info!(
            path = %path.display(),
            completed = completed.len(),
            cursor = snapshot.cursor,
            "Progress snapshot loaded"
        );

        Self {
            path,
            completed,
            cursor: snapshot.cursor,
            dirty: false,
        }
    }

    /// Whether the task is already recorded as complete.
    pub fn contains(&self, id: &TaskId) -> bool {
        self.completed.contains(id)
    }

    /// Record a task as complete in memory. Durable only after `flush`.
    pub fn mark_complete(&mut self, id: TaskId) {
        if self.completed.insert(id) {
            self.cursor += 1;
            self.dirty = true;
        }
    }

    /// Number of completed tasks in the snapshot.
    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    /// Monotonic completion cursor.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Serialize the snapshot and overwrite the durable copy atomically
    /// (write to a sibling temp file, then rename). Idempotent and
    /// last-write-wins.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let mut ids: Vec<String> = self.completed.iter().map(TaskId::to_string).collect();
        ids.sort();

        let snapshot = ProgressSnapshot {
            completed_task_ids: ids,
            cursor: self.cursor,
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        let dir = dir.unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        self.dirty = false;
        tracing::debug!(
            path = %self.path.display(),
            completed = self.completed.len(),
            "Progress snapshot flushed"
        );
        Ok(())
    }
}

impl Drop for ProgressStore {
    fn drop(&mut self) {
        // Best-effort: a panic unwinding past the run loop still persists
        // whatever was marked complete since the last flush.
        if self.dirty {
            if let Err(e) = self.flush() {
                tracing::warn!(error = %e, "Best-effort progress flush on drop failed");
            }
        }
    }
}
