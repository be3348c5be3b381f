//! Run statistics and the final report.
//!
//! Counters are scoped to one process lifetime and never persisted; every
//! run recomputes them from zero, independent of the progress snapshot.

use crate::catalog::TaskId;
use crate::llm::Usage;

/// A task that ended in fatal failure, with its error message.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub id: TaskId,
    pub message: String,
}

/// Counters accumulated over one run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Tasks executed (succeeded + failed).
    pub total: u64,
    /// Tasks that completed and were persisted.
    pub succeeded: u64,
    /// Tasks that ended in fatal failure.
    pub failed: u64,
    /// Succeeded tasks whose secondary stage fell back to primary content.
    pub degraded: u64,
    /// Token usage summed across all generation calls.
    pub usage: Usage,
    /// Every fatal failure, in execution order.
    pub failures: Vec<TaskFailure>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed task.
    pub fn record_success(&mut self, usage: &Usage, degraded: bool) {
        self.total += 1;
        self.succeeded += 1;
        if degraded {
            self.degraded += 1;
        }
        self.usage.add(usage);
    }

    /// Records a fatally failed task.
    pub fn record_failure(&mut self, failure: TaskFailure) {
        self.total += 1;
        self.failed += 1;
        self.failures.push(failure);
    }

    /// Log the final run report: the summary line plus one line per failed
    /// task.
    pub fn report(&self) {
        tracing::info!(
            total = self.total,
            succeeded = self.succeeded,
            failed = self.failed,
            degraded = self.degraded,
            prompt_tokens = self.usage.prompt_tokens,
            completion_tokens = self.usage.completion_tokens,
            total_tokens = self.usage.total_tokens,
            "Run complete"
        );

        for failure in &self.failures {
            tracing::error!(task = %failure.id, error = failure.message.as_str(), "Task failed");
        }
    }
}
