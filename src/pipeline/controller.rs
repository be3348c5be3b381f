//! Run lifecycle: the main loop, signal-triggered draining, and the final
//! report.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::store::ProgressStore;

use super::executor::PipelineExecutor;
use super::matrix::GenerationTask;
use super::stats::RunStats;

/// Lifecycle states of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Running,
    /// A termination signal arrived; no new tasks start, the in-flight task
    /// finishes, progress is flushed.
    Draining,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Idle => write!(f, "idle"),
            LifecycleState::Running => write!(f, "running"),
            LifecycleState::Draining => write!(f, "draining"),
            LifecycleState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug)]
pub struct RunReport {
    pub stats: RunStats,
    /// True when the run stopped early because of a termination signal.
    pub drained: bool,
    /// True when the final progress flush failed.
    pub flush_failed: bool,
}

impl RunReport {
    /// Process exit code: zero for a clean drain or a completed run with no
    /// failures, non-zero otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.stats.failed > 0 || self.flush_failed {
            1
        } else {
            0
        }
    }
}

/// Owns the main loop and the in-memory progress registry.
///
/// Single-threaded and cooperative: one task in flight at a time, and the
/// only mutator of the progress store.
pub struct LifecycleController {
    executor: PipelineExecutor,
    progress: ProgressStore,
    flush_every: usize,
    shutdown: Arc<AtomicBool>,
    state: LifecycleState,
}

impl LifecycleController {
    pub fn new(executor: PipelineExecutor, progress: ProgressStore, flush_every: usize) -> Self {
        Self {
            executor,
            progress,
            // flush_every = 0 would mean "never checkpoint"; clamp to 1.
            flush_every: flush_every.max(1),
            shutdown: Arc::new(AtomicBool::new(false)),
            state: LifecycleState::Idle,
        }
    }

    /// Shared flag that, once set, stops the loop from pulling new tasks.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Install interrupt/termination listeners that request a drain.
    ///
    /// The in-flight task is never killed mid-stage; the loop checks the
    /// flag between tasks.
    pub fn install_signal_handlers(&self) {
        let flag = Arc::clone(&self.shutdown);
        tokio::spawn(async move {
            shutdown_signal().await;
            tracing::info!("Termination signal received, draining after the current task");
            flag.store(true, Ordering::Relaxed);
        });
    }

    /// Run the remaining task queue to completion or drain.
    pub async fn run(mut self, tasks: Vec<GenerationTask>) -> RunReport {
        self.state = LifecycleState::Running;
        let total = tasks.len();
        let mut stats = RunStats::new();
        let mut since_flush = 0usize;

        tracing::info!(tasks = total, "Pipeline run started");

        for (index, task) in tasks.iter().enumerate() {
            if self.shutdown.load(Ordering::Relaxed) {
                self.state = LifecycleState::Draining;
                tracing::info!(
                    completed = index,
                    remaining = total - index,
                    "Draining, remaining tasks are left for the next run"
                );
                break;
            }

            let id = task.id();
            match self.executor.execute(task).await {
                Ok(outcome) => {
                    stats.record_success(&outcome.usage, outcome.degraded);
                    self.progress.mark_complete(id.clone());
                    since_flush += 1;

                    if since_flush >= self.flush_every {
                        match self.progress.flush() {
                            Ok(()) => since_flush = 0,
                            Err(e) => {
                                tracing::warn!(error = %e, "Periodic progress flush failed")
                            }
                        }
                    }

                    tracing::info!(
                        task = %id,
                        record_id = outcome.record_id,
                        degraded = outcome.degraded,
                        position = index + 1,
                        total = total,
                        "Task completed"
                    );
                }
                Err(failure) => {
                    tracing::error!(
                        task = %failure.id,
                        error = failure.message.as_str(),
                        position = index + 1,
                        total = total,
                        "Task failed, continuing with the next task"
                    );
                    stats.record_failure(failure);
                    self.executor.cooldown().await;
                }
            }
        }

        let drained = self.state == LifecycleState::Draining;

        // Unconditional flush on every exit path, best effort.
        let flush_failed = match self.progress.flush() {
            Ok(()) => false,
            Err(e) => {
                tracing::error!(error = %e, "Final progress flush failed");
                true
            }
        };

        stats.report();
        self.state = LifecycleState::Stopped;

        RunReport {
            stats,
            drained,
            flush_failed,
        }
    }
}

/// Resolves when an interrupt or termination signal arrives.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler, listening for ctrl-c only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
