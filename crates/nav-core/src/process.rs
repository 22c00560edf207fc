//! Task state machine shared by every schedulable navigation task.
//!
//! ```text
//! WAITING ──▶ RUNNING ──▶ FINISHED
//!                │  ▲  └─▶ FAILED
//!                ▼  │
//!            INTERRUPTED
//! ```

use std::fmt;

/// Lifecycle state of a navigation task.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProcessState {
    /// Created but `execute` has not been called yet.
    #[default]
    Waiting,
    /// Inside an `execute` slice.
    Running,
    /// Completed successfully; a result can be fetched.
    Finished,
    /// Completed without a usable result (no path, canceled, bad config).
    Failed,
    /// Paused between slices; calling `execute` again resumes it.
    Interrupted,
}

impl ProcessState {
    /// `true` once the task will never run again.
    #[inline]
    pub fn is_resolved(self) -> bool {
        matches!(self, ProcessState::Finished | ProcessState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessState::Waiting     => "waiting",
            ProcessState::Running     => "running",
            ProcessState::Finished    => "finished",
            ProcessState::Failed      => "failed",
            ProcessState::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete kind of a schedulable task.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaskKind {
    PathSearch,
    MapUpdate,
    /// Placeholder standing in for a request that could not be built.
    Dummy,
}
