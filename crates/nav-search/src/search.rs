//! The `PathSearch` task contract and the failed placeholder task.

use std::any::Any;

use nav_core::{Pose, ProcessState, TaskId, TaskKind};
use nav_world::{NavigationTask, TaskContext, TaskHeader};

use crate::{NavigationPath, PathSearchConfiguration};

/// A schedulable path search.
pub trait PathSearch: NavigationTask {
    fn configuration(&self) -> &PathSearchConfiguration;

    /// Copy the result into `out`.  `current` is the caller's latest pose;
    /// the path is anchored at it when given.
    ///
    /// Writes nothing (leaving `out` empty) unless the search has resolved
    /// with a path: a full one when finished, a partial one when it failed
    /// under the move-to-closest policy.
    fn write_resulting_path(&self, current: Option<Pose>, out: &mut NavigationPath);

    /// States expanded so far, over both maps.
    fn num_expanded_search_states(&self) -> usize;

    /// Cheap pre-check: did setup find any goal candidate?  Only used to
    /// annotate failures.
    fn is_goal_reachable(&self) -> bool;
}

// ── NavigationDummyTask ───────────────────────────────────────────────────────

/// Stand-in for a request that could not be turned into a search (unknown
/// map, invalid configuration).  Resolved as failed from the start.
pub struct NavigationDummyTask {
    header: TaskHeader,
    config: PathSearchConfiguration,
}

impl NavigationDummyTask {
    pub fn new(id: TaskId, start_time: f64, config: PathSearchConfiguration) -> Self {
        let mut header = TaskHeader::new(id, start_time);
        header.state = ProcessState::Failed;
        Self { header, config }
    }
}

impl NavigationTask for NavigationDummyTask {
    fn header(&self) -> &TaskHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TaskHeader {
        &mut self.header
    }

    fn kind(&self) -> TaskKind {
        TaskKind::Dummy
    }

    fn execute(&mut self, _ctx: &TaskContext<'_>) -> ProcessState {
        self.header.state
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl PathSearch for NavigationDummyTask {
    fn configuration(&self) -> &PathSearchConfiguration {
        &self.config
    }

    fn write_resulting_path(&self, _current: Option<Pose>, out: &mut NavigationPath) {
        out.clear();
    }

    fn num_expanded_search_states(&self) -> usize {
        0
    }

    fn is_goal_reachable(&self) -> bool {
        false
    }
}
