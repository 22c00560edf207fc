//! The scheduler's unit of work.
//!
//! Every task carries a [`TaskHeader`] and is driven by repeated
//! [`NavigationTask::execute`] calls, each one slice of work.  A slice ends
//! when the task resolves or when the shared interrupt flag is raised.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use nav_core::{ProcessState, TaskId, TaskKind};

use crate::WorldModelManager;

/// Bookkeeping shared by all task kinds.
#[derive(Clone, Debug)]
pub struct TaskHeader {
    pub id:         TaskId,
    pub state:      ProcessState,
    /// Simulation time at which the task was created.
    pub start_time: f64,
    /// Wall-clock time spent inside `execute`.
    pub time_used:  Duration,
}

impl TaskHeader {
    pub fn new(id: TaskId, start_time: f64) -> Self {
        Self { id, state: ProcessState::Waiting, start_time, time_used: Duration::ZERO }
    }
}

/// What a task sees while it runs.
pub struct TaskContext<'a> {
    pub maps:            &'a WorldModelManager,
    pub interrupt:       &'a AtomicBool,
    pub simulation_time: f64,
}

impl<'a> TaskContext<'a> {
    pub fn new(maps: &'a WorldModelManager, interrupt: &'a AtomicBool, simulation_time: f64) -> Self {
        Self { maps, interrupt, simulation_time }
    }

    /// Checked by long-running tasks between units of work.
    #[inline]
    pub fn interrupt_requested(&self) -> bool {
        self.interrupt.load(Ordering::Acquire)
    }
}

pub trait NavigationTask: Send {
    fn header(&self) -> &TaskHeader;

    fn header_mut(&mut self) -> &mut TaskHeader;

    fn kind(&self) -> TaskKind;

    /// Run one slice.  Returns the state after the slice.
    fn execute(&mut self, ctx: &TaskContext<'_>) -> ProcessState;

    fn as_any(&self) -> &dyn Any;

    fn id(&self) -> TaskId {
        self.header().id
    }

    fn state(&self) -> ProcessState {
        self.header().state
    }

    /// Resolve as failed without further work.
    fn fail(&mut self) {
        self.header_mut().state = ProcessState::Failed;
    }

    fn time_used(&self) -> Duration {
        self.header().time_used
    }
}
