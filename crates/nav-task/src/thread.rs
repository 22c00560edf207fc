//! `NavigationTaskThread` — the navigation scheduler.
//!
//! # Queues
//!
//! ```text
//!   request_search ──▶ pending_priority ─┐
//!                  └─▶ pending_regular ──┤
//!   request_map_update ─▶ map_updates ───┤
//!                                        ▼
//!                              worker: one task at a time
//!                                        │
//!              interrupted ◀─────────────┤
//!              (running, back)           │ resolved
//!                                        ▼
//!                                     finished ──▶ try_fetch_result
//! ```
//!
//! The worker takes the next task in this order: map updates, priority
//! searches, interrupted searches (longest waiting first), regular searches.
//! Every task lives in exactly one queue, or is in flight on the worker.
//!
//! All queue state sits behind one mutex.  The worker drops it while a task
//! executes, so callers never wait on a search.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use nav_core::serialize::io_vec;
use nav_core::{MapId, NavResult, Pose, ProcessState, Serializer, TaskId};
use nav_search::{create_search, NavigationPath, PathSearch, PathSearchConfiguration};
use nav_world::{MapChange, MapReconnectionTask, NavigationTask, TaskContext, WorldModelManager};

use crate::{NavigationConfig, TaskError, TaskResult};

type SearchTask = Box<dyn PathSearch>;
type UpdateTask = Box<dyn NavigationTask>;

enum Job {
    Search(SearchTask),
    MapUpdate(UpdateTask),
}

/// The task currently executing on the worker.
struct InFlight {
    id:     TaskId,
    /// `None` for map updates.
    config: Option<PathSearchConfiguration>,
}

/// Snapshot of the queue sizes.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct QueueLengths {
    pub running:          usize,
    pub pending_regular:  usize,
    pub pending_priority: usize,
    pub map_updates:      usize,
    pub finished:         usize,
    /// A task is executing right now.
    pub in_flight:        bool,
}

/// One search as written by [`NavigationTaskThread::serialize`].
#[derive(Default)]
struct PersistedSearch {
    id:     TaskId,
    config: PathSearchConfiguration,
}

// ── Queues ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Queues {
    next_id:          u64,
    simulation_time:  f64,
    since_interrupt:  f64,
    running:          VecDeque<SearchTask>,
    pending_regular:  VecDeque<SearchTask>,
    pending_priority: VecDeque<SearchTask>,
    map_updates:      VecDeque<UpdateTask>,
    finished:         VecDeque<SearchTask>,
    current:          Option<InFlight>,
    /// Set by `cancel_search` for the in-flight task; read after its slice.
    fail_current:     bool,
}

impl Queues {
    fn allocate_id(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        id
    }

    fn enqueue_search(&mut self, task: SearchTask) {
        if task.state().is_resolved() {
            self.finished.push_back(task);
        } else if task.configuration().is_priority() {
            self.pending_priority.push_back(task);
        } else {
            self.pending_regular.push_back(task);
        }
    }

    fn pop_next(&mut self) -> Option<Job> {
        if let Some(task) = self.map_updates.pop_front() {
            self.current = Some(InFlight { id: task.id(), config: None });
            return Some(Job::MapUpdate(task));
        }
        let task = self
            .pending_priority
            .pop_front()
            .or_else(|| self.running.pop_front())
            .or_else(|| self.pending_regular.pop_front())?;
        self.current = Some(InFlight { id: task.id(), config: Some(task.configuration().clone()) });
        Some(Job::Search(task))
    }

    fn search_in_flight(&self) -> bool {
        self.current.as_ref().is_some_and(|c| c.config.is_some())
    }

    /// Remove a search that is waiting in any of the unresolved queues.
    fn take_unresolved(&mut self, id: TaskId) -> Option<SearchTask> {
        for queue in [&mut self.pending_priority, &mut self.pending_regular, &mut self.running] {
            if let Some(pos) = queue.iter().position(|t| t.id() == id) {
                return queue.remove(pos);
            }
        }
        None
    }

    /// What a poller sees for a queued search: `Waiting` before its first
    /// slice, `Running` once it has been started and paused.
    fn polled_state(&self, id: TaskId) -> Option<ProcessState> {
        if self.pending_priority.iter().chain(self.pending_regular.iter()).any(|t| t.id() == id) {
            return Some(ProcessState::Waiting);
        }
        self.running.iter().any(|t| t.id() == id).then_some(ProcessState::Running)
    }

    /// In-flight search first, then every unresolved search in queue order.
    fn persisted_searches(&self) -> Vec<PersistedSearch> {
        let in_flight = self
            .current
            .iter()
            .filter_map(|c| c.config.clone().map(|config| PersistedSearch { id: c.id, config }));
        let queued = self
            .running
            .iter()
            .chain(self.pending_priority.iter())
            .chain(self.pending_regular.iter())
            .map(|t| PersistedSearch { id: t.id(), config: t.configuration().clone() });
        in_flight.chain(queued).collect()
    }

    fn total(&self) -> usize {
        self.running.len()
            + self.pending_regular.len()
            + self.pending_priority.len()
            + self.map_updates.len()
            + self.finished.len()
    }

    fn clear(&mut self) {
        self.running.clear();
        self.pending_regular.clear();
        self.pending_priority.clear();
        self.map_updates.clear();
        self.finished.clear();
    }
}

// ── State shared with the worker ──────────────────────────────────────────────

struct Shared {
    maps:           Arc<WorldModelManager>,
    config:         NavigationConfig,
    queues:         Mutex<Queues>,
    work_available: Condvar,
    /// Polled by the executing task between units of work.
    interrupt:      AtomicBool,
    shutdown:       AtomicBool,
}

impl Shared {
    /// Take the next job; `None` if every queue is empty.
    fn next_job(&self) -> Option<(Job, f64)> {
        let mut q = self.queues.lock();
        let job = q.pop_next()?;
        self.interrupt.store(false, Ordering::Release);
        Some((job, q.simulation_time))
    }

    /// Block until a job is available; `None` once shutdown is scheduled.
    fn wait_for_job(&self) -> Option<(Job, f64)> {
        let mut q = self.queues.lock();
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                return None;
            }
            if let Some(job) = q.pop_next() {
                self.interrupt.store(false, Ordering::Release);
                return Some((job, q.simulation_time));
            }
            self.work_available.wait(&mut q);
        }
    }

    /// Execute one slice of `job` without holding the queue lock, then file
    /// the task where it belongs.
    fn run(&self, job: Job, simulation_time: f64) -> ProcessState {
        let ctx = TaskContext::new(&self.maps, &self.interrupt, simulation_time);
        match job {
            Job::MapUpdate(mut task) => {
                let state = task.execute(&ctx);
                let mut q = self.queues.lock();
                q.current = None;
                q.fail_current = false;
                if state.is_resolved() {
                    tracing::debug!(task = %task.id(), ?state, "map update processed");
                } else {
                    q.map_updates.push_front(task);
                }
                state
            }
            Job::Search(mut task) => {
                task.execute(&ctx);
                let mut q = self.queues.lock();
                q.current = None;
                if std::mem::take(&mut q.fail_current) {
                    task.fail();
                    tracing::debug!(task = %task.id(), "canceled search stopped");
                }
                let state = task.state();
                if state.is_resolved() {
                    tracing::debug!(
                        task = %task.id(),
                        ?state,
                        expanded = task.num_expanded_search_states(),
                        time_used = ?task.time_used(),
                        "search resolved"
                    );
                    q.finished.push_back(task);
                } else {
                    tracing::trace!(task = %task.id(), ?state, "search suspended");
                    q.running.push_back(task);
                }
                state
            }
        }
    }
}

fn worker_loop(shared: &Shared) {
    while let Some((job, simulation_time)) = shared.wait_for_job() {
        shared.run(job, simulation_time);
    }
}

// ── NavigationTaskThread ──────────────────────────────────────────────────────

/// Runs navigation tasks one at a time on a dedicated worker thread.
///
/// Requests, polls and cancellations may come from any thread.  Without
/// [`start`](Self::start), the same scheduling is available one slice at a
/// time through [`process_next_task`](Self::process_next_task).
pub struct NavigationTaskThread {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl NavigationTaskThread {
    pub fn new(maps: Arc<WorldModelManager>, config: NavigationConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                maps,
                config,
                queues:         Mutex::new(Queues::default()),
                work_available: Condvar::new(),
                interrupt:      AtomicBool::new(false),
                shutdown:       AtomicBool::new(false),
            }),
            worker: None,
        }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.shared.config
    }

    pub fn maps(&self) -> &Arc<WorldModelManager> {
        &self.shared.maps
    }

    // ── Worker lifecycle ──────────────────────────────────────────────────

    /// Spawn the worker thread.
    pub fn start(&mut self) -> TaskResult<()> {
        if self.worker.is_some() {
            return Err(TaskError::AlreadyRunning);
        }
        self.shared.shutdown.store(false, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let name = self.shared.config.thread_name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(&shared))
            .map_err(TaskError::Spawn)?;
        self.worker = Some(handle);
        tracing::info!(thread = %name, "navigation worker started");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Stop the worker and join it.
    ///
    /// Raises the interrupt, so an in-flight search ends its slice early at
    /// the next expansion step and goes back to the running queue; a map
    /// update always completes.  Queued tasks stay queued and resume after
    /// the next [`start`](Self::start).
    pub fn schedule_shutdown(&mut self) {
        if !self.stop_worker() {
            tracing::warn!("shutdown requested but the navigation worker is not running");
        }
    }

    fn stop_worker(&mut self) -> bool {
        let Some(handle) = self.worker.take() else {
            return false;
        };
        {
            let _q = self.shared.queues.lock();
            self.shared.shutdown.store(true, Ordering::Release);
            self.shared.interrupt.store(true, Ordering::Release);
            self.shared.work_available.notify_all();
        }
        if handle.join().is_err() {
            tracing::error!("navigation worker panicked");
        }
        tracing::info!("navigation worker stopped");
        true
    }

    /// Run one scheduling slice on the calling thread.  Returns the state of
    /// the task that ran, or `None` if there was nothing to do.
    ///
    /// Not for use while the worker thread is running.
    pub fn process_next_task(&self) -> Option<ProcessState> {
        debug_assert!(self.worker.is_none(), "process_next_task while the worker thread runs");
        let (job, simulation_time) = self.shared.next_job()?;
        Some(self.shared.run(job, simulation_time))
    }

    // ── Tick contract ─────────────────────────────────────────────────────

    /// Advance the scheduler clock.  Interrupts the running search every
    /// `interrupt_interval` seconds so other tasks get a turn.
    pub fn update(&self, time_delta: f64, simulation_time: f64) {
        let mut q = self.shared.queues.lock();
        q.simulation_time = simulation_time;
        q.since_interrupt += time_delta;
        if q.since_interrupt >= self.shared.config.interrupt_interval {
            q.since_interrupt = 0.0;
            if q.search_in_flight() {
                self.shared.interrupt.store(true, Ordering::Release);
            }
        }
    }

    /// Ask the executing search to stop at its next checkpoint.  It goes to
    /// the back of the running queue.
    pub fn interrupt_search(&self) {
        let q = self.shared.queues.lock();
        if q.search_in_flight() {
            self.shared.interrupt.store(true, Ordering::Release);
        }
    }

    // ── Requests ──────────────────────────────────────────────────────────

    /// Reserve a task id, e.g. for a task built by the caller.
    pub fn allocate_task_id(&self) -> TaskId {
        self.shared.queues.lock().allocate_id()
    }

    /// Queue a search for `config`.  Never blocks on the worker.
    ///
    /// A request that cannot be searched (unknown map, invalid
    /// configuration) is filed as finished and failed right away.
    pub fn request_search(&self, config: PathSearchConfiguration) -> TaskId {
        let priority = config.is_priority();
        let mut q = self.shared.queues.lock();
        let id = q.allocate_id();
        let task = create_search(id, q.simulation_time, config, &self.shared.maps);
        q.enqueue_search(task);
        drop(q);
        self.shared.work_available.notify_one();
        tracing::debug!(task = %id, priority, "search requested");
        id
    }

    /// Queue an already-built search under its own id.
    pub fn submit_search(&self, task: Box<dyn PathSearch>) -> TaskId {
        let id = task.id();
        let mut q = self.shared.queues.lock();
        q.next_id = q.next_id.max(id.0 + 1);
        q.enqueue_search(task);
        drop(q);
        self.shared.work_available.notify_one();
        tracing::debug!(task = %id, "search submitted");
        id
    }

    /// Queue a map mutation.  Map updates run before any waiting search.
    pub fn request_map_update(&self, task: Box<dyn NavigationTask>) -> TaskId {
        let id = task.id();
        self.shared.queues.lock().map_updates.push_back(task);
        self.shared.work_available.notify_one();
        tracing::debug!(task = %id, "map update requested");
        id
    }

    /// Queue `change` for `map`, using the map's own update task.
    pub fn request_collision_update(&self, map: MapId, change: MapChange) -> TaskResult<TaskId> {
        let (id, start_time) = {
            let mut q = self.shared.queues.lock();
            (q.allocate_id(), q.simulation_time)
        };
        let task = self.shared.maps.acquire_read_access(map)?.create_map_update_task(id, start_time, change);
        Ok(self.request_map_update(task))
    }

    /// Queue a recomputation of the transitions between `a` and `b`.
    pub fn request_map_reconnection(&self, a: MapId, b: MapId) -> TaskId {
        let (id, start_time) = {
            let mut q = self.shared.queues.lock();
            (q.allocate_id(), q.simulation_time)
        };
        let distance = self.shared.config.tuning.connection_distance;
        self.request_map_update(Box::new(MapReconnectionTask::new(id, start_time, a, b, distance)))
    }

    // ── Polling and cancellation ──────────────────────────────────────────

    /// Poll search `id`.
    ///
    /// A search that has not resolved reports `Waiting` (queued, never run)
    /// or `Running` (in flight, or paused between slices).  Once resolved, the path (if any) is written to `out`, anchored at
    /// `current`, and the task is dropped; later polls of the same id are
    /// caller errors.  Otherwise `out` is cleared and the task stays queued.
    pub fn try_fetch_result(&self, id: TaskId, current: Option<Pose>, out: &mut NavigationPath) -> ProcessState {
        out.clear();
        let mut q = self.shared.queues.lock();
        if let Some(pos) = q.finished.iter().position(|t| t.id() == id) {
            if let Some(task) = q.finished.remove(pos) {
                drop(q);
                task.write_resulting_path(current, out);
                return task.state();
            }
        }
        if q.current.as_ref().is_some_and(|c| c.id == id) {
            return ProcessState::Running;
        }
        if let Some(state) = q.polled_state(id) {
            return state;
        }
        tracing::warn!(task = %id, "fetch for unknown or already consumed search");
        debug_assert!(false, "fetch for unknown or already consumed search {id}");
        ProcessState::Failed
    }

    /// Fail search `id` wherever it is.  An in-flight search is stopped at
    /// its next checkpoint.
    pub fn cancel_search(&self, id: TaskId) {
        let mut q = self.shared.queues.lock();
        if q.current.as_ref().is_some_and(|c| c.id == id && c.config.is_some()) {
            q.fail_current = true;
            self.shared.interrupt.store(true, Ordering::Release);
            tracing::debug!(task = %id, "in-flight search canceled");
            return;
        }
        if let Some(mut task) = q.take_unresolved(id) {
            task.fail();
            q.finished.push_back(task);
            tracing::debug!(task = %id, "queued search canceled");
            return;
        }
        if q.finished.iter().any(|t| t.id() == id) {
            tracing::warn!(task = %id, "cancel of a search that already resolved");
        } else {
            tracing::warn!(task = %id, "cancel of unknown search");
        }
    }

    // ── Diagnostics ───────────────────────────────────────────────────────

    pub fn queue_lengths(&self) -> QueueLengths {
        let q = self.shared.queues.lock();
        QueueLengths {
            running:          q.running.len(),
            pending_regular:  q.pending_regular.len(),
            pending_priority: q.pending_priority.len(),
            map_updates:      q.map_updates.len(),
            finished:         q.finished.len(),
            in_flight:        q.current.is_some(),
        }
    }

    /// Ids of resolved searches not yet fetched, oldest first.
    pub fn finished_task_ids(&self) -> Vec<TaskId> {
        self.shared.queues.lock().finished.iter().map(|t| t.id()).collect()
    }

    pub fn simulation_time(&self) -> f64 {
        self.shared.queues.lock().simulation_time
    }

    // ── Persistence ───────────────────────────────────────────────────────

    /// Write or read the id counter and every unresolved search.
    ///
    /// Reading appends the stored searches as fresh pending requests.
    /// Finished results and map updates are not persisted.
    pub fn serialize(&self, s: &mut dyn Serializer) -> NavResult<()> {
        let mut q = self.shared.queues.lock();
        let mut next_id = q.next_id;
        s.io_u64(&mut next_id)?;

        let mut searches = if s.is_reading() { Vec::new() } else { q.persisted_searches() };
        io_vec(s, &mut searches, |s, p| {
            p.id.serialize(s)?;
            p.config.serialize(s)
        })?;

        if s.is_reading() {
            q.next_id = q.next_id.max(next_id);
            let restored = searches.len();
            for p in searches {
                let task = create_search(p.id, q.simulation_time, p.config, &self.shared.maps);
                q.enqueue_search(task);
            }
            drop(q);
            self.shared.work_available.notify_all();
            tracing::info!(restored, "navigation searches restored");
        }
        Ok(())
    }
}

impl Drop for NavigationTaskThread {
    fn drop(&mut self) {
        self.stop_worker();
        let mut q = self.shared.queues.lock();
        let discarded = q.total();
        q.clear();
        if discarded > 0 {
            tracing::debug!(discarded, "navigation tasks discarded");
        }
    }
}
