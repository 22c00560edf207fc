//! Unit tests for nav-task.
//!
//! Most tests drive the scheduler with `process_next_task` so the order of
//! slices is deterministic.  The `worker` block runs the real thread and
//! polls with bounded loops.

#[cfg(test)]
mod helpers {
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use parking_lot::Mutex;

    use nav_core::{AreaTypeId, MapId, MoverTypeId, Pose, ProcessState, TaskId, TaskKind, Vec2};
    use nav_search::{NavigationGoal, NavigationPath, PathSearch, PathSearchConfiguration};
    use nav_world::{
        AreaType, AreaTypeTable, LaneFlags, LaneGraphBuilder, MoverCosts, NavigationTask, TaskContext, TaskHeader,
        WorldModelManager,
    };

    use crate::{NavigationConfig, NavigationTaskThread};

    pub const CAR: MoverTypeId = MoverTypeId(0);
    pub const ROAD: AreaTypeId = AreaTypeId(0);
    pub const MAP_A: MapId = MapId(1);

    pub fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    /// One map: `(0,0) ⇄ (10,0) ⇄ (20,0)`.
    pub fn maps() -> WorldModelManager {
        let mut areas = AreaTypeTable::new();
        areas.register(AreaType::new("road").with_mover(CAR, MoverCosts::UNIFORM));
        let mut maps = WorldModelManager::new(areas);

        let mut b = LaneGraphBuilder::new(MAP_A);
        let n0 = b.add_node(v(0.0, 0.0), ROAD);
        let n1 = b.add_node(v(10.0, 0.0), ROAD);
        let n2 = b.add_node(v(20.0, 0.0), ROAD);
        b.add_two_way_lane(n0, n1, LaneFlags::NONE);
        b.add_two_way_lane(n1, n2, LaneFlags::NONE);
        maps.register(b.build()).unwrap();
        maps
    }

    pub fn scheduler() -> NavigationTaskThread {
        NavigationTaskThread::new(Arc::new(maps()), NavigationConfig::default())
    }

    pub fn request(goal_x: f32) -> PathSearchConfiguration {
        PathSearchConfiguration::new(MAP_A, CAR, Pose::at(0.0, 0.0), NavigationGoal::point(v(goal_x, 0.0)))
    }

    /// Run slices until every queue is empty.
    pub fn drain(nav: &NavigationTaskThread) -> usize {
        let mut slices = 0;
        while nav.process_next_task().is_some() {
            slices += 1;
            assert!(slices < 1_000, "scheduler did not drain");
        }
        slices
    }

    /// Poll `id` until it resolves, for at most ~5 s.
    pub fn wait_for(nav: &NavigationTaskThread, id: TaskId, path: &mut NavigationPath) -> ProcessState {
        for _ in 0..5_000 {
            let state = nav.try_fetch_result(id, None, path);
            if state.is_resolved() {
                return state;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        panic!("search {id} did not resolve");
    }

    pub type SliceLog = Arc<Mutex<Vec<TaskId>>>;

    /// A search that is interrupted a fixed number of times before it
    /// finishes, logging every slice.
    pub struct ScriptedSearch {
        header:     TaskHeader,
        config:     PathSearchConfiguration,
        interrupts: usize,
        log:        SliceLog,
    }

    impl ScriptedSearch {
        pub fn boxed(id: TaskId, interrupts: usize, priority: bool, log: &SliceLog) -> Box<dyn PathSearch> {
            let mut config = request(20.0);
            if priority {
                config.options.insert(nav_core::MovementOptions::PRIORITY);
            }
            Box::new(Self { header: TaskHeader::new(id, 0.0), config, interrupts, log: Arc::clone(log) })
        }
    }

    /// A search that runs until it is interrupted, counting its slices.
    pub struct SpinSearch {
        header: TaskHeader,
        config: PathSearchConfiguration,
        slices: Arc<AtomicUsize>,
    }

    impl SpinSearch {
        pub fn boxed(id: TaskId, slices: &Arc<AtomicUsize>) -> Box<dyn PathSearch> {
            Box::new(Self { header: TaskHeader::new(id, 0.0), config: request(20.0), slices: Arc::clone(slices) })
        }
    }

    macro_rules! mock_search {
        ($ty:ty, |$this:ident, $ctx:ident| $body:block) => {
            impl NavigationTask for $ty {
                fn header(&self) -> &TaskHeader {
                    &self.header
                }

                fn header_mut(&mut self) -> &mut TaskHeader {
                    &mut self.header
                }

                fn kind(&self) -> TaskKind {
                    TaskKind::PathSearch
                }

                fn execute(&mut self, ctx: &TaskContext<'_>) -> ProcessState {
                    let $this = self;
                    let $ctx = ctx;
                    let state = $body;
                    $this.header.state = state;
                    state
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }

            impl PathSearch for $ty {
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
                    true
                }
            }
        };
    }

    mock_search!(ScriptedSearch, |this, _ctx| {
        this.log.lock().push(this.header.id);
        if this.interrupts > 0 {
            this.interrupts -= 1;
            ProcessState::Interrupted
        } else {
            ProcessState::Finished
        }
    });

    mock_search!(SpinSearch, |this, ctx| {
        this.slices.fetch_add(1, Ordering::SeqCst);
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut state = ProcessState::Finished;
        while Instant::now() < deadline {
            if ctx.interrupt_requested() {
                state = ProcessState::Interrupted;
                break;
            }
            std::thread::yield_now();
        }
        state
    });
}

// ── Requests and polling ──────────────────────────────────────────────────────

#[cfg(test)]
mod requests {
    use nav_core::{MapId, ProcessState};
    use nav_search::NavigationPath;

    use super::helpers::*;

    #[test]
    fn ids_increase_monotonically() {
        let nav = scheduler();
        let a = nav.request_search(request(20.0));
        let b = nav.request_search(request(10.0));
        let c = nav.allocate_task_id();
        assert!(a < b && b < c);
    }

    #[test]
    fn pending_search_reports_waiting() {
        let nav = scheduler();
        let id = nav.request_search(request(20.0));
        let mut path = NavigationPath::default();

        assert_eq!(nav.try_fetch_result(id, None, &mut path), ProcessState::Waiting);
        assert!(path.is_empty());
        assert_eq!(nav.queue_lengths().pending_regular, 1);
    }

    #[test]
    fn resolved_search_is_fetched_and_removed() {
        let nav = scheduler();
        let id = nav.request_search(request(20.0));
        assert_eq!(nav.process_next_task(), Some(ProcessState::Finished));
        assert_eq!(nav.finished_task_ids(), vec![id]);

        let mut path = NavigationPath::default();
        assert_eq!(nav.try_fetch_result(id, None, &mut path), ProcessState::Finished);
        assert_eq!(path.positions().last(), Some(v(20.0, 0.0)));
        assert!(nav.finished_task_ids().is_empty());
        assert_eq!(nav.process_next_task(), None);
    }

    #[test]
    fn unknown_map_fails_without_running() {
        let nav = scheduler();
        let mut config = request(20.0);
        config.map_a = MapId(9);
        let id = nav.request_search(config);

        assert_eq!(nav.finished_task_ids(), vec![id]);
        let mut path = NavigationPath::default();
        assert_eq!(nav.try_fetch_result(id, None, &mut path), ProcessState::Failed);
        assert!(path.is_empty());
    }

    #[test]
    fn update_records_simulation_time() {
        let nav = scheduler();
        nav.update(0.5, 12.0);
        assert_eq!(nav.simulation_time(), 12.0);
        // Nothing in flight: no interrupt is left behind for the next task.
        let id = nav.request_search(request(20.0));
        assert_eq!(nav.process_next_task(), Some(ProcessState::Finished));
        assert_eq!(nav.finished_task_ids(), vec![id]);
    }
}

// ── Scheduling order ──────────────────────────────────────────────────────────

#[cfg(test)]
mod scheduling {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use nav_core::{MovementOptions, ObstacleId, ProcessState};
    use nav_search::NavigationPath;
    use nav_world::{MapChange, Obstacle};

    use super::helpers::*;

    #[test]
    fn priority_search_runs_before_regular_ones() {
        let nav = scheduler();
        let regular: Vec<_> = (0..3).map(|_| nav.request_search(request(20.0))).collect();
        let mut urgent = request(10.0);
        urgent.options.insert(MovementOptions::PRIORITY);
        let priority = nav.request_search(urgent);

        nav.process_next_task();
        assert_eq!(nav.finished_task_ids(), vec![priority]);

        drain(&nav);
        let mut expected = vec![priority];
        expected.extend(regular);
        assert_eq!(nav.finished_task_ids(), expected);
    }

    #[test]
    fn interrupted_searches_take_turns() {
        let nav = scheduler();
        let log: SliceLog = Arc::new(Mutex::new(Vec::new()));

        let a = nav.submit_search(ScriptedSearch::boxed(nav.allocate_task_id(), 2, false, &log));
        assert_eq!(nav.process_next_task(), Some(ProcessState::Interrupted));
        assert_eq!(nav.queue_lengths().running, 1);

        let p = nav.submit_search(ScriptedSearch::boxed(nav.allocate_task_id(), 1, true, &log));
        drain(&nav);

        assert_eq!(*log.lock(), vec![a, p, a, p, a]);
        assert_eq!(nav.finished_task_ids(), vec![p, a]);
    }

    #[test]
    fn paused_search_polls_as_running() {
        let nav = scheduler();
        let log: SliceLog = Arc::new(Mutex::new(Vec::new()));
        let a = nav.submit_search(ScriptedSearch::boxed(nav.allocate_task_id(), 1, false, &log));
        let b = nav.submit_search(ScriptedSearch::boxed(nav.allocate_task_id(), 0, false, &log));
        let mut path = NavigationPath::default();

        assert_eq!(nav.process_next_task(), Some(ProcessState::Interrupted));
        assert_eq!(nav.try_fetch_result(a, None, &mut path), ProcessState::Running);
        assert_eq!(nav.try_fetch_result(b, None, &mut path), ProcessState::Waiting);
        assert!(path.is_empty());

        drain(&nav);
        assert_eq!(nav.try_fetch_result(a, None, &mut path), ProcessState::Finished);
        assert_eq!(nav.try_fetch_result(b, None, &mut path), ProcessState::Finished);
    }

    #[test]
    fn started_searches_go_before_new_regular_ones() {
        let nav = scheduler();
        let log: SliceLog = Arc::new(Mutex::new(Vec::new()));
        let a = nav.submit_search(ScriptedSearch::boxed(nav.allocate_task_id(), 1, false, &log));
        let b = nav.submit_search(ScriptedSearch::boxed(nav.allocate_task_id(), 1, false, &log));

        drain(&nav);
        assert_eq!(*log.lock(), vec![a, a, b, b]);
    }

    #[test]
    fn map_updates_run_before_searches() {
        let nav = scheduler();
        let search = nav.request_search(request(20.0));
        let obstacle = Obstacle { id: ObstacleId(1), center: v(10.0, 0.0), radius: 1.0 };
        nav.request_collision_update(MAP_A, MapChange::AddObstacle(obstacle)).unwrap();

        assert_eq!(nav.process_next_task(), Some(ProcessState::Finished));
        let lengths = nav.queue_lengths();
        assert_eq!(lengths.map_updates, 0);
        assert_eq!(lengths.finished, 0, "map updates are not kept as results");
        assert_eq!(lengths.pending_regular, 1);

        // The only route crosses the blocked node.
        drain(&nav);
        let mut path = NavigationPath::default();
        assert_eq!(nav.try_fetch_result(search, None, &mut path), ProcessState::Failed);
    }

    #[test]
    fn reconnection_request_is_processed() {
        let nav = scheduler();
        nav.request_map_reconnection(MAP_A, MAP_A);
        assert_eq!(nav.queue_lengths().map_updates, 1);
        // A map cannot connect to itself; the task fails and is dropped.
        assert_eq!(nav.process_next_task(), Some(ProcessState::Failed));
        assert_eq!(nav.queue_lengths(), Default::default());
    }
}

// ── Cancellation ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod cancellation {
    use nav_core::ProcessState;
    use nav_search::NavigationPath;

    use super::helpers::*;

    #[test]
    fn canceled_pending_search_fails() {
        let nav = scheduler();
        let id = nav.request_search(request(20.0));
        nav.cancel_search(id);

        assert_eq!(nav.queue_lengths().pending_regular, 0);
        let mut path = NavigationPath::default();
        assert_eq!(nav.try_fetch_result(id, None, &mut path), ProcessState::Failed);
        assert!(path.is_empty());
        assert_eq!(nav.process_next_task(), None);
    }

    #[test]
    fn canceling_a_resolved_search_keeps_its_result() {
        let nav = scheduler();
        let id = nav.request_search(request(20.0));
        drain(&nav);
        nav.cancel_search(id);

        let mut path = NavigationPath::default();
        assert_eq!(nav.try_fetch_result(id, None, &mut path), ProcessState::Finished);
        assert!(!path.is_empty());
    }

    #[test]
    fn canceling_an_unknown_id_is_harmless() {
        let nav = scheduler();
        let id = nav.request_search(request(20.0));
        nav.cancel_search(nav_core::TaskId(999));
        assert_eq!(nav.queue_lengths().pending_regular, 1);
        drain(&nav);
        assert_eq!(nav.finished_task_ids(), vec![id]);
    }
}

// ── Persistence ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod persistence {
    use nav_core::{BinaryReader, BinaryWriter, MovementOptions};

    use super::helpers::*;

    #[test]
    fn unresolved_searches_are_restored_as_pending() {
        let nav = scheduler();
        let regular = nav.request_search(request(20.0));
        let mut urgent = request(10.0);
        urgent.options.insert(MovementOptions::PRIORITY);
        let priority = nav.request_search(urgent);

        let mut w = BinaryWriter::new();
        nav.serialize(&mut w).unwrap();
        let bytes = w.into_bytes();

        let restored = scheduler();
        restored.serialize(&mut BinaryReader::new(&bytes)).unwrap();
        let lengths = restored.queue_lengths();
        assert_eq!(lengths.pending_regular, 1);
        assert_eq!(lengths.pending_priority, 1);
        assert!(restored.allocate_task_id() > priority);

        drain(&restored);
        assert_eq!(restored.finished_task_ids(), vec![priority, regular]);
    }

    #[test]
    fn resolved_searches_are_not_persisted() {
        let nav = scheduler();
        nav.request_search(request(20.0));
        drain(&nav);

        let mut w = BinaryWriter::new();
        nav.serialize(&mut w).unwrap();
        let bytes = w.into_bytes();

        let restored = scheduler();
        restored.serialize(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(restored.queue_lengths(), Default::default());
    }
}

// ── Worker thread ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod worker {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use nav_core::ProcessState;
    use nav_search::NavigationPath;

    use super::helpers::*;
    use crate::TaskError;

    fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..5_000 {
            if condition() {
                return;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        panic!("condition not reached");
    }

    #[test]
    fn worker_resolves_requests() {
        let mut nav = scheduler();
        nav.start().unwrap();
        assert!(nav.is_running());

        let ids: Vec<_> = [10.0, 20.0, 0.0].into_iter().map(|x| nav.request_search(request(x))).collect();
        let mut path = NavigationPath::default();
        for id in ids {
            assert_eq!(wait_for(&nav, id, &mut path), ProcessState::Finished);
        }

        nav.schedule_shutdown();
        assert!(!nav.is_running());
    }

    #[test]
    fn second_start_is_rejected() {
        let mut nav = scheduler();
        nav.start().unwrap();
        assert!(matches!(nav.start(), Err(TaskError::AlreadyRunning)));
        nav.schedule_shutdown();
        nav.start().unwrap();
    }

    #[test]
    fn interrupted_search_is_resumed() {
        let mut nav = scheduler();
        let slices = Arc::new(AtomicUsize::new(0));
        let id = nav.submit_search(SpinSearch::boxed(nav.allocate_task_id(), &slices));
        nav.start().unwrap();

        wait_until(|| slices.load(Ordering::SeqCst) == 1);
        nav.interrupt_search();
        wait_until(|| slices.load(Ordering::SeqCst) >= 2);

        nav.cancel_search(id);
        let mut path = NavigationPath::default();
        assert_eq!(wait_for(&nav, id, &mut path), ProcessState::Failed);
    }

    #[test]
    fn cancel_stops_the_in_flight_search() {
        let mut nav = scheduler();
        let slices = Arc::new(AtomicUsize::new(0));
        let id = nav.submit_search(SpinSearch::boxed(nav.allocate_task_id(), &slices));
        nav.start().unwrap();

        wait_until(|| slices.load(Ordering::SeqCst) == 1);
        nav.cancel_search(id);

        let mut path = NavigationPath::default();
        assert_eq!(wait_for(&nav, id, &mut path), ProcessState::Failed);
        assert_eq!(slices.load(Ordering::SeqCst), 1, "a canceled search gets no further slice");
    }

    #[test]
    fn shutdown_keeps_queued_work() {
        let mut nav = scheduler();
        let slices = Arc::new(AtomicUsize::new(0));
        nav.submit_search(SpinSearch::boxed(nav.allocate_task_id(), &slices));
        nav.start().unwrap();
        wait_until(|| slices.load(Ordering::SeqCst) == 1);

        nav.schedule_shutdown();
        let lengths = nav.queue_lengths();
        assert_eq!(lengths.running, 1);
        assert!(!lengths.in_flight);
    }
}
