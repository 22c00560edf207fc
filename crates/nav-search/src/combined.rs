//! `CombinedPathSearch<A, B>` — one A* request spread over two maps.
//!
//! Each map keeps its own [`AStar`] over its own node type.  Every iteration
//! expands one state on whichever side has the cheaper open-list front (ties
//! go to side A), which approximates a single best-first order across both
//! state spaces without merging them.  Reaching a transition seeds a start
//! state on the other side at `g + transition_penalty` and records where it
//! came from, so the final path can be walked back across the seams.
//!
//! A single-map search is the same type with side B absent.
//!
//! # States
//!
//! ```text
//! WAITING ─execute─▶ RUNNING ─target─▶ FINISHED
//!                      │  ▲  └─exhausted─▶ FAILED
//!              interrupt  execute
//!                      ▼  │
//!                   INTERRUPTED
//! ```

use std::any::Any;
use std::time::Instant;

use rustc_hash::FxHashMap;

use nav_core::{MapId, Pose, ProcessState, StateIndex, TaskId, TaskKind, TransitionId, Vec2};
use nav_world::{AreaTypeTable, LegalPoint, NavigationTask, TaskContext, TaskHeader, Transition, WorldModel};

use crate::astar::{AStar, GoalType, Step};
use crate::mechanics::NavigationMechanics;
use crate::{IgnoredStep, NavigationGoal, NavigationPath, PathPoint, PathSearch, PathSearchConfiguration, WaypointKind};

/// Positions closer than this are the same waypoint.
const WAYPOINT_EPS: f32 = 1e-3;

// ── Per-map search side ───────────────────────────────────────────────────────

/// How a start state on one side was reached from the other side.
#[derive(Copy, Clone, Debug)]
struct UsedTransition {
    /// State on the other side standing on the transition.
    from_state: StateIndex,
    /// Seen from the other side: `local` there, `remote` here.
    transition: Transition,
}

struct Side<M: NavigationMechanics> {
    map:         MapId,
    mechanics:   M,
    astar:       AStar<M::Node>,
    /// Keyed by the start state each transition created.
    provenance:  FxHashMap<StateIndex, UsedTransition>,
    /// Legal point the original start was snapped to.
    start_point: Option<Vec2>,
    /// Legal point closest to the goal anchor.
    goal_point:  Option<Vec2>,
}

impl<M: NavigationMechanics> Side<M> {
    fn new(map: MapId, config: &PathSearchConfiguration) -> Self {
        Self {
            map,
            mechanics:   M::new(config.mover, config.options),
            astar:       AStar::new(),
            provenance:  FxHashMap::default(),
            start_point: None,
            goal_point:  None,
        }
    }

    fn heuristic(&self, world: &M::World, goal: &NavigationGoal, factor: f32, node: M::Node) -> f32 {
        goal.distance_to(self.mechanics.position(world, node)) * factor
    }

    fn step(
        &mut self,
        world:   &M::World,
        areas:   &AreaTypeTable,
        goal:    &NavigationGoal,
        factor:  f32,
        ignored: &[IgnoredStep],
    ) -> Option<Step> {
        let mechanics = &self.mechanics;
        let map = self.map;
        self.astar.search_step(
            |node, out| {
                mechanics.expand(world, areas, node, out);
                if !ignored.is_empty() {
                    let from = mechanics.position(world, node);
                    out.retain(|&(next, _)| {
                        let to = mechanics.position(world, next);
                        !ignored.iter().any(|step| step.matches(map, from, to))
                    });
                }
            },
            |node| goal.distance_to(mechanics.position(world, node)) * factor,
        )
    }

    fn seed_starts(&mut self, world: &M::World, areas: &AreaTypeTable, point: Vec2, goal: &NavigationGoal, factor: f32) {
        self.start_point = Some(point);
        let mut entries = Vec::new();
        self.mechanics.entry_nodes(world, areas, point, &mut entries);
        for (node, cost) in entries {
            let h = self.heuristic(world, goal, factor, node);
            self.astar.add_start(node, cost, h);
        }
    }

    /// Mark the ideal points satisfying the goal as targets.  If none lies
    /// inside the goal region, the nearest ones are used instead.
    fn seed_targets(&mut self, world: &M::World, areas: &AreaTypeTable, goal_point: Vec2, candidates: &[LegalPoint], reach: f32, tol: f32) {
        self.goal_point = Some(goal_point);
        let Some(nearest) = candidates.first() else { return };
        let cutoff = reach.max(nearest.distance + tol);
        for p in candidates.iter().take_while(|p| p.distance <= cutoff) {
            if let Some(node) = self.mechanics.node_at(world, p.position) {
                if self.mechanics.is_legal(world, areas, node) {
                    self.astar.add_goal(node, GoalType::TargetReached);
                }
            }
        }
    }

    /// Register transitions towards `other` as goals.  With `limit`, only
    /// those within that distance of `start` are used.
    fn activate_transitions(&mut self, world: &M::World, areas: &AreaTypeTable, other: MapId, start: Vec2, limit: Option<f32>) {
        for t in world.inter_map_connections().to_map(other) {
            if limit.is_some_and(|r| start.distance(t.local) > r) {
                continue;
            }
            if let Some(node) = self.mechanics.node_at(world, t.local) {
                if self.mechanics.is_legal(world, areas, node) {
                    self.astar.add_goal(node, GoalType::TransitionReached(t.id));
                }
            }
        }
    }

    /// Path points from the segment's local start to `state`, plus the
    /// transition that created that start, if any.
    fn segment(&self, world: &M::World, areas: &AreaTypeTable, state: StateIndex) -> (Vec<PathPoint>, Option<UsedTransition>) {
        let mut nodes = Vec::new();
        let root = self.astar.write_path(state, &mut nodes);
        let mut positions: Vec<Vec2> = nodes.iter().map(|&n| self.mechanics.position(world, n)).collect();

        let used = self.provenance.get(&root).copied();
        if used.is_none() {
            if let Some(p) = self.start_point {
                if positions.first().is_none_or(|f| f.distance(p) > WAYPOINT_EPS) {
                    positions.insert(0, p);
                }
            }
        }
        self.mechanics.smooth(world, areas, &mut positions);

        let points = positions
            .into_iter()
            .map(|p| PathPoint::new(p, self.map, WaypointKind::Regular))
            .collect();
        (points, used)
    }

    fn remaining_distance(&self, world: &M::World, goal: &NavigationGoal, state: StateIndex) -> f32 {
        goal.distance_to(self.mechanics.position(world, self.astar.state(state).node))
    }
}

/// Seed a start on `to` from a transition reached by `state` on `from`.
/// Returns `true` if the start was new or cheaper than before.
#[allow(clippy::too_many_arguments)]
fn cross_into<X: NavigationMechanics, Y: NavigationMechanics>(
    from:       &Side<X>,
    from_world: &X::World,
    to:         &mut Side<Y>,
    to_world:   &Y::World,
    areas:      &AreaTypeTable,
    state:      StateIndex,
    id:         TransitionId,
    gate:       &mut TransitionGate,
    goal:       &NavigationGoal,
    factor:     f32,
    penalty:    f32,
) -> bool {
    let Some(&transition) = from_world.inter_map_connections().get(to.map, id) else {
        return false;
    };
    if !gate.admit(transition.local) {
        tracing::trace!(transition = %id, "transition outside the crossing radius skipped");
        return false;
    }
    let Some(node) = to.mechanics.node_at(to_world, transition.remote) else {
        return false;
    };
    if !to.mechanics.is_legal(to_world, areas, node) {
        return false;
    }
    let g = from.astar.state(state).g + penalty;
    let h = to.heuristic(to_world, goal, factor, node);
    match to.astar.add_start(node, g, h) {
        Some(index) => {
            to.provenance.insert(index, UsedTransition { from_state: state, transition });
            true
        }
        None => false,
    }
}

/// Limits which transitions are used when the start is ambiguous between
/// the two maps.
#[derive(Copy, Clone, Debug, Default)]
struct TransitionGate {
    limited:           bool,
    start:             Vec2,
    crossing_diameter: f32,
    /// Set by the first transition reached.
    radius:            Option<f32>,
}

impl TransitionGate {
    fn admit(&mut self, point: Vec2) -> bool {
        if !self.limited {
            return true;
        }
        let d = self.start.distance(point);
        match self.radius {
            Some(r) => d <= r,
            None => {
                self.radius = Some(d + self.crossing_diameter);
                true
            }
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Which {
    A,
    B,
}

impl Which {
    fn other(self) -> Which {
        match self {
            Which::A => Which::B,
            Which::B => Which::A,
        }
    }
}

/// Keep only the candidate(s) on the closer map unless the two are within
/// `tol` of each other or `keep_both` is set.
fn pick_sides(a: Option<f32>, b: Option<f32>, tol: f32, keep_both: bool) -> (bool, bool) {
    match (a, b) {
        (Some(x), Some(y)) if !keep_both && (x - y).abs() > tol => (x < y, y < x),
        (x, y) => (x.is_some(), y.is_some()),
    }
}

// ── CombinedPathSearch ────────────────────────────────────────────────────────

pub struct CombinedPathSearch<A: NavigationMechanics, B: NavigationMechanics> {
    header:              TaskHeader,
    config:              PathSearchConfiguration,
    a:                   Side<A>,
    b:                   Option<Side<B>>,
    setup_done:          bool,
    goal_reachable:      bool,
    gate:                TransitionGate,
    heuristic_factor:    f32,
    initial_distance:    f32,
    accepted:            Option<(Which, StateIndex)>,
    transitions_reached: usize,
    result:              Option<NavigationPath>,
}

impl<A: NavigationMechanics, B: NavigationMechanics> CombinedPathSearch<A, B> {
    /// Takes ownership of `config`.  Side B is searched only when
    /// `config.is_combined()`.
    pub fn new(id: TaskId, start_time: f64, config: PathSearchConfiguration) -> Self {
        let a = Side::new(config.map_a, &config);
        let b = config.is_combined().then(|| Side::new(config.map_b, &config));
        Self {
            header: TaskHeader::new(id, start_time),
            config,
            a,
            b,
            setup_done: false,
            goal_reachable: false,
            gate: TransitionGate::default(),
            heuristic_factor: 1.0,
            initial_distance: 0.0,
            accepted: None,
            transitions_reached: 0,
            result: None,
        }
    }

    /// Run until resolved, interrupted, or `max_steps` expansions were made
    /// in this slice.  A spent budget leaves the search `Interrupted`.
    pub fn execute_steps(&mut self, ctx: &TaskContext<'_>, max_steps: usize) -> ProcessState {
        if self.header.state.is_resolved() {
            return self.header.state;
        }
        let started = Instant::now();
        self.header.state = ProcessState::Running;
        let state = self.run_slice(ctx, max_steps);
        if state.is_resolved() {
            self.a.astar.close_all();
            if let Some(b) = self.b.as_mut() {
                b.astar.close_all();
            }
        }
        self.header.state = state;
        self.header.time_used += started.elapsed();
        state
    }

    /// Transitions crossed so far, counting only those that seeded (or
    /// improved) a start on the other map.
    pub fn transitions_reached(&self) -> usize {
        self.transitions_reached
    }

    /// States expanded on `map`.
    pub fn expanded_states_on(&self, map: MapId) -> usize {
        if map == self.a.map {
            self.a.astar.num_expanded()
        } else {
            self.b.as_ref().filter(|b| b.map == map).map_or(0, |b| b.astar.num_expanded())
        }
    }

    // ── Slice ─────────────────────────────────────────────────────────────

    fn run_slice(&mut self, ctx: &TaskContext<'_>, max_steps: usize) -> ProcessState {
        let areas = ctx.maps.areas();
        let task = self.header.id;
        match self.b.as_ref().map(|b| b.map) {
            None => {
                let guard = match ctx.maps.acquire_read_access(self.a.map) {
                    Ok(g) => g,
                    Err(e) => {
                        tracing::warn!(task = %task, error = %e, "path search failed");
                        return ProcessState::Failed;
                    }
                };
                let Some(world_a) = A::world(&*guard) else {
                    tracing::warn!(task = %task, map = %self.a.map, "unexpected world representation");
                    return ProcessState::Failed;
                };
                self.run_with(ctx, areas, world_a, None, max_steps)
            }
            Some(map_b) => {
                let (ga, gb) = match ctx.maps.acquire_parallel_read_access(self.a.map, map_b) {
                    Ok(g) => g,
                    Err(e) => {
                        tracing::warn!(task = %task, error = %e, "path search failed");
                        return ProcessState::Failed;
                    }
                };
                let (Some(world_a), Some(world_b)) = (A::world(&*ga), B::world(&*gb)) else {
                    tracing::warn!(task = %task, "unexpected world representation");
                    return ProcessState::Failed;
                };
                self.run_with(ctx, areas, world_a, Some(world_b), max_steps)
            }
        }
    }

    fn run_with(
        &mut self,
        ctx:       &TaskContext<'_>,
        areas:     &AreaTypeTable,
        world_a:   &A::World,
        world_b:   Option<&B::World>,
        max_steps: usize,
    ) -> ProcessState {
        if !self.setup_done {
            self.setup_done = true;
            if !self.setup_start_and_goal_states(areas, world_a, world_b) {
                if self.goal_reachable {
                    tracing::debug!(task = %self.header.id, "search setup failed: start is illegal");
                } else {
                    tracing::debug!(task = %self.header.id, "search setup failed: Goal is illegal");
                }
                return ProcessState::Failed;
            }
        }

        let goal = self.config.goal;
        let factor = self.heuristic_factor;
        let penalty = self.config.tuning.transition_penalty;

        for _ in 0..max_steps {
            if ctx.interrupt_requested() {
                return ProcessState::Interrupted;
            }

            let front_a = self.a.astar.front_cost();
            let front_b = self.b.as_mut().and_then(|b| b.astar.front_cost());
            let which = match (front_a, front_b) {
                (None, None) => {
                    self.finish_failed(areas, world_a, world_b);
                    return ProcessState::Failed;
                }
                (Some(_), None) => Which::A,
                (None, Some(_)) => Which::B,
                (Some(fa), Some(fb)) => if fa <= fb { Which::A } else { Which::B },
            };

            let ignored = &self.config.ignored_steps;
            let step = match (which, self.b.as_mut(), world_b) {
                (Which::A, _, _) => self.a.step(world_a, areas, &goal, factor, ignored),
                (Which::B, Some(b), Some(wb)) => b.step(wb, areas, &goal, factor, ignored),
                (Which::B, _, _) => None,
            };
            let Some(step) = step else { continue };

            match step.goal {
                GoalType::NoGoal => {}
                GoalType::TargetReached => {
                    self.accepted = Some((which, step.state));
                    let path = self.reconstruct(areas, world_a, world_b, which, step.state, true);
                    tracing::debug!(
                        task = %self.header.id,
                        cost = path.cost,
                        waypoints = path.len(),
                        expanded = self.num_expanded_search_states(),
                        "path found"
                    );
                    self.result = Some(path);
                    return ProcessState::Finished;
                }
                GoalType::TransitionReached(id) => {
                    let crossed = match (which, self.b.as_mut(), world_b) {
                        (Which::A, Some(b), Some(wb)) => {
                            cross_into(&self.a, world_a, b, wb, areas, step.state, id, &mut self.gate, &goal, factor, penalty)
                        }
                        (Which::B, Some(b), Some(wb)) => {
                            cross_into(b, wb, &mut self.a, world_a, areas, step.state, id, &mut self.gate, &goal, factor, penalty)
                        }
                        _ => false,
                    };
                    if crossed {
                        self.transitions_reached += 1;
                    }
                }
            }
        }
        ProcessState::Interrupted
    }

    // ── Setup ─────────────────────────────────────────────────────────────

    fn setup_start_and_goal_states(&mut self, areas: &AreaTypeTable, world_a: &A::World, world_b: Option<&B::World>) -> bool {
        let cfg = &self.config;
        let tuning = &cfg.tuning;
        let start = cfg.start.position;
        let goal = cfg.goal;
        let correction = if cfg.correct_illegal_states { tuning.max_correction_distance } else { tuning.start_snap_tolerance };
        let tol = tuning.rounding_tolerance;

        self.heuristic_factor = areas.min_cost_factor(cfg.mover);
        self.initial_distance = goal.distance_to(start);
        let factor = self.heuristic_factor;

        let closest = |world: &dyn WorldModel, pos: Vec2, radius: f32, ideal_only: bool| {
            let mut out = Vec::new();
            world.write_closest_legal_points(pos, cfg.mover, areas, radius, ideal_only, &mut out);
            out
        };

        let starts_a = closest(world_a, start, correction, false);
        let goals_a = closest(world_a, goal.anchor(), goal.reach() + correction, false);
        let (starts_b, goals_b) = match world_b {
            Some(wb) => (closest(wb, start, correction, false), closest(wb, goal.anchor(), goal.reach() + correction, false)),
            None => (Vec::new(), Vec::new()),
        };

        let dist = |pts: &[LegalPoint]| pts.first().map(|p| p.distance);
        let (use_start_a, use_start_b) = pick_sides(dist(&starts_a), dist(&starts_b), tol, cfg.correct_illegal_states);
        let (use_goal_a, use_goal_b) = pick_sides(dist(&goals_a), dist(&goals_b), tol, cfg.correct_illegal_states);

        self.goal_reachable = use_goal_a || use_goal_b;
        if !self.goal_reachable || !(use_start_a || use_start_b) {
            return false;
        }

        // ── Targets ───────────────────────────────────────────────────────
        let ideal_radius = goal.reach() + correction;
        if use_goal_a {
            let ideal = closest(world_a, goal.anchor(), ideal_radius, true);
            self.a.seed_targets(world_a, areas, goals_a[0].position, &ideal, goal.reach(), tol);
        }
        if let (true, Some(b), Some(wb)) = (use_goal_b, self.b.as_mut(), world_b) {
            let ideal = closest(wb, goal.anchor(), ideal_radius, true);
            b.seed_targets(wb, areas, goals_b[0].position, &ideal, goal.reach(), tol);
        }
        self.goal_reachable = self.a.astar.has_target() || self.b.as_ref().is_some_and(|b| b.astar.has_target());
        if !self.goal_reachable {
            return false;
        }

        // ── Starts ────────────────────────────────────────────────────────
        if use_start_a {
            self.a.seed_starts(world_a, areas, starts_a[0].position, &goal, factor);
        }
        if let (true, Some(b), Some(wb)) = (use_start_b, self.b.as_mut(), world_b) {
            b.seed_starts(wb, areas, starts_b[0].position, &goal, factor);
        }

        // ── Transitions ───────────────────────────────────────────────────
        if let (Some(b), Some(wb)) = (self.b.as_mut(), world_b) {
            let on_boundary = use_start_a
                && use_start_b
                && starts_a[0].distance <= tol
                && starts_b[0].distance <= tol;
            let limit = on_boundary.then_some(2.0 * tuning.max_crossing_diameter);
            self.a.activate_transitions(world_a, areas, b.map, start, limit);
            b.activate_transitions(wb, areas, self.a.map, start, limit);
            self.gate = TransitionGate {
                limited:           on_boundary,
                start,
                crossing_diameter: tuning.max_crossing_diameter,
                radius:            None,
            };
        }

        let has_open = !self.a.astar.is_open_empty() || self.b.as_mut().is_some_and(|b| !b.astar.is_open_empty());
        tracing::trace!(
            task = %self.header.id,
            start_a = use_start_a,
            start_b = use_start_b,
            goal_a = use_goal_a,
            goal_b = use_goal_b,
            limited = self.gate.limited,
            "search setup"
        );
        has_open
    }

    // ── Results ───────────────────────────────────────────────────────────

    /// Best-effort partial path towards the goal, only if it ends closer to
    /// the goal than the start is.
    fn finish_failed(&mut self, areas: &AreaTypeTable, world_a: &A::World, world_b: Option<&B::World>) {
        if !self.config.move_to_closest_on_failure {
            return;
        }
        let goal = self.config.goal;
        let best_a = self
            .a
            .astar
            .best_state()
            .map(|s| (Which::A, s, self.a.remaining_distance(world_a, &goal, s)));
        let best_b = match (self.b.as_ref(), world_b) {
            (Some(b), Some(wb)) => b.astar.best_state().map(|s| (Which::B, s, b.remaining_distance(wb, &goal, s))),
            _ => None,
        };
        let best = match (best_a, best_b) {
            (Some(a), Some(b)) => Some(if b.2 < a.2 { b } else { a }),
            (a, b) => a.or(b),
        };
        if let Some((which, state, remaining)) = best {
            if remaining < self.initial_distance - self.config.tuning.rounding_tolerance {
                self.result = Some(self.reconstruct(areas, world_a, world_b, which, state, false));
            }
        }
    }

    /// Walk back from `state` across every recorded transition to an
    /// original start.
    fn reconstruct(
        &self,
        areas:   &AreaTypeTable,
        world_a: &A::World,
        world_b: Option<&B::World>,
        which:   Which,
        state:   StateIndex,
        reached: bool,
    ) -> NavigationPath {
        let cost = match (which, self.b.as_ref()) {
            (Which::A, _) => self.a.astar.state(state).g,
            (Which::B, Some(b)) => b.astar.state(state).g,
            (Which::B, None) => 0.0,
        };

        let max_hops = self.a.astar.num_states() + self.b.as_ref().map_or(0, |b| b.astar.num_states()) + 1;
        let mut segments: Vec<Vec<PathPoint>> = Vec::new();
        let (mut side, mut cur) = (which, state);
        // Crossing point of the segment walked just before, on this side.
        let mut entry: Option<Vec2> = None;

        for _ in 0..max_hops {
            let (mut points, used) = match (side, self.b.as_ref(), world_b) {
                (Which::A, _, _) => self.a.segment(world_a, areas, cur),
                (Which::B, Some(b), Some(wb)) => b.segment(wb, areas, cur),
                (Which::B, _, _) => break,
            };
            if let (Some(p), Some(last)) = (entry, points.last_mut()) {
                last.position = p;
                last.kind = WaypointKind::TransitionEntry;
            }
            match used {
                Some(u) => {
                    if let Some(first) = points.first_mut() {
                        first.kind = WaypointKind::TransitionExit;
                    }
                    segments.push(points);
                    side = side.other();
                    cur = u.from_state;
                    entry = Some(u.transition.local);
                }
                None => {
                    segments.push(points);
                    break;
                }
            }
        }

        let mut waypoints: Vec<PathPoint> = segments.into_iter().rev().flatten().collect();

        if reached {
            if let NavigationGoal::Point { .. } = self.config.goal {
                let (map, goal_point) = match (which, self.b.as_ref()) {
                    (Which::B, Some(b)) => (b.map, b.goal_point),
                    _ => (self.a.map, self.a.goal_point),
                };
                if let Some(p) = goal_point {
                    if waypoints.last().is_none_or(|l| l.position.distance(p) > WAYPOINT_EPS) {
                        waypoints.push(PathPoint::new(p, map, WaypointKind::Regular));
                    }
                }
            }
        }

        NavigationPath { waypoints, cost, reached_target: reached }
    }
}

// ── Task contract ─────────────────────────────────────────────────────────────

impl<A: NavigationMechanics, B: NavigationMechanics> NavigationTask for CombinedPathSearch<A, B> {
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
        self.execute_steps(ctx, usize::MAX)
    }

    /// A canceled search yields no path, partial or not.
    fn fail(&mut self) {
        self.header.state = ProcessState::Failed;
        self.result = None;
        self.a.astar.close_all();
        if let Some(b) = self.b.as_mut() {
            b.astar.close_all();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<A: NavigationMechanics, B: NavigationMechanics> PathSearch for CombinedPathSearch<A, B> {
    fn configuration(&self) -> &PathSearchConfiguration {
        &self.config
    }

    fn write_resulting_path(&self, current: Option<Pose>, out: &mut NavigationPath) {
        out.clear();
        if !self.header.state.is_resolved() {
            return;
        }
        if let Some(path) = &self.result {
            out.clone_from(path);
            if let Some(pose) = current {
                out.anchor_at(pose, self.config.tuning.start_snap_tolerance);
            }
        }
    }

    fn num_expanded_search_states(&self) -> usize {
        self.a.astar.num_expanded() + self.b.as_ref().map_or(0, |b| b.astar.num_expanded())
    }

    fn is_goal_reachable(&self) -> bool {
        self.goal_reachable
    }
}
