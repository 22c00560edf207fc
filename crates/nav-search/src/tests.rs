//! Unit tests for nav-search.
//!
//! Maps are built by hand so every expected cost can be worked out on paper.

#[cfg(test)]
mod helpers {
    use std::sync::atomic::AtomicBool;

    use nav_core::{AreaTypeId, MapId, MoverTypeId, NodeId, Pose, ProcessState, Vec2};
    use nav_world::{
        AreaType, AreaTypeTable, LaneFlags, LaneGraph, LaneGraphBuilder, MoverCosts, NavigationTask, TaskContext,
        WorldModelManager,
    };

    use crate::{NavigationGoal, NavigationPath, PathSearch, PathSearchConfiguration};

    pub const CAR: MoverTypeId = MoverTypeId(0);
    pub const ROAD: AreaTypeId = AreaTypeId(0);

    pub const MAP_A: MapId = MapId(1);
    pub const MAP_B: MapId = MapId(2);

    pub fn areas() -> AreaTypeTable {
        let mut t = AreaTypeTable::new();
        t.register(AreaType::new("road").with_mover(CAR, MoverCosts::UNIFORM));
        t
    }

    pub fn manager() -> WorldModelManager {
        WorldModelManager::new(areas())
    }

    pub fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    /// Nodes at `points`, joined in order by lanes.
    pub fn chain(id: MapId, points: &[Vec2], two_way: bool) -> LaneGraph {
        let mut b = LaneGraphBuilder::new(id);
        let nodes: Vec<NodeId> = points.iter().map(|&p| b.add_node(p, ROAD)).collect();
        for w in nodes.windows(2) {
            if two_way {
                b.add_two_way_lane(w[0], w[1], LaneFlags::NONE);
            } else {
                b.add_lane(w[0], w[1], LaneFlags::NONE);
            }
        }
        b.build()
    }

    pub fn request(map: MapId, start: Vec2, goal: Vec2) -> PathSearchConfiguration {
        PathSearchConfiguration::new(map, CAR, Pose::new(start, 0.0), NavigationGoal::point(goal))
    }

    /// Run one slice with the interrupt flag lowered.
    pub fn run(search: &mut dyn PathSearch, maps: &WorldModelManager) -> ProcessState {
        let interrupt = AtomicBool::new(false);
        search.execute(&TaskContext::new(maps, &interrupt, 0.0))
    }

    pub fn result(search: &dyn PathSearch) -> NavigationPath {
        let mut path = NavigationPath::default();
        search.write_resulting_path(None, &mut path);
        path
    }

    pub fn positions(path: &NavigationPath) -> Vec<Vec2> {
        path.positions().collect()
    }
}

// ── A* bookkeeping ────────────────────────────────────────────────────────────

#[cfg(test)]
mod astar {
    use nav_core::TransitionId;

    use crate::{AStar, GoalType};

    fn no_neighbors(_: u32, _: &mut Vec<(u32, f32)>) {}

    #[test]
    fn lowest_f_first_then_insertion_order() {
        let mut a: AStar<u32> = AStar::new();
        a.add_start(1, 0.0, 5.0);
        a.add_start(2, 0.0, 3.0);
        a.add_start(3, 0.0, 3.0);

        let mut order = Vec::new();
        while let Some(step) = a.search_step(no_neighbors, |_| 0.0) {
            order.push(a.state(step.state).node);
        }
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn reseeding_a_start_only_when_cheaper() {
        let mut a: AStar<u32> = AStar::new();
        let first = a.add_start(7, 5.0, 0.0).expect("new start");
        assert_eq!(a.add_start(7, 6.0, 0.0), None);
        assert_eq!(a.add_start(7, 2.0, 0.0), Some(first));
        assert_eq!(a.state(first).g, 2.0);
        assert_eq!(a.num_states(), 1);
    }

    #[test]
    fn target_is_returned_without_expansion() {
        let mut a: AStar<u32> = AStar::new();
        a.add_goal(2, GoalType::TargetReached);
        a.add_start(1, 0.0, 1.0);
        let expand = |n: u32, out: &mut Vec<(u32, f32)>| out.push((n + 1, 1.0));

        let s1 = a.search_step(expand, |_| 0.0).expect("step");
        assert_eq!(s1.goal, GoalType::NoGoal);
        let s2 = a.search_step(expand, |_| 0.0).expect("step");
        assert_eq!(s2.goal, GoalType::TargetReached);
        assert_eq!(a.state(s2.state).node, 2);
        // Node 3 was never generated.
        assert_eq!(a.num_states(), 2);
        assert_eq!(a.num_expanded(), 2);
    }

    #[test]
    fn cheaper_route_replaces_stale_entry() {
        // 1 → 2 costs 5; 1 → 3 → 2 costs 2.
        let mut a: AStar<u32> = AStar::new();
        a.add_goal(2, GoalType::TargetReached);
        a.add_start(1, 0.0, 0.0);
        let expand = |n: u32, out: &mut Vec<(u32, f32)>| match n {
            1 => out.extend([(2, 5.0), (3, 1.0)]),
            3 => out.push((2, 1.0)),
            _ => {}
        };

        let mut last = None;
        while let Some(step) = a.search_step(expand, |_| 0.0) {
            if step.goal == GoalType::TargetReached {
                last = Some(step.state);
                break;
            }
        }
        let target = last.expect("target reached");
        assert_eq!(a.state(target).g, 2.0);

        let mut nodes = Vec::new();
        let root = a.write_path(target, &mut nodes);
        assert_eq!(nodes, vec![1, 3, 2]);
        assert_eq!(a.state(root).node, 1);

        // The 5.0 entry for node 2 is stale and must not surface.
        assert_eq!(a.front_cost(), None);
    }

    #[test]
    fn target_is_never_downgraded() {
        let mut a: AStar<u32> = AStar::new();
        a.add_goal(5, GoalType::TargetReached);
        a.add_goal(5, GoalType::TransitionReached(TransitionId(0)));
        assert_eq!(a.goal_of(5), GoalType::TargetReached);

        a.add_goal(6, GoalType::TransitionReached(TransitionId(3)));
        assert_eq!(a.goal_of(6), GoalType::TransitionReached(TransitionId(3)));
        assert!(a.has_target());
        assert_eq!(a.goal_count(), 2);
    }
}

// ── Single-map lane searches ──────────────────────────────────────────────────

#[cfg(test)]
mod lane_search {
    use std::sync::atomic::AtomicBool;

    use nav_core::{MovementOptions, Pose, ProcessState, TaskId};
    use nav_world::{LaneFlags, LaneGraphBuilder, NavigationTask, TaskContext};

    use super::helpers::*;
    use crate::{create_path_search, IgnoredStep, LaneMechanics, NavigationPath, PathSearch};

    #[test]
    fn straight_path_along_nodes() {
        let mut maps = manager();
        maps.register(chain(MAP_A, &[v(0.0, 0.0), v(10.0, 0.0), v(20.0, 0.0)], true)).unwrap();

        let mut s = create_path_search::<LaneMechanics>(TaskId(1), 0.0, request(MAP_A, v(0.0, 0.0), v(20.0, 0.0)));
        assert_eq!(run(&mut s, &maps), ProcessState::Finished);

        let path = result(&s);
        assert!(path.reached_target);
        assert!((path.cost - 20.0).abs() < 1e-4);
        assert_eq!(positions(&path), vec![v(0.0, 0.0), v(10.0, 0.0), v(20.0, 0.0)]);
        assert!(path.waypoints.iter().all(|p| p.map == MAP_A));
        assert_eq!(path.transition_count(), 0);
    }

    #[test]
    fn start_on_lane_enters_at_its_end() {
        let mut maps = manager();
        maps.register(chain(MAP_A, &[v(0.0, 0.0), v(10.0, 0.0), v(20.0, 0.0)], true)).unwrap();

        let mut s = create_path_search::<LaneMechanics>(TaskId(1), 0.0, request(MAP_A, v(5.0, 0.0), v(20.0, 0.0)));
        assert_eq!(run(&mut s, &maps), ProcessState::Finished);

        let path = result(&s);
        assert!((path.cost - 15.0).abs() < 1e-4);
        assert_eq!(positions(&path), vec![v(5.0, 0.0), v(10.0, 0.0), v(20.0, 0.0)]);
    }

    #[test]
    fn illegal_goal_fails_unless_corrected() {
        let mut maps = manager();
        maps.register(chain(MAP_A, &[v(0.0, 0.0), v(10.0, 0.0), v(20.0, 0.0)], true)).unwrap();
        let config = request(MAP_A, v(0.0, 0.0), v(20.0, 5.0));

        let mut strict = create_path_search::<LaneMechanics>(TaskId(1), 0.0, config.clone());
        assert_eq!(run(&mut strict, &maps), ProcessState::Failed);
        assert!(!strict.is_goal_reachable());
        assert!(result(&strict).is_empty());

        let mut lenient = create_path_search::<LaneMechanics>(TaskId(2), 0.0, config.with_illegal_state_correction());
        assert_eq!(run(&mut lenient, &maps), ProcessState::Finished);
        assert!(lenient.is_goal_reachable());
        assert_eq!(positions(&result(&lenient)).last(), Some(&v(20.0, 0.0)));
    }

    #[test]
    fn one_way_lane_needs_backward_option() {
        let mut maps = manager();
        maps.register(chain(MAP_A, &[v(0.0, 0.0), v(10.0, 0.0)], false)).unwrap();
        let config = request(MAP_A, v(10.0, 0.0), v(0.0, 0.0));

        let mut forward = create_path_search::<LaneMechanics>(TaskId(1), 0.0, config.clone());
        assert_eq!(run(&mut forward, &maps), ProcessState::Failed);

        let options = MovementOptions::FORWARD | MovementOptions::BACKWARD;
        let mut both = create_path_search::<LaneMechanics>(TaskId(2), 0.0, config.with_options(options));
        assert_eq!(run(&mut both, &maps), ProcessState::Finished);
        assert!((result(&both).cost - 10.0).abs() < 1e-4);
    }

    #[test]
    fn maneuver_lane_needs_maneuver_option() {
        let mut maps = manager();
        let mut b = LaneGraphBuilder::new(MAP_A);
        let n0 = b.add_node(v(0.0, 0.0), ROAD);
        let n1 = b.add_node(v(10.0, 0.0), ROAD);
        b.add_lane(n0, n1, LaneFlags::MANEUVER);
        maps.register(b.build()).unwrap();
        let config = request(MAP_A, v(0.0, 0.0), v(10.0, 0.0));

        let mut plain = create_path_search::<LaneMechanics>(TaskId(1), 0.0, config.clone());
        assert_eq!(run(&mut plain, &maps), ProcessState::Failed);

        let options = MovementOptions::default().with(MovementOptions::MANEUVER);
        let mut maneuvering = create_path_search::<LaneMechanics>(TaskId(2), 0.0, config.with_options(options));
        assert_eq!(run(&mut maneuvering, &maps), ProcessState::Finished);
    }

    #[test]
    fn ignored_step_forces_detour() {
        let mut maps = manager();
        let mut b = LaneGraphBuilder::new(MAP_A);
        let n0 = b.add_node(v(0.0, 0.0), ROAD);
        let n1 = b.add_node(v(10.0, 0.0), ROAD);
        let n2 = b.add_node(v(10.0, 5.0), ROAD);
        let n3 = b.add_node(v(20.0, 0.0), ROAD);
        b.add_lane(n0, n1, LaneFlags::NONE);
        b.add_lane(n1, n3, LaneFlags::NONE);
        b.add_lane(n0, n2, LaneFlags::NONE);
        b.add_lane(n2, n3, LaneFlags::NONE);
        maps.register(b.build()).unwrap();
        let config = request(MAP_A, v(0.0, 0.0), v(20.0, 0.0));

        let mut direct = create_path_search::<LaneMechanics>(TaskId(1), 0.0, config.clone());
        run(&mut direct, &maps);
        assert!((result(&direct).cost - 20.0).abs() < 1e-4);

        let avoid = IgnoredStep::new(MAP_A, v(10.0, 0.0), v(20.0, 0.0));
        let mut detour = create_path_search::<LaneMechanics>(TaskId(2), 0.0, config.with_ignored_step(avoid));
        assert_eq!(run(&mut detour, &maps), ProcessState::Finished);
        let path = result(&detour);
        assert!((path.cost - 2.0 * 125f32.sqrt()).abs() < 1e-3, "cost {}", path.cost);
        assert!(positions(&path).contains(&v(10.0, 5.0)));
    }

    #[test]
    fn move_to_closest_returns_partial_path() {
        let mut maps = manager();
        let mut b = LaneGraphBuilder::new(MAP_A);
        let n0 = b.add_node(v(0.0, 0.0), ROAD);
        let n1 = b.add_node(v(10.0, 0.0), ROAD);
        b.add_node(v(30.0, 0.0), ROAD); // unreachable
        b.add_two_way_lane(n0, n1, LaneFlags::NONE);
        maps.register(b.build()).unwrap();
        let config = request(MAP_A, v(0.0, 0.0), v(30.0, 0.0));

        let mut plain = create_path_search::<LaneMechanics>(TaskId(1), 0.0, config.clone());
        assert_eq!(run(&mut plain, &maps), ProcessState::Failed);
        assert!(plain.is_goal_reachable());
        assert!(result(&plain).is_empty());

        let mut closest = create_path_search::<LaneMechanics>(TaskId(2), 0.0, config.with_move_to_closest());
        assert_eq!(run(&mut closest, &maps), ProcessState::Failed);
        let path = result(&closest);
        assert!(!path.reached_target);
        assert_eq!(positions(&path), vec![v(0.0, 0.0), v(10.0, 0.0)]);
        assert!((path.cost - 10.0).abs() < 1e-4);
    }

    #[test]
    fn interrupt_suspends_and_execute_resumes() {
        let mut maps = manager();
        maps.register(chain(MAP_A, &[v(0.0, 0.0), v(10.0, 0.0), v(20.0, 0.0)], true)).unwrap();
        let mut s = create_path_search::<LaneMechanics>(TaskId(1), 0.0, request(MAP_A, v(0.0, 0.0), v(20.0, 0.0)));

        let raised = AtomicBool::new(true);
        assert_eq!(s.execute(&TaskContext::new(&maps, &raised, 0.0)), ProcessState::Interrupted);
        assert_eq!(s.num_expanded_search_states(), 0);
        assert!(result(&s).is_empty());

        assert_eq!(run(&mut s, &maps), ProcessState::Finished);
        assert_eq!(s.state(), ProcessState::Finished);
        // Resolved searches are not re-run.
        assert_eq!(run(&mut s, &maps), ProcessState::Finished);
    }

    #[test]
    fn step_budget_leaves_search_resumable() {
        let mut maps = manager();
        maps.register(chain(MAP_A, &[v(0.0, 0.0), v(10.0, 0.0), v(20.0, 0.0)], true)).unwrap();
        let config = request(MAP_A, v(0.0, 0.0), v(20.0, 0.0));

        let mut reference = create_path_search::<LaneMechanics>(TaskId(1), 0.0, config.clone());
        run(&mut reference, &maps);

        let mut sliced = create_path_search::<LaneMechanics>(TaskId(2), 0.0, config);
        let lowered = AtomicBool::new(false);
        let ctx = TaskContext::new(&maps, &lowered, 0.0);
        assert_eq!(sliced.execute_steps(&ctx, 1), ProcessState::Interrupted);
        assert_eq!(sliced.num_expanded_search_states(), 1);
        assert_eq!(sliced.execute(&ctx), ProcessState::Finished);

        assert_eq!(result(&sliced), result(&reference));
        assert_eq!(sliced.num_expanded_search_states(), reference.num_expanded_search_states());
    }

    #[test]
    fn result_is_anchored_at_current_pose() {
        let mut maps = manager();
        maps.register(chain(MAP_A, &[v(0.0, 0.0), v(10.0, 0.0)], true)).unwrap();
        let mut s = create_path_search::<LaneMechanics>(TaskId(1), 0.0, request(MAP_A, v(0.0, 0.0), v(10.0, 0.0)));

        let mut path = NavigationPath::default();
        s.write_resulting_path(None, &mut path);
        assert!(path.is_empty(), "nothing before the search resolves");

        run(&mut s, &maps);
        s.write_resulting_path(Some(Pose::new(v(0.2, 0.0), 0.0)), &mut path);
        assert_eq!(positions(&path), vec![v(0.2, 0.0), v(10.0, 0.0)]);

        s.write_resulting_path(Some(Pose::new(v(-3.0, 0.0), 0.0)), &mut path);
        assert_eq!(positions(&path), vec![v(-3.0, 0.0), v(0.0, 0.0), v(10.0, 0.0)]);
    }
}

// ── Grid searches ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod grid_search {
    use nav_core::{MapId, MovementOptions, ProcessState, TaskId};
    use nav_world::{Cell, NavGrid, NavGridBuilder};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::helpers::*;
    use crate::{create_path_search, GridMechanics, PathSearch};

    /// 5 × 3 grid with a wall across the lower two rows of column 2.
    fn walled(id: MapId) -> NavGrid {
        NavGridBuilder::new(id, v(0.0, 0.0), 1.0, 5, 3)
            .fill(ROAD)
            .wall(Cell::new(2, 0))
            .wall(Cell::new(2, 1))
            .build()
    }

    #[test]
    fn path_goes_around_wall() {
        let mut maps = manager();
        maps.register(walled(MAP_A)).unwrap();
        let mut s = create_path_search::<GridMechanics>(TaskId(1), 0.0, request(MAP_A, v(0.5, 0.5), v(4.5, 0.5)));
        assert_eq!(run(&mut s, &maps), ProcessState::Finished);

        let path = result(&s);
        let expected = 4.0 + 2.0 * std::f32::consts::SQRT_2;
        assert!((path.cost - expected).abs() < 1e-3, "cost {}", path.cost);
        let pts = positions(&path);
        assert_eq!(pts.first(), Some(&v(0.5, 0.5)));
        assert_eq!(pts.last(), Some(&v(4.5, 0.5)));
        assert!(path.length() > 4.0);

        let grid = walled(MAP_A);
        for p in pts {
            let cell = grid.cell_at(p).expect("inside grid");
            assert!(!grid.is_blocked(cell) && grid.area(cell).is_some(), "waypoint {p:?} in a wall");
        }
    }

    #[test]
    fn corner_cutting_is_cheaper() {
        let mut maps = manager();
        maps.register(walled(MAP_A)).unwrap();
        let config = request(MAP_A, v(0.5, 0.5), v(4.5, 0.5));

        let mut strict = create_path_search::<GridMechanics>(TaskId(1), 0.0, config.clone());
        run(&mut strict, &maps);
        let options = MovementOptions::default().with(MovementOptions::SHRINK_TURNING_RADIUS);
        let mut cutting = create_path_search::<GridMechanics>(TaskId(2), 0.0, config.with_options(options));
        run(&mut cutting, &maps);

        let cut = result(&cutting).cost;
        assert!((cut - 4.0 * std::f32::consts::SQRT_2).abs() < 1e-3, "cost {cut}");
        assert!(cut < result(&strict).cost);
    }

    #[test]
    fn identical_requests_give_identical_results() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut builder = NavGridBuilder::new(MAP_A, v(0.0, 0.0), 1.0, 20, 20).fill(ROAD);
        for x in 0..20 {
            for y in 0..20 {
                let corner = (x < 2 && y < 2) || (x > 17 && y > 17);
                if !corner && rng.gen_bool(0.25) {
                    builder = builder.wall(Cell::new(x, y));
                }
            }
        }
        let mut maps = manager();
        maps.register(builder.build()).unwrap();
        let config = request(MAP_A, v(0.5, 0.5), v(19.5, 19.5)).with_move_to_closest();

        let mut first = create_path_search::<GridMechanics>(TaskId(1), 0.0, config.clone());
        let mut second = create_path_search::<GridMechanics>(TaskId(2), 0.0, config);
        assert_eq!(run(&mut first, &maps), run(&mut second, &maps));
        assert_eq!(result(&first), result(&second));
        assert_eq!(first.num_expanded_search_states(), second.num_expanded_search_states());
    }
}

// ── Two-map searches ──────────────────────────────────────────────────────────

#[cfg(test)]
mod combined {
    use std::sync::atomic::AtomicBool;

    use nav_core::{MapId, ProcessState, TaskId};
    use nav_world::{LaneFlags, LaneGraphBuilder, NavigationTask, TaskContext};

    use super::helpers::*;
    use crate::{create_combined_path_search, LaneMechanics, WaypointKind};

    #[test]
    fn crossing_adds_transition_penalty() {
        let mut maps = manager();
        maps.register(chain(MAP_A, &[v(0.0, 0.0)], false)).unwrap();
        maps.register(chain(MAP_B, &[v(0.5, 0.0), v(1.5, 0.0)], false)).unwrap();
        assert_eq!(maps.calculate_inter_map_connections(MAP_A, MAP_B, 1.0).unwrap(), 1);

        let config = request(MAP_A, v(0.0, 0.0), v(1.5, 0.0)).with_second_map(MAP_B);
        let mut s = create_combined_path_search::<LaneMechanics, LaneMechanics>(TaskId(1), 0.0, config);
        assert_eq!(run(&mut s, &maps), ProcessState::Finished);

        let path = result(&s);
        // 0 on A, 5 for the crossing, 1 along the lane on B.
        assert!((path.cost - 6.0).abs() < 1e-4, "cost {}", path.cost);
        assert_eq!(s.transitions_reached(), 1);
        assert_eq!(path.transition_count(), 1);

        let kinds: Vec<WaypointKind> = path.waypoints.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![WaypointKind::TransitionEntry, WaypointKind::TransitionExit, WaypointKind::Regular]);
        let maps_on_path: Vec<MapId> = path.waypoints.iter().map(|p| p.map).collect();
        assert_eq!(maps_on_path, vec![MAP_A, MAP_B, MAP_B]);
    }

    #[test]
    fn a_b_a_round_trip_marks_each_seam() {
        let mut maps = manager();
        let mut a = LaneGraphBuilder::new(MAP_A);
        let n0 = a.add_node(v(0.0, 0.0), ROAD);
        let n1 = a.add_node(v(10.0, 0.0), ROAD);
        let n2 = a.add_node(v(30.0, 0.0), ROAD);
        let n3 = a.add_node(v(40.0, 0.0), ROAD);
        a.add_lane(n0, n1, LaneFlags::NONE);
        a.add_lane(n2, n3, LaneFlags::NONE);
        maps.register(a.build()).unwrap();
        maps.register(chain(MAP_B, &[v(10.0, 0.5), v(30.0, 0.5)], false)).unwrap();
        assert_eq!(maps.calculate_inter_map_connections(MAP_A, MAP_B, 1.0).unwrap(), 2);

        let config = request(MAP_A, v(0.0, 0.0), v(40.0, 0.0)).with_second_map(MAP_B);
        let mut s = create_combined_path_search::<LaneMechanics, LaneMechanics>(TaskId(1), 0.0, config);
        assert_eq!(run(&mut s, &maps), ProcessState::Finished);

        let path = result(&s);
        assert!((path.cost - 50.0).abs() < 1e-4, "cost {}", path.cost);
        assert_eq!(s.transitions_reached(), 2);
        assert_eq!(path.transition_count(), 2);

        let seams: Vec<(MapId, WaypointKind)> = path.waypoints.iter().map(|p| (p.map, p.kind)).collect();
        assert_eq!(
            seams,
            vec![
                (MAP_A, WaypointKind::Regular),
                (MAP_A, WaypointKind::TransitionEntry),
                (MAP_B, WaypointKind::TransitionExit),
                (MAP_B, WaypointKind::TransitionEntry),
                (MAP_A, WaypointKind::TransitionExit),
                (MAP_A, WaypointKind::Regular),
            ]
        );
        assert_eq!(positions(&path).last(), Some(&v(40.0, 0.0)));
    }

    #[test]
    fn equal_fronts_expand_first_map_first() {
        let mut maps = manager();
        maps.register(chain(MAP_A, &[v(0.0, 0.0), v(10.0, 0.0)], false)).unwrap();
        maps.register(chain(MAP_B, &[v(0.0, 0.0), v(0.0, 10.0)], false)).unwrap();

        let config = request(MAP_A, v(0.0, 0.0), v(10.0, 0.0)).with_second_map(MAP_B);
        let mut s = create_combined_path_search::<LaneMechanics, LaneMechanics>(TaskId(1), 0.0, config);

        let lowered = AtomicBool::new(false);
        let ctx = TaskContext::new(&maps, &lowered, 0.0);
        assert_eq!(s.execute_steps(&ctx, 1), ProcessState::Interrupted);
        assert_eq!(s.expanded_states_on(MAP_A), 1);
        assert_eq!(s.expanded_states_on(MAP_B), 0);

        assert_eq!(s.execute(&ctx), ProcessState::Finished);
        assert!((result(&s).cost - 10.0).abs() < 1e-4);
    }

    /// A: `(0,0) ⇄ (2,0) ⇄ (9,0) ⇄ (20,0)`.  B: lanes from `(9,0.5)` (when
    /// `near_branch`) and from `(20,0.5)` up to the goal `(9,10)`, plus an
    /// isolated node at `(0,0)` when `island`.  Transitions sit at x = 0
    /// (island only), 9 and 20.
    fn gated_maps(island: bool, near_branch: bool) -> nav_world::WorldModelManager {
        let mut maps = manager();
        maps.register(chain(MAP_A, &[v(0.0, 0.0), v(2.0, 0.0), v(9.0, 0.0), v(20.0, 0.0)], true)).unwrap();

        let mut b = LaneGraphBuilder::new(MAP_B);
        if island {
            b.add_node(v(0.0, 0.0), ROAD);
        }
        let near = b.add_node(v(9.0, 0.5), ROAD);
        let far = b.add_node(v(20.0, 0.5), ROAD);
        let goal = b.add_node(v(9.0, 10.0), ROAD);
        if near_branch {
            b.add_lane(near, goal, LaneFlags::NONE);
        }
        b.add_lane(far, goal, LaneFlags::NONE);
        maps.register(b.build()).unwrap();

        let expected = if island { 3 } else { 2 };
        assert_eq!(maps.calculate_inter_map_connections(MAP_A, MAP_B, 1.0).unwrap(), expected);
        maps
    }

    fn entry_point(path: &crate::NavigationPath) -> Option<nav_core::Vec2> {
        path.waypoints.iter().find(|p| p.kind == WaypointKind::TransitionEntry).map(|p| p.position)
    }

    #[test]
    fn boundary_start_limits_transitions_to_crossing_radius() {
        let maps = gated_maps(true, true);
        let mut config = request(MAP_A, v(0.0, 0.0), v(9.0, 10.0)).with_second_map(MAP_B);

        // Diameter 5: the crossing at the start sets the radius to 5, so x = 9
        // is skipped; x = 20 lies beyond 2 × 5 and is never activated.
        config.tuning.max_crossing_diameter = 5.0;
        let mut tight = create_combined_path_search::<LaneMechanics, LaneMechanics>(TaskId(1), 0.0, config.clone());
        assert_eq!(run(&mut tight, &maps), ProcessState::Failed);
        assert_eq!(tight.transitions_reached(), 0);

        // Diameter 10: x = 9 is inside the radius, x = 20 (activated, since
        // 20 <= 2 × 10) is still outside it.
        config.tuning.max_crossing_diameter = 10.0;
        let mut wide = create_combined_path_search::<LaneMechanics, LaneMechanics>(TaskId(2), 0.0, config);
        assert_eq!(run(&mut wide, &maps), ProcessState::Finished);
        assert_eq!(wide.transitions_reached(), 1);

        let path = result(&wide);
        // 9 on A, 5 for the crossing, 9.5 up the lane on B.
        assert!((path.cost - 23.5).abs() < 1e-3, "cost {}", path.cost);
        assert_eq!(entry_point(&path), Some(v(9.0, 0.0)));
    }

    #[test]
    fn start_off_the_boundary_uses_every_transition() {
        let maps = gated_maps(false, false);
        let mut config = request(MAP_A, v(0.0, 0.0), v(9.0, 10.0)).with_second_map(MAP_B);
        config.tuning.max_crossing_diameter = 5.0;

        let mut s = create_combined_path_search::<LaneMechanics, LaneMechanics>(TaskId(1), 0.0, config);
        assert_eq!(run(&mut s, &maps), ProcessState::Finished);
        // Both crossings seed a start on B; only the far one leads on.
        assert_eq!(s.transitions_reached(), 2);

        let path = result(&s);
        let climb = v(20.0, 0.5).distance(v(9.0, 10.0));
        assert!((path.cost - (25.0 + climb)).abs() < 1e-3, "cost {}", path.cost);
        assert_eq!(path.transition_count(), 1);
        assert_eq!(entry_point(&path), Some(v(20.0, 0.0)));
    }

    #[test]
    fn unreachable_goal_moves_towards_the_closer_map() {
        let mut maps = manager();
        let mut a = LaneGraphBuilder::new(MAP_A);
        let a0 = a.add_node(v(0.0, 0.0), ROAD);
        let a1 = a.add_node(v(5.0, 0.0), ROAD);
        a.add_node(v(40.0, 0.0), ROAD); // goal, cut off
        a.add_two_way_lane(a0, a1, LaneFlags::NONE);
        maps.register(a.build()).unwrap();
        maps.register(chain(MAP_B, &[v(0.0, 0.0), v(20.0, 0.0)], true)).unwrap();

        let config = request(MAP_A, v(0.0, 0.0), v(40.0, 0.0)).with_second_map(MAP_B);

        let mut plain = create_combined_path_search::<LaneMechanics, LaneMechanics>(TaskId(1), 0.0, config.clone());
        assert_eq!(run(&mut plain, &maps), ProcessState::Failed);
        assert!(result(&plain).is_empty());

        let mut closest =
            create_combined_path_search::<LaneMechanics, LaneMechanics>(TaskId(2), 0.0, config.with_move_to_closest());
        assert_eq!(run(&mut closest, &maps), ProcessState::Failed);
        assert_eq!(closest.transitions_reached(), 0);

        // B ends 20 m from the goal, A only gets to within 35 m.
        let path = result(&closest);
        assert!(!path.reached_target);
        assert_eq!(positions(&path), vec![v(0.0, 0.0), v(20.0, 0.0)]);
        assert!(path.waypoints.iter().all(|p| p.map == MAP_B));
        assert!((path.cost - 20.0).abs() < 1e-4);
    }

    #[test]
    fn missing_second_map_fails() {
        let mut maps = manager();
        maps.register(chain(MAP_A, &[v(0.0, 0.0), v(10.0, 0.0)], false)).unwrap();

        let config = request(MAP_A, v(0.0, 0.0), v(10.0, 0.0)).with_second_map(MAP_B);
        let mut s = create_combined_path_search::<LaneMechanics, LaneMechanics>(TaskId(1), 0.0, config);
        assert_eq!(run(&mut s, &maps), ProcessState::Failed);
        assert_eq!(s.state(), ProcessState::Failed);
    }
}

// ── Factory and placeholder ───────────────────────────────────────────────────

#[cfg(test)]
mod factory {
    use nav_core::{MapId, ProcessState, TaskId, TaskKind};
    use nav_world::{NavGridBuilder, NavigationTask};

    use super::helpers::*;
    use crate::{
        create_search, CombinedPathSearch, GridMechanics, LaneMechanics, NavigationDummyTask, NavigationPath,
        PathSearch, PathSearchConfiguration,
    };

    fn maps_with_lane_and_grid() -> nav_world::WorldModelManager {
        let mut maps = manager();
        maps.register(chain(MAP_A, &[v(0.0, 0.0), v(10.0, 0.0)], true)).unwrap();
        maps.register(NavGridBuilder::new(MAP_B, v(0.0, 0.0), 1.0, 4, 4).fill(ROAD).build()).unwrap();
        maps
    }

    #[test]
    fn dispatches_on_world_kinds() {
        let maps = maps_with_lane_and_grid();

        let lane = create_search(TaskId(1), 0.0, request(MAP_A, v(0.0, 0.0), v(10.0, 0.0)), &maps);
        assert!(lane.as_any().is::<CombinedPathSearch<LaneMechanics, LaneMechanics>>());
        assert_eq!(lane.kind(), TaskKind::PathSearch);

        let grid = create_search(TaskId(2), 0.0, request(MAP_B, v(0.5, 0.5), v(3.5, 3.5)), &maps);
        assert!(grid.as_any().is::<CombinedPathSearch<GridMechanics, GridMechanics>>());

        let mixed = create_search(
            TaskId(3),
            0.0,
            request(MAP_A, v(0.0, 0.0), v(3.5, 3.5)).with_second_map(MAP_B),
            &maps,
        );
        assert!(mixed.as_any().is::<CombinedPathSearch<LaneMechanics, GridMechanics>>());

        let reversed = create_search(
            TaskId(4),
            0.0,
            request(MAP_B, v(0.5, 0.5), v(10.0, 0.0)).with_second_map(MAP_A),
            &maps,
        );
        assert!(reversed.as_any().is::<CombinedPathSearch<GridMechanics, LaneMechanics>>());
    }

    #[test]
    fn unknown_map_gives_failed_placeholder() {
        let maps = maps_with_lane_and_grid();
        let mut s = create_search(TaskId(9), 0.0, request(MapId(42), v(0.0, 0.0), v(1.0, 0.0)), &maps);

        assert!(s.as_any().is::<NavigationDummyTask>());
        assert_eq!(s.kind(), TaskKind::Dummy);
        assert_eq!(s.state(), ProcessState::Failed);
        assert_eq!(run(s.as_mut(), &maps), ProcessState::Failed);

        let mut path = NavigationPath::default();
        s.write_resulting_path(None, &mut path);
        assert!(path.is_empty());
    }

    #[test]
    fn invalid_configuration_gives_failed_placeholder() {
        let maps = maps_with_lane_and_grid();
        let s = create_search(TaskId(9), 0.0, PathSearchConfiguration::default(), &maps);
        assert_eq!(s.state(), ProcessState::Failed);
        assert_eq!(s.num_expanded_search_states(), 0);
    }
}

// ── Configuration ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod configuration {
    use nav_core::{BinaryReader, BinaryWriter, MapId, MovementOptions};

    use super::helpers::*;
    use crate::{IgnoredStep, NavigationGoal, PathSearchConfiguration, SearchError};

    #[test]
    fn persisted_configuration_reads_back() {
        let mut original = request(MAP_A, v(1.0, 2.0), v(3.0, 4.0))
            .with_second_map(MAP_B)
            .with_options(MovementOptions::FORWARD | MovementOptions::PRIORITY)
            .with_move_to_closest()
            .with_ignored_step(IgnoredStep::new(MAP_A, v(0.0, 0.0), v(1.0, 0.0)));
        original.goal = NavigationGoal::Area { center: v(3.0, 4.0), radius: 2.5 };

        let mut w = BinaryWriter::new();
        original.serialize(&mut w).unwrap();
        let bytes = w.into_bytes();

        let mut restored = PathSearchConfiguration::default();
        let mut r = BinaryReader::new(&bytes);
        restored.serialize(&mut r).unwrap();
        assert_eq!(restored, original);
        assert_eq!(r.remaining(), 0);
        assert!(restored.is_priority());
        assert!(restored.is_combined());
    }

    #[test]
    fn same_map_twice_is_not_combined() {
        let config = request(MAP_A, v(0.0, 0.0), v(1.0, 0.0)).with_second_map(MAP_A);
        assert!(!config.is_combined());
    }

    #[test]
    fn validation_rejects_unsearchable_requests() {
        assert!(matches!(
            PathSearchConfiguration::default().validate(),
            Err(SearchError::InvalidConfiguration(_))
        ));
        let nan = request(MapId(1), v(f32::NAN, 0.0), v(1.0, 0.0));
        assert!(nan.validate().is_err());
        assert!(request(MapId(1), v(0.0, 0.0), v(1.0, 0.0)).validate().is_ok());
    }

    #[test]
    fn goal_distance_is_zero_inside_region() {
        let goal = NavigationGoal::Area { center: v(0.0, 0.0), radius: 2.0 };
        assert_eq!(goal.distance_to(v(1.0, 0.0)), 0.0);
        assert!((goal.distance_to(v(5.0, 0.0)) - 3.0).abs() < 1e-6);
    }
}
