//! lanes — smallest end-to-end example for the rust_nav framework.
//!
//! A walker on a street map asks for paths into a walled plaza on a second
//! map.  The background navigation thread answers while the main loop keeps
//! ticking, the gap past a wall is narrowed mid-run, and one request is canceled.
//!
//! Set `RUST_LOG=nav_task=debug` to follow the scheduler.

mod world;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use nav_core::{MapId, ObstacleId, Pose, ProcessState, TaskId, Vec2};
use nav_search::{NavigationGoal, NavigationPath, WaypointKind};
use nav_task::{NavigationConfig, NavigationTaskThread};
use nav_world::{MapChange, Obstacle};

use world::{PLAZA, STREET, WALKER, build_world};

// ── Constants ─────────────────────────────────────────────────────────────────

const TICK_SECS: f64 = 0.05;
const MAX_TICKS: u32 = 2_000;

// ── Requests ──────────────────────────────────────────────────────────────────

struct Request {
    label: &'static str,
    id:    TaskId,
}

fn request(
    nav:    &NavigationTaskThread,
    label:  &'static str,
    second: Option<MapId>,
    start:  Vec2,
    goal:   Vec2,
) -> Request {
    let mut config = nav.config().request(STREET, WALKER, Pose::new(start, 0.0), NavigationGoal::point(goal));
    if let Some(map) = second {
        config = config.with_second_map(map);
    }
    Request { label, id: nav.request_search(config) }
}

fn describe(path: &NavigationPath) -> String {
    let crossings: Vec<String> = path
        .waypoints
        .iter()
        .filter(|p| p.kind == WaypointKind::TransitionEntry)
        .map(|p| format!("({:.1}, {:.1})", p.position.x, p.position.y))
        .collect();
    format!(
        "{} waypoints, length {:.1}, cost {:.1}, crossings [{}]",
        path.len(),
        path.length(),
        path.cost,
        crossings.join(", ")
    )
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== lanes — rust_nav navigation demo ===");

    // 1. World: two maps, then the transitions between them.
    let maps = build_world().context("building demo maps")?;
    let config = NavigationConfig::default();
    let transitions = maps
        .calculate_inter_map_connections(STREET, PLAZA, config.tuning.connection_distance)
        .context("connecting street and plaza")?;
    println!("Maps: {}  |  street ⇄ plaza transitions: {transitions}", maps.len());
    if transitions == 0 {
        bail!("street and plaza are not connected");
    }

    // 2. Navigation thread.
    let mut nav = NavigationTaskThread::new(Arc::new(maps), config);
    nav.start()?;

    // 3. Requests.
    let mut pending = vec![
        request(&nav, "along the street", None, Vec2::new(0.0, 0.5), Vec2::new(30.0, 0.5)),
        request(&nav, "into the plaza", Some(PLAZA), Vec2::new(0.0, 0.5), Vec2::new(55.5, 2.5)),
        request(&nav, "behind the wall", Some(PLAZA), Vec2::new(10.0, 0.5), Vec2::new(58.5, 0.5)),
    ];
    let canceled = request(&nav, "canceled", Some(PLAZA), Vec2::new(20.0, 0.5), Vec2::new(45.5, 8.5));
    nav.cancel_search(canceled.id);
    pending.push(canceled);

    // 4. Narrow the gap above the wall to a single cell.
    let obstacle = Obstacle { id: ObstacleId(1), center: Vec2::new(50.5, 8.0), radius: 0.8 };
    nav.request_collision_update(PLAZA, MapChange::AddObstacle(obstacle))?;
    pending.push(request(&nav, "through the gap", Some(PLAZA), Vec2::new(0.0, 0.5), Vec2::new(58.5, 8.5)));

    // 5. Tick until every request resolved.
    let t0 = Instant::now();
    let mut sim_time = 0.0;
    let mut path = NavigationPath::default();
    let mut ticks = 0;
    while !pending.is_empty() && ticks < MAX_TICKS {
        ticks += 1;
        sim_time += TICK_SECS;
        nav.update(TICK_SECS, sim_time);

        pending.retain(|r| {
            let state = nav.try_fetch_result(r.id, None, &mut path);
            match state {
                ProcessState::Finished => println!("  {:<20} finished: {}", r.label, describe(&path)),
                ProcessState::Failed if path.is_empty() => println!("  {:<20} failed", r.label),
                ProcessState::Failed => println!("  {:<20} failed, closest: {}", r.label, describe(&path)),
                _ => return true,
            }
            false
        });
        thread::sleep(Duration::from_millis(1));
    }

    let lengths = nav.queue_lengths();
    nav.schedule_shutdown();
    println!();
    println!("Done in {ticks} ticks ({:.3} s wall)", t0.elapsed().as_secs_f64());
    println!("Queues at shutdown: {lengths:?}");

    if !pending.is_empty() {
        bail!("{} requests unresolved after {MAX_TICKS} ticks", pending.len());
    }
    Ok(())
}
