//! Turn a [`PathSearchConfiguration`] into a runnable search.
//!
//! The concrete `CombinedPathSearch<A, B>` is picked from the world kinds of
//! the requested maps.  Requests that cannot be searched at all come back
//! as a [`NavigationDummyTask`] that is already failed, so callers always
//! get a task they can poll.

use nav_core::TaskId;
use nav_world::{WorldKind, WorldModelManager};

use crate::{
    CombinedPathSearch, GridMechanics, LaneMechanics, NavigationDummyTask, NavigationMechanics, PathSearch,
    PathSearchConfiguration, SearchResult,
};

/// Single-map search over `M`.
pub fn create_path_search<M: NavigationMechanics>(
    id:         TaskId,
    start_time: f64,
    config:     PathSearchConfiguration,
) -> CombinedPathSearch<M, M> {
    CombinedPathSearch::new(id, start_time, config)
}

/// Two-map search; `config.map_a` must hold an `A` world and `config.map_b`
/// a `B` world.
pub fn create_combined_path_search<A: NavigationMechanics, B: NavigationMechanics>(
    id:         TaskId,
    start_time: f64,
    config:     PathSearchConfiguration,
) -> CombinedPathSearch<A, B> {
    CombinedPathSearch::new(id, start_time, config)
}

/// Build the search matching the kinds of the requested maps.
pub fn create_search(
    id:         TaskId,
    start_time: f64,
    config:     PathSearchConfiguration,
    maps:       &WorldModelManager,
) -> Box<dyn PathSearch> {
    let kinds = match resolve_kinds(&config, maps) {
        Ok(k) => k,
        Err(e) => {
            tracing::warn!(task = %id, error = %e, "search request rejected");
            return Box::new(NavigationDummyTask::new(id, start_time, config));
        }
    };

    use WorldKind::{Grid, LaneGraph};
    match kinds {
        (LaneGraph, None) => Box::new(create_path_search::<LaneMechanics>(id, start_time, config)),
        (Grid, None) => Box::new(create_path_search::<GridMechanics>(id, start_time, config)),
        (LaneGraph, Some(LaneGraph)) => {
            Box::new(create_combined_path_search::<LaneMechanics, LaneMechanics>(id, start_time, config))
        }
        (LaneGraph, Some(Grid)) => {
            Box::new(create_combined_path_search::<LaneMechanics, GridMechanics>(id, start_time, config))
        }
        (Grid, Some(LaneGraph)) => {
            Box::new(create_combined_path_search::<GridMechanics, LaneMechanics>(id, start_time, config))
        }
        (Grid, Some(Grid)) => {
            Box::new(create_combined_path_search::<GridMechanics, GridMechanics>(id, start_time, config))
        }
    }
}

fn resolve_kinds(config: &PathSearchConfiguration, maps: &WorldModelManager) -> SearchResult<(WorldKind, Option<WorldKind>)> {
    config.validate()?;
    let a = maps.map_kind(config.map_a)?;
    let b = if config.is_combined() { Some(maps.map_kind(config.map_b)?) } else { None };
    Ok((a, b))
}
