//! `nav-search` — path searches over one or two world models.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                          |
//! |----------------|-------------------------------------------------------------------|
//! | [`astar`]      | `AStar<N>` open/closed bookkeeping, `GoalType`, `Step`            |
//! | [`mechanics`]  | `NavigationMechanics` trait, `LaneMechanics`, `GridMechanics`     |
//! | [`config`]     | `PathSearchConfiguration`, `NavigationGoal`, `IgnoredStep`, tuning |
//! | [`path`]       | `NavigationPath`, `PathPoint`, `WaypointKind`                     |
//! | [`search`]     | `PathSearch` task contract, `NavigationDummyTask`                 |
//! | [`combined`]   | `CombinedPathSearch<A, B>`                                        |
//! | [`factory`]    | `create_search` and the typed constructors                        |
//! | [`error`]      | `SearchError`, `SearchResult<T>`                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                          |
//! |---------|-----------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on configuration and paths.   |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use nav_search::{create_search, NavigationGoal, PathSearchConfiguration};
//!
//! let config = PathSearchConfiguration::new(map, mover, start, NavigationGoal::point(goal));
//! let mut search = create_search(TaskId(1), 0.0, config, &maps);
//! search.execute(&TaskContext::new(&maps, &interrupt, 0.0));
//!
//! let mut path = NavigationPath::default();
//! search.write_resulting_path(None, &mut path);
//! ```

pub mod astar;
pub mod combined;
pub mod config;
pub mod error;
pub mod factory;
pub mod mechanics;
pub mod path;
pub mod search;

#[cfg(test)]
mod tests;

pub use astar::{AStar, GoalType, SearchState, Step};
pub use combined::CombinedPathSearch;
pub use config::{IgnoredStep, NavigationGoal, PathSearchConfiguration, SearchTuning};
pub use error::{SearchError, SearchResult};
pub use factory::{create_combined_path_search, create_path_search, create_search};
pub use mechanics::{GridMechanics, LaneMechanics, NavigationMechanics};
pub use path::{NavigationPath, PathPoint, WaypointKind};
pub use search::{NavigationDummyTask, PathSearch};
