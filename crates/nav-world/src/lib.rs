//! `nav-world` — navigable world models and the locks that guard them.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                       |
//! |-----------------|----------------------------------------------------------------|
//! | [`area`]        | `AreaType`, `AreaTypeTable`, `MoverCosts`, `Direction`         |
//! | [`world`]       | `WorldModel` trait, `WorldKind`, `LegalPoint`, obstacles       |
//! | [`lane_graph`]  | `LaneGraph` (CSR + R-tree), `LaneGraphBuilder`, `LaneFlags`    |
//! | [`grid`]        | `NavGrid`, `NavGridBuilder`, `Cell`                            |
//! | [`connections`] | `Transition`, `InterMapConnections`, connection computation    |
//! | [`loader`]      | `load_lane_graph_csv`, `load_lane_graph_reader`                |
//! | [`managed`]     | `ManagedNavigationMap`, read/write/upgradable guards, `WouldBlock` |
//! | [`manager`]     | `WorldModelManager`                                            |
//! | [`task`]        | `NavigationTask` trait, `TaskHeader`, `TaskContext`            |
//! | [`update`]      | `CollisionUpdateTask`, `MapReconnectionTask`                   |
//! | [`error`]       | `WorldError`, `WorldResult<T>`                                 |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                     |
//! |------------|------------------------------------------------------------|
//! | `parallel` | Pairs connection candidates on Rayon's thread pool.        |
//! | `serde`    | Derives `Serialize`/`Deserialize` on public value types.   |

pub mod area;
pub mod connections;
pub mod error;
pub mod grid;
pub mod lane_graph;
pub mod loader;
pub mod managed;
pub mod manager;
pub mod task;
pub mod update;
pub mod world;

mod spatial;


pub use area::{AreaType, AreaTypeTable, Direction, MoverCosts};
pub use connections::{calculate_inter_map_connections, InterMapConnections, Transition};
pub use error::{WorldError, WorldResult};
pub use grid::{Cell, NavGrid, NavGridBuilder};
pub use lane_graph::{LaneFlags, LaneGraph, LaneGraphBuilder};
pub use loader::{load_lane_graph_csv, load_lane_graph_reader};
pub use managed::{ManagedNavigationMap, ReadAccess, UpgradableAccess, WouldBlock, WriteAccess};
pub use manager::WorldModelManager;
pub use task::{NavigationTask, TaskContext, TaskHeader};
pub use update::{CollisionUpdateTask, MapReconnectionTask};
pub use world::{LegalPoint, MapChange, Obstacle, ObstacleSet, WorldKind, WorldModel};
