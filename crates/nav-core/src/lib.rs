//! `nav-core` — foundational types for the `rust_nav` navigation framework.
//!
//! This crate is a dependency of every other `nav-*` crate.  It has no
//! `nav-*` dependencies and only `thiserror` (plus optional `serde`) from
//! the outside world.
//!
//! # What lives here
//!
//! | Module          | Contents                                                        |
//! |-----------------|-----------------------------------------------------------------|
//! | [`ids`]         | `MapId`, `TaskId`, `NodeId`, `EdgeId`, `StateIndex`, …          |
//! | [`geo`]         | `Vec2`, `Pose`, segment projection                              |
//! | [`options`]     | `MovementOptions` bitmask                                       |
//! | [`process`]     | `ProcessState` task state machine, `TaskKind`                   |
//! | [`serialize`]   | `Serializer` contract, `BinaryWriter`, `BinaryReader`           |
//! | [`error`]       | `NavError`, `NavResult`                                         |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to public value types.      |

pub mod error;
pub mod geo;
pub mod ids;
pub mod options;
pub mod process;
pub mod serialize;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{NavError, NavResult};
pub use geo::{Pose, Vec2};
pub use ids::{AreaTypeId, EdgeId, MapId, MoverTypeId, NodeId, ObstacleId, StateIndex, TaskId, TransitionId};
pub use options::MovementOptions;
pub use process::{ProcessState, TaskKind};
pub use serialize::{BinaryReader, BinaryWriter, Serializer};
