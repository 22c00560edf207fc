//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  The inner integer is `pub` to allow
//! direct indexing into `Vec`s, but callers should prefer `.index()`.

use std::fmt;

use crate::{NavResult, Serializer};

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty) => $io:ident;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID" — the inner type's `MAX`.
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline(always)]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }

            /// Read or write this ID through a directional [`Serializer`].
            pub fn serialize(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
                s.$io(&mut self.0)
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Identifier of a registered world model (navigation map).
    pub struct MapId(u32) => io_u32;
}

typed_id! {
    /// Request / task identifier handed out by the scheduler.  Monotonically
    /// increasing for the lifetime of a `NavigationTaskThread`.
    pub struct TaskId(u64) => io_u64;
}

typed_id! {
    /// Index of a lane-graph node.
    pub struct NodeId(u32) => io_u32;
}

typed_id! {
    /// Index of a directed lane-graph edge.
    pub struct EdgeId(u32) => io_u32;
}

typed_id! {
    /// Index of a search state inside one `AStar` state arena.
    pub struct StateIndex(u32) => io_u32;
}

typed_id! {
    /// Index into the global `AreaTypeTable`.  Stable once assigned.
    pub struct AreaTypeId(u16) => io_u16;
}

typed_id! {
    /// Application-defined mover category (pedestrian, vehicle, …).
    pub struct MoverTypeId(u16) => io_u16;
}

typed_id! {
    /// Identifier of one inter-map transition, unique per map pair.
    pub struct TransitionId(u32) => io_u32;
}

typed_id! {
    /// Caller-chosen identifier of a dynamic obstacle.
    pub struct ObstacleId(u32) => io_u32;
}
