//! Movement option bitmask carried by every path search request.

use std::ops::{BitOr, BitOrAssign};

/// Which kinds of movement a mover may use for one request.
///
/// Stored as a `u8` bitmask so it serializes as a single byte.  The default
/// is forward-only movement.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MovementOptions(pub u8);

impl MovementOptions {
    pub const NONE: MovementOptions = MovementOptions(0);
    /// Drive lanes in their own direction.
    pub const FORWARD: MovementOptions = MovementOptions(1 << 0);
    /// Drive lanes against their direction (reversing).
    pub const BACKWARD: MovementOptions = MovementOptions(1 << 1);
    /// Allow maneuver-only connections (turnarounds, lane changes).
    pub const MANEUVER: MovementOptions = MovementOptions(1 << 2);
    /// Allow tight turns / corner cutting that a full turning radius forbids.
    pub const SHRINK_TURNING_RADIUS: MovementOptions = MovementOptions(1 << 3);
    /// Schedule the request in the priority queue.
    pub const PRIORITY: MovementOptions = MovementOptions(1 << 4);

    #[inline]
    pub fn contains(self, other: MovementOptions) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: MovementOptions) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: MovementOptions) {
        self.0 &= !other.0;
    }

    #[inline]
    pub fn with(mut self, other: MovementOptions) -> Self {
        self.insert(other);
        self
    }

    #[inline]
    pub fn is_priority(self) -> bool {
        self.contains(Self::PRIORITY)
    }
}

impl Default for MovementOptions {
    fn default() -> Self {
        Self::FORWARD
    }
}

impl BitOr for MovementOptions {
    type Output = MovementOptions;
    #[inline]
    fn bitor(self, rhs: MovementOptions) -> MovementOptions {
        MovementOptions(self.0 | rhs.0)
    }
}

impl BitOrAssign for MovementOptions {
    #[inline]
    fn bitor_assign(&mut self, rhs: MovementOptions) {
        self.insert(rhs);
    }
}
