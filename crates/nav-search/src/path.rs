//! The result of a path search.

use nav_core::{MapId, Pose, Vec2};

/// Role of a waypoint at a map seam.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WaypointKind {
    #[default]
    Regular,
    /// Last point on a map before crossing to the other one.
    TransitionEntry,
    /// First point on the map crossed into.
    TransitionExit,
}

#[derive(Copy, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathPoint {
    pub position: Vec2,
    pub map:      MapId,
    pub kind:     WaypointKind,
}

impl PathPoint {
    pub fn new(position: Vec2, map: MapId, kind: WaypointKind) -> Self {
        Self { position, map, kind }
    }
}

/// Continuous path across one or two maps.
#[derive(Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavigationPath {
    pub waypoints:      Vec<PathPoint>,
    /// Search cost of the path, transition penalties included.
    pub cost:           f32,
    /// `false` for a best-effort path towards an unreachable goal.
    pub reached_target: bool,
}

impl NavigationPath {
    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.cost = 0.0;
        self.reached_target = false;
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Geometric length; seam gaps included.
    pub fn length(&self) -> f32 {
        self.waypoints
            .windows(2)
            .map(|w| w[0].position.distance(w[1].position))
            .sum()
    }

    /// Number of map crossings.
    pub fn transition_count(&self) -> usize {
        self.waypoints
            .iter()
            .filter(|p| p.kind == WaypointKind::TransitionEntry)
            .count()
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.waypoints.iter().map(|p| p.position)
    }

    /// Anchor the path at the caller's current pose.
    ///
    /// A first waypoint within `snap` of `current` is moved onto it;
    /// otherwise `current` is prepended.
    pub(crate) fn anchor_at(&mut self, current: Pose, snap: f32) {
        let Some(first) = self.waypoints.first_mut() else { return };
        if first.position.distance(current.position) <= snap {
            first.position = current.position;
        } else {
            let map = first.map;
            self.waypoints.insert(0, PathPoint::new(current.position, map, WaypointKind::Regular));
        }
    }
}
