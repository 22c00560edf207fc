//! The `WorldModel` trait — one navigable space representation.
//!
//! # Object safety
//!
//! World models are stored as `Box<dyn WorldModel>` inside
//! [`ManagedNavigationMap`](crate::ManagedNavigationMap), so the trait is
//! object safe.  Searches recover the concrete type through
//! [`WorldModel::as_any`] after dispatching on [`WorldModel::kind`].

use std::any::Any;

use nav_core::serialize::io_vec;
use nav_core::{AreaTypeId, MapId, MoverTypeId, NavResult, ObstacleId, Serializer, TaskId, Vec2};

use crate::connections::InterMapConnections;
use crate::task::NavigationTask;
use crate::update::CollisionUpdateTask;
use crate::AreaTypeTable;

/// Closed set of world representations.  Search factories match on this to
/// pick a monomorphized search implementation.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WorldKind {
    LaneGraph,
    Grid,
}

/// A legal (mover-admissible, unblocked) point near a query position.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LegalPoint {
    pub position: Vec2,
    /// Distance from the query position.
    pub distance: f32,
    pub area:     AreaTypeId,
}

/// A circular dynamic obstacle.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Obstacle {
    pub id:     ObstacleId,
    pub center: Vec2,
    pub radius: f32,
}

impl Obstacle {
    #[inline]
    pub fn covers(&self, p: Vec2) -> bool {
        self.center.distance_squared(p) <= self.radius * self.radius
    }

    pub fn serialize(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        self.id.serialize(s)?;
        self.center.serialize(s)?;
        s.io_f32(&mut self.radius)
    }
}

/// A dynamic collision change applied by a map-update task.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MapChange {
    AddObstacle(Obstacle),
    RemoveObstacle(ObstacleId),
}

/// Obstacles currently integrated into one world model.
///
/// Adding an existing id or removing an unknown one is a no-op, which makes
/// collision updates idempotent.
#[derive(Clone, Debug, Default)]
pub struct ObstacleSet {
    obstacles: Vec<Obstacle>,
}

impl ObstacleSet {
    pub fn contains(&self, id: ObstacleId) -> bool {
        self.obstacles.iter().any(|o| o.id == id)
    }

    /// Returns `false` if `obstacle.id` was already present.
    pub fn insert(&mut self, obstacle: Obstacle) -> bool {
        if self.contains(obstacle.id) {
            return false;
        }
        self.obstacles.push(obstacle);
        true
    }

    pub fn remove(&mut self, id: ObstacleId) -> Option<Obstacle> {
        let pos = self.obstacles.iter().position(|o| o.id == id)?;
        Some(self.obstacles.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn serialize(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        io_vec(s, &mut self.obstacles, |s, o| o.serialize(s))
    }
}

/// One navigable space.
///
/// Implementations own their geometry, per-point area tags, dynamic
/// blocking state and their [`InterMapConnections`].
pub trait WorldModel: Send + Sync + Any {
    fn id(&self) -> MapId;

    fn kind(&self) -> WorldKind;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Project `pos` onto the nearest legal points for `mover` within
    /// `max_distance`, appending them to `out` sorted by ascending distance.
    ///
    /// With `ideal_only`, only ideal points (lane nodes, cell centres) are
    /// reported.  Finding nothing leaves `out` untouched; callers treat that
    /// as "this map cannot service the request".
    fn write_closest_legal_points(
        &self,
        pos:          Vec2,
        mover:        MoverTypeId,
        areas:        &AreaTypeTable,
        max_distance: f32,
        ideal_only:   bool,
        out:          &mut Vec<LegalPoint>,
    );

    /// Every unblocked ideal point usable by at least one mover, used to pair
    /// this world with another when computing transitions.
    fn connection_candidates(&self) -> Vec<(Vec2, AreaTypeId)>;

    fn inter_map_connections(&self) -> &InterMapConnections;

    fn inter_map_connections_mut(&mut self) -> &mut InterMapConnections;

    /// Compute transitions to `other` and store them on both models.
    /// Returns the number of transitions found.
    fn calculate_inter_map_connections(&mut self, other: &mut dyn WorldModel, max_distance: f32) -> usize;

    /// Apply a dynamic collision change.  Returns `false` if it was a no-op.
    fn integrate_change(&mut self, change: &MapChange) -> bool;

    /// Build the map-update task that applies `change` to this world.
    fn create_map_update_task(&self, task_id: TaskId, start_time: f64, change: MapChange) -> Box<dyn NavigationTask> {
        Box::new(CollisionUpdateTask::new(task_id, start_time, self.id(), change))
    }

    /// Geometry and area tags — everything fixed at map load.
    fn serialize_static_data(&mut self, s: &mut dyn Serializer) -> NavResult<()>;

    /// Obstacles, blocking and inter-map connections.
    fn serialize_dynamic_data(&mut self, s: &mut dyn Serializer) -> NavResult<()>;
}

/// Insert `p` into `out` keeping ascending distance order (stable for ties).
pub(crate) fn push_sorted(out: &mut Vec<LegalPoint>, from: usize, p: LegalPoint) {
    let idx = out[from..].partition_point(|q| q.distance <= p.distance) + from;
    out.insert(idx, p);
}
