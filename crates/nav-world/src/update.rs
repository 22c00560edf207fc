//! Map-update tasks.  Both resolve in a single slice and are idempotent.

use std::any::Any;

use nav_core::{MapId, ProcessState, TaskId, TaskKind};

use crate::task::{NavigationTask, TaskContext, TaskHeader};
use crate::world::MapChange;

// ── CollisionUpdateTask ───────────────────────────────────────────────────────

/// Apply one [`MapChange`] to one map under its write lock.
pub struct CollisionUpdateTask {
    header: TaskHeader,
    map:    MapId,
    change: MapChange,
}

impl CollisionUpdateTask {
    pub fn new(id: TaskId, start_time: f64, map: MapId, change: MapChange) -> Self {
        Self { header: TaskHeader::new(id, start_time), map, change }
    }

    pub fn map(&self) -> MapId {
        self.map
    }

    pub fn change(&self) -> &MapChange {
        &self.change
    }
}

impl NavigationTask for CollisionUpdateTask {
    fn header(&self) -> &TaskHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TaskHeader {
        &mut self.header
    }

    fn kind(&self) -> TaskKind {
        TaskKind::MapUpdate
    }

    fn execute(&mut self, ctx: &TaskContext<'_>) -> ProcessState {
        if self.header.state.is_resolved() {
            return self.header.state;
        }
        self.header.state = match ctx.maps.acquire_write_access(self.map) {
            Err(e) => {
                tracing::warn!(task = %self.header.id, error = %e, "collision update dropped");
                ProcessState::Failed
            }
            Ok(mut world) => {
                let applied = world.integrate_change(&self.change);
                tracing::debug!(task = %self.header.id, map = %self.map, applied, "collision update");
                ProcessState::Finished
            }
        };
        self.header.state
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ── MapReconnectionTask ───────────────────────────────────────────────────────

/// Recompute the transitions between two maps, e.g. after one of them was
/// edited.  Takes both write locks in `MapId` order.
pub struct MapReconnectionTask {
    header:       TaskHeader,
    map_a:        MapId,
    map_b:        MapId,
    max_distance: f32,
}

impl MapReconnectionTask {
    pub fn new(id: TaskId, start_time: f64, map_a: MapId, map_b: MapId, max_distance: f32) -> Self {
        Self { header: TaskHeader::new(id, start_time), map_a, map_b, max_distance }
    }
}

impl NavigationTask for MapReconnectionTask {
    fn header(&self) -> &TaskHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TaskHeader {
        &mut self.header
    }

    fn kind(&self) -> TaskKind {
        TaskKind::MapUpdate
    }

    fn execute(&mut self, ctx: &TaskContext<'_>) -> ProcessState {
        if self.header.state.is_resolved() {
            return self.header.state;
        }
        self.header.state = match ctx.maps.calculate_inter_map_connections(self.map_a, self.map_b, self.max_distance) {
            Err(e) => {
                tracing::warn!(task = %self.header.id, error = %e, "map reconnection dropped");
                ProcessState::Failed
            }
            Ok(count) => {
                tracing::debug!(task = %self.header.id, map_a = %self.map_a, map_b = %self.map_b, count, "maps reconnected");
                ProcessState::Finished
            }
        };
        self.header.state
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
