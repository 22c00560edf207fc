//! `WorldModelManager` — the registry of every navigable map.
//!
//! Maps are registered while the manager is still exclusively owned; after
//! that it is shared (`Arc<WorldModelManager>`) and only the per-map locks
//! hand out access.  There is no global instance: the scheduler, tasks and
//! tests each receive the manager they should use.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use nav_core::{MapId, NavResult, Serializer};

use crate::managed::{ManagedNavigationMap, ReadAccess, WriteAccess};
use crate::{AreaTypeTable, WorldError, WorldKind, WorldModel, WorldResult};

pub struct WorldModelManager {
    maps:  FxHashMap<MapId, ManagedNavigationMap>,
    areas: Arc<AreaTypeTable>,
}

impl WorldModelManager {
    pub fn new(areas: AreaTypeTable) -> Self {
        Self::with_shared_areas(Arc::new(areas))
    }

    pub fn with_shared_areas(areas: Arc<AreaTypeTable>) -> Self {
        Self { maps: FxHashMap::default(), areas }
    }

    // ── Registration ──────────────────────────────────────────────────────

    /// Register `world` under its own id.
    pub fn register<W: WorldModel>(&mut self, world: W) -> WorldResult<MapId> {
        self.register_boxed(Box::new(world))
    }

    pub fn register_boxed(&mut self, world: Box<dyn WorldModel>) -> WorldResult<MapId> {
        let id = world.id();
        if self.maps.contains_key(&id) {
            return Err(WorldError::DuplicateMap(id));
        }
        tracing::debug!(map = %id, kind = ?world.kind(), "world model registered");
        self.maps.insert(id, ManagedNavigationMap::new(world));
        Ok(id)
    }

    /// Unregister and return the world model.
    pub fn unregister(&mut self, id: MapId) -> WorldResult<Box<dyn WorldModel>> {
        let managed = self.maps.remove(&id).ok_or(WorldError::MapNotFound(id))?;
        let world = managed.into_inner();
        // Drop stale transitions pointing at the removed map.
        for other in self.maps.values_mut() {
            other.get_mut().inter_map_connections_mut().clear_for(id);
        }
        Ok(world)
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    pub fn contains(&self, id: MapId) -> bool {
        self.maps.contains_key(&id)
    }

    pub fn map(&self, id: MapId) -> WorldResult<&ManagedNavigationMap> {
        self.maps.get(&id).ok_or(WorldError::MapNotFound(id))
    }

    /// Representation of map `id`.  Never blocks.
    pub fn map_kind(&self, id: MapId) -> WorldResult<WorldKind> {
        Ok(self.map(id)?.kind())
    }

    /// Registered ids in ascending order.
    pub fn map_ids(&self) -> Vec<MapId> {
        let mut ids: Vec<MapId> = self.maps.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn areas(&self) -> &AreaTypeTable {
        &self.areas
    }

    pub fn shared_areas(&self) -> Arc<AreaTypeTable> {
        Arc::clone(&self.areas)
    }

    // ── Access ────────────────────────────────────────────────────────────

    pub fn acquire_read_access(&self, id: MapId) -> WorldResult<ReadAccess<'_>> {
        Ok(self.map(id)?.acquire_read_access())
    }

    pub fn acquire_write_access(&self, id: MapId) -> WorldResult<WriteAccess<'_>> {
        Ok(self.map(id)?.acquire_write_access())
    }

    /// Read-lock two distinct maps.  Locks are always taken in ascending
    /// `MapId` order; guards are returned in argument order.
    pub fn acquire_parallel_read_access(&self, a: MapId, b: MapId) -> WorldResult<(ReadAccess<'_>, ReadAccess<'_>)> {
        let (map_a, map_b) = self.pair(a, b)?;
        if a < b {
            let ga = map_a.acquire_read_access();
            Ok((ga, map_b.acquire_read_access()))
        } else {
            let gb = map_b.acquire_read_access();
            Ok((map_a.acquire_read_access(), gb))
        }
    }

    /// Write-lock two distinct maps in ascending `MapId` order, so two
    /// callers needing the same pair can never deadlock.
    pub fn acquire_parallel_write_access(&self, a: MapId, b: MapId) -> WorldResult<(WriteAccess<'_>, WriteAccess<'_>)> {
        let (map_a, map_b) = self.pair(a, b)?;
        if a < b {
            let ga = map_a.acquire_write_access();
            Ok((ga, map_b.acquire_write_access()))
        } else {
            let gb = map_b.acquire_write_access();
            Ok((map_a.acquire_write_access(), gb))
        }
    }

    fn pair(&self, a: MapId, b: MapId) -> WorldResult<(&ManagedNavigationMap, &ManagedNavigationMap)> {
        if a == b {
            return Err(WorldError::SameMap(a));
        }
        Ok((self.map(a)?, self.map(b)?))
    }

    // ── Inter-map connections ─────────────────────────────────────────────

    /// Recompute transitions between `a` and `b` under a parallel write lock.
    pub fn calculate_inter_map_connections(&self, a: MapId, b: MapId, max_distance: f32) -> WorldResult<usize> {
        let (mut wa, mut wb) = self.acquire_parallel_write_access(a, b)?;
        Ok(wa.calculate_inter_map_connections(&mut *wb, max_distance))
    }

    /// Connect every pair of registered maps.  Returns the total number of
    /// transitions.
    pub fn connect_all(&self, max_distance: f32) -> usize {
        let ids = self.map_ids();
        let mut total = 0;
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                total += self.calculate_inter_map_connections(a, b, max_distance).unwrap_or(0);
            }
        }
        tracing::info!(maps = ids.len(), transitions = total, "inter-map connections ready");
        total
    }

    // ── Persistence ───────────────────────────────────────────────────────

    /// Static then dynamic data of every map in ascending id order.  When
    /// reading, the same maps must already be registered.
    pub fn serialize(&self, s: &mut dyn Serializer) -> NavResult<()> {
        for id in self.map_ids() {
            let mut guard = self.maps[&id].acquire_write_access();
            guard.serialize_static_data(s)?;
            guard.serialize_dynamic_data(s)?;
        }
        Ok(())
    }
}
