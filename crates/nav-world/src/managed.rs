//! Reader/writer gate around one world model.
//!
//! Searches hold a [`ReadAccess`] for the duration of one execution slice;
//! map-update tasks hold a [`WriteAccess`].  Guards release on drop.
//!
//! The `try_*` variants never block.  They return [`WouldBlock`] instead of
//! an unlocked guard, so a failed acquisition cannot be used by accident.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};
use thiserror::Error;

use nav_core::MapId;

use crate::{WorldKind, WorldModel};

/// A non-blocking acquisition found the map locked incompatibly.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("map {map} is locked")]
pub struct WouldBlock {
    pub map: MapId,
}

/// One registered world model plus its upgradable reader/writer lock.
pub struct ManagedNavigationMap {
    id:    MapId,
    kind:  WorldKind,
    world: RwLock<Box<dyn WorldModel>>,
}

impl ManagedNavigationMap {
    pub fn new(world: Box<dyn WorldModel>) -> Self {
        Self { id: world.id(), kind: world.kind(), world: RwLock::new(world) }
    }

    pub fn id(&self) -> MapId {
        self.id
    }

    /// Known without taking the lock.
    pub fn kind(&self) -> WorldKind {
        self.kind
    }

    /// Block until no writer holds the map.
    pub fn acquire_read_access(&self) -> ReadAccess<'_> {
        ReadAccess { guard: self.world.read() }
    }

    pub fn try_acquire_read_access(&self) -> Result<ReadAccess<'_>, WouldBlock> {
        self.world
            .try_read()
            .map(|guard| ReadAccess { guard })
            .ok_or(WouldBlock { map: self.id })
    }

    /// Block until no reader or writer holds the map.
    pub fn acquire_write_access(&self) -> WriteAccess<'_> {
        WriteAccess { guard: self.world.write() }
    }

    pub fn try_acquire_write_access(&self) -> Result<WriteAccess<'_>, WouldBlock> {
        self.world
            .try_write()
            .map(|guard| WriteAccess { guard })
            .ok_or(WouldBlock { map: self.id })
    }

    /// Shared access that can later be upgraded to exclusive access without
    /// letting another writer in between.  At most one upgradable guard
    /// exists at a time; plain readers may coexist with it.
    pub fn acquire_upgradable_access(&self) -> UpgradableAccess<'_> {
        UpgradableAccess { guard: self.world.upgradable_read() }
    }

    pub fn try_acquire_upgradable_access(&self) -> Result<UpgradableAccess<'_>, WouldBlock> {
        self.world
            .try_upgradable_read()
            .map(|guard| UpgradableAccess { guard })
            .ok_or(WouldBlock { map: self.id })
    }

    pub(crate) fn into_inner(self) -> Box<dyn WorldModel> {
        self.world.into_inner()
    }

    /// Lock-free access through exclusive ownership of the manager.
    pub(crate) fn get_mut(&mut self) -> &mut dyn WorldModel {
        &mut **self.world.get_mut()
    }
}

// ── Guards ────────────────────────────────────────────────────────────────────

/// Shared access to one world model.
pub struct ReadAccess<'a> {
    guard: RwLockReadGuard<'a, Box<dyn WorldModel>>,
}

impl ReadAccess<'_> {
    /// The concrete world model, if it is a `W`.
    pub fn downcast<W: WorldModel>(&self) -> Option<&W> {
        self.guard.as_any().downcast_ref::<W>()
    }
}

impl Deref for ReadAccess<'_> {
    type Target = dyn WorldModel;

    fn deref(&self) -> &Self::Target {
        &**self.guard
    }
}

/// Exclusive access to one world model.
pub struct WriteAccess<'a> {
    guard: RwLockWriteGuard<'a, Box<dyn WorldModel>>,
}

impl WriteAccess<'_> {
    pub fn downcast_mut<W: WorldModel>(&mut self) -> Option<&mut W> {
        self.guard.as_any_mut().downcast_mut::<W>()
    }
}

impl Deref for WriteAccess<'_> {
    type Target = dyn WorldModel;

    fn deref(&self) -> &Self::Target {
        &**self.guard
    }
}

impl DerefMut for WriteAccess<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut **self.guard
    }
}

/// Shared access that may be upgraded in place.
pub struct UpgradableAccess<'a> {
    guard: RwLockUpgradableReadGuard<'a, Box<dyn WorldModel>>,
}

impl<'a> UpgradableAccess<'a> {
    /// Wait for the remaining readers to leave, then become exclusive.
    pub fn upgrade(self) -> WriteAccess<'a> {
        WriteAccess { guard: RwLockUpgradableReadGuard::upgrade(self.guard) }
    }

    /// Upgrade only if no other reader is present.
    pub fn try_upgrade(self) -> Result<WriteAccess<'a>, UpgradableAccess<'a>> {
        RwLockUpgradableReadGuard::try_upgrade(self.guard)
            .map(|guard| WriteAccess { guard })
            .map_err(|guard| UpgradableAccess { guard })
    }
}

impl Deref for UpgradableAccess<'_> {
    type Target = dyn WorldModel;

    fn deref(&self) -> &Self::Target {
        &**self.guard
    }
}
