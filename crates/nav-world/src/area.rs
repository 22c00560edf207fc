//! Area types: per-mover cost and speed multipliers for one classification
//! of traversable space.
//!
//! The [`AreaTypeTable`] is built once at load time and shared read-only by
//! every world model and every search (through `WorldModelManager`).  IDs
//! are indices into the table and never change after registration.

use nav_core::serialize::io_vec;
use nav_core::{AreaTypeId, MoverTypeId, NavResult, Serializer};

/// Travel direction relative to a lane's own direction.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Forward,
    Backward,
}

/// Cost and speed multipliers for one mover type on one area type.
///
/// A speed of `0.0` forbids movement in that direction.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MoverCosts {
    pub forward_cost:   f32,
    pub backward_cost:  f32,
    pub forward_speed:  f32,
    pub backward_speed: f32,
}

impl MoverCosts {
    /// Unit cost and speed forward, backward movement forbidden.
    pub const FORWARD_ONLY: MoverCosts = MoverCosts {
        forward_cost:   1.0,
        backward_cost:  1.0,
        forward_speed:  1.0,
        backward_speed: 0.0,
    };

    /// Unit cost and speed in both directions.
    pub const UNIFORM: MoverCosts = MoverCosts {
        forward_cost:   1.0,
        backward_cost:  1.0,
        forward_speed:  1.0,
        backward_speed: 1.0,
    };

    /// Effective cost per metre in `dir`, or `None` if forbidden.
    #[inline]
    pub fn cost_factor(&self, dir: Direction) -> Option<f32> {
        let (cost, speed) = match dir {
            Direction::Forward  => (self.forward_cost, self.forward_speed),
            Direction::Backward => (self.backward_cost, self.backward_speed),
        };
        (speed > 0.0).then(|| cost / speed)
    }

    fn serialize(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        s.io_f32(&mut self.forward_cost)?;
        s.io_f32(&mut self.backward_cost)?;
        s.io_f32(&mut self.forward_speed)?;
        s.io_f32(&mut self.backward_speed)
    }
}

impl Default for MoverCosts {
    fn default() -> Self {
        Self::FORWARD_ONLY
    }
}

/// One area classification.  `movers[m]` is `None` when mover type `m` may
/// not enter this area at all.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AreaType {
    pub name: String,
    movers:   Vec<Option<MoverCosts>>,
}

impl AreaType {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), movers: Vec::new() }
    }

    /// Builder-style: allow `mover` with the given multipliers.
    pub fn with_mover(mut self, mover: MoverTypeId, costs: MoverCosts) -> Self {
        if self.movers.len() <= mover.index() {
            self.movers.resize(mover.index() + 1, None);
        }
        self.movers[mover.index()] = Some(costs);
        self
    }

    #[inline]
    pub fn costs(&self, mover: MoverTypeId) -> Option<&MoverCosts> {
        self.movers.get(mover.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn allows(&self, mover: MoverTypeId) -> bool {
        self.costs(mover).is_some()
    }

    fn serialize(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        s.io_string(&mut self.name)?;
        io_vec(s, &mut self.movers, |s, slot| {
            let mut present = slot.is_some();
            s.io_bool(&mut present)?;
            if present {
                let mut costs = slot.unwrap_or_default();
                costs.serialize(s)?;
                *slot = Some(costs);
            } else {
                *slot = None;
            }
            Ok(())
        })
    }
}

/// The global, append-only table of area types.
#[derive(Clone, Debug, Default)]
pub struct AreaTypeTable {
    types: Vec<AreaType>,
}

impl AreaTypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `area` and return its permanent ID.
    pub fn register(&mut self, area: AreaType) -> AreaTypeId {
        let id = AreaTypeId(self.types.len() as u16);
        self.types.push(area);
        id
    }

    #[inline]
    pub fn get(&self, id: AreaTypeId) -> Option<&AreaType> {
        self.types.get(id.index())
    }

    /// Look an area type up by name.
    pub fn find(&self, name: &str) -> Option<AreaTypeId> {
        self.types
            .iter()
            .position(|a| a.name == name)
            .map(|i| AreaTypeId(i as u16))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// `true` if `mover` may stand in / move through area `id`.
    #[inline]
    pub fn allows(&self, id: AreaTypeId, mover: MoverTypeId) -> bool {
        self.get(id).is_some_and(|a| a.allows(mover))
    }

    /// Effective cost per metre for `mover` on area `id` in `dir`.
    #[inline]
    pub fn cost_factor(&self, id: AreaTypeId, mover: MoverTypeId, dir: Direction) -> Option<f32> {
        self.get(id)?.costs(mover)?.cost_factor(dir)
    }

    /// Smallest cost factor `mover` can achieve anywhere.  Multiplying a
    /// straight-line distance by this keeps A* heuristics admissible.
    ///
    /// Returns `1.0` if the mover is allowed nowhere.
    pub fn min_cost_factor(&self, mover: MoverTypeId) -> f32 {
        self.types
            .iter()
            .filter_map(|a| a.costs(mover))
            .flat_map(|c| [c.cost_factor(Direction::Forward), c.cost_factor(Direction::Backward)])
            .flatten()
            .fold(None, |acc: Option<f32>, f| Some(acc.map_or(f, |a| a.min(f))))
            .unwrap_or(1.0)
    }

    pub fn serialize(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        io_vec(s, &mut self.types, |s, a| a.serialize(s))
    }
}
