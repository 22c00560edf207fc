//! Inter-map connections: precomputed points where two world models are
//! close enough for a mover to cross from one to the other.
//!
//! Connections are computed offline (at load, or by a
//! [`MapReconnectionTask`](crate::MapReconnectionTask) after map edits) and
//! stored mirrored on both models: transition `t` on map A with
//! `local = p, remote = q` appears on map B as `local = q, remote = p`
//! under the same [`TransitionId`].

use rstar::RTree;

use nav_core::serialize::io_vec;
use nav_core::{MapId, NavResult, Serializer, TransitionId, Vec2};

use crate::spatial::PointEntry;
use crate::WorldModel;

/// One directed view of a transition between this map and `other_map`.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transition {
    pub id:        TransitionId,
    pub other_map: MapId,
    /// Crossing point on this map.
    pub local:     Vec2,
    /// Matching point on `other_map`.
    pub remote:    Vec2,
}

impl Transition {
    /// Straight-line gap bridged by the crossing.
    #[inline]
    pub fn gap(&self) -> f32 {
        self.local.distance(self.remote)
    }

    /// The same transition seen from `other_map`.
    pub fn mirrored(&self, this_map: MapId) -> Transition {
        Transition {
            id:        self.id,
            other_map: this_map,
            local:     self.remote,
            remote:    self.local,
        }
    }

    fn serialize(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        self.id.serialize(s)?;
        self.other_map.serialize(s)?;
        self.local.serialize(s)?;
        self.remote.serialize(s)
    }
}

/// All transitions from one map to every other map.
#[derive(Clone, Debug, Default)]
pub struct InterMapConnections {
    transitions: Vec<Transition>,
}

impl InterMapConnections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transitions leading to `other`, in id order.
    pub fn to_map(&self, other: MapId) -> impl Iterator<Item = &Transition> {
        self.transitions.iter().filter(move |t| t.other_map == other)
    }

    pub fn get(&self, other: MapId, id: TransitionId) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.other_map == other && t.id == id)
    }

    /// Replace every transition towards `other` with `transitions`.
    pub fn replace_for(&mut self, other: MapId, transitions: Vec<Transition>) {
        self.transitions.retain(|t| t.other_map != other);
        self.transitions.extend(transitions);
    }

    pub fn clear_for(&mut self, other: MapId) {
        self.transitions.retain(|t| t.other_map != other);
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn serialize(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        io_vec(s, &mut self.transitions, |s, t| t.serialize(s))
    }
}

/// Pair every connection candidate of `a` with its nearest candidate on `b`
/// within `max_distance` and store the mirrored transitions on both maps.
///
/// Previous transitions between the two maps are replaced.  Returns the
/// number of transitions.
pub fn calculate_inter_map_connections(
    a:            &mut dyn WorldModel,
    b:            &mut dyn WorldModel,
    max_distance: f32,
) -> usize {
    let a_id = a.id();
    let b_id = b.id();
    debug_assert_ne!(a_id, b_id, "a map cannot connect to itself");

    let a_points = a.connection_candidates();
    let b_points = b.connection_candidates();
    let pairs = pair_points(&a_points, &b_points, max_distance);

    // Ids are never reused between the same pair of maps, so a search that
    // activated an old transition cannot resolve it to a new one.
    let first_id = a
        .inter_map_connections()
        .to_map(b_id)
        .chain(b.inter_map_connections().to_map(a_id))
        .map(|t| t.id.0 + 1)
        .max()
        .unwrap_or(0);

    let forward: Vec<Transition> = pairs
        .into_iter()
        .enumerate()
        .map(|(i, (local, remote))| Transition {
            id: TransitionId(first_id + i as u32),
            other_map: b_id,
            local,
            remote,
        })
        .collect();
    let backward: Vec<Transition> = forward.iter().map(|t| t.mirrored(a_id)).collect();
    let count = forward.len();

    a.inter_map_connections_mut().replace_for(b_id, forward);
    b.inter_map_connections_mut().replace_for(a_id, backward);

    tracing::debug!(map_a = %a_id, map_b = %b_id, count, "inter-map connections calculated");
    count
}

type Candidate = (Vec2, nav_core::AreaTypeId);

fn pair_points(a_points: &[Candidate], b_points: &[Candidate], max_distance: f32) -> Vec<(Vec2, Vec2)> {
    let entries: Vec<PointEntry> = b_points
        .iter()
        .enumerate()
        .map(|(i, (p, _))| PointEntry::new(*p, i as u32))
        .collect();
    let tree = RTree::bulk_load(entries);
    let max_sq = max_distance * max_distance;

    let nearest = |(p, _): &Candidate| -> Option<(Vec2, Vec2)> {
        let hit = tree.nearest_neighbor(&[p.x, p.y])?;
        let q = b_points[hit.index as usize].0;
        (p.distance_squared(q) <= max_sq).then_some((*p, q))
    };

    #[cfg(not(feature = "parallel"))]
    {
        a_points.iter().filter_map(nearest).collect()
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        a_points.par_iter().filter_map(nearest).collect()
    }
}
