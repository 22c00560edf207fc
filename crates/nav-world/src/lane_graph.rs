//! Lane graph world model and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format in both directions.
//! Given a `NodeId n`, its outgoing lanes occupy EdgeIds
//!
//! ```text
//! node_out_start[n] .. node_out_start[n+1]
//! ```
//!
//! and its incoming lanes are listed in
//! `in_edges[node_in_start[n] .. node_in_start[n+1]]`.  Incoming lanes are
//! what a mover driving backwards expands.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps `(x, y)` to nearby `NodeId`s.  Used for
//! start/goal snapping, transition lookup and obstacle integration.

use std::any::Any;
use std::ops::BitOr;

use rstar::RTree;

use nav_core::serialize::io_vec;
use nav_core::{AreaTypeId, EdgeId, MapId, MoverTypeId, NavResult, NodeId, Serializer, Vec2};

use crate::connections::{self, InterMapConnections};
use crate::spatial::PointEntry;
use crate::world::{push_sorted, LegalPoint, MapChange, ObstacleSet, WorldKind, WorldModel};
use crate::AreaTypeTable;

// ── LaneFlags ─────────────────────────────────────────────────────────────────

/// Per-lane restrictions, matched against `MovementOptions` by the search.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneFlags(pub u8);

impl LaneFlags {
    pub const NONE: LaneFlags = LaneFlags(0);
    /// Turnaround or lane-change connection; needs `MovementOptions::MANEUVER`.
    pub const MANEUVER: LaneFlags = LaneFlags(1 << 0);
    /// Turn tighter than the default radius; needs `SHRINK_TURNING_RADIUS`.
    pub const TIGHT_TURN: LaneFlags = LaneFlags(1 << 1);

    #[inline]
    pub fn contains(self, other: LaneFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for LaneFlags {
    type Output = LaneFlags;
    #[inline]
    fn bitor(self, rhs: LaneFlags) -> LaneFlags {
        LaneFlags(self.0 | rhs.0)
    }
}

// ── LaneGraph ─────────────────────────────────────────────────────────────────

/// Directed lane graph in CSR format plus a spatial index for node snapping.
///
/// Geometry fields are `pub` for direct indexed access on hot paths.  Do not
/// construct directly; use [`LaneGraphBuilder`].
pub struct LaneGraph {
    id: MapId,

    // ── Node data ─────────────────────────────────────────────────────────
    pub node_pos:  Vec<Vec2>,
    pub node_area: Vec<AreaTypeId>,

    // ── CSR adjacency ─────────────────────────────────────────────────────
    /// Outgoing lanes of node `n` are EdgeIds
    /// `node_out_start[n] .. node_out_start[n+1]`.  Length = `node_count + 1`.
    pub node_out_start: Vec<u32>,
    /// Row pointer into `in_edges`.  Length = `node_count + 1`.
    pub node_in_start: Vec<u32>,
    /// Incoming EdgeIds grouped by destination node.
    pub in_edges: Vec<EdgeId>,

    // ── Edge data (indexed by EdgeId) ─────────────────────────────────────
    pub edge_from:   Vec<NodeId>,
    pub edge_to:     Vec<NodeId>,
    pub edge_length: Vec<f32>,
    pub edge_flags:  Vec<LaneFlags>,

    max_edge_length: f32,
    spatial_idx:     RTree<PointEntry>,

    // ── Dynamic data ──────────────────────────────────────────────────────
    /// Number of obstacles covering each node.
    blocked:     Vec<u16>,
    obstacles:   ObstacleSet,
    connections: InterMapConnections,
}

impl LaneGraph {
    /// An empty lane graph.  Every query against it finds nothing.
    pub fn empty(id: MapId) -> Self {
        LaneGraphBuilder::new(id).build()
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    /// Length of the longest lane.  Bounds how far a point on a lane can be
    /// from that lane's source node.
    pub fn max_edge_length(&self) -> f32 {
        self.max_edge_length
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Outgoing lanes of `node`.  Contiguous index range, no allocation.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    /// Incoming lanes of `node`.
    #[inline]
    pub fn in_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_in_start[node.index()] as usize;
        let end   = self.node_in_start[node.index() + 1] as usize;
        self.in_edges[start..end].iter().copied()
    }

    #[inline]
    pub fn out_degree(&self, node: NodeId) -> usize {
        (self.node_out_start[node.index() + 1] - self.node_out_start[node.index()]) as usize
    }

    // ── Legality ──────────────────────────────────────────────────────────

    #[inline]
    pub fn is_blocked(&self, node: NodeId) -> bool {
        self.blocked[node.index()] > 0
    }

    /// Unblocked and in an area `mover` may enter.
    #[inline]
    pub fn is_legal(&self, node: NodeId, mover: MoverTypeId, areas: &AreaTypeTable) -> bool {
        !self.is_blocked(node) && areas.allows(self.node_area[node.index()], mover)
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Nodes within `max_distance` of `pos`, nearest first.
    pub fn nodes_within(&self, pos: Vec2, max_distance: f32) -> Vec<(NodeId, f32)> {
        let max_sq = max_distance * max_distance;
        self.spatial_idx
            .nearest_neighbor_iter(&[pos.x, pos.y])
            .map(|e| (NodeId(e.index), pos.distance_squared(self.node_pos[e.index as usize])))
            .take_while(|&(_, d_sq)| d_sq <= max_sq)
            .map(|(n, d_sq)| (n, d_sq.sqrt()))
            .collect()
    }

    /// The nearest node to `pos`, or `None` for an empty graph.
    pub fn nearest_node(&self, pos: Vec2) -> Option<NodeId> {
        self.spatial_idx.nearest_neighbor(&[pos.x, pos.y]).map(|e| NodeId(e.index))
    }

    /// The node lying at `pos` (within `eps`), if any.
    pub fn node_at(&self, pos: Vec2, eps: f32) -> Option<NodeId> {
        self.nearest_node(pos)
            .filter(|&n| self.node_pos[n.index()].distance(pos) <= eps)
    }

    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    fn recompute_blocking(&mut self) {
        self.blocked.iter_mut().for_each(|b| *b = 0);
        let covered: Vec<NodeId> = self
            .obstacles
            .iter()
            .flat_map(|o| self.nodes_within(o.center, o.radius))
            .map(|(n, _)| n)
            .collect();
        for n in covered {
            self.blocked[n.index()] += 1;
        }
    }
}

impl WorldModel for LaneGraph {
    fn id(&self) -> MapId {
        self.id
    }

    fn kind(&self) -> WorldKind {
        WorldKind::LaneGraph
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn write_closest_legal_points(
        &self,
        pos:          Vec2,
        mover:        MoverTypeId,
        areas:        &AreaTypeTable,
        max_distance: f32,
        ideal_only:   bool,
        out:          &mut Vec<LegalPoint>,
    ) {
        let first = out.len();
        // A lane passing within `max_distance` has its source node within
        // `max_distance + max_edge_length`.
        let reach = if ideal_only { max_distance } else { max_distance + self.max_edge_length };

        for (node, d) in self.nodes_within(pos, reach) {
            if !self.is_legal(node, mover, areas) {
                continue;
            }
            let node_pos = self.node_pos[node.index()];
            let area     = self.node_area[node.index()];
            if d <= max_distance {
                push_sorted(out, first, LegalPoint { position: node_pos, distance: d, area });
            }
            if ideal_only {
                continue;
            }
            for e in self.out_edges(node) {
                let to = self.edge_to[e.index()];
                if !self.is_legal(to, mover, areas) {
                    continue;
                }
                let to_pos = self.node_pos[to.index()];
                let p = pos.project_onto_segment(node_pos, to_pos);
                let dist = pos.distance(p);
                let interior = !p.approx_eq(node_pos, 1e-4) && !p.approx_eq(to_pos, 1e-4);
                // Two-way lanes project to the same point twice.
                let seen = out[first..].iter().any(|q| q.position.approx_eq(p, 1e-4));
                if dist <= max_distance && interior && !seen {
                    push_sorted(out, first, LegalPoint { position: p, distance: dist, area });
                }
            }
        }
    }

    fn connection_candidates(&self) -> Vec<(Vec2, AreaTypeId)> {
        (0..self.node_count())
            .filter(|&i| self.blocked[i] == 0 && self.node_area[i].is_valid())
            .map(|i| (self.node_pos[i], self.node_area[i]))
            .collect()
    }

    fn inter_map_connections(&self) -> &InterMapConnections {
        &self.connections
    }

    fn inter_map_connections_mut(&mut self) -> &mut InterMapConnections {
        &mut self.connections
    }

    fn calculate_inter_map_connections(&mut self, other: &mut dyn WorldModel, max_distance: f32) -> usize {
        connections::calculate_inter_map_connections(self, other, max_distance)
    }

    fn integrate_change(&mut self, change: &MapChange) -> bool {
        match *change {
            MapChange::AddObstacle(obstacle) => {
                if !self.obstacles.insert(obstacle) {
                    return false;
                }
                for (n, _) in self.nodes_within(obstacle.center, obstacle.radius) {
                    self.blocked[n.index()] += 1;
                }
                true
            }
            MapChange::RemoveObstacle(id) => match self.obstacles.remove(id) {
                None => false,
                Some(obstacle) => {
                    for (n, _) in self.nodes_within(obstacle.center, obstacle.radius) {
                        let b = &mut self.blocked[n.index()];
                        *b = b.saturating_sub(1);
                    }
                    true
                }
            },
        }
    }

    fn serialize_static_data(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        self.id.serialize(s)?;

        let mut nodes: Vec<(Vec2, AreaTypeId)> = self
            .node_pos
            .iter()
            .copied()
            .zip(self.node_area.iter().copied())
            .collect();
        io_vec(s, &mut nodes, |s, (p, a)| {
            p.serialize(s)?;
            a.serialize(s)
        })?;

        let mut lanes: Vec<RawLane> = (0..self.edge_count())
            .map(|i| RawLane {
                from:   self.edge_from[i],
                to:     self.edge_to[i],
                length: self.edge_length[i],
                flags:  self.edge_flags[i],
            })
            .collect();
        io_vec(s, &mut lanes, |s, l| l.serialize(s))?;

        if s.is_reading() {
            let mut b = LaneGraphBuilder::new(self.id);
            for (p, a) in nodes {
                b.add_node(p, a);
            }
            b.raw_lanes = lanes;
            let mut rebuilt = b.build();
            rebuilt.connections = std::mem::take(&mut self.connections);
            rebuilt.obstacles = std::mem::take(&mut self.obstacles);
            rebuilt.recompute_blocking();
            *self = rebuilt;
        }
        Ok(())
    }

    fn serialize_dynamic_data(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        self.obstacles.serialize(s)?;
        if s.is_reading() {
            self.recompute_blocking();
        }
        self.connections.serialize(s)
    }
}

// ── LaneGraphBuilder ──────────────────────────────────────────────────────────

/// Construct a [`LaneGraph`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use nav_core::{AreaTypeId, MapId, Vec2};
/// use nav_world::{LaneFlags, LaneGraphBuilder};
///
/// let mut b = LaneGraphBuilder::new(MapId(0));
/// let a = b.add_node(Vec2::new(0.0, 0.0), AreaTypeId(0));
/// let c = b.add_node(Vec2::new(10.0, 0.0), AreaTypeId(0));
/// b.add_two_way_lane(a, c, LaneFlags::NONE);
/// let graph = b.build();
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.edge_count(), 2);
/// ```
pub struct LaneGraphBuilder {
    id:        MapId,
    nodes:     Vec<Vec2>,
    areas:     Vec<AreaTypeId>,
    raw_lanes: Vec<RawLane>,
}

#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct RawLane {
    from:   NodeId,
    to:     NodeId,
    length: f32,
    flags:  LaneFlags,
}

impl RawLane {
    fn serialize(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        self.from.serialize(s)?;
        self.to.serialize(s)?;
        s.io_f32(&mut self.length)?;
        s.io_u8(&mut self.flags.0)
    }
}

impl LaneGraphBuilder {
    pub fn new(id: MapId) -> Self {
        Self { id, nodes: Vec::new(), areas: Vec::new(), raw_lanes: Vec::new() }
    }

    pub fn with_capacity(id: MapId, nodes: usize, lanes: usize) -> Self {
        Self {
            id,
            nodes:     Vec::with_capacity(nodes),
            areas:     Vec::with_capacity(nodes),
            raw_lanes: Vec::with_capacity(lanes),
        }
    }

    /// Add a node and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, pos: Vec2, area: AreaTypeId) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        self.areas.push(area);
        id
    }

    /// Add a **directed** lane whose length is the straight-line distance.
    pub fn add_lane(&mut self, from: NodeId, to: NodeId, flags: LaneFlags) {
        let length = self.nodes[from.index()].distance(self.nodes[to.index()]);
        self.add_lane_with_length(from, to, length, flags);
    }

    /// Add a directed lane with an explicit length (curved lanes).
    pub fn add_lane_with_length(&mut self, from: NodeId, to: NodeId, length: f32, flags: LaneFlags) {
        self.raw_lanes.push(RawLane { from, to, length, flags });
    }

    /// Convenience: lanes in **both directions**.
    pub fn add_two_way_lane(&mut self, a: NodeId, b: NodeId, flags: LaneFlags) {
        self.add_lane(a, b, flags);
        self.add_lane(b, a, flags);
    }

    pub fn node_pos(&self, id: NodeId) -> Vec2 {
        self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn lane_count(&self) -> usize { self.raw_lanes.len() }

    /// Consume the builder and produce a [`LaneGraph`].
    ///
    /// O(E log E) for the lane sort + O(N log N) for the R-tree bulk load.
    pub fn build(self) -> LaneGraph {
        let node_count = self.nodes.len();
        let edge_count = self.raw_lanes.len();

        // Stable sort keeps insertion order among lanes with the same source.
        let mut raw = self.raw_lanes;
        raw.sort_by_key(|l| l.from.0);

        let edge_from:   Vec<NodeId>    = raw.iter().map(|l| l.from).collect();
        let edge_to:     Vec<NodeId>    = raw.iter().map(|l| l.to).collect();
        let edge_length: Vec<f32>       = raw.iter().map(|l| l.length).collect();
        let edge_flags:  Vec<LaneFlags> = raw.iter().map(|l| l.flags).collect();

        let mut node_out_start = vec![0u32; node_count + 1];
        for l in &raw {
            node_out_start[l.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, edge_count);

        // Reverse CSR: EdgeIds grouped by destination.
        let mut in_edges: Vec<EdgeId> = (0..edge_count as u32).map(EdgeId).collect();
        in_edges.sort_by_key(|e| edge_to[e.index()].0);
        let mut node_in_start = vec![0u32; node_count + 1];
        for to in &edge_to {
            node_in_start[to.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_in_start[i] += node_in_start[i - 1];
        }

        let max_edge_length = edge_length.iter().copied().fold(0.0f32, f32::max);

        let entries: Vec<PointEntry> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &p)| PointEntry::new(p, i as u32))
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        LaneGraph {
            id: self.id,
            node_pos: self.nodes,
            node_area: self.areas,
            node_out_start,
            node_in_start,
            in_edges,
            edge_from,
            edge_to,
            edge_length,
            edge_flags,
            max_edge_length,
            spatial_idx,
            blocked: vec![0; node_count],
            obstacles: ObstacleSet::default(),
            connections: InterMapConnections::new(),
        }
    }
}
