//! Navigation mechanics: how a search moves through one world representation.
//!
//! The combined search is generic over two [`NavigationMechanics`] types, so
//! the per-step calls (`expand`, `position`) are monomorphized and never go
//! through a vtable.  The world model itself arrives as `&dyn WorldModel`
//! from the map lock and is downcast once per execution slice.

use std::fmt::Debug;
use std::hash::Hash;

use nav_core::{MoverTypeId, MovementOptions, NodeId, Vec2};
use nav_world::{AreaTypeTable, Cell, Direction, LaneFlags, LaneGraph, NavGrid, WorldKind, WorldModel};

/// Positions closer than this are the same point.
const POINT_EPS: f32 = 1e-3;

pub trait NavigationMechanics: Send + Sized + 'static {
    type World: WorldModel;
    type Node: Copy + Eq + Hash + Debug + Send + 'static;

    const KIND: WorldKind;

    fn new(mover: MoverTypeId, options: MovementOptions) -> Self;

    /// Recover the concrete world from a locked map.
    fn world(model: &dyn WorldModel) -> Option<&Self::World> {
        model.as_any().downcast_ref::<Self::World>()
    }

    /// The node lying exactly at `pos`, if any.
    fn node_at(&self, world: &Self::World, pos: Vec2) -> Option<Self::Node>;

    fn is_legal(&self, world: &Self::World, areas: &AreaTypeTable, node: Self::Node) -> bool;

    fn position(&self, world: &Self::World, node: Self::Node) -> Vec2;

    /// Nodes a search may start from when standing on the legal point
    /// `point`, with the cost of reaching each.
    fn entry_nodes(&self, world: &Self::World, areas: &AreaTypeTable, point: Vec2, out: &mut Vec<(Self::Node, f32)>);

    /// Append `(neighbor, cost)` for every legal move out of `node`.
    fn expand(&self, world: &Self::World, areas: &AreaTypeTable, node: Self::Node, out: &mut Vec<(Self::Node, f32)>);

    /// Post-process one path segment in place.  Endpoints must survive.
    fn smooth(&self, _world: &Self::World, _areas: &AreaTypeTable, _points: &mut Vec<Vec2>) {}
}

// ── LaneMechanics ─────────────────────────────────────────────────────────────

/// Moves along lanes: forward on out-lanes, backward on in-lanes.
pub struct LaneMechanics {
    mover:   MoverTypeId,
    options: MovementOptions,
}

impl LaneMechanics {
    #[inline]
    fn flags_allowed(&self, flags: LaneFlags) -> bool {
        (!flags.contains(LaneFlags::MANEUVER) || self.options.contains(MovementOptions::MANEUVER))
            && (!flags.contains(LaneFlags::TIGHT_TURN) || self.options.contains(MovementOptions::SHRINK_TURNING_RADIUS))
    }

    /// Cost of driving `length` into `to` in `dir`, if allowed.
    #[inline]
    fn step_cost(&self, world: &LaneGraph, areas: &AreaTypeTable, to: NodeId, length: f32, dir: Direction) -> Option<f32> {
        if !world.is_legal(to, self.mover, areas) {
            return None;
        }
        areas
            .cost_factor(world.node_area[to.index()], self.mover, dir)
            .map(|f| length * f)
    }
}

impl NavigationMechanics for LaneMechanics {
    type World = LaneGraph;
    type Node = NodeId;

    const KIND: WorldKind = WorldKind::LaneGraph;

    fn new(mover: MoverTypeId, options: MovementOptions) -> Self {
        Self { mover, options }
    }

    fn node_at(&self, world: &LaneGraph, pos: Vec2) -> Option<NodeId> {
        world.node_at(pos, POINT_EPS)
    }

    fn is_legal(&self, world: &LaneGraph, areas: &AreaTypeTable, node: NodeId) -> bool {
        world.is_legal(node, self.mover, areas)
    }

    fn position(&self, world: &LaneGraph, node: NodeId) -> Vec2 {
        world.node_pos[node.index()]
    }

    fn entry_nodes(&self, world: &LaneGraph, areas: &AreaTypeTable, point: Vec2, out: &mut Vec<(NodeId, f32)>) {
        if let Some(node) = self.node_at(world, point) {
            if world.is_legal(node, self.mover, areas) {
                out.push((node, 0.0));
            }
            return;
        }

        // `point` lies on a lane: enter at either end.
        let forward = self.options.contains(MovementOptions::FORWARD);
        let backward = self.options.contains(MovementOptions::BACKWARD);
        for (from, _) in world.nodes_within(point, world.max_edge_length() + POINT_EPS) {
            for e in world.out_edges(from) {
                let to = world.edge_to[e.index()];
                let (a, b) = (world.node_pos[from.index()], world.node_pos[to.index()]);
                if point.project_onto_segment(a, b).distance(point) > POINT_EPS
                    || !self.flags_allowed(world.edge_flags[e.index()])
                {
                    continue;
                }
                if forward {
                    if let Some(c) = self.step_cost(world, areas, to, point.distance(b), Direction::Forward) {
                        out.push((to, c));
                    }
                }
                if backward {
                    if let Some(c) = self.step_cost(world, areas, from, point.distance(a), Direction::Backward) {
                        out.push((from, c));
                    }
                }
            }
        }
    }

    fn expand(&self, world: &LaneGraph, areas: &AreaTypeTable, node: NodeId, out: &mut Vec<(NodeId, f32)>) {
        if self.options.contains(MovementOptions::FORWARD) {
            for e in world.out_edges(node) {
                if !self.flags_allowed(world.edge_flags[e.index()]) {
                    continue;
                }
                let to = world.edge_to[e.index()];
                if let Some(c) = self.step_cost(world, areas, to, world.edge_length[e.index()], Direction::Forward) {
                    out.push((to, c));
                }
            }
        }
        if self.options.contains(MovementOptions::BACKWARD) {
            for e in world.in_edges(node) {
                if !self.flags_allowed(world.edge_flags[e.index()]) {
                    continue;
                }
                let from = world.edge_from[e.index()];
                if let Some(c) = self.step_cost(world, areas, from, world.edge_length[e.index()], Direction::Backward) {
                    out.push((from, c));
                }
            }
        }
    }
}

// ── GridMechanics ─────────────────────────────────────────────────────────────

/// 8-connected grid movement with line-of-sight smoothing.
pub struct GridMechanics {
    mover:   MoverTypeId,
    options: MovementOptions,
}

/// Orthogonal steps first, then diagonals.
const NEIGHBORS: [(i32, i32); 8] = [(1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (1, -1), (-1, 1), (-1, -1)];

impl GridMechanics {
    /// Cheapest allowed cost factor for entering `cell`.
    fn cost_factor(&self, world: &NavGrid, areas: &AreaTypeTable, cell: Cell) -> Option<f32> {
        let area = world.area(cell)?;
        let forward = self
            .options
            .contains(MovementOptions::FORWARD)
            .then(|| areas.cost_factor(area, self.mover, Direction::Forward))
            .flatten();
        let backward = self
            .options
            .contains(MovementOptions::BACKWARD)
            .then(|| areas.cost_factor(area, self.mover, Direction::Backward))
            .flatten();
        match (forward, backward) {
            (Some(f), Some(b)) => Some(f.min(b)),
            (f, b) => f.or(b),
        }
    }

    /// Every sample along `a → b` lies in a legal cell.
    fn line_of_sight(&self, world: &NavGrid, areas: &AreaTypeTable, a: Vec2, b: Vec2) -> bool {
        let step = world.cell_size() * 0.25;
        let samples = ((a.distance(b) / step).ceil() as usize).max(1);
        (0..=samples).all(|i| {
            let p = a.lerp(b, i as f32 / samples as f32);
            world.cell_at(p).is_some_and(|c| world.is_legal(c, self.mover, areas))
        })
    }
}

impl NavigationMechanics for GridMechanics {
    type World = NavGrid;
    type Node = Cell;

    const KIND: WorldKind = WorldKind::Grid;

    fn new(mover: MoverTypeId, options: MovementOptions) -> Self {
        Self { mover, options }
    }

    fn node_at(&self, world: &NavGrid, pos: Vec2) -> Option<Cell> {
        world.cell_at(pos)
    }

    fn is_legal(&self, world: &NavGrid, areas: &AreaTypeTable, node: Cell) -> bool {
        world.is_legal(node, self.mover, areas)
    }

    fn position(&self, world: &NavGrid, node: Cell) -> Vec2 {
        world.cell_center(node)
    }

    fn entry_nodes(&self, world: &NavGrid, areas: &AreaTypeTable, point: Vec2, out: &mut Vec<(Cell, f32)>) {
        let Some(cell) = world.cell_at(point) else { return };
        if !world.is_legal(cell, self.mover, areas) {
            return;
        }
        if let Some(f) = self.cost_factor(world, areas, cell) {
            out.push((cell, point.distance(world.cell_center(cell)) * f));
        }
    }

    fn expand(&self, world: &NavGrid, areas: &AreaTypeTable, node: Cell, out: &mut Vec<(Cell, f32)>) {
        let cut_corners = self.options.contains(MovementOptions::SHRINK_TURNING_RADIUS);
        for &(dx, dy) in &NEIGHBORS {
            let next = node.offset(dx, dy);
            if !world.is_legal(next, self.mover, areas) {
                continue;
            }
            let diagonal = dx != 0 && dy != 0;
            if diagonal
                && !cut_corners
                && !(world.is_legal(node.offset(dx, 0), self.mover, areas)
                    && world.is_legal(node.offset(0, dy), self.mover, areas))
            {
                continue;
            }
            let Some(f) = self.cost_factor(world, areas, next) else { continue };
            let length = if diagonal { std::f32::consts::SQRT_2 } else { 1.0 } * world.cell_size();
            out.push((next, length * f));
        }
    }

    /// Line-of-sight shortcutting: keep only the points where the straight
    /// line from the previous kept point would leave legal space.
    fn smooth(&self, world: &NavGrid, areas: &AreaTypeTable, points: &mut Vec<Vec2>) {
        if points.len() <= 2 {
            return;
        }
        let mut kept = vec![points[0]];
        let mut i = 0;
        while i < points.len() - 1 {
            let mut furthest = i + 1;
            for j in (i + 2)..points.len() {
                if self.line_of_sight(world, areas, points[i], points[j]) {
                    furthest = j;
                }
            }
            kept.push(points[furthest]);
            i = furthest;
        }
        *points = kept;
    }
}
