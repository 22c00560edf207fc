//! Uniform 2-D grid world model.
//!
//! Cells are stored row-major (`index = y * width + x`).  Each cell carries
//! an [`AreaTypeId`]; [`AreaTypeId::INVALID`] marks a wall.  The ideal point
//! of a cell is its centre.

use std::any::Any;

use nav_core::serialize::io_vec;
use nav_core::{AreaTypeId, MapId, MoverTypeId, NavResult, Serializer, Vec2};

use crate::connections::{self, InterMapConnections};
use crate::world::{push_sorted, LegalPoint, MapChange, ObstacleSet, WorldKind, WorldModel};
use crate::AreaTypeTable;

/// Integer cell coordinates.  May lie outside the grid.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Cell {
        Cell { x: self.x + dx, y: self.y + dy }
    }
}

/// Grid world model.  Build with [`NavGridBuilder`].
pub struct NavGrid {
    id:        MapId,
    origin:    Vec2,
    cell_size: f32,
    width:     u32,
    height:    u32,
    cells:     Vec<AreaTypeId>,

    blocked:     Vec<u16>,
    obstacles:   ObstacleSet,
    connections: InterMapConnections,
}

impl NavGrid {
    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn cell_size(&self) -> f32 { self.cell_size }
    pub fn origin(&self) -> Vec2 { self.origin }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    #[inline]
    fn cell_index(&self, cell: Cell) -> Option<usize> {
        self.contains(cell)
            .then(|| cell.y as usize * self.width as usize + cell.x as usize)
    }

    /// World-space centre of `cell`.
    #[inline]
    pub fn cell_center(&self, cell: Cell) -> Vec2 {
        Vec2::new(
            self.origin.x + (cell.x as f32 + 0.5) * self.cell_size,
            self.origin.y + (cell.y as f32 + 0.5) * self.cell_size,
        )
    }

    /// The cell containing `pos`, or `None` outside the grid.
    pub fn cell_at(&self, pos: Vec2) -> Option<Cell> {
        let cell = Cell::new(
            ((pos.x - self.origin.x) / self.cell_size).floor() as i32,
            ((pos.y - self.origin.y) / self.cell_size).floor() as i32,
        );
        self.contains(cell).then_some(cell)
    }

    /// Area of `cell`; `None` for walls and out-of-bounds cells.
    #[inline]
    pub fn area(&self, cell: Cell) -> Option<AreaTypeId> {
        self.cell_index(cell)
            .map(|i| self.cells[i])
            .filter(|a| a.is_valid())
    }

    #[inline]
    pub fn is_blocked(&self, cell: Cell) -> bool {
        self.cell_index(cell).is_some_and(|i| self.blocked[i] > 0)
    }

    /// In bounds, not a wall, unblocked and enterable by `mover`.
    #[inline]
    pub fn is_legal(&self, cell: Cell, mover: MoverTypeId, areas: &AreaTypeTable) -> bool {
        match self.area(cell) {
            Some(a) => !self.is_blocked(cell) && areas.allows(a, mover),
            None => false,
        }
    }

    /// In-bounds cells whose centre lies within `radius` of `pos`, nearest
    /// first (ties in row-major order).
    pub fn cells_within(&self, pos: Vec2, radius: f32) -> Vec<(Cell, f32)> {
        let lo = self.clamp_cell(pos - Vec2::new(radius, radius));
        let hi = self.clamp_cell(pos + Vec2::new(radius, radius));
        let mut hits = Vec::new();
        for y in lo.y..=hi.y {
            for x in lo.x..=hi.x {
                let cell = Cell::new(x, y);
                let d = self.cell_center(cell).distance(pos);
                if d <= radius {
                    hits.push((cell, d));
                }
            }
        }
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }

    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    fn clamp_cell(&self, pos: Vec2) -> Cell {
        let max_x = self.width.saturating_sub(1) as i32;
        let max_y = self.height.saturating_sub(1) as i32;
        Cell::new(
            (((pos.x - self.origin.x) / self.cell_size).floor() as i32).clamp(0, max_x),
            (((pos.y - self.origin.y) / self.cell_size).floor() as i32).clamp(0, max_y),
        )
    }

    fn cell_of_index(&self, i: usize) -> Cell {
        Cell::new((i % self.width as usize) as i32, (i / self.width as usize) as i32)
    }

    fn covered_cells(&self, center: Vec2, radius: f32) -> Vec<usize> {
        if self.cells.is_empty() {
            return Vec::new();
        }
        self.cells_within(center, radius)
            .into_iter()
            .filter_map(|(c, _)| self.cell_index(c))
            .collect()
    }

    fn recompute_blocking(&mut self) {
        self.blocked.iter_mut().for_each(|b| *b = 0);
        let covered: Vec<usize> = self
            .obstacles
            .iter()
            .flat_map(|o| self.covered_cells(o.center, o.radius))
            .collect();
        for i in covered {
            self.blocked[i] += 1;
        }
    }
}

impl WorldModel for NavGrid {
    fn id(&self) -> MapId {
        self.id
    }

    fn kind(&self) -> WorldKind {
        WorldKind::Grid
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
        if self.cells.is_empty() {
            return;
        }
        let first = out.len();

        // Any point inside a legal cell is itself legal.
        if !ideal_only {
            if let Some((cell, area)) = self.cell_at(pos).and_then(|c| self.area(c).map(|a| (c, a))) {
                if self.is_legal(cell, mover, areas) {
                    push_sorted(out, first, LegalPoint { position: pos, distance: 0.0, area });
                }
            }
        }

        for (cell, d) in self.cells_within(pos, max_distance) {
            if let Some(area) = self.area(cell) {
                if self.is_legal(cell, mover, areas) {
                    push_sorted(out, first, LegalPoint { position: self.cell_center(cell), distance: d, area });
                }
            }
        }
    }

    fn connection_candidates(&self) -> Vec<(Vec2, AreaTypeId)> {
        (0..self.cells.len())
            .filter(|&i| self.cells[i].is_valid() && self.blocked[i] == 0)
            .map(|i| (self.cell_center(self.cell_of_index(i)), self.cells[i]))
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
                for i in self.covered_cells(obstacle.center, obstacle.radius) {
                    self.blocked[i] += 1;
                }
                true
            }
            MapChange::RemoveObstacle(id) => match self.obstacles.remove(id) {
                None => false,
                Some(obstacle) => {
                    for i in self.covered_cells(obstacle.center, obstacle.radius) {
                        self.blocked[i] = self.blocked[i].saturating_sub(1);
                    }
                    true
                }
            },
        }
    }

    fn serialize_static_data(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        self.id.serialize(s)?;
        self.origin.serialize(s)?;
        s.io_f32(&mut self.cell_size)?;
        s.io_u32(&mut self.width)?;
        s.io_u32(&mut self.height)?;
        io_vec(s, &mut self.cells, |s, a| a.serialize(s))?;
        if s.is_reading() {
            self.blocked = vec![0; self.cells.len()];
            self.recompute_blocking();
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

// ── NavGridBuilder ────────────────────────────────────────────────────────────

/// Construct a [`NavGrid`].  Every cell starts as a wall.
pub struct NavGridBuilder {
    id:        MapId,
    origin:    Vec2,
    cell_size: f32,
    width:     u32,
    height:    u32,
    cells:     Vec<AreaTypeId>,
}

impl NavGridBuilder {
    pub fn new(id: MapId, origin: Vec2, cell_size: f32, width: u32, height: u32) -> Self {
        Self {
            id,
            origin,
            cell_size,
            width,
            height,
            cells: vec![AreaTypeId::INVALID; width as usize * height as usize],
        }
    }

    /// Set every cell to `area`.
    pub fn fill(mut self, area: AreaTypeId) -> Self {
        self.cells.iter_mut().for_each(|c| *c = area);
        self
    }

    /// Set every cell in the inclusive rectangle to `area`; out-of-bounds
    /// parts are ignored.
    pub fn fill_rect(mut self, min: Cell, max: Cell, area: AreaTypeId) -> Self {
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                self.set_cell(Cell::new(x, y), area);
            }
        }
        self
    }

    pub fn set(mut self, cell: Cell, area: AreaTypeId) -> Self {
        self.set_cell(cell, area);
        self
    }

    pub fn wall(self, cell: Cell) -> Self {
        self.set(cell, AreaTypeId::INVALID)
    }

    fn set_cell(&mut self, cell: Cell, area: AreaTypeId) {
        if cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height {
            let i = cell.y as usize * self.width as usize + cell.x as usize;
            self.cells[i] = area;
        }
    }

    pub fn build(self) -> NavGrid {
        let n = self.cells.len();
        NavGrid {
            id:          self.id,
            origin:      self.origin,
            cell_size:   self.cell_size,
            width:       self.width,
            height:      self.height,
            cells:       self.cells,
            blocked:     vec![0; n],
            obstacles:   ObstacleSet::default(),
            connections: InterMapConnections::new(),
        }
    }
}
