//! Demo world: a street (lane graph) leading into a plaza (grid).
//!
//! ```text
//!  street  0 ── 10 ── 20 ── 30 ── 40 ┐
//!                                    └─ plaza 40..60 × 0..10, wall at x = 50
//! ```

use nav_core::{AreaTypeId, MapId, MoverTypeId, Vec2};
use nav_world::{
    AreaType, AreaTypeTable, Cell, LaneFlags, LaneGraph, LaneGraphBuilder, MoverCosts, NavGrid, NavGridBuilder,
    WorldModelManager, WorldResult,
};

pub const STREET: MapId = MapId(1);
pub const PLAZA:  MapId = MapId(2);

pub const WALKER: MoverTypeId = MoverTypeId(0);

/// Plaza cells blocked by the wall, bottom to top.
const WALL_HEIGHT: i32 = 7;

struct Areas {
    sidewalk: AreaTypeId,
    paving:   AreaTypeId,
}

fn build_areas() -> (AreaTypeTable, Areas) {
    let mut table = AreaTypeTable::new();
    let sidewalk = table.register(AreaType::new("sidewalk").with_mover(WALKER, MoverCosts::UNIFORM));
    let paving = table.register(AreaType::new("paving").with_mover(
        WALKER,
        MoverCosts { forward_cost: 1.2, backward_cost: 1.2, forward_speed: 1.0, backward_speed: 1.0 },
    ));
    (table, Areas { sidewalk, paving })
}

fn build_street(area: AreaTypeId) -> LaneGraph {
    let mut b = LaneGraphBuilder::new(STREET);
    let nodes: Vec<_> = (0..5).map(|i| b.add_node(Vec2::new(i as f32 * 10.0, 0.5), area)).collect();
    for pair in nodes.windows(2) {
        b.add_two_way_lane(pair[0], pair[1], LaneFlags::NONE);
    }
    b.build()
}

fn build_plaza(area: AreaTypeId) -> NavGrid {
    let mut b = NavGridBuilder::new(PLAZA, Vec2::new(40.0, 0.0), 1.0, 20, 10).fill(area);
    for y in 0..WALL_HEIGHT {
        b = b.wall(Cell::new(10, y));
    }
    b.build()
}

/// Register both maps.  The maps are not connected yet.
pub fn build_world() -> WorldResult<WorldModelManager> {
    let (table, areas) = build_areas();
    let mut maps = WorldModelManager::new(table);
    maps.register(build_street(areas.sidewalk))?;
    maps.register(build_plaza(areas.paving))?;
    Ok(maps)
}
