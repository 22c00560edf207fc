//! CSV lane graph loader.
//!
//! # CSV format
//!
//! Two files: one row per node, one row per lane.  Node ids must be dense
//! and listed in order starting at 0.
//!
//! ```csv
//! node_id,x,y,area
//! 0,0.0,0.0,road
//! 1,10.0,0.0,road
//! 2,10.0,8.0,yard
//! ```
//!
//! ```csv
//! from,to,two_way,flags
//! 0,1,true,
//! 1,2,false,maneuver
//! 2,1,false,maneuver|tight_turn
//! ```
//!
//! **`area`** is an area type name registered in the [`AreaTypeTable`], or
//! its numeric id.  **`flags`** is empty or a `|`-separated list of
//! `maneuver` and `tight_turn`.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use nav_core::{AreaTypeId, MapId, NodeId, Vec2};

use crate::lane_graph::{LaneFlags, LaneGraph, LaneGraphBuilder};
use crate::{AreaTypeTable, WorldError, WorldResult};

// ── CSV records ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NodeRecord {
    node_id: u32,
    x:       f32,
    y:       f32,
    area:    String,
}

#[derive(Deserialize)]
struct LaneRecord {
    from:    u32,
    to:      u32,
    two_way: bool,
    #[serde(default)]
    flags:   String,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a [`LaneGraph`] from a node CSV file and a lane CSV file.
pub fn load_lane_graph_csv(
    nodes_path: &Path,
    lanes_path: &Path,
    id:         MapId,
    areas:      &AreaTypeTable,
) -> WorldResult<LaneGraph> {
    let nodes = std::fs::File::open(nodes_path)?;
    let lanes = std::fs::File::open(lanes_path)?;
    load_lane_graph_reader(nodes, lanes, id, areas)
}

/// Like [`load_lane_graph_csv`] but accepts any `Read` sources.
pub fn load_lane_graph_reader<N: Read, L: Read>(
    nodes: N,
    lanes: L,
    id:    MapId,
    areas: &AreaTypeTable,
) -> WorldResult<LaneGraph> {
    let mut builder = LaneGraphBuilder::new(id);

    // ── Nodes ─────────────────────────────────────────────────────────────
    let mut node_reader = csv::Reader::from_reader(nodes);
    for result in node_reader.deserialize::<NodeRecord>() {
        let row = result.map_err(|e| WorldError::Parse(e.to_string()))?;
        let expected = builder.node_count() as u32;
        if row.node_id != expected {
            return Err(WorldError::Parse(format!(
                "node ids must be dense and ordered: expected {expected}, found {}",
                row.node_id
            )));
        }
        let area = parse_area(&row.area, areas)?;
        builder.add_node(Vec2::new(row.x, row.y), area);
    }

    // ── Lanes ─────────────────────────────────────────────────────────────
    let node_count = builder.node_count() as u32;
    let mut lane_reader = csv::Reader::from_reader(lanes);
    for result in lane_reader.deserialize::<LaneRecord>() {
        let row = result.map_err(|e| WorldError::Parse(e.to_string()))?;
        for n in [row.from, row.to] {
            if n >= node_count {
                return Err(WorldError::Parse(format!("lane references unknown node {n}")));
            }
        }
        let flags = parse_flags(&row.flags)?;
        let (from, to) = (NodeId(row.from), NodeId(row.to));
        if row.two_way {
            builder.add_two_way_lane(from, to, flags);
        } else {
            builder.add_lane(from, to, flags);
        }
    }

    let graph = builder.build();
    tracing::info!(map = %id, nodes = graph.node_count(), lanes = graph.edge_count(), "lane graph loaded");
    Ok(graph)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_area(s: &str, areas: &AreaTypeTable) -> WorldResult<AreaTypeId> {
    let s = s.trim();
    if let Some(id) = areas.find(s) {
        return Ok(id);
    }
    s.parse::<u16>()
        .ok()
        .map(AreaTypeId)
        .filter(|&id| areas.get(id).is_some())
        .ok_or_else(|| WorldError::Parse(format!("unknown area type {s:?}")))
}

fn parse_flags(s: &str) -> WorldResult<LaneFlags> {
    s.split('|')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .try_fold(LaneFlags::NONE, |acc, f| match f {
            "maneuver"   => Ok(acc | LaneFlags::MANEUVER),
            "tight_turn" => Ok(acc | LaneFlags::TIGHT_TURN),
            other => Err(WorldError::Parse(format!(
                "invalid lane flag {other:?}: expected \"maneuver\" or \"tight_turn\""
            ))),
        })
}
