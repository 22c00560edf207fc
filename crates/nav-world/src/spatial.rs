//! R-tree entry shared by the lane graph index and transition pairing.

use rstar::{PointDistance, RTreeObject, AABB};

use nav_core::Vec2;

/// Entry stored in an R-tree: a 2-D `[x, y]` point with a payload index.
#[derive(Clone, Debug)]
pub(crate) struct PointEntry {
    pub point: [f32; 2],
    pub index: u32,
}

impl PointEntry {
    #[inline]
    pub fn new(p: Vec2, index: u32) -> Self {
        Self { point: [p.x, p.y], index }
    }
}

impl RTreeObject for PointEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for PointEntry {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}
