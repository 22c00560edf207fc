//! Planar geometry used by every world model.
//!
//! Navigation runs in a flat local frame (metres), so positions are plain
//! `f32` 2-D vectors.  World models that need height keep it internally.

use std::ops::{Add, Mul, Sub};

use crate::{NavResult, Serializer};

/// A 2-D point or direction in the local navigation frame (metres).
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    #[inline]
    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    #[inline]
    pub fn distance_squared(self, other: Vec2) -> f32 {
        (other - self).length_squared()
    }

    /// Linear interpolation, `t = 0` → `self`, `t = 1` → `other`.
    #[inline]
    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        self + (other - self) * t
    }

    /// `true` if both coordinates differ by at most `eps`.
    #[inline]
    pub fn approx_eq(self, other: Vec2, eps: f32) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }

    /// Closest point to `self` on the segment `a → b`.
    ///
    /// Degenerate segments (`a == b`) return `a`.
    pub fn project_onto_segment(self, a: Vec2, b: Vec2) -> Vec2 {
        let ab = b - a;
        let len_sq = ab.length_squared();
        if len_sq <= f32::EPSILON {
            return a;
        }
        let t = ((self - a).dot(ab) / len_sq).clamp(0.0, 1.0);
        a + ab * t
    }

    pub fn serialize(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        s.io_f32(&mut self.x)?;
        s.io_f32(&mut self.y)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl std::fmt::Display for Vec2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Position plus heading (radians, counter-clockwise from +x).
///
/// This is the only entity-transform data the navigation core consumes;
/// callers copy it out of their own transform system.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    pub position: Vec2,
    pub heading: f32,
}

impl Pose {
    #[inline]
    pub const fn new(position: Vec2, heading: f32) -> Self {
        Self { position, heading }
    }

    #[inline]
    pub fn at(x: f32, y: f32) -> Self {
        Self::new(Vec2::new(x, y), 0.0)
    }

    pub fn serialize(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        self.position.serialize(s)?;
        s.io_f32(&mut self.heading)
    }
}
