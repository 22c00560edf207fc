//! Search requests and tuning constants.

use nav_core::serialize::io_vec;
use nav_core::{MapId, MoverTypeId, MovementOptions, NavError, NavResult, Pose, Serializer, Vec2};

use crate::{SearchError, SearchResult};

// ── SearchTuning ──────────────────────────────────────────────────────────────

/// Engineering constants of the combined search.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchTuning {
    /// Two distances closer than this are treated as equal.
    pub rounding_tolerance:      f32,
    /// Upper bound on the size of one intersection.  Limits how far from an
    /// ambiguous start transitions are considered.
    pub max_crossing_diameter:   f32,
    /// A start this close to legal space is snapped onto it without needing
    /// illegal-state correction.
    pub start_snap_tolerance:    f32,
    /// Flat cost of crossing between maps.
    pub transition_penalty:      f32,
    /// How far illegal starts and goals may be moved onto legal space.
    pub max_correction_distance: f32,
    /// Maximum gap bridged by an inter-map connection.
    pub connection_distance:     f32,
}

impl Default for SearchTuning {
    fn default() -> Self {
        Self {
            rounding_tolerance:      0.01,
            max_crossing_diameter:   30.0,
            start_snap_tolerance:    0.5,
            transition_penalty:      5.0,
            max_correction_distance: 10.0,
            connection_distance:     1.0,
        }
    }
}

impl SearchTuning {
    pub fn serialize(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        s.io_f32(&mut self.rounding_tolerance)?;
        s.io_f32(&mut self.max_crossing_diameter)?;
        s.io_f32(&mut self.start_snap_tolerance)?;
        s.io_f32(&mut self.transition_penalty)?;
        s.io_f32(&mut self.max_correction_distance)?;
        s.io_f32(&mut self.connection_distance)
    }
}

// ── NavigationGoal ────────────────────────────────────────────────────────────

/// Where the mover wants to end up.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NavigationGoal {
    /// Reach `position` to within `tolerance`.
    Point { position: Vec2, tolerance: f32 },
    /// Reach any point inside the circle.
    Area { center: Vec2, radius: f32 },
}

impl NavigationGoal {
    pub fn point(position: Vec2) -> Self {
        NavigationGoal::Point { position, tolerance: 0.5 }
    }

    /// Centre of the goal region.
    #[inline]
    pub fn anchor(&self) -> Vec2 {
        match *self {
            NavigationGoal::Point { position, .. } => position,
            NavigationGoal::Area { center, .. } => center,
        }
    }

    /// Radius within which the goal counts as reached.
    #[inline]
    pub fn reach(&self) -> f32 {
        match *self {
            NavigationGoal::Point { tolerance, .. } => tolerance,
            NavigationGoal::Area { radius, .. } => radius,
        }
    }

    /// Euclidean distance from `p` to the goal region (0 inside it).
    #[inline]
    pub fn distance_to(&self, p: Vec2) -> f32 {
        (self.anchor().distance(p) - self.reach()).max(0.0)
    }

    fn serialize(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        let mut tag: u8 = match self {
            NavigationGoal::Point { .. } => 0,
            NavigationGoal::Area { .. } => 1,
        };
        s.io_u8(&mut tag)?;
        let mut anchor = self.anchor();
        let mut reach = self.reach();
        anchor.serialize(s)?;
        s.io_f32(&mut reach)?;
        if s.is_reading() {
            *self = match tag {
                0 => NavigationGoal::Point { position: anchor, tolerance: reach },
                1 => NavigationGoal::Area { center: anchor, radius: reach },
                t => return Err(NavError::InvalidData(format!("unknown goal tag {t}"))),
            };
        }
        Ok(())
    }
}

impl Default for NavigationGoal {
    fn default() -> Self {
        NavigationGoal::point(Vec2::ZERO)
    }
}

// ── IgnoredStep ──────────────────────────────────────────────────────────────

/// Step endpoints closer than this match an ignored step.
const STEP_EPS: f32 = 1e-3;

/// A move between two search nodes that the search must not take, typically
/// one a previous path could not execute.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IgnoredStep {
    pub map:  MapId,
    pub from: Vec2,
    pub to:   Vec2,
}

impl IgnoredStep {
    pub fn new(map: MapId, from: Vec2, to: Vec2) -> Self {
        Self { map, from, to }
    }

    #[inline]
    pub fn matches(&self, map: MapId, from: Vec2, to: Vec2) -> bool {
        self.map == map && self.from.distance(from) <= STEP_EPS && self.to.distance(to) <= STEP_EPS
    }

    fn serialize(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        self.map.serialize(s)?;
        self.from.serialize(s)?;
        self.to.serialize(s)
    }
}

// ── PathSearchConfiguration ───────────────────────────────────────────────────

/// One path request.  Owned by the search created from it.
///
/// A single-map request leaves `map_b` as [`MapId::INVALID`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathSearchConfiguration {
    pub map_a:   MapId,
    pub map_b:   MapId,
    pub mover:   MoverTypeId,
    pub start:   Pose,
    pub goal:    NavigationGoal,
    pub options: MovementOptions,
    /// Keep start/goal candidates on both maps even when one is clearly
    /// closer, and allow moving illegal positions up to
    /// `tuning.max_correction_distance` onto legal space.
    pub correct_illegal_states:     bool,
    /// On failure, produce a path to the expanded state closest to the goal
    /// if it is closer than the start.
    pub move_to_closest_on_failure: bool,
    /// Steps to leave out, for replanning around a failed segment.
    pub ignored_steps: Vec<IgnoredStep>,
    pub tuning: SearchTuning,
}

impl Default for PathSearchConfiguration {
    fn default() -> Self {
        Self {
            map_a:   MapId::INVALID,
            map_b:   MapId::INVALID,
            mover:   MoverTypeId(0),
            start:   Pose::default(),
            goal:    NavigationGoal::default(),
            options: MovementOptions::default(),
            correct_illegal_states:     false,
            move_to_closest_on_failure: false,
            ignored_steps: Vec::new(),
            tuning: SearchTuning::default(),
        }
    }
}

impl PathSearchConfiguration {
    /// Single-map request with default options.
    pub fn new(map: MapId, mover: MoverTypeId, start: Pose, goal: NavigationGoal) -> Self {
        Self { map_a: map, mover, start, goal, ..Self::default() }
    }

    /// Builder-style: also search `map`, transitioning between the two.
    pub fn with_second_map(mut self, map: MapId) -> Self {
        self.map_b = map;
        self
    }

    pub fn with_options(mut self, options: MovementOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_move_to_closest(mut self) -> Self {
        self.move_to_closest_on_failure = true;
        self
    }

    pub fn with_illegal_state_correction(mut self) -> Self {
        self.correct_illegal_states = true;
        self
    }

    pub fn with_ignored_step(mut self, step: IgnoredStep) -> Self {
        self.ignored_steps.push(step);
        self
    }

    /// `true` when two distinct maps are searched together.
    #[inline]
    pub fn is_combined(&self) -> bool {
        self.map_b.is_valid() && self.map_b != self.map_a
    }

    #[inline]
    pub fn is_priority(&self) -> bool {
        self.options.is_priority()
    }

    /// Reject requests that can never be searched.
    pub fn validate(&self) -> SearchResult<()> {
        if !self.map_a.is_valid() {
            return Err(SearchError::InvalidConfiguration("no map set".into()));
        }
        let p = self.start.position;
        let g = self.goal.anchor();
        if !(p.x.is_finite() && p.y.is_finite() && g.x.is_finite() && g.y.is_finite()) {
            return Err(SearchError::InvalidConfiguration("non-finite start or goal".into()));
        }
        if !(self.goal.reach() >= 0.0) {
            return Err(SearchError::InvalidConfiguration("negative goal reach".into()));
        }
        Ok(())
    }

    pub fn serialize(&mut self, s: &mut dyn Serializer) -> NavResult<()> {
        self.map_a.serialize(s)?;
        self.map_b.serialize(s)?;
        self.mover.serialize(s)?;
        self.start.serialize(s)?;
        self.goal.serialize(s)?;
        s.io_u8(&mut self.options.0)?;
        s.io_bool(&mut self.correct_illegal_states)?;
        s.io_bool(&mut self.move_to_closest_on_failure)?;
        io_vec(s, &mut self.ignored_steps, |s, step| step.serialize(s))?;
        self.tuning.serialize(s)
    }
}
