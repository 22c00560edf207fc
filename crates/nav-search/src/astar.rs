//! Resumable A* over an arbitrary node type.
//!
//! Unlike a one-shot planner, [`AStar`] advances one expansion per
//! [`search_step`](AStar::search_step) call and keeps every state in an
//! arena indexed by [`StateIndex`], so a caller can interleave two searches,
//! inject new start states mid-search (map transitions) and reconstruct the
//! path afterwards from any reached state.
//!
//! # Ordering
//!
//! The open list is a `BinaryHeap` keyed on `(f, seq)`: lowest estimated
//! total cost first, then insertion order.  The sequence number makes the
//! expansion order fully deterministic for equal costs.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use nav_core::{StateIndex, TransitionId};

/// What a node means to the search when it is expanded.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum GoalType {
    NoGoal,
    TargetReached,
    TransitionReached(TransitionId),
}

/// Result of one expansion.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Step {
    pub state: StateIndex,
    pub goal:  GoalType,
}

/// One arena entry.
#[derive(Clone, Debug)]
pub struct SearchState<N> {
    pub node:   N,
    /// Cost from the nearest start.
    pub g:      f32,
    /// Heuristic estimate to the goal.
    pub h:      f32,
    /// Predecessor, or `INVALID` for a start state.
    pub parent: StateIndex,
    pub closed: bool,
}

impl<N> SearchState<N> {
    #[inline]
    pub fn f(&self) -> f32 {
        self.g + self.h
    }
}

// ── Open list entry ───────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug)]
struct OpenEntry {
    f:     f32,
    g:     f32,
    seq:   u64,
    state: StateIndex,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    // Reversed: BinaryHeap is a max-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        other.f.total_cmp(&self.f).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ── AStar ─────────────────────────────────────────────────────────────────────

pub struct AStar<N> {
    states:   Vec<SearchState<N>>,
    by_node:  FxHashMap<N, StateIndex>,
    open:     BinaryHeap<OpenEntry>,
    goals:    FxHashMap<N, GoalType>,
    seq:      u64,
    expanded: usize,
    /// Expanded state with the smallest heuristic.
    best:     Option<StateIndex>,
    scratch:  Vec<(N, f32)>,
}

impl<N: Copy + Eq + Hash> Default for AStar<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Copy + Eq + Hash> AStar<N> {
    pub fn new() -> Self {
        Self {
            states:   Vec::new(),
            by_node:  FxHashMap::default(),
            open:     BinaryHeap::new(),
            goals:    FxHashMap::default(),
            seq:      0,
            expanded: 0,
            best:     None,
            scratch:  Vec::new(),
        }
    }

    // ── Goals ─────────────────────────────────────────────────────────────

    /// Mark `node` as a goal.  A target is never downgraded to a transition.
    pub fn add_goal(&mut self, node: N, goal: GoalType) {
        let slot = self.goals.entry(node).or_insert(GoalType::NoGoal);
        if *slot != GoalType::TargetReached {
            *slot = goal;
        }
    }

    pub fn goal_of(&self, node: N) -> GoalType {
        self.goals.get(&node).copied().unwrap_or(GoalType::NoGoal)
    }

    pub fn has_target(&self) -> bool {
        self.goals.values().any(|&g| g == GoalType::TargetReached)
    }

    pub fn goal_count(&self) -> usize {
        self.goals.len()
    }

    // ── Starts ────────────────────────────────────────────────────────────

    /// Seed (or reseed) `node` as a start with cost `g`.
    ///
    /// Returns the state index if the node is new or `g` improves on its
    /// current cost, `None` otherwise.  An improved state loses its parent
    /// and is reopened.
    pub fn add_start(&mut self, node: N, g: f32, h: f32) -> Option<StateIndex> {
        let index = match self.by_node.get(&node) {
            Some(&i) => {
                let s = &mut self.states[i.index()];
                if g >= s.g {
                    return None;
                }
                s.g = g;
                s.parent = StateIndex::INVALID;
                s.closed = false;
                i
            }
            None => self.push_state(node, g, h, StateIndex::INVALID),
        };
        self.push_open(index);
        Some(index)
    }

    // ── Expansion ─────────────────────────────────────────────────────────

    /// Estimated total cost of the next state to expand, or `None` when the
    /// open list is exhausted.  Discards stale heap entries on the way.
    pub fn front_cost(&mut self) -> Option<f32> {
        while let Some(top) = self.open.peek() {
            if self.is_stale(top) {
                self.open.pop();
            } else {
                return Some(top.f);
            }
        }
        None
    }

    pub fn is_open_empty(&mut self) -> bool {
        self.front_cost().is_none()
    }

    /// Expand the best open state.
    ///
    /// `expand` appends `(neighbor, step_cost)` pairs; `heuristic` estimates
    /// the remaining cost from a node.  Target states are not expanded.
    /// Returns `None` if the open list is empty.
    pub fn search_step(
        &mut self,
        mut expand: impl FnMut(N, &mut Vec<(N, f32)>),
        heuristic:  impl Fn(N) -> f32,
    ) -> Option<Step> {
        self.front_cost()?;
        let entry = self.open.pop()?;
        let index = entry.state;

        let (node, g, h) = {
            let s = &mut self.states[index.index()];
            s.closed = true;
            (s.node, s.g, s.h)
        };
        self.expanded += 1;
        if self.best.is_none_or(|b| h < self.states[b.index()].h) {
            self.best = Some(index);
        }

        let goal = self.goal_of(node);
        if goal == GoalType::TargetReached {
            return Some(Step { state: index, goal });
        }

        let mut neighbors = std::mem::take(&mut self.scratch);
        neighbors.clear();
        expand(node, &mut neighbors);
        for &(next, cost) in &neighbors {
            let g_next = g + cost;
            match self.by_node.get(&next) {
                Some(&i) => {
                    let s = &mut self.states[i.index()];
                    if g_next >= s.g {
                        continue;
                    }
                    s.g = g_next;
                    s.parent = index;
                    s.closed = false;
                    self.push_open(i);
                }
                None => {
                    let i = self.push_state(next, g_next, heuristic(next), index);
                    self.push_open(i);
                }
            }
        }
        self.scratch = neighbors;

        Some(Step { state: index, goal })
    }

    /// Drop every open entry.  Used once the search has resolved.
    pub fn close_all(&mut self) {
        self.open.clear();
    }

    // ── Inspection ────────────────────────────────────────────────────────

    #[inline]
    pub fn state(&self, index: StateIndex) -> &SearchState<N> {
        &self.states[index.index()]
    }

    pub fn state_of(&self, node: N) -> Option<StateIndex> {
        self.by_node.get(&node).copied()
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_expanded(&self) -> usize {
        self.expanded
    }

    /// Expanded state with the smallest heuristic, for partial paths.
    pub fn best_state(&self) -> Option<StateIndex> {
        self.best
    }

    /// Append the node chain ending at `to`, start first, to `out`.
    /// Returns the start state of the chain.
    pub fn write_path(&self, to: StateIndex, out: &mut Vec<N>) -> StateIndex {
        let first = out.len();
        let mut cur = to;
        // A chain can never be longer than the arena.
        for _ in 0..self.states.len() {
            let s = &self.states[cur.index()];
            out.push(s.node);
            if !s.parent.is_valid() {
                break;
            }
            cur = s.parent;
        }
        out[first..].reverse();
        cur
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn push_state(&mut self, node: N, g: f32, h: f32, parent: StateIndex) -> StateIndex {
        let index = StateIndex(self.states.len() as u32);
        self.states.push(SearchState { node, g, h, parent, closed: false });
        self.by_node.insert(node, index);
        index
    }

    fn push_open(&mut self, index: StateIndex) {
        let s = &self.states[index.index()];
        self.open.push(OpenEntry { f: s.f(), g: s.g, seq: self.seq, state: index });
        self.seq += 1;
    }

    #[inline]
    fn is_stale(&self, entry: &OpenEntry) -> bool {
        let s = &self.states[entry.state.index()];
        s.closed || s.g != entry.g
    }
}
