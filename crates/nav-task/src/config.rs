//! Scheduler configuration.

use nav_core::{MapId, MoverTypeId, Pose};
use nav_search::{NavigationGoal, PathSearchConfiguration, SearchTuning};

/// Settings of one [`NavigationTaskThread`][crate::NavigationTaskThread].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavigationConfig {
    /// Name given to the worker thread.
    pub thread_name: String,

    /// Simulation seconds between two interruptions of the running task.
    /// `update` raises the interrupt flag whenever this much time has
    /// accumulated; 0 interrupts on every update.
    pub interrupt_interval: f64,

    /// Tuning copied into requests built with [`NavigationConfig::request`];
    /// its `connection_distance` is used for reconnection requests.
    pub tuning: SearchTuning,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            thread_name:        "navigation".into(),
            interrupt_interval: 0.1,
            tuning:             SearchTuning::default(),
        }
    }
}

impl NavigationConfig {
    /// A single-map request carrying this configuration's tuning.
    pub fn request(&self, map: MapId, mover: MoverTypeId, start: Pose, goal: NavigationGoal) -> PathSearchConfiguration {
        PathSearchConfiguration { tuning: self.tuning.clone(), ..PathSearchConfiguration::new(map, mover, start, goal) }
    }
}
