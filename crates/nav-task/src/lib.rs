//! `nav-task` — the background navigation scheduler.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                  |
//! |------------|-----------------------------------------------------------|
//! | [`thread`] | `NavigationTaskThread`, `QueueLengths`                    |
//! | [`config`] | `NavigationConfig`                                        |
//! | [`error`]  | `TaskError`, `TaskResult<T>`                              |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                  |
//! |---------|---------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on `NavigationConfig`. |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use nav_task::{NavigationConfig, NavigationTaskThread};
//!
//! let mut nav = NavigationTaskThread::new(Arc::new(maps), NavigationConfig::default());
//! nav.start()?;
//! let id = nav.request_search(config);
//!
//! // once per simulation tick
//! nav.update(dt, now);
//! match nav.try_fetch_result(id, Some(pose), &mut path) {
//!     ProcessState::Finished => follow(&path),
//!     ProcessState::Failed => give_up(),
//!     _ => {} // poll again next tick
//! }
//! ```

pub mod config;
pub mod error;
pub mod thread;

#[cfg(test)]
mod tests;

pub use config::NavigationConfig;
pub use error::{TaskError, TaskResult};
pub use thread::{NavigationTaskThread, QueueLengths};
