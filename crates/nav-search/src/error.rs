//! Search-subsystem error type.
//!
//! A search that finds no path is not an error; it resolves as
//! `ProcessState::Failed`.  These errors cover requests that cannot be turned
//! into a search at all.

use thiserror::Error;

use nav_core::{MapId, NavError};
use nav_world::WorldError;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search configuration: {0}")]
    InvalidConfiguration(String),

    #[error("map {0} does not hold the expected world representation")]
    WrongWorldKind(MapId),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Core(#[from] NavError),
}

pub type SearchResult<T> = Result<T, SearchError>;
