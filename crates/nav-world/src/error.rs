//! World-subsystem error type.

use thiserror::Error;

use nav_core::{MapId, NavError};

/// Errors produced by `nav-world`.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("map {0} is not registered")]
    MapNotFound(MapId),

    #[error("map {0} is already registered")]
    DuplicateMap(MapId),

    #[error("parallel access to {0} requires two distinct maps")]
    SameMap(MapId),

    #[error("lane graph parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] NavError),
}

pub type WorldResult<T> = Result<T, WorldError>;
