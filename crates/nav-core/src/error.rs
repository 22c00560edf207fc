//! Framework error type.
//!
//! Sub-crates define their own error enums and wrap `NavError` as one
//! variant via `#[from]`.

use thiserror::Error;

/// The base error type for `nav-core` and a common variant for sub-crates.
#[derive(Debug, Error)]
pub enum NavError {
    #[error("unexpected end of data: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `nav-*` crates.
pub type NavResult<T> = Result<T, NavError>;
