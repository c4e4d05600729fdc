//! Error types shared across RoastBot crates.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the analytics store.
#[derive(Error, Debug)]
pub enum Error {
    /// The analytics backend failed to read or write.
    #[error("storage error: {0}")]
    Storage(String),
}
