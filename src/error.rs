//! Error taxonomy for keeldb.
//!
//! [`DbError`] enumerates the typed error kinds from the spec (§7). All
//! fallible APIs return [`eyre::Result`]; typed kinds are raised with
//! `bail!(DbError::...)` so callers and tests can recover them via
//! [`error_kind`] (an `eyre::Report` downcast).

use thiserror::Error;

/// The typed error kinds carried inside `eyre` reports.
#[derive(Debug, Error)]
pub enum DbError {
    /// An underlying I/O operation failed.
    #[error("I/O error")]
    Io(std::io::Error),

    /// The database file length is not an exact multiple of the page size.
    #[error("corrupt file: length {length} is not a multiple of page size {page_size}")]
    CorruptFile { length: u64, page_size: usize },

    /// The configured page size cannot hold the required header and cells.
    #[error("layout error: page size {page_size} below required {required}")]
    Layout { page_size: usize, required: usize },

    /// An insert collided with an existing key.
    #[error("duplicate key")]
    DuplicateKey,

    /// A lookup targeted a key that is not present.
    #[error("key not found")]
    KeyNotFound,

    /// A split would grow the tree beyond the configured maximum depth.
    #[error("maximum tree depth {max_depth} exceeded")]
    MaxDepthExceeded { max_depth: usize },

    /// A page number reached or exceeded the configured page limit.
    #[error("page {page} out of bounds (max pages {max_pages})")]
    PageOutOfBounds { page: u32, max_pages: u32 },
}

/// Returns the typed [`DbError`] carried by an `eyre` report, if any.
pub fn error_kind(report: &eyre::Report) -> Option<&DbError> {
    report.downcast_ref::<DbError>()
}
