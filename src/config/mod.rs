//! # Table Configuration
//!
//! A [`TableConfig`] is passed explicitly to `Table::open` and threaded
//! through the Pager and B-tree constructors. Everything the original
//! layout depends on — page size, page-count bound, depth bound — lives
//! here and is validated once at open time, not scattered across global
//! constants.

mod constants;

pub use constants::{
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE, MIN_PAGE_SIZE, NODE_HEADER_SIZE,
};

use eyre::{ensure, Result};

/// Runtime configuration for a single table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    /// Size of every page in the file, in bytes.
    pub page_size: usize,
    /// Maximum number of pages the file may grow to.
    pub max_pages: u32,
    /// Maximum tree depth, counting the leaf level.
    pub max_depth: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl TableConfig {
    /// Config with a non-default page size, keeping the other defaults.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Basic sanity checks, independent of the key/value types. Type-aware
    /// capacity checks happen in `NodeLayout::new`.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.page_size >= MIN_PAGE_SIZE,
            "page_size {} below minimum {}",
            self.page_size,
            MIN_PAGE_SIZE
        );
        ensure!(self.max_pages >= 1, "max_pages must be at least 1");
        ensure!(self.max_depth >= 1, "max_depth must be at least 1");
        Ok(())
    }
}
