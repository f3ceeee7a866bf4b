//! # Configuration Constants
//!
//! Defaults and fixed layout constants for the storage engine. Values that
//! depend on each other are co-located and checked with compile-time
//! assertions so a change to one cannot silently break another.
//!
//! ## Dependency Graph
//!
//! ```text
//! DEFAULT_PAGE_SIZE (4096 bytes)
//!       │
//!       ├─> NODE_HEADER_SIZE (12 bytes, fixed)
//!       │     kind(1) + is_root(1) + reserved(2) + parent(4) + count(4)
//!       │
//!       └─> per-type cell capacities are derived at runtime by NodeLayout
//!           from page_size and the instantiated key/value sizes
//!
//! DEFAULT_MAX_PAGES (100)
//!       └─> Pager bounds every page number against the configured value;
//!           allocation past it fails with PageOutOfBounds
//!
//! DEFAULT_MAX_DEPTH (8)
//!       └─> a root split that would grow the tree past this fails with
//!           MaxDepthExceeded before any cell is moved
//! ```

/// Default size of each database page in bytes. The fundamental unit of
/// disk I/O and caching; configurable per table via `TableConfig`.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default maximum number of pages a table file may hold.
pub const DEFAULT_MAX_PAGES: u32 = 100;

/// Default maximum tree depth (levels including the leaf level).
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Size of the node header at the start of every page.
pub const NODE_HEADER_SIZE: usize = 12;

/// Smallest page size the engine will accept regardless of cell sizes.
/// A page must hold the header plus at least one byte of cell space.
pub const MIN_PAGE_SIZE: usize = NODE_HEADER_SIZE + 1;

const _: () = assert!(
    MIN_PAGE_SIZE > NODE_HEADER_SIZE,
    "MIN_PAGE_SIZE must leave room for at least one cell byte"
);

const _: () = assert!(
    DEFAULT_PAGE_SIZE >= MIN_PAGE_SIZE,
    "DEFAULT_PAGE_SIZE below the engine minimum"
);
