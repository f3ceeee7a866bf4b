//! # Storage Layer
//!
//! The foundational layer of the engine: fixed-size page buffers, the
//! common node header, and the [`Pager`] that owns every in-memory node
//! and backs it with a single random-access file.
//!
//! ## File Format
//!
//! A database file is a sequence of `page_size`-byte pages. Page 0 is the
//! root node. There is no superblock: each page is self-describing via
//! the node-kind byte at offset 0, so reopening a file needs nothing but
//! the configuration it was created with. The file length is always an
//! exact multiple of the page size; anything else is rejected as corrupt
//! at open time.
//!
//! ## Ownership
//!
//! The pager is the sole owner of node memory. Components above it (the
//! B-tree engine, cursors, the table handle) address nodes by page number
//! and borrow them through the pager, which keeps relocation and eviction
//! concerns in one place.
//!
//! ## I/O Model
//!
//! Synchronous, blocking reads and writes on the calling thread; no
//! background flushing and no write-ahead log. `Pager::flush_all` at
//! orderly shutdown is the only durability point.

mod page;
mod pager;

pub use page::{NodeHeader, NodeKind, Page, PageNo, NO_PARENT};
pub use pager::Pager;
