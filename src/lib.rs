//! # keeldb - Single-File Ordered Key/Value Store
//!
//! keeldb is a disk-backed, ordered key/value store built on a paged
//! B-tree. One database file holds one tree; every node occupies exactly
//! one fixed-size page, and page 0 is always the root.
//!
//! ## Quick Start
//!
//! ```ignore
//! use keeldb::{Table, TableConfig};
//!
//! let mut table: Table<u32, [u8; 8]> =
//!     Table::open(path, TableConfig::default())?;
//!
//! table.insert(1, *b"01234567")?;
//! for row in table.scan()? {
//!     let (key, value) = row?;
//! }
//! table.close()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        CLI (REPL, statements)        │
//! ├─────────────────────────────────────┤
//! │        Table (open/insert/scan)      │
//! ├──────────────────┬──────────────────┤
//! │   B-Tree Engine  │      Cursor      │
//! ├──────────────────┴──────────────────┤
//! │   Node Layout & (De)serialization    │
//! ├─────────────────────────────────────┤
//! │     Pager (node cache + file I/O)    │
//! └─────────────────────────────────────┘
//! ```
//!
//! The tree is generic over any fixed-layout `Ord` key and fixed-layout
//! value; the CLI instantiates it as `Table<u32, UserRow>`.
//!
//! ## Concurrency
//!
//! Single-threaded and synchronous: the engine provides no internal
//! locking and expects one logical caller per table. I/O is ordinary
//! blocking file I/O; `Table::close` (or drop) is the only durability
//! point.
//!
//! ## Module Overview
//!
//! - [`storage`]: page buffers, node headers, and the pager
//! - [`btree`]: node layout, the tree engine, and cursors
//! - [`table`]: the public table handle and scan iterator
//! - [`config`]: runtime configuration
//! - [`cli`]: the interactive front end
//! - [`error`]: the error taxonomy

pub mod btree;
pub mod cli;
pub mod config;
pub mod error;
pub mod storage;
pub mod table;

pub use config::TableConfig;
pub use error::DbError;
pub use table::{Scan, Table, UserRow, UserTable};
