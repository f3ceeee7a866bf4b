//! # B-Tree Index
//!
//! This module implements the ordered, balanced multiway tree at the heart
//! of the engine. All data lives in leaf nodes; internal nodes hold
//! separator keys and child page numbers. Every node occupies exactly one
//! page.
//!
//! ## Node Types
//!
//! - **Leaf nodes**: a sorted, duplicate-free array of `(key, value)`
//!   cells with a fixed per-page capacity.
//! - **Internal nodes**: one `(key, child page)` cell per child; the key
//!   of each non-trailing cell is the maximum key in its child's subtree.
//!
//! ## Page Layout (both kinds)
//!
//! ```text
//! +----------------------+
//! | Node Header (12B)    |  kind, is_root, parent, cell_count
//! +----------------------+
//! | Cell Array           |  fixed-size cells, count in [0, maxValues]
//! |   leaf:     key | value
//! |   internal: key | child page
//! +----------------------+
//! | Filler (zeroed)      |  pads the node to exactly one page
//! +----------------------+
//! ```
//!
//! Capacities derive from the page size and the instantiated key/value
//! sizes; see [`NodeLayout`]. The tree is generic over any fixed-layout
//! `Ord` key and fixed-layout value ([`Key`], [`Datum`]).
//!
//! ## Operations
//!
//! - `find_leaf` / `at`: descend by separator, binary-search the leaf.
//! - `emplace`: ordered insert; duplicate keys are rejected, full leaves
//!   split and the split propagates up the recorded descent path, growing
//!   the tree at the root when necessary.
//! - `cursor_first` / `cursor_seek`: positions for scans and positioned
//!   inserts (see [`Cursor`]).
//! - `dump`: indented structural dump for the `.btree` command and tests.
//!
//! ## Thread Safety
//!
//! Not thread-safe; the engine expects a single logical caller and the
//! pager it borrows provides no internal locking.

mod cursor;
mod node;
mod tree;

pub use cursor::Cursor;
pub use node::{
    Datum, InternalCell, InternalNode, Key, LeafCell, LeafNode, Node, NodeLayout, SearchResult,
};
pub use tree::{BTree, InsertResult};
