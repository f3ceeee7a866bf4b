//! # Node Layout and Serialization
//!
//! This module defines the typed interpretation of a page: a leaf node
//! holding `(key, value)` cells or an internal node holding
//! `(key, child page)` cells, each sized so the serialized node occupies
//! exactly one page.
//!
//! ## Cell Arithmetic
//!
//! For a page of `page_size` bytes and a 12-byte node header:
//!
//! ```text
//! leaf cell     = key_size + value_size
//! internal cell = key_size + 4                  (child page number)
//! max cells     = (page_size - 12) / cell_size  (per node kind)
//! filler        = (page_size - 12) % cell_size  (explicit, zeroed)
//! ```
//!
//! Capacities are computed once per table in [`NodeLayout`] and validated
//! at open time: a page must hold at least one leaf cell and two internal
//! cells, otherwise the layout is rejected.
//!
//! ## Key/Value Bounds
//!
//! Keys and values are fixed-layout types: `zerocopy`'s `FromBytes` +
//! `IntoBytes` + `Immutable` + `KnownLayout` plus `Copy`. Serialization
//! reads and writes owned copies at computed offsets; page buffers are
//! never reinterpreted in place.
//!
//! ## Internal Node Semantics
//!
//! An internal node with `count` children stores `count` cells. The key of
//! cell `i` (for `i < count - 1`) is the maximum key of the subtree under
//! `cells[i].child`; the last cell's key is not consulted. Search descends
//! the first cell whose key is `>=` the target, else the last child.

use core::fmt::Debug;
use core::mem::size_of;

use eyre::{bail, ensure, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::config::NODE_HEADER_SIZE;
use crate::error::DbError;
use crate::storage::{NodeHeader, NodeKind, Page, PageNo};

/// Fixed-layout datum storable in a cell.
pub trait Datum:
    FromBytes + IntoBytes + Immutable + KnownLayout + Copy + Debug + 'static
{
}

impl<T> Datum for T where
    T: FromBytes + IntoBytes + Immutable + KnownLayout + Copy + Debug + 'static
{
}

/// Fixed-layout, totally ordered key.
pub trait Key: Datum + Ord {}

impl<T: Datum + Ord> Key for T {}

/// Per-table cell capacities, derived from the page size and the
/// instantiated key/value sizes, validated once at table-open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    pub page_size: usize,
    pub key_size: usize,
    pub value_size: usize,
    /// Maximum `(key, value)` cells per leaf.
    pub leaf_cap: usize,
    /// Maximum `(key, child)` cells per internal node.
    pub internal_cap: usize,
}

impl NodeLayout {
    pub fn new<K: Key, V: Datum>(page_size: usize) -> Result<Self> {
        let key_size = size_of::<K>();
        let value_size = size_of::<V>();
        ensure!(key_size >= 1, "zero-sized key type is not storable");

        let leaf_cell = key_size + value_size;
        let internal_cell = key_size + size_of::<PageNo>();
        let required = NODE_HEADER_SIZE + leaf_cell.max(2 * internal_cell);

        let body = match page_size.checked_sub(NODE_HEADER_SIZE) {
            Some(body) => body,
            None => bail!(DbError::Layout {
                page_size,
                required,
            }),
        };

        let leaf_cap = body / leaf_cell;
        let internal_cap = body / internal_cell;
        if leaf_cap < 1 || internal_cap < 2 {
            bail!(DbError::Layout {
                page_size,
                required,
            });
        }

        Ok(Self {
            page_size,
            key_size,
            value_size,
            leaf_cap,
            internal_cap,
        })
    }

    fn leaf_cell_size(&self) -> usize {
        self.key_size + self.value_size
    }

    fn internal_cell_size(&self) -> usize {
        self.key_size + size_of::<PageNo>()
    }
}

/// Result of a within-node key search, either the exact slot or the slot
/// where the key would be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    Found(usize),
    NotFound(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafCell<K, V> {
    pub key: K,
    pub value: V,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalCell<K> {
    pub key: K,
    pub child: PageNo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode<K, V> {
    pub is_root: bool,
    pub parent: Option<PageNo>,
    pub cells: Vec<LeafCell<K, V>>,
}

impl<K: Key, V: Datum> LeafNode<K, V> {
    pub fn new(is_root: bool, parent: Option<PageNo>) -> Self {
        Self {
            is_root,
            parent,
            cells: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.cells.len()
    }

    /// Binary search for `key`. Cells `[0, count)` are sorted ascending and
    /// unique, so the insertion slot is the first slot whose key is `>=`
    /// the target.
    pub fn search(&self, key: &K) -> SearchResult {
        match self.cells.binary_search_by(|cell| cell.key.cmp(key)) {
            Ok(idx) => SearchResult::Found(idx),
            Err(idx) => SearchResult::NotFound(idx),
        }
    }

    pub fn max_key(&self) -> Option<K> {
        self.cells.last().map(|cell| cell.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode<K> {
    pub is_root: bool,
    pub parent: Option<PageNo>,
    /// One cell per child; the last cell's key is unused.
    pub cells: Vec<InternalCell<K>>,
}

impl<K: Key> InternalNode<K> {
    pub fn new(is_root: bool, parent: Option<PageNo>) -> Self {
        Self {
            is_root,
            parent,
            cells: Vec::new(),
        }
    }

    /// Number of children (cells).
    pub fn count(&self) -> usize {
        self.cells.len()
    }

    /// Index of the child to descend for `key`: the first cell in
    /// `[0, count - 1)` whose key is `>=` the target, else the last child.
    pub fn child_index_for(&self, key: &K) -> usize {
        if self.cells.is_empty() {
            return 0;
        }
        let separators = self.cells.len() - 1;
        match self.cells[..separators].binary_search_by(|cell| cell.key.cmp(key)) {
            Ok(idx) => idx,
            Err(idx) if idx < separators => idx,
            Err(_) => self.cells.len() - 1,
        }
    }

    pub fn child_at(&self, index: usize) -> Result<PageNo> {
        ensure!(
            index < self.cells.len(),
            "child index {} out of bounds (count={})",
            index,
            self.cells.len()
        );
        Ok(self.cells[index].child)
    }

    /// Slot of the cell referencing `child`, if this node lists it.
    pub fn position_of_child(&self, child: PageNo) -> Option<usize> {
        self.cells.iter().position(|cell| cell.child == child)
    }
}

/// Typed interpretation of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<K, V> {
    Leaf(LeafNode<K, V>),
    Internal(InternalNode<K>),
}

impl<K: Key, V: Datum> Node<K, V> {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf(_) => NodeKind::Leaf,
            Node::Internal(_) => NodeKind::Internal,
        }
    }

    pub fn is_root(&self) -> bool {
        match self {
            Node::Leaf(leaf) => leaf.is_root,
            Node::Internal(node) => node.is_root,
        }
    }

    pub fn set_is_root(&mut self, is_root: bool) {
        match self {
            Node::Leaf(leaf) => leaf.is_root = is_root,
            Node::Internal(node) => node.is_root = is_root,
        }
    }

    pub fn parent(&self) -> Option<PageNo> {
        match self {
            Node::Leaf(leaf) => leaf.parent,
            Node::Internal(node) => node.parent,
        }
    }

    pub fn set_parent(&mut self, parent: Option<PageNo>) {
        match self {
            Node::Leaf(leaf) => leaf.parent = parent,
            Node::Internal(node) => node.parent = parent,
        }
    }

    pub fn cell_count(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.count(),
            Node::Internal(node) => node.count(),
        }
    }

    pub fn as_leaf(&self) -> Result<&LeafNode<K, V>> {
        match self {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Internal(_) => bail!("expected leaf node, found internal"),
        }
    }

    pub fn as_leaf_mut(&mut self) -> Result<&mut LeafNode<K, V>> {
        match self {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Internal(_) => bail!("expected leaf node, found internal"),
        }
    }

    pub fn as_internal(&self) -> Result<&InternalNode<K>> {
        match self {
            Node::Internal(node) => Ok(node),
            Node::Leaf(_) => bail!("expected internal node, found leaf"),
        }
    }

    pub fn as_internal_mut(&mut self) -> Result<&mut InternalNode<K>> {
        match self {
            Node::Internal(node) => Ok(node),
            Node::Leaf(_) => bail!("expected internal node, found leaf"),
        }
    }

    /// Serializes this node into `page`, zero-filling first so the filler
    /// region is deterministic and the whole page is exactly the node's
    /// on-disk representation.
    pub fn write_page(&self, layout: &NodeLayout, page: &mut Page) -> Result<()> {
        ensure!(
            page.len() == layout.page_size,
            "page buffer size {} != layout page size {}",
            page.len(),
            layout.page_size
        );
        page.clear();

        let header = NodeHeader {
            kind: self.kind(),
            is_root: self.is_root(),
            parent: self.parent(),
            cell_count: self.cell_count() as u32,
        };
        let data = page.bytes_mut();
        header.encode(data)?;

        match self {
            Node::Leaf(leaf) => {
                ensure!(
                    leaf.count() <= layout.leaf_cap,
                    "leaf overflow: {} cells > capacity {}",
                    leaf.count(),
                    layout.leaf_cap
                );
                let cell_size = layout.leaf_cell_size();
                for (i, cell) in leaf.cells.iter().enumerate() {
                    let off = NODE_HEADER_SIZE + i * cell_size;
                    cell.key
                        .write_to(&mut data[off..off + layout.key_size])
                        .map_err(|e| eyre::eyre!("failed to encode key at slot {}: {:?}", i, e))?;
                    let voff = off + layout.key_size;
                    cell.value
                        .write_to(&mut data[voff..voff + layout.value_size])
                        .map_err(|e| {
                            eyre::eyre!("failed to encode value at slot {}: {:?}", i, e)
                        })?;
                }
            }
            Node::Internal(node) => {
                ensure!(
                    node.count() <= layout.internal_cap,
                    "internal overflow: {} cells > capacity {}",
                    node.count(),
                    layout.internal_cap
                );
                let cell_size = layout.internal_cell_size();
                for (i, cell) in node.cells.iter().enumerate() {
                    let off = NODE_HEADER_SIZE + i * cell_size;
                    cell.key
                        .write_to(&mut data[off..off + layout.key_size])
                        .map_err(|e| eyre::eyre!("failed to encode key at slot {}: {:?}", i, e))?;
                    let coff = off + layout.key_size;
                    data[coff..coff + size_of::<PageNo>()]
                        .copy_from_slice(&cell.child.to_le_bytes());
                }
            }
        }

        Ok(())
    }

    /// Deserializes a node from `page`, dispatching on the kind byte.
    pub fn read_page(layout: &NodeLayout, page: &Page) -> Result<Self> {
        ensure!(
            page.len() == layout.page_size,
            "page buffer size {} != layout page size {}",
            page.len(),
            layout.page_size
        );
        let data = page.bytes();
        let header = NodeHeader::decode(data)?;
        let count = header.cell_count as usize;

        match header.kind {
            NodeKind::Leaf => {
                ensure!(
                    count <= layout.leaf_cap,
                    "leaf cell count {} exceeds capacity {}",
                    count,
                    layout.leaf_cap
                );
                let cell_size = layout.leaf_cell_size();
                let mut cells = Vec::with_capacity(count);
                for i in 0..count {
                    let off = NODE_HEADER_SIZE + i * cell_size;
                    let key = K::read_from_bytes(&data[off..off + layout.key_size])
                        .map_err(|e| eyre::eyre!("failed to decode key at slot {}: {:?}", i, e))?;
                    let voff = off + layout.key_size;
                    let value = V::read_from_bytes(&data[voff..voff + layout.value_size])
                        .map_err(|e| {
                            eyre::eyre!("failed to decode value at slot {}: {:?}", i, e)
                        })?;
                    cells.push(LeafCell { key, value });
                }
                Ok(Node::Leaf(LeafNode {
                    is_root: header.is_root,
                    parent: header.parent,
                    cells,
                }))
            }
            NodeKind::Internal => {
                ensure!(
                    count <= layout.internal_cap,
                    "internal cell count {} exceeds capacity {}",
                    count,
                    layout.internal_cap
                );
                let cell_size = layout.internal_cell_size();
                let mut cells = Vec::with_capacity(count);
                for i in 0..count {
                    let off = NODE_HEADER_SIZE + i * cell_size;
                    let key = K::read_from_bytes(&data[off..off + layout.key_size])
                        .map_err(|e| eyre::eyre!("failed to decode key at slot {}: {:?}", i, e))?;
                    let coff = off + layout.key_size;
                    let child = PageNo::from_le_bytes([
                        data[coff],
                        data[coff + 1],
                        data[coff + 2],
                        data[coff + 3],
                    ]);
                    cells.push(InternalCell { key, child });
                }
                Ok(Node::Internal(InternalNode {
                    is_root: header.is_root,
                    parent: header.parent,
                    cells,
                }))
            }
            NodeKind::Unknown => bail!("invalid node kind in page"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_kind;

    type Layout = NodeLayout;

    // Value sized so a 128-byte page holds exactly two leaf cells, the
    // shape used by the small-tree scenarios.
    type WideValue = [u8; 48];

    #[test]
    fn layout_capacities_small_page() {
        let layout = Layout::new::<u32, WideValue>(128).unwrap();
        assert_eq!(layout.leaf_cap, 2);
        assert_eq!(layout.internal_cap, (128 - NODE_HEADER_SIZE) / 8);
    }

    #[test]
    fn layout_capacities_default_page() {
        let layout = Layout::new::<u32, [u8; 8]>(4096).unwrap();
        assert_eq!(layout.leaf_cap, (4096 - NODE_HEADER_SIZE) / 12);
        assert_eq!(layout.internal_cap, (4096 - NODE_HEADER_SIZE) / 8);
    }

    #[test]
    fn layout_rejects_page_too_small_for_one_cell() {
        let err = Layout::new::<u32, [u8; 200]>(64).unwrap_err();
        assert!(matches!(error_kind(&err), Some(DbError::Layout { .. })));
    }

    #[test]
    fn layout_rejects_page_smaller_than_header() {
        let err = Layout::new::<u32, u32>(8).unwrap_err();
        assert!(matches!(error_kind(&err), Some(DbError::Layout { .. })));
    }

    #[test]
    fn leaf_search_reports_insertion_slots() {
        let mut leaf: LeafNode<u32, u32> = LeafNode::new(true, None);
        for key in [10u32, 20, 30] {
            leaf.cells.push(LeafCell { key, value: key * 2 });
        }
        assert_eq!(leaf.search(&10), SearchResult::Found(0));
        assert_eq!(leaf.search(&30), SearchResult::Found(2));
        assert_eq!(leaf.search(&5), SearchResult::NotFound(0));
        assert_eq!(leaf.search(&25), SearchResult::NotFound(2));
        assert_eq!(leaf.search(&99), SearchResult::NotFound(3));
    }

    #[test]
    fn internal_child_routing() {
        // Children c0..c2 with separators 10 (max of c0) and 20 (max of c1);
        // the last cell's key is unused.
        let node = InternalNode {
            is_root: true,
            parent: None,
            cells: vec![
                InternalCell { key: 10u32, child: 1 },
                InternalCell { key: 20, child: 2 },
                InternalCell { key: 20, child: 3 },
            ],
        };
        assert_eq!(node.child_index_for(&5), 0);
        assert_eq!(node.child_index_for(&10), 0);
        assert_eq!(node.child_index_for(&11), 1);
        assert_eq!(node.child_index_for(&20), 1);
        assert_eq!(node.child_index_for(&21), 2);
        assert_eq!(node.child_index_for(&1000), 2);
    }

    #[test]
    fn internal_single_child_routes_everything_there() {
        let node = InternalNode {
            is_root: true,
            parent: None,
            cells: vec![InternalCell { key: 7u32, child: 4 }],
        };
        assert_eq!(node.child_index_for(&0), 0);
        assert_eq!(node.child_index_for(&7), 0);
        assert_eq!(node.child_index_for(&100), 0);
    }

    #[test]
    fn leaf_round_trip_every_occupancy() {
        let layout = Layout::new::<u32, WideValue>(128).unwrap();
        for count in 0..=layout.leaf_cap {
            let mut leaf: LeafNode<u32, WideValue> = LeafNode::new(false, Some(9));
            for i in 0..count {
                leaf.cells.push(LeafCell {
                    key: (i as u32 + 1) * 3,
                    value: [i as u8; 48],
                });
            }
            let node = Node::Leaf(leaf);

            let mut page = Page::zeroed(layout.page_size);
            node.write_page(&layout, &mut page).unwrap();
            let decoded = Node::read_page(&layout, &page).unwrap();
            assert_eq!(decoded, node, "occupancy {}", count);

            // Re-encoding must be bit-identical.
            let mut page2 = Page::zeroed(layout.page_size);
            decoded.write_page(&layout, &mut page2).unwrap();
            assert_eq!(page.bytes(), page2.bytes(), "occupancy {}", count);
        }
    }

    #[test]
    fn internal_round_trip_every_occupancy() {
        let layout = Layout::new::<u32, WideValue>(128).unwrap();
        for count in 0..=layout.internal_cap {
            let mut node: InternalNode<u32> = InternalNode::new(true, None);
            for i in 0..count {
                node.cells.push(InternalCell {
                    key: i as u32 * 10,
                    child: i as PageNo + 1,
                });
            }
            let node: Node<u32, WideValue> = Node::Internal(node);

            let mut page = Page::zeroed(layout.page_size);
            node.write_page(&layout, &mut page).unwrap();
            let decoded = Node::read_page(&layout, &page).unwrap();
            assert_eq!(decoded, node, "occupancy {}", count);

            let mut page2 = Page::zeroed(layout.page_size);
            decoded.write_page(&layout, &mut page2).unwrap();
            assert_eq!(page.bytes(), page2.bytes(), "occupancy {}", count);
        }
    }

    #[test]
    fn serialized_filler_is_zeroed() {
        let layout = Layout::new::<u32, WideValue>(128).unwrap();
        let mut leaf: LeafNode<u32, WideValue> = LeafNode::new(true, None);
        leaf.cells.push(LeafCell {
            key: 1,
            value: [0xAA; 48],
        });
        let node = Node::Leaf(leaf);

        let mut page = Page::zeroed(layout.page_size);
        // Dirty the buffer first; write_page must still produce a clean tail.
        page.bytes_mut().fill(0xFF);
        node.write_page(&layout, &mut page).unwrap();

        let cell_end = NODE_HEADER_SIZE + 52;
        assert!(page.bytes()[cell_end..].iter().all(|&b| b == 0));
    }

    #[test]
    fn write_rejects_overflowing_leaf() {
        let layout = Layout::new::<u32, WideValue>(128).unwrap();
        let mut leaf: LeafNode<u32, WideValue> = LeafNode::new(true, None);
        for i in 0..=layout.leaf_cap as u32 {
            leaf.cells.push(LeafCell {
                key: i,
                value: [0; 48],
            });
        }
        let node = Node::Leaf(leaf);
        let mut page = Page::zeroed(layout.page_size);
        assert!(node.write_page(&layout, &mut page).is_err());
    }

    #[test]
    fn read_rejects_corrupt_cell_count() {
        let layout = Layout::new::<u32, WideValue>(128).unwrap();
        let node: Node<u32, WideValue> = Node::Leaf(LeafNode::new(true, None));
        let mut page = Page::zeroed(layout.page_size);
        node.write_page(&layout, &mut page).unwrap();
        // Forge an impossible cell count.
        page.bytes_mut()[8..12].copy_from_slice(&1000u32.to_le_bytes());
        assert!(Node::<u32, WideValue>::read_page(&layout, &page).is_err());
    }
}
