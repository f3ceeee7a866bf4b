//! # B-Tree Engine
//!
//! Maintains the sorted, balanced multiway tree over pager-owned nodes:
//! descent, ordered insert with duplicate rejection, node splitting with
//! upward propagation, and root replacement.
//!
//! ## Separator Convention
//!
//! One rule everywhere: an internal cell's key is the maximum key of the
//! subtree under that cell's child; the last cell's key is unused. Search
//! descends the first cell whose key is `>=` the target (equality included
//! — the key equals that subtree's maximum, so it lives there), else the
//! last child. Splits promote the left half's maximum under the same rule,
//! so no stored separator ever goes stale.
//!
//! ## Split Apportioning
//!
//! A full node plus the incoming cell holds `cap + 1` cells. The new right
//! sibling receives `(cap + 1) / 2` of them and the original keeps the
//! rest, so the left node gets the larger half when the total is odd and
//! `|left - right| <= 1` always holds.
//!
//! ## Split Propagation
//!
//! The descent path is recorded on the way down (a stack of internal page
//! numbers). After a leaf splits, the separator and new sibling are
//! inserted into the popped parent; an overflowing parent splits the same
//! way and the promotion continues upward. Parent back-pointers stored in
//! the nodes are cross-checked against the path at every step rather than
//! trusted blindly.
//!
//! ## Root Splits
//!
//! The root lives at page 0 forever. When it splits, its old contents are
//! relocated to a fresh page (children reparented), and page 0 is
//! rewritten as a new internal root with two children and one live
//! separator. Tree depth grows only here.
//!
//! ## Failure Atomicity
//!
//! A split preflights the whole cascade read-only — pages needed, depth
//! growth — before touching any cell, so allocation and depth failures
//! surface with the tree unchanged.

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;
use eyre::{bail, ensure, Result};
use smallvec::SmallVec;
use tracing::debug;

use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::DbError;
use crate::storage::{PageNo, Pager};

use super::node::{
    Datum, InternalCell, InternalNode, Key, LeafCell, LeafNode, Node, SearchResult,
};

/// Stack of internal pages from the root down to a leaf's parent.
type DescentPath = SmallVec<[PageNo; DEFAULT_MAX_DEPTH]>;

/// Outcome of inserting a separator into an internal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult<K> {
    Ok,
    Split { separator: K, new_page: PageNo },
}

/// The B-tree engine, borrowing the pager that owns the nodes.
pub struct BTree<'p, K: Key, V: Datum> {
    pager: &'p mut Pager<K, V>,
    root_page: PageNo,
    max_depth: usize,
}

impl<'p, K: Key, V: Datum> BTree<'p, K, V> {
    pub fn new(pager: &'p mut Pager<K, V>, root_page: PageNo, max_depth: usize) -> Self {
        Self {
            pager,
            root_page,
            max_depth,
        }
    }

    pub fn root_page(&self) -> PageNo {
        self.root_page
    }

    /// Descends internal nodes to the leaf responsible for `key`.
    pub fn find_leaf(&mut self, key: &K) -> Result<PageNo> {
        Ok(self.descend(key)?.0)
    }

    /// Point lookup. Fails with `KeyNotFound` for absent keys.
    pub fn at(&mut self, key: &K) -> Result<V> {
        let leaf_page = self.find_leaf(key)?;
        let leaf = self.pager.node(leaf_page)?.as_leaf()?;
        match leaf.search(key) {
            SearchResult::Found(slot) => Ok(leaf.cells[slot].value),
            SearchResult::NotFound(_) => bail!(DbError::KeyNotFound),
        }
    }

    /// Ordered insert. Fails with `DuplicateKey` if `key` is present;
    /// the tree is unchanged by the failed attempt.
    pub fn emplace(&mut self, key: K, value: V) -> Result<()> {
        let (leaf_page, path) = self.descend(&key)?;
        let slot = match self.pager.node(leaf_page)?.as_leaf()?.search(&key) {
            SearchResult::Found(_) => bail!(DbError::DuplicateKey),
            SearchResult::NotFound(slot) => slot,
        };
        self.insert_in_leaf(leaf_page, slot, key, value, path)
    }

    /// Positioned insert used by cursors: the descent path is re-derived
    /// and the cursor's leaf is cross-checked against it.
    pub fn insert_at(&mut self, leaf_page: PageNo, slot: usize, key: K, value: V) -> Result<()> {
        let (found_leaf, path) = self.descend(&key)?;
        ensure!(
            found_leaf == leaf_page,
            "stale cursor: leaf {} no longer owns the key (search routes to {})",
            leaf_page,
            found_leaf
        );
        self.insert_in_leaf(leaf_page, slot, key, value, path)
    }

    /// Cursor at the first cell of the leftmost leaf; `end_of_table` is
    /// already set for an empty tree.
    pub fn cursor_first(mut self) -> Result<super::cursor::Cursor<'p, K, V>> {
        let page = self.first_leaf()?;
        let count = self.pager.node(page)?.as_leaf()?.count();
        Ok(super::cursor::Cursor {
            pager: self.pager,
            root_page: self.root_page,
            max_depth: self.max_depth,
            page,
            slot: 0,
            end_of_table: count == 0,
        })
    }

    /// Cursor at `key`'s slot in its leaf: the exact slot when present,
    /// the insertion slot otherwise.
    pub fn cursor_seek(mut self, key: &K) -> Result<super::cursor::Cursor<'p, K, V>> {
        let page = self.find_leaf(key)?;
        let leaf = self.pager.node(page)?.as_leaf()?;
        let slot = match leaf.search(key) {
            SearchResult::Found(slot) | SearchResult::NotFound(slot) => slot,
        };
        let end_of_table = slot >= leaf.count();
        Ok(super::cursor::Cursor {
            pager: self.pager,
            root_page: self.root_page,
            max_depth: self.max_depth,
            page,
            slot,
            end_of_table,
        })
    }

    /// Leftmost leaf of the tree; scans start here.
    pub fn first_leaf(&mut self) -> Result<PageNo> {
        let mut current = self.root_page;
        for _ in 0..self.max_depth {
            match self.pager.node(current)? {
                Node::Leaf(_) => return Ok(current),
                Node::Internal(node) => {
                    current = node.child_at(0)?;
                }
            }
        }
        bail!("tree deeper than configured maximum {}", self.max_depth)
    }

    /// Leaf holding the smallest key strictly greater than `key`, if any.
    /// Scans hop leaves with this instead of sibling links.
    pub fn leaf_after(&mut self, key: &K) -> Result<Option<PageNo>> {
        let mut current = self.root_page;
        for _ in 0..self.max_depth {
            match self.pager.node(current)? {
                Node::Leaf(leaf) => {
                    return Ok(match leaf.max_key() {
                        Some(max) if max > *key => Some(current),
                        _ => None,
                    });
                }
                Node::Internal(node) => {
                    ensure!(node.count() > 0, "internal page {} has no children", current);
                    let separators = node.count() - 1;
                    let idx = node.cells[..separators].partition_point(|cell| cell.key <= *key);
                    let idx = if idx == separators {
                        node.count() - 1
                    } else {
                        idx
                    };
                    current = node.child_at(idx)?;
                }
            }
        }
        bail!("tree deeper than configured maximum {}", self.max_depth)
    }

    /// Number of levels, counting the leaf level.
    pub fn depth(&mut self) -> Result<usize> {
        let mut current = self.root_page;
        for level in 1..=self.max_depth {
            match self.pager.node(current)? {
                Node::Leaf(_) => return Ok(level),
                Node::Internal(node) => {
                    current = node.child_at(0)?;
                }
            }
        }
        bail!("tree deeper than configured maximum {}", self.max_depth)
    }

    /// Total number of keys, by walking the leaves in order.
    pub fn row_count(&mut self) -> Result<u64> {
        let mut total = 0u64;
        let mut page = self.first_leaf()?;
        loop {
            let leaf = self.pager.node(page)?.as_leaf()?;
            total += leaf.count() as u64;
            let max = match leaf.max_key() {
                Some(max) => max,
                None => break,
            };
            match self.leaf_after(&max)? {
                Some(next) => page = next,
                None => break,
            }
        }
        Ok(total)
    }

    /// Depth-first, indented dump of the tree structure. Diagnostics only.
    pub fn dump(&mut self) -> Result<String> {
        let mut out = String::new();
        self.dump_node(self.root_page, 0, &mut out)?;
        Ok(out)
    }

    fn dump_node(&mut self, page: PageNo, level: usize, out: &mut String) -> Result<()> {
        use std::fmt::Write as _;

        ensure!(
            level < self.max_depth,
            "tree deeper than configured maximum {}",
            self.max_depth
        );
        let indent = "  ".repeat(level);
        match self.pager.node(page)? {
            Node::Leaf(leaf) => {
                let _ = writeln!(out, "{}- leaf (size {})", indent, leaf.count());
                for cell in &leaf.cells {
                    let _ = writeln!(out, "{}  - {:?}", indent, cell.key);
                }
                Ok(())
            }
            Node::Internal(node) => {
                let _ = writeln!(out, "{}- internal ({} children)", indent, node.count());
                let separators = node.count().saturating_sub(1);
                let cells: Vec<InternalCell<K>> = node.cells.clone();
                for (i, cell) in cells.iter().enumerate() {
                    self.dump_node(cell.child, level + 1, out)?;
                    if i < separators {
                        let _ = writeln!(out, "{}- key {:?}", indent, cell.key);
                    }
                }
                Ok(())
            }
        }
    }

    fn descend(&mut self, key: &K) -> Result<(PageNo, DescentPath)> {
        let mut path = DescentPath::new();
        let mut current = self.root_page;
        for _ in 0..self.max_depth {
            match self.pager.node(current)? {
                Node::Leaf(_) => return Ok((current, path)),
                Node::Internal(node) => {
                    ensure!(node.count() > 0, "internal page {} has no children", current);
                    let idx = node.child_index_for(key);
                    let child = node.child_at(idx)?;
                    path.push(current);
                    current = child;
                }
            }
        }
        bail!("tree deeper than configured maximum {}", self.max_depth)
    }

    fn insert_in_leaf(
        &mut self,
        leaf_page: PageNo,
        slot: usize,
        key: K,
        value: V,
        path: DescentPath,
    ) -> Result<()> {
        let cap = self.pager.layout().leaf_cap;
        let count = {
            let leaf = self.pager.node(leaf_page)?.as_leaf()?;
            let count = leaf.count();
            ensure!(
                slot <= count,
                "insert slot {} out of bounds (count={})",
                slot,
                count
            );
            if slot < count && leaf.cells[slot].key == key {
                bail!(DbError::DuplicateKey);
            }
            ensure!(
                slot == 0 || leaf.cells[slot - 1].key < key,
                "insert slot violates key order"
            );
            ensure!(
                slot == count || key < leaf.cells[slot].key,
                "insert slot violates key order"
            );
            count
        };

        if count < cap {
            let leaf = self.pager.node_mut(leaf_page)?.as_leaf_mut()?;
            leaf.cells.insert(slot, LeafCell { key, value });
            return Ok(());
        }

        self.preflight_split(&path)?;
        let (separator, new_page) = self.split_leaf(leaf_page, slot, key, value)?;
        self.propagate_split(path, separator, leaf_page, new_page)
    }

    /// Read-only check that the whole split cascade can complete: enough
    /// pages for every sibling (plus the root relocation target if the
    /// cascade reaches the root) and room for the depth to grow. Nothing
    /// is mutated until this passes.
    fn preflight_split(&mut self, path: &[PageNo]) -> Result<()> {
        let internal_cap = self.pager.layout().internal_cap;
        let mut pages_needed: u32 = 1;
        let mut grows_root = path.is_empty();

        for (i, &page) in path.iter().enumerate().rev() {
            let node = self.pager.node(page)?.as_internal()?;
            if node.count() < internal_cap {
                grows_root = false;
                break;
            }
            pages_needed += 1;
            if i == 0 {
                grows_root = true;
            }
        }

        if grows_root {
            pages_needed += 1;
            let depth = path.len() + 1;
            if depth + 1 > self.max_depth {
                bail!(DbError::MaxDepthExceeded {
                    max_depth: self.max_depth,
                });
            }
        }

        if !self.pager.can_allocate(pages_needed) {
            bail!(DbError::PageOutOfBounds {
                page: self.pager.page_count() + pages_needed - 1,
                max_pages: self.pager.max_pages(),
            });
        }
        Ok(())
    }

    /// Splits a full leaf, distributing the `cap + 1` cells left-biased.
    /// Returns the promoted separator (max key of the left node) and the
    /// new sibling's page.
    fn split_leaf(
        &mut self,
        leaf_page: PageNo,
        slot: usize,
        key: K,
        value: V,
    ) -> Result<(K, PageNo)> {
        let arena = Bump::new();

        let (parent, mut merged) = {
            let leaf = self.pager.node(leaf_page)?.as_leaf()?;
            let mut merged: BumpVec<LeafCell<K, V>> =
                BumpVec::with_capacity_in(leaf.count() + 1, &arena);
            merged.extend(leaf.cells.iter().copied());
            (leaf.parent, merged)
        };
        merged.insert(slot, LeafCell { key, value });

        let total = merged.len();
        let right_count = total / 2;
        let left_count = total - right_count;
        let separator = merged[left_count - 1].key;

        let sibling = LeafNode {
            is_root: false,
            parent,
            cells: merged[left_count..].to_vec(),
        };
        let sibling_page = self.pager.allocate(Node::Leaf(sibling))?;

        {
            let leaf = self.pager.node_mut(leaf_page)?.as_leaf_mut()?;
            leaf.cells.clear();
            leaf.cells.extend_from_slice(&merged[..left_count]);
        }

        debug!(
            page = leaf_page,
            sibling = sibling_page,
            left = left_count,
            right = right_count,
            "split leaf"
        );
        Ok((separator, sibling_page))
    }

    /// Carries a separator and new sibling up the recorded descent path,
    /// splitting overflowing ancestors, until a parent absorbs it or a new
    /// root is made.
    fn propagate_split(
        &mut self,
        mut path: DescentPath,
        separator: K,
        left: PageNo,
        right: PageNo,
    ) -> Result<()> {
        let mut separator = separator;
        let mut left = left;
        let mut right = right;

        while let Some(parent_page) = path.pop() {
            // The stored back-pointer is validated against the descent
            // path, never trusted on its own.
            let stored = self.pager.node(left)?.parent();
            ensure!(
                stored == Some(parent_page),
                "stale parent link: page {} records {:?}, descent says {}",
                left,
                stored,
                parent_page
            );

            match self.insert_into_internal(parent_page, separator, left, right)? {
                InsertResult::Ok => return Ok(()),
                InsertResult::Split {
                    separator: promoted,
                    new_page,
                } => {
                    separator = promoted;
                    left = parent_page;
                    right = new_page;
                }
            }
        }

        ensure!(
            left == self.root_page,
            "split cascade escaped the root: page {} has no parent but root is {}",
            left,
            self.root_page
        );
        self.create_new_root(separator, right)
    }

    /// Inserts `(separator, right)` into an internal node just after the
    /// cell referencing `left`, splitting the node if it is full.
    fn insert_into_internal(
        &mut self,
        page: PageNo,
        separator: K,
        left: PageNo,
        right: PageNo,
    ) -> Result<InsertResult<K>> {
        let cap = self.pager.layout().internal_cap;
        let (slot, count) = {
            let node = self.pager.node(page)?.as_internal()?;
            ensure!(node.count() > 0, "internal page {} has no children", page);
            let slot = node.child_index_for(&separator);
            ensure!(
                node.cells[slot].child == left,
                "internal page {} does not reference split child {} at slot {}",
                page,
                left,
                slot
            );
            (slot, node.count())
        };

        if count < cap {
            let node = self.pager.node_mut(page)?.as_internal_mut()?;
            let old_key = node.cells[slot].key;
            node.cells[slot].key = separator;
            node.cells.insert(
                slot + 1,
                InternalCell {
                    key: old_key,
                    child: right,
                },
            );
            self.pager.node_mut(right)?.set_parent(Some(page));
            return Ok(InsertResult::Ok);
        }

        self.split_internal(page, slot, separator, right)
    }

    /// Splits a full internal node absorbing `(separator, right)`. The
    /// promoted separator is the left half's last cell key, which becomes
    /// the unused trailing key of the left node.
    fn split_internal(
        &mut self,
        page: PageNo,
        slot: usize,
        separator: K,
        right: PageNo,
    ) -> Result<InsertResult<K>> {
        let arena = Bump::new();

        let (parent, mut merged) = {
            let node = self.pager.node(page)?.as_internal()?;
            let mut merged: BumpVec<InternalCell<K>> =
                BumpVec::with_capacity_in(node.count() + 1, &arena);
            merged.extend(node.cells.iter().copied());
            (node.parent, merged)
        };
        let old_key = merged[slot].key;
        merged[slot].key = separator;
        merged.insert(
            slot + 1,
            InternalCell {
                key: old_key,
                child: right,
            },
        );

        let total = merged.len();
        let right_count = total / 2;
        let left_count = total - right_count;
        let promoted = merged[left_count - 1].key;

        let sibling = InternalNode {
            is_root: false,
            parent,
            cells: merged[left_count..].to_vec(),
        };
        let moved: Vec<PageNo> = sibling.cells.iter().map(|cell| cell.child).collect();
        let sibling_page = self.pager.allocate(Node::Internal(sibling))?;

        {
            let node = self.pager.node_mut(page)?.as_internal_mut()?;
            node.cells.clear();
            node.cells.extend_from_slice(&merged[..left_count]);
        }

        for child in moved {
            self.pager.node_mut(child)?.set_parent(Some(sibling_page));
        }

        debug!(
            page,
            sibling = sibling_page,
            left = left_count,
            right = right_count,
            "split internal node"
        );
        Ok(InsertResult::Split {
            separator: promoted,
            new_page: sibling_page,
        })
    }

    /// Replaces the root in place: the old root's node moves to a fresh
    /// page and page 0 becomes a new internal root over the two halves.
    fn create_new_root(&mut self, separator: K, right_page: PageNo) -> Result<()> {
        let relocated = self.pager.unused_page_no();
        let new_root = Node::Internal(InternalNode {
            is_root: true,
            parent: None,
            cells: vec![
                InternalCell {
                    key: separator,
                    child: relocated,
                },
                // Trailing cell key is unused; the separator's bytes keep
                // the page deterministic.
                InternalCell {
                    key: separator,
                    child: right_page,
                },
            ],
        });

        let mut old_root = self.pager.replace_node(self.root_page, new_root)?;
        old_root.set_is_root(false);
        old_root.set_parent(Some(self.root_page));
        let children: Vec<PageNo> = match &old_root {
            Node::Internal(node) => node.cells.iter().map(|cell| cell.child).collect(),
            Node::Leaf(_) => Vec::new(),
        };

        let actual = self.pager.allocate(old_root)?;
        ensure!(
            actual == relocated,
            "root relocation target moved: expected page {}, got {}",
            relocated,
            actual
        );

        for child in children {
            self.pager.node_mut(child)?.set_parent(Some(actual));
        }

        {
            let right = self.pager.node_mut(right_page)?;
            right.set_parent(Some(self.root_page));
            right.set_is_root(false);
        }

        debug!(
            root = self.root_page,
            relocated, right = right_page, "root split, tree depth grew"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::error::error_kind;
    use tempfile::NamedTempFile;

    // 128-byte pages hold two leaf cells of (u32, [u8; 48]) and fourteen
    // internal cells, forcing splits within a handful of inserts.
    type Value = [u8; 48];

    fn config(max_pages: u32, max_depth: usize) -> TableConfig {
        TableConfig {
            page_size: 128,
            max_pages,
            max_depth,
        }
    }

    fn fresh_pager(cfg: TableConfig) -> (NamedTempFile, Pager<u32, Value>) {
        let file = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(file.path(), cfg).unwrap();
        pager
            .allocate(Node::Leaf(LeafNode::new(true, None)))
            .unwrap();
        (file, pager)
    }

    fn value(tag: u8) -> Value {
        [tag; 48]
    }

    fn collect_keys(tree: &mut BTree<'_, u32, Value>) -> Vec<u32> {
        let mut keys = Vec::new();
        let mut page = tree.first_leaf().unwrap();
        loop {
            let leaf = tree.pager.node(page).unwrap().as_leaf().unwrap();
            // Sortedness within each populated leaf, every time.
            for pair in leaf.cells.windows(2) {
                assert!(pair[0].key < pair[1].key, "leaf keys out of order");
            }
            keys.extend(leaf.cells.iter().map(|cell| cell.key));
            let max = match leaf.max_key() {
                Some(max) => max,
                None => break,
            };
            match tree.leaf_after(&max).unwrap() {
                Some(next) => page = next,
                None => break,
            }
        }
        keys
    }

    #[test]
    fn insert_and_lookup_without_splits() {
        let (_file, mut pager) = fresh_pager(config(8, 8));
        let mut tree = BTree::new(&mut pager, 0, 8);

        tree.emplace(2, value(2)).unwrap();
        tree.emplace(1, value(1)).unwrap();

        assert_eq!(tree.at(&1).unwrap(), value(1));
        assert_eq!(tree.at(&2).unwrap(), value(2));
        assert_eq!(tree.depth().unwrap(), 1);
    }

    #[test]
    fn lookup_of_absent_key_fails() {
        let (_file, mut pager) = fresh_pager(config(8, 8));
        let mut tree = BTree::new(&mut pager, 0, 8);
        tree.emplace(1, value(1)).unwrap();

        let err = tree.at(&9).unwrap_err();
        assert!(matches!(error_kind(&err), Some(DbError::KeyNotFound)));
    }

    #[test]
    fn duplicate_key_is_rejected_and_tree_unchanged() {
        let (_file, mut pager) = fresh_pager(config(8, 8));
        let mut tree = BTree::new(&mut pager, 0, 8);
        tree.emplace(3, value(3)).unwrap();

        let err = tree.emplace(3, value(9)).unwrap_err();
        assert!(matches!(error_kind(&err), Some(DbError::DuplicateKey)));

        assert_eq!(tree.row_count().unwrap(), 1);
        assert_eq!(tree.at(&3).unwrap(), value(3));
    }

    #[test]
    fn duplicate_key_is_rejected_in_full_leaf() {
        let (_file, mut pager) = fresh_pager(config(8, 8));
        let mut tree = BTree::new(&mut pager, 0, 8);
        tree.emplace(1, value(1)).unwrap();
        tree.emplace(2, value(2)).unwrap();

        // Leaf is at capacity; the duplicate must still fail cleanly
        // without triggering a split.
        let err = tree.emplace(2, value(9)).unwrap_err();
        assert!(matches!(error_kind(&err), Some(DbError::DuplicateKey)));
        assert_eq!(tree.depth().unwrap(), 1);
        assert_eq!(tree.row_count().unwrap(), 2);
    }

    #[test]
    fn leaf_split_creates_internal_root() {
        let (_file, mut pager) = fresh_pager(config(8, 8));
        let mut tree = BTree::new(&mut pager, 0, 8);
        for key in [1u32, 3, 4] {
            tree.emplace(key, value(key as u8)).unwrap();
        }

        assert_eq!(tree.depth().unwrap(), 2);
        assert_eq!(tree.row_count().unwrap(), 3);

        let root = pager.node(0).unwrap().as_internal().unwrap();
        assert!(root.is_root);
        assert_eq!(root.count(), 2);

        // Split balance: |left - right| <= 1, total == cap + 1.
        let left_page = root.cells[0].child;
        let right_page = root.cells[1].child;
        let left_count = pager.node(left_page).unwrap().cell_count();
        let right_count = pager.node(right_page).unwrap().cell_count();
        assert_eq!(left_count + right_count, 3);
        assert!(left_count.abs_diff(right_count) <= 1);
        assert!(left_count >= right_count);

        // Children agree on their parent.
        assert_eq!(pager.node(left_page).unwrap().parent(), Some(0));
        assert_eq!(pager.node(right_page).unwrap().parent(), Some(0));
        assert!(!pager.node(left_page).unwrap().is_root());
    }

    #[test]
    fn smaller_key_lands_in_leftmost_child() {
        let (_file, mut pager) = fresh_pager(config(8, 8));
        let mut tree = BTree::new(&mut pager, 0, 8);
        tree.emplace(8, value(8)).unwrap();
        tree.emplace(10, value(10)).unwrap();
        tree.emplace(1, value(1)).unwrap();

        assert_eq!(tree.at(&1).unwrap(), value(1));
        assert_eq!(tree.at(&8).unwrap(), value(8));
        assert_eq!(tree.at(&10).unwrap(), value(10));
        assert_eq!(collect_keys(&mut tree), vec![1, 8, 10]);

        // The leftmost child holds the smallest key; the root separator
        // still routes 10 to the right child.
        let root = pager.node(0).unwrap().as_internal().unwrap();
        let left_page = root.cells[0].child;
        let left = pager.node(left_page).unwrap().as_leaf().unwrap();
        assert_eq!(left.cells[0].key, 1);
    }

    #[test]
    fn sequential_inserts_keep_global_order() {
        let (_file, mut pager) = fresh_pager(config(64, 8));
        let mut tree = BTree::new(&mut pager, 0, 8);
        for key in 0u32..40 {
            tree.emplace(key, value(key as u8)).unwrap();
        }
        assert_eq!(collect_keys(&mut tree), (0u32..40).collect::<Vec<_>>());
    }

    #[test]
    fn shuffled_inserts_keep_global_order_and_lookups() {
        let (_file, mut pager) = fresh_pager(config(64, 8));
        let mut tree = BTree::new(&mut pager, 0, 8);

        // Deterministic shuffle of 0..40.
        let mut keys: Vec<u32> = (0..40).collect();
        for i in (1..keys.len()).rev() {
            let j = (i * 7 + 3) % (i + 1);
            keys.swap(i, j);
        }

        for &key in &keys {
            tree.emplace(key, value(key as u8)).unwrap();
        }

        assert_eq!(collect_keys(&mut tree), (0u32..40).collect::<Vec<_>>());
        for key in 0u32..40 {
            assert_eq!(tree.at(&key).unwrap(), value(key as u8));
        }
        let err = tree.at(&40).unwrap_err();
        assert!(matches!(error_kind(&err), Some(DbError::KeyNotFound)));
    }

    #[test]
    fn deep_tree_reaches_three_levels() {
        // Narrow values: a 128-byte page holds 14 leaf cells of
        // (u32, [u8; 4]) and 14 internal cells. 256 sequential keys then
        // need two levels of internal splits.
        let file = NamedTempFile::new().unwrap();
        let mut pager: Pager<u32, [u8; 4]> = Pager::open(file.path(), config(512, 8)).unwrap();
        pager
            .allocate(Node::Leaf(LeafNode::new(true, None)))
            .unwrap();
        let mut tree = BTree::new(&mut pager, 0, 8);

        for key in 0u32..256 {
            tree.emplace(key, [key as u8; 4]).unwrap();
        }

        assert_eq!(tree.depth().unwrap(), 3);
        assert_eq!(tree.row_count().unwrap(), 256);
        assert_eq!(tree.at(&128).unwrap(), [128u8; 4]);

        let mut keys = Vec::new();
        let mut page = tree.first_leaf().unwrap();
        loop {
            let leaf = tree.pager.node(page).unwrap().as_leaf().unwrap();
            keys.extend(leaf.cells.iter().map(|cell| cell.key));
            let max = leaf.max_key().unwrap();
            match tree.leaf_after(&max).unwrap() {
                Some(next) => page = next,
                None => break,
            }
        }
        assert_eq!(keys, (0u32..256).collect::<Vec<_>>());
    }

    #[test]
    fn parent_links_agree_with_structure_after_splits() {
        let (_file, mut pager) = fresh_pager(config(512, 8));
        let mut tree = BTree::new(&mut pager, 0, 8);
        for key in 0u32..256 {
            tree.emplace(key, value(key as u8)).unwrap();
        }

        // Every child listed by an internal node records that node as its
        // parent.
        let mut stack = vec![0 as PageNo];
        while let Some(page) = stack.pop() {
            let children: Vec<PageNo> = match pager.node(page).unwrap() {
                Node::Internal(node) => node.cells.iter().map(|cell| cell.child).collect(),
                Node::Leaf(_) => continue,
            };
            for child in children {
                assert_eq!(pager.node(child).unwrap().parent(), Some(page));
                stack.push(child);
            }
        }
    }

    #[test]
    fn max_depth_is_enforced_before_mutation() {
        let (_file, mut pager) = fresh_pager(config(8, 1));
        let mut tree = BTree::new(&mut pager, 0, 1);
        tree.emplace(1, value(1)).unwrap();
        tree.emplace(2, value(2)).unwrap();

        let err = tree.emplace(3, value(3)).unwrap_err();
        assert!(matches!(
            error_kind(&err),
            Some(DbError::MaxDepthExceeded { max_depth: 1 })
        ));

        // The failed split left the root leaf untouched.
        let root = pager.node(0).unwrap().as_leaf().unwrap();
        assert!(root.is_root);
        assert_eq!(root.count(), 2);
        assert_eq!(root.cells[0].key, 1);
        assert_eq!(root.cells[1].key, 2);
    }

    #[test]
    fn page_exhaustion_is_detected_before_mutation() {
        let (_file, mut pager) = fresh_pager(config(1, 8));
        let mut tree = BTree::new(&mut pager, 0, 8);
        tree.emplace(1, value(1)).unwrap();
        tree.emplace(2, value(2)).unwrap();

        // A root-leaf split needs two fresh pages; only page 0 exists.
        let err = tree.emplace(3, value(3)).unwrap_err();
        assert!(matches!(
            error_kind(&err),
            Some(DbError::PageOutOfBounds { .. })
        ));

        let root = pager.node(0).unwrap().as_leaf().unwrap();
        assert_eq!(root.count(), 2);
    }

    #[test]
    fn dump_shows_levels() {
        let (_file, mut pager) = fresh_pager(config(8, 8));
        let mut tree = BTree::new(&mut pager, 0, 8);
        for key in [1u32, 3, 4] {
            tree.emplace(key, value(key as u8)).unwrap();
        }

        let dump = tree.dump().unwrap();
        assert!(dump.starts_with("- internal (2 children)"));
        assert!(dump.contains("- leaf (size 2)"));
        assert!(dump.contains("- leaf (size 1)"));
        assert!(dump.contains("- key"));
    }
}
