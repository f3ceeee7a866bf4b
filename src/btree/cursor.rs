//! # Cursor
//!
//! A movable position over one leaf's cells: `(page, slot, end_of_table)`.
//! Cursors are created by the engine's seek operations, read cells in slot
//! order, and perform positioned inserts that delegate back to the
//! engine's leaf-insert/split logic.
//!
//! `advance` stops at the end of the current leaf — leaves carry no
//! sibling links in this design. Whole-table scans re-descend the tree for
//! the next leaf; see `Table::scan`.

use eyre::{ensure, Result};

use crate::storage::{PageNo, Pager};

use super::node::{Datum, Key};
use super::tree::BTree;

pub struct Cursor<'p, K: Key, V: Datum> {
    pub(super) pager: &'p mut Pager<K, V>,
    pub(super) root_page: PageNo,
    pub(super) max_depth: usize,
    pub(super) page: PageNo,
    pub(super) slot: usize,
    pub(super) end_of_table: bool,
}

impl<'p, K: Key, V: Datum> Cursor<'p, K, V> {
    /// False once the cursor has moved past the last cell of its leaf.
    pub fn valid(&self) -> bool {
        !self.end_of_table
    }

    /// Page of the leaf the cursor is positioned in.
    pub fn page(&self) -> PageNo {
        self.page
    }

    /// Slot index within the leaf.
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn key(&mut self) -> Result<K> {
        ensure!(!self.end_of_table, "cursor is at end of table");
        let leaf = self.pager.node(self.page)?.as_leaf()?;
        ensure!(
            self.slot < leaf.count(),
            "cursor slot {} out of bounds (count={})",
            self.slot,
            leaf.count()
        );
        Ok(leaf.cells[self.slot].key)
    }

    pub fn value(&mut self) -> Result<V> {
        ensure!(!self.end_of_table, "cursor is at end of table");
        let leaf = self.pager.node(self.page)?.as_leaf()?;
        ensure!(
            self.slot < leaf.count(),
            "cursor slot {} out of bounds (count={})",
            self.slot,
            leaf.count()
        );
        Ok(leaf.cells[self.slot].value)
    }

    /// Moves to the next slot. Returns false and sets `end_of_table` when
    /// the current leaf is exhausted.
    pub fn advance(&mut self) -> Result<bool> {
        if self.end_of_table {
            return Ok(false);
        }
        self.slot += 1;
        let count = self.pager.node(self.page)?.as_leaf()?.count();
        if self.slot >= count {
            self.end_of_table = true;
            return Ok(false);
        }
        Ok(true)
    }

    /// Positioned insert at the cursor's leaf and slot, delegating to the
    /// engine's leaf-insert/split logic. The cursor is not repositioned
    /// afterwards; splits may relocate cells.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        BTree::new(self.pager, self.root_page, self.max_depth)
            .insert_at(self.page, self.slot, key, value)
    }
}
