//! # Table
//!
//! The externally visible handle over one database file: a [`Pager`] plus
//! the root node reference. Opening a zero-length file installs an empty
//! root leaf at page 0; reopening an existing file picks the tree up from
//! its pages alone — there is no metadata page to maintain.
//!
//! ## Scans
//!
//! [`Table::scan`] yields rows in ascending key order. Leaves carry no
//! sibling links, so the iterator drains one leaf and then re-descends the
//! tree for the leaf holding the successor of the last key returned.
//!
//! ## Shutdown
//!
//! [`Table::close`] flushes every resident page and surfaces errors.
//! Dropping a table without closing performs a best-effort flush and logs
//! a warning on failure.

use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use tracing::warn;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::btree::{BTree, Datum, Key, LeafNode, Node};
use crate::config::TableConfig;
use crate::storage::{PageNo, Pager};

/// The root node's page; fixed for the lifetime of a database file.
pub const ROOT_PAGE: PageNo = 0;

/// The CLI's row payload: everything but the id key. Packed after the
/// 4-byte id this is the classic 12-byte row.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct UserRow {
    pub age: u32,
    pub field: u32,
}

/// The table type served by the CLI front end.
pub type UserTable = Table<u32, UserRow>;

#[derive(Debug)]
pub struct Table<K: Key, V: Datum> {
    pager: Pager<K, V>,
    root_page: PageNo,
    max_depth: usize,
    row_count: u64,
    closed: bool,
}

impl<K: Key, V: Datum> Table<K, V> {
    /// Opens (creating if absent) the database file at `path`. A fresh
    /// file gets an empty root leaf; an existing file is validated and its
    /// row count established by an initial scan.
    pub fn open(path: &Path, config: TableConfig) -> Result<Self> {
        let mut pager = Pager::open(path, config)?;

        if pager.page_count() == 0 {
            let root = pager.allocate(Node::Leaf(LeafNode::new(true, None)))?;
            ensure!(
                root == ROOT_PAGE,
                "fresh file allocated root at page {}, expected {}",
                root,
                ROOT_PAGE
            );
        }

        let mut table = Self {
            pager,
            root_page: ROOT_PAGE,
            max_depth: config.max_depth,
            row_count: 0,
            closed: false,
        };
        table.row_count = table
            .tree()
            .row_count()
            .wrap_err("failed to count rows in existing database")?;
        Ok(table)
    }

    /// `open` with the default configuration.
    pub fn open_default(path: &Path) -> Result<Self> {
        Self::open(path, TableConfig::default())
    }

    fn tree(&mut self) -> BTree<'_, K, V> {
        BTree::new(&mut self.pager, self.root_page, self.max_depth)
    }

    /// Inserts a row. Fails with `DuplicateKey` if `key` already exists;
    /// the table is unchanged by the failed attempt.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        self.tree()
            .emplace(key, value)
            .wrap_err_with(|| format!("failed to insert key {:?}", key))?;
        self.row_count += 1;
        Ok(())
    }

    /// Point lookup. Fails with `KeyNotFound` for absent keys.
    pub fn get(&mut self, key: &K) -> Result<V> {
        self.tree()
            .at(key)
            .wrap_err_with(|| format!("failed to look up key {:?}", key))
    }

    /// Iterator over all rows in ascending key order.
    pub fn scan(&mut self) -> Result<Scan<'_, K, V>> {
        let page = self.tree().first_leaf()?;
        Ok(Scan {
            table: self,
            page,
            slot: 0,
            last_key: None,
            done: false,
        })
    }

    /// Number of rows currently stored.
    pub fn len(&self) -> u64 {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Tree depth, counting the leaf level.
    pub fn depth(&mut self) -> Result<usize> {
        self.tree().depth()
    }

    /// Indented structural dump of the tree (the `.btree` command).
    pub fn dump(&mut self) -> Result<String> {
        self.tree().dump()
    }

    pub fn debug_print(&mut self) -> Result<()> {
        print!("{}", self.dump()?);
        Ok(())
    }

    /// Flushes every resident page without closing the table.
    pub fn flush(&mut self) -> Result<()> {
        self.pager.flush_all()
    }

    /// Flushes and consumes the table, surfacing any I/O error. Dropping
    /// without closing still flushes, but can only log failures.
    pub fn close(mut self) -> Result<()> {
        self.pager.flush_all()?;
        self.closed = true;
        Ok(())
    }
}

impl<K: Key, V: Datum> Drop for Table<K, V> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.pager.flush_all() {
            warn!("flush on drop failed: {err:#}");
        }
    }
}

/// Forward scan over all rows in key order. Each exhausted leaf is
/// followed by a fresh descent for the successor of the last key.
pub struct Scan<'t, K: Key, V: Datum> {
    table: &'t mut Table<K, V>,
    page: PageNo,
    slot: usize,
    last_key: Option<K>,
    done: bool,
}

impl<K: Key, V: Datum> Iterator for Scan<'_, K, V> {
    type Item = Result<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let cell = {
                let leaf = match self.table.pager.node(self.page).and_then(|n| n.as_leaf()) {
                    Ok(leaf) => leaf,
                    Err(err) => {
                        self.done = true;
                        return Some(Err(err));
                    }
                };
                leaf.cells.get(self.slot).copied()
            };

            if let Some(cell) = cell {
                self.slot += 1;
                self.last_key = Some(cell.key);
                return Some(Ok((cell.key, cell.value)));
            }

            // Leaf drained; hop to the leaf holding the successor.
            let last = match self.last_key {
                Some(last) => last,
                None => {
                    self.done = true;
                    return None;
                }
            };
            match self.table.tree().leaf_after(&last) {
                Ok(Some(next)) => {
                    self.page = next;
                    self.slot = 0;
                }
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
