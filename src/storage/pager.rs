//! # Pager
//!
//! The pager translates logical page numbers into in-memory nodes backed
//! by a single random-access file. It is the sole owner of node memory:
//! every other component addresses nodes by page number and borrows them
//! through the pager.
//!
//! ## Caching
//!
//! Nodes live in a page-number-indexed arena. A first access to a page
//! that exists in the file reads `page_size` bytes at
//! `page * page_size`, deserializes, and caches the node; later accesses
//! hit the cache. A short or zero read at end-of-file zero-fills the tail
//! and is not an error.
//!
//! ## Allocation
//!
//! New page numbers are handed out monotonically past the end of the
//! file; there is no free list and pages are never recycled. Allocation
//! past the configured `max_pages` fails with `PageOutOfBounds`.
//!
//! ## Flush
//!
//! `flush_all` serializes every resident node back to its page offset.
//! Writes are page-granular and independent, so a failed flush leaves
//! already-written pages intact.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use eyre::{bail, eyre, Result, WrapErr};
use tracing::{debug, trace};

use crate::btree::{Datum, Key, Node, NodeLayout};
use crate::config::TableConfig;
use crate::error::DbError;

use super::{Page, PageNo};

#[derive(Debug)]
pub struct Pager<K: Key, V: Datum> {
    file: File,
    path: PathBuf,
    layout: NodeLayout,
    max_pages: u32,
    /// Pages present in the file when it was opened.
    file_pages: u32,
    /// Total pages known: file pages plus this session's allocations.
    num_pages: u32,
    nodes: Vec<Option<Node<K, V>>>,
}

impl<K: Key, V: Datum> Pager<K, V> {
    /// Opens (creating if absent) the backing file and validates that its
    /// length is an exact multiple of the page size.
    pub fn open(path: &Path, config: TableConfig) -> Result<Self> {
        config.validate()?;
        let layout = NodeLayout::new::<K, V>(config.page_size)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(DbError::Io)
            .wrap_err_with(|| format!("unable to open database file {}", path.display()))?;

        let length = file
            .metadata()
            .map_err(DbError::Io)
            .wrap_err("failed to stat database file")?
            .len();

        if length % config.page_size as u64 != 0 {
            bail!(DbError::CorruptFile {
                length,
                page_size: config.page_size,
            });
        }

        let file_pages = (length / config.page_size as u64) as u32;
        if file_pages > config.max_pages {
            bail!(DbError::PageOutOfBounds {
                page: file_pages - 1,
                max_pages: config.max_pages,
            });
        }

        let mut nodes = Vec::new();
        nodes.resize_with(file_pages as usize, || None);

        trace!(path = %path.display(), pages = file_pages, "opened database file");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            layout,
            max_pages: config.max_pages,
            file_pages,
            num_pages: file_pages,
            nodes,
        })
    }

    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    pub fn page_count(&self) -> u32 {
        self.num_pages
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Next never-used page number.
    pub fn unused_page_no(&self) -> PageNo {
        self.num_pages
    }

    /// Whether `extra` more pages can be allocated without exceeding the
    /// configured bound. Splits check this before mutating any cell.
    pub fn can_allocate(&self, extra: u32) -> bool {
        self.num_pages.saturating_add(extra) <= self.max_pages
    }

    /// Returns the cached node for `page`, loading it from the file on a
    /// cache miss.
    pub fn node(&mut self, page: PageNo) -> Result<&Node<K, V>> {
        self.ensure_loaded(page)?;
        self.nodes[page as usize]
            .as_ref()
            .ok_or_else(|| eyre!("page {} vanished from cache", page))
    }

    pub fn node_mut(&mut self, page: PageNo) -> Result<&mut Node<K, V>> {
        self.ensure_loaded(page)?;
        self.nodes[page as usize]
            .as_mut()
            .ok_or_else(|| eyre!("page {} vanished from cache", page))
    }

    /// Places `node` on the next never-used page and returns its number.
    pub fn allocate(&mut self, node: Node<K, V>) -> Result<PageNo> {
        let page = self.num_pages;
        if page >= self.max_pages {
            bail!(DbError::PageOutOfBounds {
                page,
                max_pages: self.max_pages,
            });
        }
        if self.nodes.len() <= page as usize {
            self.nodes.resize_with(page as usize + 1, || None);
        }
        self.nodes[page as usize] = Some(node);
        self.num_pages = page + 1;
        trace!(page, "allocated page");
        Ok(page)
    }

    /// Swaps the node stored at `page` for `node`, returning the old one.
    /// Used when the root splits and its old contents move to a new page.
    pub fn replace_node(&mut self, page: PageNo, node: Node<K, V>) -> Result<Node<K, V>> {
        self.ensure_loaded(page)?;
        self.nodes[page as usize]
            .replace(node)
            .ok_or_else(|| eyre!("page {} vanished from cache", page))
    }

    /// Writes every resident node back to the file at its page offset and
    /// syncs the file. Called once at orderly shutdown.
    pub fn flush_all(&mut self) -> Result<()> {
        let mut buf = Page::zeroed(self.layout.page_size);
        let mut written = 0u32;

        for page in 0..self.num_pages {
            let node = match &self.nodes[page as usize] {
                Some(node) => node,
                None => continue,
            };
            node.write_page(&self.layout, &mut buf)
                .wrap_err_with(|| format!("while serializing page {}", page))?;

            let offset = page as u64 * self.layout.page_size as u64;
            self.file
                .seek(SeekFrom::Start(offset))
                .map_err(DbError::Io)
                .wrap_err_with(|| format!("seek failed flushing page {}", page))?;
            self.file
                .write_all(buf.bytes())
                .map_err(DbError::Io)
                .wrap_err_with(|| format!("write failed flushing page {}", page))?;
            written += 1;
        }

        self.file
            .sync_all()
            .map_err(DbError::Io)
            .wrap_err("failed to sync database file")?;

        debug!(path = %self.path.display(), pages = written, "flushed database file");
        Ok(())
    }

    fn ensure_loaded(&mut self, page: PageNo) -> Result<()> {
        if page >= self.max_pages {
            bail!(DbError::PageOutOfBounds {
                page,
                max_pages: self.max_pages,
            });
        }
        let idx = page as usize;
        if idx < self.nodes.len() && self.nodes[idx].is_some() {
            return Ok(());
        }
        if page >= self.file_pages {
            // Allocated pages are cached immediately, so an uncached page
            // past the file end is a dangling reference.
            bail!("page {} referenced before allocation", page);
        }

        trace!(page, "page cache miss, loading from file");
        let mut buf = Page::zeroed(self.layout.page_size);
        self.read_page_bytes(page, &mut buf)?;
        let node = Node::read_page(&self.layout, &buf)
            .wrap_err_with(|| format!("while loading page {}", page))?;
        self.nodes[idx] = Some(node);
        Ok(())
    }

    /// Reads one page worth of bytes at the page's offset. A short read at
    /// end-of-file leaves the tail zeroed and is not an error.
    fn read_page_bytes(&mut self, page: PageNo, buf: &mut Page) -> Result<()> {
        let offset = page as u64 * self.layout.page_size as u64;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(DbError::Io)
            .wrap_err_with(|| format!("seek failed reading page {}", page))?;

        let bytes = buf.bytes_mut();
        let mut filled = 0;
        while filled < bytes.len() {
            match self.file.read(&mut bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(DbError::Io(e))
                        .wrap_err_with(|| format!("read failed on page {}", page));
                }
            }
        }
        Ok(())
    }
}
