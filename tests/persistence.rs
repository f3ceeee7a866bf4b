//! # Persistence Tests
//!
//! Close/reopen durability across split-heavy workloads: the file stays
//! page-aligned, every row comes back in order, and a reopened tree keeps
//! serving lookups and inserts.

use keeldb::{Table, TableConfig};
use tempfile::TempDir;

type SmallTable = Table<u32, [u8; 48]>;

fn config() -> TableConfig {
    TableConfig {
        page_size: 128,
        max_pages: 256,
        max_depth: 8,
    }
}

#[test]
fn multi_level_tree_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("multi.db");

    {
        let mut table = SmallTable::open(&path, config()).unwrap();
        for key in 0u32..100 {
            table.insert(key, [key as u8; 48]).unwrap();
        }
        assert!(table.depth().unwrap() >= 3);
        table.close().unwrap();
    }

    let mut table = SmallTable::open(&path, config()).unwrap();
    assert_eq!(table.len(), 100);
    for key in 0u32..100 {
        assert_eq!(table.get(&key).unwrap(), [key as u8; 48]);
    }

    let keys: Vec<u32> = table
        .scan()
        .unwrap()
        .map(|row| row.map(|(k, _)| k))
        .collect::<eyre::Result<Vec<_>>>()
        .unwrap();
    assert_eq!(keys, (0u32..100).collect::<Vec<_>>());
}

#[test]
fn flushed_file_length_is_page_aligned() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("aligned.db");
    let cfg = config();

    {
        let mut table = SmallTable::open(&path, cfg).unwrap();
        for key in 0u32..25 {
            table.insert(key, [key as u8; 48]).unwrap();
        }
        table.close().unwrap();
    }

    let length = std::fs::metadata(&path).unwrap().len();
    assert!(length > 0);
    assert_eq!(length % cfg.page_size as u64, 0);
}

#[test]
fn reopened_tree_accepts_further_inserts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("grow.db");

    {
        let mut table = SmallTable::open(&path, config()).unwrap();
        for key in (0u32..40).step_by(2) {
            table.insert(key, [key as u8; 48]).unwrap();
        }
        table.close().unwrap();
    }

    {
        // Fill in the odd keys after reopening.
        let mut table = SmallTable::open(&path, config()).unwrap();
        for key in (1u32..40).step_by(2) {
            table.insert(key, [key as u8; 48]).unwrap();
        }
        table.close().unwrap();
    }

    let mut table = SmallTable::open(&path, config()).unwrap();
    assert_eq!(table.len(), 40);
    let keys: Vec<u32> = table
        .scan()
        .unwrap()
        .map(|row| row.map(|(k, _)| k))
        .collect::<eyre::Result<Vec<_>>>()
        .unwrap();
    assert_eq!(keys, (0u32..40).collect::<Vec<_>>());
}

#[test]
fn repeated_reopen_cycles_are_stable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cycles.db");

    for round in 0u32..5 {
        let mut table = SmallTable::open(&path, config()).unwrap();
        assert_eq!(table.len(), (round * 10) as u64);
        for key in round * 10..(round + 1) * 10 {
            table.insert(key, [key as u8; 48]).unwrap();
        }
        table.close().unwrap();
    }

    let mut table = SmallTable::open(&path, config()).unwrap();
    assert_eq!(table.len(), 50);
    for key in 0u32..50 {
        assert_eq!(table.get(&key).unwrap(), [key as u8; 48]);
    }
}
