use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

use page_store::btree::BTreeTable;
use page_store::storage::heap_file::HeapFile;
use page_store::storage::{int_schema, Cell, Tuple};
use page_store::{set_page_size, TransactionID, BUFFER_POOL};
use page_store::common::DEFAULT_PAGE_SIZE;

static INIT: Once = Once::new();
static NEXT_FILE: AtomicUsize = AtomicUsize::new(0);

/// Clears the buffer pool and restores the default page size. Mirrors
/// the host repo's per-test `setup()`: the page size is a process-wide
/// static, so shrinking it for a split/merge test and never restoring
/// it would bleed into whatever test runs next.
pub fn setup() {
    INIT.call_once(page_store::log::init_log);
    BUFFER_POOL.clear();
    set_page_size(DEFAULT_PAGE_SIZE);
}

/// A fresh, never-before-used file path under the OS temp dir. Table
/// ids are a hash of the absolute path, and the buffer pool is one
/// process-wide cache, so distinct tests must never share a path.
pub fn temp_path(prefix: &str) -> PathBuf {
    let n = NEXT_FILE.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("page_store_test_{}_{}_{}.db", prefix, std::process::id(), n))
}

pub fn new_empty_btree_table(prefix: &str, columns: usize, key_field: usize) -> BTreeTable {
    let schema = int_schema(columns, "c");
    BTreeTable::new(&temp_path(prefix), key_field, schema)
}

pub fn new_empty_heap_file(prefix: &str, columns: usize) -> HeapFile {
    let schema = int_schema(columns, "c");
    HeapFile::new(&temp_path(prefix), schema)
}

pub fn int_tuple(columns: usize, value: i32) -> Tuple {
    Tuple::new((0..columns).map(|_| Cell::Int(value)).collect())
}

/// Deletes the `count` smallest surviving tuples via a single forward
/// scan, mirroring the host repo's bulk-delete fixture: one iterator
/// walked front-to-back, feeding straight into `delete_tuple`.
pub fn delete_front(table: &BTreeTable, tid: TransactionID, count: usize) {
    let mut it = page_store::btree::BTreeTableIterator::new(table, tid);
    for _ in 0..count {
        let tuple = it.next().expect("fewer live tuples than requested to delete");
        page_store::btree::delete_tuple(table, tid, &tuple).unwrap();
    }
}

/// Inserts `0..count` (in that order), every column holding the same
/// value `v`, and returns the inserted tuples in ascending key order —
/// the order a forward scan should reproduce. `key_field` only matters
/// to the caller's choice of table; every column here already sorts
/// identically to it.
pub fn insert_sequential(table: &BTreeTable, tid: TransactionID, columns: usize, _key_field: usize, count: i32) -> Vec<Tuple> {
    let mut inserted = Vec::new();
    for v in 0..count {
        let tuple = int_tuple(columns, v);
        page_store::btree::insert_tuple(table, tid, tuple.clone()).unwrap();
        inserted.push(tuple);
    }
    inserted
}
