mod common;

use page_store::common::{set_page_size, TransactionID};
use page_store::storage::Cell;

use common::{int_tuple, new_empty_heap_file, setup};

#[test]
fn insert_and_scan_single_page() {
    setup();
    let file = new_empty_heap_file("heap_single", 2);
    let tid = TransactionID::new();

    for v in 0..5 {
        file.insert_tuple(tid, int_tuple(2, v)).unwrap();
    }

    let mut it = file.iterator(tid);
    it.open();
    let seen: Vec<Cell> = it.map(|t| t.get_cell(0).clone()).collect();
    assert_eq!(seen.len(), 5);
}

#[test]
fn iterator_yields_nothing_before_open() {
    setup();
    let file = new_empty_heap_file("heap_unopened", 2);
    let tid = TransactionID::new();
    file.insert_tuple(tid, int_tuple(2, 1)).unwrap();

    let mut it = file.iterator(tid);
    assert!(it.next().is_none());
}

#[test]
fn iterator_yields_nothing_on_empty_file() {
    setup();
    let file = new_empty_heap_file("heap_empty", 2);
    let tid = TransactionID::new();

    let mut it = file.iterator(tid);
    it.open();
    assert!(it.next().is_none());
}

#[test]
fn insert_spills_across_multiple_pages() {
    setup();
    set_page_size(160);
    let file = new_empty_heap_file("heap_multi", 2);
    let tid = TransactionID::new();

    // small page size keeps slots-per-page tiny, so this forces the
    // allocator to append fresh pages more than once.
    for v in 0..200 {
        file.insert_tuple(tid, int_tuple(2, v)).unwrap();
    }

    assert!(file.num_pages() > 1);

    let mut it = file.iterator(tid);
    it.open();
    assert_eq!(it.count(), 200);
}

#[test]
fn delete_then_rescan_reflects_removal() {
    setup();
    let file = new_empty_heap_file("heap_delete", 3);
    let tid = TransactionID::new();

    for v in 0..10 {
        file.insert_tuple(tid, int_tuple(3, v)).unwrap();
    }

    let mut it = file.iterator(tid);
    it.open();
    let all: Vec<_> = it.by_ref().collect();
    assert_eq!(all.len(), 10);

    let victim = all[3].clone();
    file.delete_tuple(tid, &victim).unwrap();

    let mut it = file.iterator(tid);
    it.open();
    assert_eq!(it.count(), 9);
}

#[test]
fn rewind_restarts_the_scan() {
    setup();
    let file = new_empty_heap_file("heap_rewind", 2);
    let tid = TransactionID::new();
    for v in 0..6 {
        file.insert_tuple(tid, int_tuple(2, v)).unwrap();
    }

    let mut it = file.iterator(tid);
    it.open();
    assert_eq!(it.by_ref().count(), 6);
    assert!(it.next().is_none());

    it.rewind();
    assert_eq!(it.count(), 6);
}
