mod common;

use page_store::btree::{delete_tuple, BTreeTableIterator};
use page_store::common::{set_page_size, TransactionID};
use page_store::storage::Cell;

use common::{delete_front, insert_sequential, new_empty_btree_table, setup};

fn scan_keys(table: &page_store::btree::BTreeTable, tid: TransactionID) -> Vec<i32> {
    BTreeTableIterator::new(table, tid)
        .map(|t| match t.get_cell(0) {
            Cell::Int(v) => *v,
            _ => unreachable!(),
        })
        .collect()
}

#[test]
fn delete_from_a_single_leaf() {
    setup();
    let table = new_empty_btree_table("del_single_leaf", 2, 0);
    let tid = TransactionID::new();
    let inserted = insert_sequential(&table, tid, 2, 0, 5);

    // a single small leaf never splits, so the tuple handed back by
    // insert_tuple still carries a valid record id.
    delete_tuple(&table, tid, &inserted[2]).unwrap();

    assert_eq!(scan_keys(&table, tid), vec![0, 1, 3, 4]);
}

#[test]
fn delete_triggering_underflow_rebalances_the_remaining_rows() {
    setup();
    set_page_size(100);
    let table = new_empty_btree_table("del_steal", 2, 0);
    let tid = TransactionID::new();
    insert_sequential(&table, tid, 2, 0, 40);

    // deleting the smallest keys drains the left-most leaf below its
    // minimum occupancy, forcing it to either steal from or merge
    // with its right neighbor.
    delete_front(&table, tid, 6);

    let expected: Vec<i32> = (6..40).collect();
    assert_eq!(scan_keys(&table, tid), expected);
}

#[test]
fn delete_triggering_merge_and_root_collapse() {
    setup();
    set_page_size(100);
    let table = new_empty_btree_table("del_merge_collapse", 2, 0);
    let tid = TransactionID::new();
    // 16 ascending rows at this page size build an internal root over
    // three leaves; draining all but the last four forces enough
    // merges that the internal root collapses back to a single leaf.
    insert_sequential(&table, tid, 2, 0, 16);

    delete_front(&table, tid, 12);

    assert_eq!(scan_keys(&table, tid), vec![12, 13, 14, 15]);

    let root = table.get_root_ptr_page();
    let root_id = root.read().unwrap().as_root_ptr().get_root_id().unwrap();
    assert_eq!(
        root_id.category,
        page_store::storage::PageCategory::BTreeLeaf,
        "merging the tree's only remaining leaves should collapse the internal root"
    );
}

#[test]
fn delete_all_rows_leaves_an_empty_scan() {
    setup();
    set_page_size(100);
    let table = new_empty_btree_table("del_all", 2, 0);
    let tid = TransactionID::new();
    let inserted = insert_sequential(&table, tid, 2, 0, 50);

    delete_front(&table, tid, inserted.len());

    assert!(scan_keys(&table, tid).is_empty());
}

#[test]
fn heavy_insert_then_bulk_delete_stays_sorted() {
    setup();
    set_page_size(100);
    let table = new_empty_btree_table("del_heavy_bulk", 2, 0);
    let tid = TransactionID::new();
    insert_sequential(&table, tid, 2, 0, 300);

    delete_front(&table, tid, 290);

    let expected: Vec<i32> = (290..300).collect();
    assert_eq!(scan_keys(&table, tid), expected);
}
