mod common;

use page_store::btree::{delete_tuple, insert_tuple, BTreeTableIterator, Op, Predicate};
use page_store::common::{set_page_size, TransactionID};
use page_store::storage::{Cell, PageCategory};

use common::{insert_sequential, new_empty_btree_table, setup};

#[test]
fn scan_of_a_single_leaf_is_sorted() {
    setup();
    let table = new_empty_btree_table("ins_single_leaf", 2, 0);
    let tid = TransactionID::new();
    insert_sequential(&table, tid, 2, 0, 5);

    let seen: Vec<i32> = BTreeTableIterator::new(&table, tid)
        .map(|t| match t.get_cell(0) {
            Cell::Int(v) => *v,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
}

#[test]
fn ascending_insert_triggers_leaf_split() {
    setup();
    set_page_size(100);
    let table = new_empty_btree_table("ins_leaf_split", 2, 0);
    let tid = TransactionID::new();
    let inserted = insert_sequential(&table, tid, 2, 0, 40);

    let root = table.get_root_ptr_page();
    let root_id = root.read().unwrap().as_root_ptr().get_root_id().unwrap();
    assert_eq!(root_id.category, PageCategory::BTreeInternal, "40 rows at page_size=100 must have split the root leaf at least once");

    let seen: Vec<i32> = BTreeTableIterator::new(&table, tid)
        .map(|t| match t.get_cell(0) {
            Cell::Int(v) => *v,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(seen.len(), inserted.len());
    let mut sorted = seen.clone();
    sorted.sort_unstable();
    assert_eq!(seen, sorted, "a forward scan over a B+-tree must come back in key order");
}

#[test]
fn heavy_ascending_insert_triggers_internal_split() {
    setup();
    set_page_size(100);
    let table = new_empty_btree_table("ins_internal_split", 2, 0);
    let tid = TransactionID::new();
    insert_sequential(&table, tid, 2, 0, 400);

    let seen: Vec<i32> = BTreeTableIterator::new(&table, tid)
        .map(|t| match t.get_cell(0) {
            Cell::Int(v) => *v,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(seen.len(), 400);
    for (i, v) in seen.iter().enumerate() {
        assert_eq!(*v, i as i32);
    }
}

#[test]
fn descending_insert_also_stays_sorted() {
    setup();
    set_page_size(100);
    let table = new_empty_btree_table("ins_descending", 2, 0);
    let tid = TransactionID::new();

    for v in (0..60).rev() {
        let tuple = common::int_tuple(2, v);
        insert_tuple(&table, tid, tuple).unwrap();
    }

    let seen: Vec<i32> = BTreeTableIterator::new(&table, tid)
        .map(|t| match t.get_cell(0) {
            Cell::Int(v) => *v,
            _ => unreachable!(),
        })
        .collect();
    let mut expected: Vec<i32> = (0..60).collect();
    expected.sort_unstable();
    assert_eq!(seen, expected);
}

#[test]
fn mixed_order_insert_splits_an_interior_leaf_correctly() {
    setup();
    set_page_size(100);
    let table = new_empty_btree_table("ins_interior_split", 2, 0);
    let tid = TransactionID::new();

    // Spread 40 keys out so the root internal page ends up with
    // several leaf children, then confirm it actually did split.
    let mut expected: Vec<i32> = (0..40).map(|i| i * 10).collect();
    for v in &expected {
        insert_tuple(&table, tid, common::int_tuple(2, *v)).unwrap();
    }

    let root = table.get_root_ptr_page();
    let root_id = root.read().unwrap().as_root_ptr().get_root_id().unwrap();
    assert_eq!(root_id.category, PageCategory::BTreeInternal, "40 keys at page_size=100 must have split the root leaf");

    // Densely insert new keys clustered around the middle of the
    // range, out of order, so the leaf that overflows and splits is
    // neither the tree's leftmost nor rightmost leaf.
    let extra = [195, 203, 197, 201, 199, 196, 202, 198, 204, 194];
    for v in &extra {
        insert_tuple(&table, tid, common::int_tuple(2, *v)).unwrap();
    }
    expected.extend_from_slice(&extra);
    expected.sort_unstable();

    let seen: Vec<i32> = BTreeTableIterator::new(&table, tid)
        .map(|t| match t.get_cell(0) {
            Cell::Int(v) => *v,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(seen, expected, "an interior leaf split must not corrupt the tree's global key order");

    // A key routed into the new right half of that split must still be
    // reachable by a point lookup...
    let predicate = Predicate::new(0, Op::Equals, Cell::Int(202));
    let matches: Vec<_> = page_store::btree::BTreeTableSearchIterator::new(&table, tid, predicate).collect();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].get_cell(0), &Cell::Int(202));

    // ...and deletable without disturbing its neighbors.
    delete_tuple(&table, tid, &matches[0]).unwrap();
    expected.retain(|v| *v != 202);
    let seen_after: Vec<i32> = BTreeTableIterator::new(&table, tid)
        .map(|t| match t.get_cell(0) {
            Cell::Int(v) => *v,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(seen_after, expected);
}

#[test]
fn equals_predicate_finds_exactly_one_match() {
    setup();
    set_page_size(100);
    let table = new_empty_btree_table("ins_search_eq", 2, 0);
    let tid = TransactionID::new();
    insert_sequential(&table, tid, 2, 0, 80);

    let predicate = Predicate::new(0, Op::Equals, Cell::Int(37));
    let matches: Vec<_> = page_store::btree::BTreeTableSearchIterator::new(&table, tid, predicate).collect();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].get_cell(0), &Cell::Int(37));
}

#[test]
fn greater_than_predicate_short_circuits_correctly() {
    setup();
    set_page_size(100);
    let table = new_empty_btree_table("ins_search_gt", 2, 0);
    let tid = TransactionID::new();
    insert_sequential(&table, tid, 2, 0, 80);

    let predicate = Predicate::new(0, Op::GreaterThan, Cell::Int(70));
    let matches: Vec<i32> = page_store::btree::BTreeTableSearchIterator::new(&table, tid, predicate)
        .map(|t| match t.get_cell(0) {
            Cell::Int(v) => *v,
            _ => unreachable!(),
        })
        .collect();
    let expected: Vec<i32> = (71..80).collect();
    assert_eq!(matches, expected);
}
