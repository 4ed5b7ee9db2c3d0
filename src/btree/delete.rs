use std::sync::{Arc, RwLock};

use log::debug;

use crate::buffer_pool::{AnyPage, BUFFER_POOL};
use crate::common::{Permission, TransactionID};
use crate::error::SmallError;
use crate::storage::{PageCategory, PageId, Tuple};

use super::allocator;
use super::entry::Entry;
use super::reparent_child;
use super::table::BTreeTable;
use super::{record_dirty, DirtyPages};

/// Deletes `tuple` from its recorded leaf, then rebalances upward as
/// far as underflow propagates. Returns every page this mutation
/// touched, for the caller to flush.
pub fn delete_tuple(
    table: &BTreeTable,
    tid: TransactionID,
    tuple: &Tuple,
) -> Result<Vec<Arc<RwLock<AnyPage>>>, SmallError> {
    let rid = tuple
        .get_record_id()
        .ok_or_else(|| SmallError::db_exception("tuple has no record id"))?;

    let mut dirty = DirtyPages::new();
    let leaf_handle = table.get_page(tid, Permission::ReadWrite, rid.page_id);
    record_dirty(&mut dirty, leaf_handle.clone());

    let needs_rebalance = {
        let mut guard = leaf_handle.write().unwrap();
        let leaf = guard.as_leaf_mut();
        leaf.delete_tuple(tuple)?;
        guard.mark_dirty(Some(tid));
        let leaf = guard.as_leaf();
        leaf.get_num_empty_slots() > leaf.get_max_tuples() - leaf.get_min_tuples()
    };

    if needs_rebalance {
        handle_min_occupancy_page(table, tid, &mut dirty, rid.page_id);
    }

    Ok(dirty.into_values().collect())
}

/// Finds `page_id`'s left and right neighbor (by scanning its parent
/// for the entries adjoining it) and dispatches to the leaf or internal
/// rebalancing routine. A no-op for the root, which has no parent.
fn handle_min_occupancy_page(table: &BTreeTable, tid: TransactionID, dirty: &mut DirtyPages, page_id: PageId) {
    let page_handle = table.get_page(tid, Permission::ReadWrite, page_id);
    record_dirty(dirty, page_handle.clone());

    let parent_id = {
        let guard = page_handle.read().unwrap();
        match page_id.category {
            PageCategory::BTreeLeaf => guard.as_leaf().get_parent_id(),
            PageCategory::BTreeInternal => guard.as_internal().get_parent_id(),
            other => panic!("unexpected page category: {:?}", other),
        }
    };

    if parent_id.category == PageCategory::BTreeRootPtr {
        return;
    }

    let parent_handle = table.get_page(tid, Permission::ReadWrite, parent_id);
    record_dirty(dirty, parent_handle.clone());

    let (left_idx, right_idx) = {
        let guard = parent_handle.read().unwrap();
        let parent = guard.as_internal();
        (
            parent.entry_index_by_right_child(page_id),
            parent.entry_index_by_left_child(page_id),
        )
    };

    match page_id.category {
        PageCategory::BTreeLeaf => {
            handle_min_occupancy_leaf_page(table, tid, dirty, page_id, parent_id, left_idx, right_idx)
        }
        PageCategory::BTreeInternal => {
            handle_min_occupancy_internal_page(table, tid, dirty, page_id, parent_id, left_idx, right_idx)
        }
        other => panic!("unexpected page category: {:?}", other),
    }
}

fn handle_min_occupancy_leaf_page(
    table: &BTreeTable,
    tid: TransactionID,
    dirty: &mut DirtyPages,
    page_id: PageId,
    parent_id: PageId,
    left_idx: Option<usize>,
    right_idx: Option<usize>,
) {
    let (sibling_id, entry_idx, sibling_is_right) = if let Some(idx) = left_idx {
        let parent_handle = table.get_page(tid, Permission::ReadOnly, parent_id);
        let sibling_id = parent_handle.read().unwrap().as_internal().entries()[idx].left_child;
        (sibling_id, idx, false)
    } else if let Some(idx) = right_idx {
        let parent_handle = table.get_page(tid, Permission::ReadOnly, parent_id);
        let sibling_id = parent_handle.read().unwrap().as_internal().entries()[idx].right_child;
        (sibling_id, idx, true)
    } else {
        panic!("non-root leaf {} has no sibling recorded in its parent", page_id);
    };

    let sibling_handle = table.get_page(tid, Permission::ReadOnly, sibling_id);
    let (page_n, sibling_n, max_tuples) = {
        let page_handle = table.get_page(tid, Permission::ReadOnly, page_id);
        let page = page_handle.read().unwrap();
        let sibling = sibling_handle.read().unwrap();
        let leaf = page.as_leaf();
        (leaf.num_tuples(), sibling.as_leaf().num_tuples(), leaf.get_max_tuples())
    };

    if page_n + sibling_n <= max_tuples {
        let (left_id, right_id) = if sibling_is_right {
            (page_id, sibling_id)
        } else {
            (sibling_id, page_id)
        };
        merge_leaf_pages(table, tid, dirty, left_id, right_id, parent_id, entry_idx);
    } else {
        steal_from_leaf_page(table, tid, dirty, page_id, sibling_id, parent_id, entry_idx, sibling_is_right);
    }
}

/// Rebalances by moving `(sibling.n - page.n) / 2` tuples across the
/// shared edge and rewriting the parent's separator key to the new
/// boundary.
fn steal_from_leaf_page(
    table: &BTreeTable,
    tid: TransactionID,
    dirty: &mut DirtyPages,
    page_id: PageId,
    sibling_id: PageId,
    parent_id: PageId,
    entry_idx: usize,
    sibling_is_right: bool,
) {
    let key_field = table.get_key_field();
    let page_handle = table.get_page(tid, Permission::ReadWrite, page_id);
    let sibling_handle = table.get_page(tid, Permission::ReadWrite, sibling_id);

    let k = {
        let page = page_handle.read().unwrap();
        let sibling = sibling_handle.read().unwrap();
        (sibling.as_leaf().num_tuples() - page.as_leaf().num_tuples()) / 2
    };

    let moved = {
        let mut guard = sibling_handle.write().unwrap();
        let sibling = guard.as_leaf_mut();
        let moved = if sibling_is_right {
            sibling.remove_front(k)
        } else {
            sibling.remove_back(k)
        };
        guard.mark_dirty(Some(tid));
        moved
    };

    {
        let mut guard = page_handle.write().unwrap();
        let page = guard.as_leaf_mut();
        if sibling_is_right {
            page.append_back(moved);
        } else {
            page.prepend_front(moved);
        }
        guard.mark_dirty(Some(tid));
    }

    let (left_id, right_id) = if sibling_is_right {
        (page_id, sibling_id)
    } else {
        (sibling_id, page_id)
    };
    let new_sep_key = {
        let handle = table.get_page(tid, Permission::ReadOnly, right_id);
        let guard = handle.read().unwrap();
        guard.as_leaf().tuples()[0].get_cell(key_field).clone()
    };

    let parent_handle = table.get_page(tid, Permission::ReadWrite, parent_id);
    {
        let mut guard = parent_handle.write().unwrap();
        guard
            .as_internal_mut()
            .update_entry(entry_idx, Entry::new(new_sep_key, left_id, right_id));
        guard.mark_dirty(Some(tid));
    }

    record_dirty(dirty, page_handle);
    record_dirty(dirty, sibling_handle);
    record_dirty(dirty, parent_handle);
}

/// Merges `right_id`'s tuples into `left_id`, relinks the sibling
/// chain, frees `right_id`, and removes the now-redundant parent entry.
fn merge_leaf_pages(
    table: &BTreeTable,
    tid: TransactionID,
    dirty: &mut DirtyPages,
    left_id: PageId,
    right_id: PageId,
    parent_id: PageId,
    entry_idx: usize,
) {
    let left_handle = table.get_page(tid, Permission::ReadWrite, left_id);
    let right_handle = table.get_page(tid, Permission::ReadWrite, right_id);

    let (moved, right_sibling) = {
        let mut guard = right_handle.write().unwrap();
        let right = guard.as_leaf_mut();
        let right_sibling = right.get_right_sibling_id();
        let moved = right.tuples().to_vec();
        guard.mark_dirty(Some(tid));
        (moved, right_sibling)
    };

    {
        let mut guard = left_handle.write().unwrap();
        let left = guard.as_leaf_mut();
        left.append_back(moved);
        left.set_right_sibling_id(right_sibling);
        guard.mark_dirty(Some(tid));
    }

    if let Some(further_right) = right_sibling {
        let handle = table.get_page(tid, Permission::ReadWrite, further_right);
        handle.write().unwrap().as_leaf_mut().set_left_sibling_id(Some(left_id));
        handle.write().unwrap().mark_dirty(Some(tid));
        record_dirty(dirty, handle);
    }

    debug!("table {}: merged leaf {} into {}", table.get_id(), right_id, left_id);

    BUFFER_POOL.discard_page(right_id);
    allocator::set_empty_page(table, tid, dirty, right_id.page_num);
    record_dirty(dirty, left_handle);

    delete_parent_entry(table, tid, dirty, left_id, parent_id, entry_idx);
}

fn handle_min_occupancy_internal_page(
    table: &BTreeTable,
    tid: TransactionID,
    dirty: &mut DirtyPages,
    page_id: PageId,
    parent_id: PageId,
    left_idx: Option<usize>,
    right_idx: Option<usize>,
) {
    let (sibling_id, entry_idx, sibling_is_right) = if let Some(idx) = left_idx {
        let parent_handle = table.get_page(tid, Permission::ReadOnly, parent_id);
        let sibling_id = parent_handle.read().unwrap().as_internal().entries()[idx].left_child;
        (sibling_id, idx, false)
    } else if let Some(idx) = right_idx {
        let parent_handle = table.get_page(tid, Permission::ReadOnly, parent_id);
        let sibling_id = parent_handle.read().unwrap().as_internal().entries()[idx].right_child;
        (sibling_id, idx, true)
    } else {
        panic!("non-root internal page {} has no sibling recorded in its parent", page_id);
    };

    let sibling_handle = table.get_page(tid, Permission::ReadOnly, sibling_id);
    let (page_n, sibling_n, max_entries) = {
        let page_handle = table.get_page(tid, Permission::ReadOnly, page_id);
        let page = page_handle.read().unwrap();
        let sibling = sibling_handle.read().unwrap();
        let internal = page.as_internal();
        (internal.num_entries(), sibling.as_internal().num_entries(), internal.get_max_entries())
    };

    // A merge additionally pulls the parent separator down as one more
    // entry, so the capacity check budgets for it up front.
    if page_n + sibling_n + 1 <= max_entries {
        let (left_id, right_id) = if sibling_is_right {
            (page_id, sibling_id)
        } else {
            (sibling_id, page_id)
        };
        merge_internal_pages(table, tid, dirty, left_id, right_id, parent_id, entry_idx);
    } else if sibling_is_right {
        steal_from_right_internal_page(table, tid, dirty, page_id, sibling_id, parent_id, entry_idx);
    } else {
        steal_from_left_internal_page(table, tid, dirty, page_id, sibling_id, parent_id, entry_idx);
    }
}

/// Rotates entries from a left sibling into `page_id`'s left edge, one
/// at a time: the old parent separator is pushed down as `page`'s new
/// first entry, and the sibling's last entry's key is pulled up to
/// become the new separator.
fn steal_from_left_internal_page(
    table: &BTreeTable,
    tid: TransactionID,
    dirty: &mut DirtyPages,
    page_id: PageId,
    sibling_id: PageId,
    parent_id: PageId,
    entry_idx: usize,
) {
    let page_handle = table.get_page(tid, Permission::ReadWrite, page_id);
    let sibling_handle = table.get_page(tid, Permission::ReadWrite, sibling_id);
    let parent_handle = table.get_page(tid, Permission::ReadWrite, parent_id);

    let k = {
        let page = page_handle.read().unwrap();
        let sibling = sibling_handle.read().unwrap();
        (sibling.as_internal().num_entries() - page.as_internal().num_entries()) / 2
    };

    for _ in 0..k {
        let moved = {
            let mut guard = sibling_handle.write().unwrap();
            let moved = guard.as_internal_mut().remove_last_entry();
            guard.mark_dirty(Some(tid));
            moved
        };

        reparent_child(table, tid, dirty, moved.right_child, page_id);

        let old_sep_key = parent_handle.read().unwrap().as_internal().entries()[entry_idx].key.clone();
        let page_old_first_child = page_handle.read().unwrap().as_internal().get_first_child_id();

        {
            let mut guard = page_handle.write().unwrap();
            guard
                .as_internal_mut()
                .insert_entry(Entry::new(old_sep_key, moved.right_child, page_old_first_child))
                .expect("steal target has room for the pushed-down separator");
            guard.mark_dirty(Some(tid));
        }
        {
            let mut guard = parent_handle.write().unwrap();
            guard
                .as_internal_mut()
                .update_entry(entry_idx, Entry::new(moved.key, sibling_id, page_id));
            guard.mark_dirty(Some(tid));
        }
    }

    record_dirty(dirty, page_handle);
    record_dirty(dirty, sibling_handle);
    record_dirty(dirty, parent_handle);
}

/// Mirror of [`steal_from_left_internal_page`] for a sibling on the
/// right: entries rotate in from the sibling's front into `page_id`'s
/// right edge.
fn steal_from_right_internal_page(
    table: &BTreeTable,
    tid: TransactionID,
    dirty: &mut DirtyPages,
    page_id: PageId,
    sibling_id: PageId,
    parent_id: PageId,
    entry_idx: usize,
) {
    let page_handle = table.get_page(tid, Permission::ReadWrite, page_id);
    let sibling_handle = table.get_page(tid, Permission::ReadWrite, sibling_id);
    let parent_handle = table.get_page(tid, Permission::ReadWrite, parent_id);

    let k = {
        let page = page_handle.read().unwrap();
        let sibling = sibling_handle.read().unwrap();
        (sibling.as_internal().num_entries() - page.as_internal().num_entries()) / 2
    };

    for _ in 0..k {
        let moved = {
            let mut guard = sibling_handle.write().unwrap();
            let moved = guard.as_internal_mut().remove_first_entry();
            guard.mark_dirty(Some(tid));
            moved
        };

        reparent_child(table, tid, dirty, moved.left_child, page_id);

        let old_sep_key = parent_handle.read().unwrap().as_internal().entries()[entry_idx].key.clone();
        let page_old_last_child = page_handle.read().unwrap().as_internal().get_last_child_id();

        {
            let mut guard = page_handle.write().unwrap();
            guard
                .as_internal_mut()
                .insert_entry(Entry::new(old_sep_key, page_old_last_child, moved.left_child))
                .expect("steal target has room for the pushed-down separator");
            guard.mark_dirty(Some(tid));
        }
        {
            let mut guard = parent_handle.write().unwrap();
            guard
                .as_internal_mut()
                .update_entry(entry_idx, Entry::new(moved.key, page_id, sibling_id));
            guard.mark_dirty(Some(tid));
        }
    }

    record_dirty(dirty, page_handle);
    record_dirty(dirty, sibling_handle);
    record_dirty(dirty, parent_handle);
}

/// Merges `right_id` into `left_id`, pulling the parent's separator key
/// down as the bridging entry between their former child ranges, then
/// frees `right_id` and removes the separator from the parent.
fn merge_internal_pages(
    table: &BTreeTable,
    tid: TransactionID,
    dirty: &mut DirtyPages,
    left_id: PageId,
    right_id: PageId,
    parent_id: PageId,
    entry_idx: usize,
) {
    let left_handle = table.get_page(tid, Permission::ReadWrite, left_id);
    let right_handle = table.get_page(tid, Permission::ReadWrite, right_id);
    let parent_handle = table.get_page(tid, Permission::ReadWrite, parent_id);

    let sep_key = parent_handle.read().unwrap().as_internal().entries()[entry_idx].key.clone();
    let left_last_child = left_handle.read().unwrap().as_internal().get_last_child_id();
    let right_first_child = right_handle.read().unwrap().as_internal().get_first_child_id();
    let bridging = Entry::new(sep_key, left_last_child, right_first_child);

    let right_entries: Vec<Entry> = right_handle.read().unwrap().as_internal().entries().to_vec();

    {
        let mut guard = left_handle.write().unwrap();
        let left = guard.as_internal_mut();
        left.insert_entry(bridging).expect("merged page fits the bridging entry");
        for entry in &right_entries {
            left.insert_entry(entry.clone()).expect("merged page fits the sibling's entries");
        }
        guard.mark_dirty(Some(tid));
    }

    reparent_child(table, tid, dirty, right_first_child, left_id);
    for entry in &right_entries {
        reparent_child(table, tid, dirty, entry.left_child, left_id);
        reparent_child(table, tid, dirty, entry.right_child, left_id);
    }

    debug!("table {}: merged internal {} into {}", table.get_id(), right_id, left_id);

    BUFFER_POOL.discard_page(right_id);
    allocator::set_empty_page(table, tid, dirty, right_id.page_num);
    record_dirty(dirty, left_handle);

    delete_parent_entry(table, tid, dirty, left_id, parent_id, entry_idx);
}

/// Removes the entry at `entry_idx` from `parent_id` (patching the
/// following entry's left child, if any, to point at `left_remainder_id`
/// since the entry it previously pointed at no longer exists), then
/// collapses the root or propagates further underflow as needed.
fn delete_parent_entry(
    table: &BTreeTable,
    tid: TransactionID,
    dirty: &mut DirtyPages,
    left_remainder_id: PageId,
    parent_id: PageId,
    entry_idx: usize,
) {
    let parent_handle = table.get_page(tid, Permission::ReadWrite, parent_id);

    let (is_empty, underflow) = {
        let mut guard = parent_handle.write().unwrap();
        let parent = guard.as_internal_mut();
        parent.remove_entry_at(entry_idx);
        if entry_idx < parent.num_entries() {
            let following = parent.entries()[entry_idx].clone();
            parent.update_entry(entry_idx, Entry::new(following.key, left_remainder_id, following.right_child));
        }
        guard.mark_dirty(Some(tid));
        let parent = guard.as_internal();
        let is_root = parent.is_root();
        let n = parent.num_entries();
        (n == 0, !is_root && n < parent.get_min_entries())
    };
    record_dirty(dirty, parent_handle.clone());

    if is_empty {
        // An empty internal page only ever occurs at the root (its last
        // entry was just pulled down into a merge) — collapse it away.
        let root_ptr = table.get_root_ptr_page();
        let root_ptr_id = root_ptr.read().unwrap().get_id();
        {
            let mut guard = root_ptr.write().unwrap();
            guard.as_root_ptr_mut().set_root_id(left_remainder_id);
            guard.mark_dirty(Some(tid));
        }
        record_dirty(dirty, root_ptr);

        reparent_child(table, tid, dirty, left_remainder_id, root_ptr_id);

        BUFFER_POOL.discard_page(parent_id);
        allocator::set_empty_page(table, tid, dirty, parent_id.page_num);
    } else if underflow {
        handle_min_occupancy_page(table, tid, dirty, parent_id);
    }
}
