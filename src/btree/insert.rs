use std::sync::{Arc, RwLock};

use log::debug;

use crate::buffer_pool::AnyPage;
use crate::common::{Permission, TransactionID};
use crate::error::SmallError;
use crate::storage::{Cell, PageCategory, PageId, Tuple};

use super::allocator::get_empty_page;
use super::entry::Entry;
use super::search::find_leaf_page;
use super::table::BTreeTable;
use super::{record_dirty, reparent_child, DirtyPages, InternalPage, LeafPage};

/// Inserts `tuple`, splitting leaves (and, transitively, internal
/// pages) as needed to make room. Returns every page this mutation
/// touched, for the caller to flush.
pub fn insert_tuple(
    table: &BTreeTable,
    tid: TransactionID,
    tuple: Tuple,
) -> Result<Vec<Arc<RwLock<AnyPage>>>, SmallError> {
    let mut dirty = DirtyPages::new();
    let root_id = table.get_root_pid(tid, &mut dirty);
    let key = tuple.get_cell(table.get_key_field()).clone();

    let leaf_handle = find_leaf_page(table, tid, root_id, Permission::ReadWrite, Some(&key));
    record_dirty(&mut dirty, leaf_handle.clone());

    let is_full = leaf_handle.read().unwrap().as_leaf().get_num_empty_slots() == 0;
    let leaf_handle = if is_full {
        split_leaf_page(table, tid, &mut dirty, leaf_handle, &key)
    } else {
        leaf_handle
    };

    {
        let mut guard = leaf_handle.write().unwrap();
        let leaf = guard.as_leaf_mut();
        leaf.insert_tuple(tuple, table.get_key_field())?;
        guard.mark_dirty(Some(tid));
    }
    record_dirty(&mut dirty, leaf_handle);

    Ok(dirty.into_values().collect())
}

/// Splits a full leaf in two, links the new sibling in, and inserts the
/// promoted (copied-up) separator into the parent. Returns whichever
/// half `probe_key` belongs in.
fn split_leaf_page(
    table: &BTreeTable,
    tid: TransactionID,
    dirty: &mut DirtyPages,
    leaf_handle: Arc<RwLock<AnyPage>>,
    probe_key: &Cell,
) -> Arc<RwLock<AnyPage>> {
    let key_field = table.get_key_field();
    let schema = table.get_schema().clone();

    let (leaf_id, leaf_parent, leaf_right, move_count) = {
        let guard = leaf_handle.read().unwrap();
        let leaf = guard.as_leaf();
        let n = leaf.num_tuples();
        (leaf.get_id(), leaf.get_parent_id(), leaf.get_right_sibling_id(), (n + 2) / 2)
    };

    let right_handle = get_empty_page(table, tid, dirty, PageCategory::BTreeLeaf, |pid| {
        AnyPage::Leaf(LeafPage::empty(pid, schema, leaf_parent))
    });
    let right_id = right_handle.read().unwrap().get_id();

    let moved = {
        let mut guard = leaf_handle.write().unwrap();
        let removed = guard.as_leaf_mut().remove_back(move_count);
        guard.mark_dirty(Some(tid));
        removed
    };

    let mid_key = moved[0].get_cell(key_field).clone();
    {
        let mut guard = right_handle.write().unwrap();
        let right = guard.as_leaf_mut();
        right.append_back(moved);
        right.set_right_sibling_id(leaf_right);
        right.set_left_sibling_id(Some(leaf_id));
        guard.mark_dirty(Some(tid));
    }

    if let Some(further_right_id) = leaf_right {
        let handle = table.get_page(tid, Permission::ReadWrite, further_right_id);
        handle.write().unwrap().as_leaf_mut().set_left_sibling_id(Some(right_id));
        handle.write().unwrap().mark_dirty(Some(tid));
        record_dirty(dirty, handle);
    }

    {
        let mut guard = leaf_handle.write().unwrap();
        guard.as_leaf_mut().set_right_sibling_id(Some(right_id));
        guard.mark_dirty(Some(tid));
    }

    let parent_id = get_parent_with_empty_slots(table, tid, dirty, leaf_parent, &mid_key);

    {
        let mut guard = leaf_handle.write().unwrap();
        guard.as_leaf_mut().set_parent_id(parent_id);
        guard.mark_dirty(Some(tid));
    }
    {
        let mut guard = right_handle.write().unwrap();
        guard.as_leaf_mut().set_parent_id(parent_id);
        guard.mark_dirty(Some(tid));
    }

    let parent_handle = table.get_page(tid, Permission::ReadWrite, parent_id);
    {
        let mut guard = parent_handle.write().unwrap();
        guard
            .as_internal_mut()
            .insert_entry(Entry::new(mid_key.clone(), leaf_id, right_id))
            .expect("parent has room for the promoted entry");
        guard.mark_dirty(Some(tid));
    }
    record_dirty(dirty, parent_handle);
    record_dirty(dirty, leaf_handle.clone());
    record_dirty(dirty, right_handle.clone());

    debug!(
        "table {}: split leaf {} into {} / {} at key {}",
        table.get_id(),
        leaf_id,
        leaf_id,
        right_id,
        mid_key
    );

    if probe_key > &mid_key {
        right_handle
    } else {
        leaf_handle
    }
}

/// Splits a full internal page. The median is **pushed up**: removed
/// from both children and inserted standalone into the parent, with
/// its own left/right children repointed at the two split halves.
fn split_internal_page(
    table: &BTreeTable,
    tid: TransactionID,
    dirty: &mut DirtyPages,
    page_id: PageId,
    probe_key: &Cell,
) -> PageId {
    let key_type = table.key_type();
    let page_handle = table.get_page(tid, Permission::ReadWrite, page_id);
    record_dirty(dirty, page_handle.clone());

    let (parent_id, move_count) = {
        let guard = page_handle.read().unwrap();
        let page = guard.as_internal();
        let n = page.num_entries();
        (page.get_parent_id(), (n + 2) / 2)
    };

    let right_handle = get_empty_page(table, tid, dirty, PageCategory::BTreeInternal, |pid| {
        AnyPage::Internal(InternalPage::empty(pid, parent_id, key_type))
    });
    let right_id = right_handle.read().unwrap().get_id();

    let mut moved: Vec<Entry> = {
        let mut guard = page_handle.write().unwrap();
        let page = guard.as_internal_mut();
        let mut out = Vec::with_capacity(move_count);
        for _ in 0..move_count {
            out.push(page.remove_last_entry());
        }
        out.reverse();
        guard.mark_dirty(Some(tid));
        out
    };

    let promoted = moved.remove(0);
    let promoted_key = promoted.key.clone();
    let promoted_entry = Entry::new(promoted_key.clone(), page_id, right_id);

    {
        let mut guard = right_handle.write().unwrap();
        let right = guard.as_internal_mut();
        for entry in moved {
            reparent_child(table, tid, dirty, entry.left_child, right_id);
            reparent_child(table, tid, dirty, entry.right_child, right_id);
            right.insert_entry(entry).expect("right half has room");
        }
        reparent_child(table, tid, dirty, promoted.right_child, right_id);
        guard.mark_dirty(Some(tid));
    }

    let new_parent_id = get_parent_with_empty_slots(table, tid, dirty, parent_id, &promoted_key);

    {
        let mut guard = page_handle.write().unwrap();
        guard.as_internal_mut().set_parent_id(new_parent_id);
        guard.mark_dirty(Some(tid));
    }
    {
        let mut guard = right_handle.write().unwrap();
        guard.as_internal_mut().set_parent_id(new_parent_id);
        guard.mark_dirty(Some(tid));
    }

    let parent_handle = table.get_page(tid, Permission::ReadWrite, new_parent_id);
    {
        let mut guard = parent_handle.write().unwrap();
        guard
            .as_internal_mut()
            .insert_entry(promoted_entry)
            .expect("parent has room for the promoted entry");
        guard.mark_dirty(Some(tid));
    }
    record_dirty(dirty, parent_handle);
    record_dirty(dirty, page_handle.clone());
    record_dirty(dirty, right_handle.clone());

    if probe_key > &promoted_key {
        right_id
    } else {
        page_id
    }
}

/// Returns an internal page with room for one more entry, splitting
/// `parent_id` (or allocating a brand-new root) if necessary.
fn get_parent_with_empty_slots(
    table: &BTreeTable,
    tid: TransactionID,
    dirty: &mut DirtyPages,
    parent_id: PageId,
    key: &Cell,
) -> PageId {
    if parent_id.category == PageCategory::BTreeRootPtr {
        let key_type = table.key_type();
        let new_handle = get_empty_page(table, tid, dirty, PageCategory::BTreeInternal, |pid| {
            AnyPage::Internal(InternalPage::empty(pid, parent_id, key_type))
        });
        let new_id = new_handle.read().unwrap().get_id();

        let root_ptr = table.get_root_ptr_page();
        root_ptr.write().unwrap().as_root_ptr_mut().set_root_id(new_id);
        root_ptr.write().unwrap().mark_dirty(Some(tid));
        record_dirty(dirty, root_ptr);
        return new_id;
    }

    let handle = table.get_page(tid, Permission::ReadWrite, parent_id);
    record_dirty(dirty, handle.clone());
    let is_full = {
        let guard = handle.read().unwrap();
        let parent = guard.as_internal();
        parent.num_entries() >= parent.get_max_entries()
    };

    if is_full {
        split_internal_page(table, tid, dirty, parent_id, key)
    } else {
        parent_id
    }
}
