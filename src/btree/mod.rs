//! B+-tree page family and file operations: search/iteration,
//! insertion (splits), deletion (redistribute/merge), and the
//! empty-page allocator.

pub mod allocator;
pub mod delete;
pub mod entry;
pub mod header_page;
pub mod insert;
pub mod internal_page;
pub mod leaf_page;
pub mod root_pointer_page;
pub mod search;
pub mod table;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::buffer_pool::AnyPage;
use crate::storage::PageId;

/// The per-mutation dirty set: a page fetched read/write once is
/// reused on subsequent references within the same insert/delete call,
/// so a recursive split/merge never double-fetches (and double-locks)
/// a page it already holds. Owned by the call's local stack frame —
/// never a process-global structure (concurrent mutations each carry
/// their own).
pub type DirtyPages = HashMap<PageId, Arc<RwLock<AnyPage>>>;

pub fn record_dirty(dirty: &mut DirtyPages, handle: Arc<RwLock<AnyPage>>) {
    let pid = handle.read().unwrap().get_id();
    dirty.entry(pid).or_insert(handle);
}

/// Re-points a leaf or internal child's `parentId` at `new_parent` —
/// used whenever a split or merge moves a subtree under a different
/// page.
pub(crate) fn reparent_child(
    table: &table::BTreeTable,
    tid: crate::common::TransactionID,
    dirty: &mut DirtyPages,
    child_id: PageId,
    new_parent: PageId,
) {
    let handle = table.get_page(tid, crate::common::Permission::ReadWrite, child_id);
    {
        let mut guard = handle.write().unwrap();
        match child_id.category {
            crate::storage::PageCategory::BTreeLeaf => guard.as_leaf_mut().set_parent_id(new_parent),
            crate::storage::PageCategory::BTreeInternal => guard.as_internal_mut().set_parent_id(new_parent),
            other => panic!("unexpected child category: {:?}", other),
        }
        guard.mark_dirty(Some(tid));
    }
    record_dirty(dirty, handle);
}

pub use delete::delete_tuple;
pub use entry::Entry;
pub use header_page::HeaderPage;
pub use insert::insert_tuple;
pub use internal_page::InternalPage;
pub use leaf_page::LeafPage;
pub use root_pointer_page::RootPointerPage;
pub use search::{BTreeTableIterator, BTreeTableSearchIterator, Op, Predicate};
pub use table::BTreeTable;
