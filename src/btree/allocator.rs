use std::sync::{Arc, RwLock};

use crate::buffer_pool::{AnyPage, BUFFER_POOL};
use crate::common::{Permission, TransactionID};
use crate::storage::{PageCategory, PageId};

use super::header_page::slots_per_header;
use super::table::BTreeTable;
use super::{record_dirty, DirtyPages, HeaderPage};

/// A header page's own page number is handed out the same way as
/// everything else — by plain file-append — so its bitmap cannot track
/// page numbers starting from slot 0 without colliding with its own
/// number. Instead each header page's bitmap tracks the page numbers
/// immediately *following* it: slot `k` means page number
/// `header.page_num + 1 + k`. Consecutive header pages are appended
/// only once the current one is exhausted, so ranges never overlap.
fn slot_to_page_no(header_page_num: u32, slot: usize) -> u32 {
    header_page_num + 1 + slot as u32
}

/// Finds (and marks allocated) the first free page number recorded in
/// the header-page chain, walking every header page — not just the
/// first — both here and in `set_empty_page`. Creates the first header
/// page, or appends a new one, lazily.
pub fn get_empty_page_no(table: &BTreeTable, tid: TransactionID, dirty: &mut DirtyPages) -> u32 {
    let root_ptr = table.get_root_ptr_page();
    let header_id = root_ptr.read().unwrap().as_root_ptr().get_header_id();

    let first_header = match header_id {
        Some(pid) => pid,
        None => {
            let new_pid = table.alloc_page_no(PageCategory::BTreeHeader);
            let handle = BUFFER_POOL.insert_page(AnyPage::Header(HeaderPage::empty(new_pid)));
            handle.write().unwrap().mark_dirty(Some(tid));
            record_dirty(dirty, handle);

            root_ptr.write().unwrap().as_root_ptr_mut().set_header_id(new_pid);
            root_ptr.write().unwrap().mark_dirty(Some(tid));
            record_dirty(dirty, root_ptr);
            new_pid
        }
    };

    let mut current = first_header;
    loop {
        let handle = table.get_page(tid, Permission::ReadWrite, current);
        let slot = handle.read().unwrap().as_header().get_empty_slot();
        if let Some(slot) = slot {
            handle.write().unwrap().as_header_mut().mark_allocated(slot);
            handle.write().unwrap().mark_dirty(Some(tid));
            let page_no = slot_to_page_no(current.page_num, slot);
            record_dirty(dirty, handle);
            return page_no;
        }

        let next = handle.read().unwrap().as_header().get_next_id();
        match next {
            Some(next_pid) => {
                current = next_pid;
            }
            None => {
                let new_pid = table.alloc_page_no(PageCategory::BTreeHeader);
                let mut new_header = HeaderPage::empty(new_pid);
                new_header.set_prev_id(Some(current));
                let new_handle = BUFFER_POOL.insert_page(AnyPage::Header(new_header));
                new_handle.write().unwrap().mark_dirty(Some(tid));
                record_dirty(dirty, new_handle);

                handle.write().unwrap().as_header_mut().set_next_id(Some(new_pid));
                handle.write().unwrap().mark_dirty(Some(tid));
                record_dirty(dirty, handle);

                current = new_pid;
            }
        }
    }
}

/// Allocates a page number, zeros its on-disk region, and installs a
/// freshly built typed page into the buffer pool — all without a
/// window where the zeroed bytes are on disk but not yet owned by the
/// cache. `build` constructs the concrete empty page for `category`
/// (its shape differs per category, so the caller supplies it).
pub fn get_empty_page<F>(
    table: &BTreeTable,
    tid: TransactionID,
    dirty: &mut DirtyPages,
    category: PageCategory,
    build: F,
) -> Arc<RwLock<AnyPage>>
where
    F: FnOnce(PageId) -> AnyPage,
{
    let page_no = get_empty_page_no(table, tid, dirty);
    let pid = PageId::new(table.get_id(), page_no, category);
    table.zero_page_region(page_no);

    let handle = BUFFER_POOL.insert_page(build(pid));
    handle.write().unwrap().mark_dirty(Some(tid));
    record_dirty(dirty, handle.clone());
    handle
}

/// Marks `page_no` free in whichever header page covers it, extending
/// the chain if it somehow doesn't reach that far yet.
pub fn set_empty_page(table: &BTreeTable, tid: TransactionID, dirty: &mut DirtyPages, page_no: u32) {
    let root_ptr = table.get_root_ptr_page();
    let header_id = root_ptr.read().unwrap().as_root_ptr().get_header_id();
    let mut current = match header_id {
        Some(pid) => pid,
        None => return,
    };

    let spn = slots_per_header() as u32;
    loop {
        if page_no > current.page_num && page_no <= current.page_num + spn {
            let slot = (page_no - current.page_num - 1) as usize;
            let handle = table.get_page(tid, Permission::ReadWrite, current);
            handle.write().unwrap().as_header_mut().mark_free(slot);
            handle.write().unwrap().mark_dirty(Some(tid));
            record_dirty(dirty, handle);
            return;
        }

        let handle = table.get_page(tid, Permission::ReadOnly, current);
        let next = handle.read().unwrap().as_header().get_next_id();
        match next {
            Some(next_pid) => {
                current = next_pid;
            }
            None => {
                let new_pid = table.alloc_page_no(PageCategory::BTreeHeader);
                let mut new_header = HeaderPage::empty(new_pid);
                new_header.set_prev_id(Some(current));
                let new_handle = BUFFER_POOL.insert_page(AnyPage::Header(new_header));
                new_handle.write().unwrap().mark_dirty(Some(tid));
                record_dirty(dirty, new_handle);

                handle.write().unwrap().as_header_mut().set_next_id(Some(new_pid));
                handle.write().unwrap().mark_dirty(Some(tid));
                record_dirty(dirty, handle);

                current = new_pid;
            }
        }
    }
}
