use crate::common::{page_size, TransactionID};
use crate::io::{clear_bit, is_bit_set, read_exact, set_bit, Decodeable, SmallWriter};
use crate::storage::{PageCategory, PageId};

const FIXED_PREFIX: usize = 8; // prev (4) + next (4)

/// A bitmap page in the free-page linked list. Bit `k` is 1 iff page
/// number `self.page_num + 1 + k` is currently allocated — relative to
/// this header's own page number, not the chain's position, since a
/// header page's number is itself handed out by plain file-append and
/// an absolute `chain_index * slots_per_header + k` scheme would risk
/// colliding with it.
pub struct HeaderPage {
    pid: PageId,
    prev: Option<PageId>,
    next: Option<PageId>,
    bitmap: Vec<u8>,
    dirty: Option<TransactionID>,
}

pub fn slots_per_header() -> usize {
    (page_size() - FIXED_PREFIX) * 8
}

impl HeaderPage {
    pub fn new(pid: PageId, bytes: &[u8]) -> Self {
        let mut reader = std::io::Cursor::new(bytes);
        let prev_num = u32::decode_from(&mut reader);
        let next_num = u32::decode_from(&mut reader);
        let bitmap = read_exact(&mut reader, page_size() - FIXED_PREFIX);

        let prev = to_header_id(pid.table_id, prev_num);
        let next = to_header_id(pid.table_id, next_num);

        HeaderPage {
            pid,
            prev,
            next,
            bitmap,
            dirty: None,
        }
    }

    /// A freshly allocated header page: every page number it covers
    /// starts out unallocated (bit = 0), because those page numbers
    /// don't exist on disk yet.
    pub fn empty(pid: PageId) -> Self {
        HeaderPage {
            pid,
            prev: None,
            next: None,
            bitmap: vec![0u8; page_size() - FIXED_PREFIX],
            dirty: None,
        }
    }

    pub fn get_id(&self) -> PageId {
        self.pid
    }

    pub fn get_prev_id(&self) -> Option<PageId> {
        self.prev
    }

    pub fn set_prev_id(&mut self, id: Option<PageId>) {
        self.prev = id;
    }

    pub fn get_next_id(&self) -> Option<PageId> {
        self.next
    }

    pub fn set_next_id(&mut self, id: Option<PageId>) {
        self.next = id;
    }

    pub fn num_slots(&self) -> usize {
        self.bitmap.len() * 8
    }

    pub fn is_allocated(&self, slot: usize) -> bool {
        is_bit_set(&self.bitmap, slot)
    }

    pub fn mark_allocated(&mut self, slot: usize) {
        set_bit(&mut self.bitmap, slot);
    }

    pub fn mark_free(&mut self, slot: usize) {
        clear_bit(&mut self.bitmap, slot);
    }

    /// First free slot, if any.
    pub fn get_empty_slot(&self) -> Option<usize> {
        (0..self.num_slots()).find(|&i| !self.is_allocated(i))
    }

    pub fn mark_dirty(&mut self, tid: Option<TransactionID>) {
        self.dirty = tid;
    }

    pub fn is_dirty(&self) -> Option<TransactionID> {
        self.dirty
    }

    pub fn get_page_data(&self) -> Vec<u8> {
        let mut w = SmallWriter::new();
        w.write(&self.prev.map(|p| p.page_num).unwrap_or(0));
        w.write(&self.next.map(|p| p.page_num).unwrap_or(0));
        w.write_bytes(&self.bitmap);
        w.to_padded_bytes(page_size())
    }
}

fn to_header_id(table_id: i32, num: u32) -> Option<PageId> {
    if num == 0 {
        None
    } else {
        Some(PageId::new(table_id, num, PageCategory::BTreeHeader))
    }
}
