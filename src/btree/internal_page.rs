use crate::common::{page_size, TransactionID};
use crate::error::{SmallError, SmallResult};
use crate::io::{compute_slot_count, header_bytes_for, read_exact, set_bit, Decodeable, SmallWriter};
use crate::storage::{Cell, PageCategory, PageId, Type};

use super::entry::Entry;

const FIXED_PREFIX: usize = 4; // parent page number

fn entry_size(key_type: Type) -> usize {
    key_type.size() + 4 + 1 + 4 + 1 // key + (left num, left cat) + (right num, right cat)
}

pub fn max_entries(key_type: Type) -> usize {
    compute_slot_count(page_size() - FIXED_PREFIX, entry_size(key_type))
}

/// Sorted sequence of `(key, childPointer)` with one extra left-most
/// child, stored as entries each holding its own `(key, leftChild,
/// rightChild)`. Entries are always kept compacted and sorted by key;
/// on-disk the first `len()` bitmap bits are set and the rest clear —
/// the host repo instead keeps entries sparse at fixed slot positions,
/// but the spec does not require an internal page's slot positions to
/// be stable across mutation the way a heap page's must be, so the
/// simpler compacted representation is used here.
pub struct InternalPage {
    pid: PageId,
    parent: PageId,
    key_type: Type,
    entries: Vec<Entry>,
    dirty: Option<TransactionID>,
}

impl InternalPage {
    pub fn new(pid: PageId, bytes: &[u8], key_type: Type) -> Self {
        let mut reader = std::io::Cursor::new(bytes);
        let parent_num = u32::decode_from(&mut reader);
        let parent = parent_id(pid.table_id, parent_num);

        let max = max_entries(key_type);
        let header_len = header_bytes_for(max);
        let header = read_exact(&mut reader, header_len);

        let mut entries = Vec::new();
        for i in 0..max {
            let record = read_exact(&mut reader, entry_size(key_type));
            if crate::io::is_bit_set(&header, i) {
                entries.push(decode_entry(&record, pid.table_id, key_type));
            }
        }

        InternalPage {
            pid,
            parent,
            key_type,
            entries,
            dirty: None,
        }
    }

    pub fn empty(pid: PageId, parent: PageId, key_type: Type) -> Self {
        InternalPage {
            pid,
            parent,
            key_type,
            entries: Vec::new(),
            dirty: None,
        }
    }

    pub fn get_id(&self) -> PageId {
        self.pid
    }

    pub fn get_parent_id(&self) -> PageId {
        self.parent
    }

    pub fn set_parent_id(&mut self, pid: PageId) {
        self.parent = pid;
    }

    pub fn is_root(&self) -> bool {
        self.parent.category == PageCategory::BTreeRootPtr
    }

    pub fn get_max_entries(&self) -> usize {
        max_entries(self.key_type)
    }

    pub fn get_min_entries(&self) -> usize {
        (self.get_max_entries() + 1) / 2
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    pub fn get_num_empty_slots(&self) -> usize {
        self.get_max_entries() - self.entries.len()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get_first_child_id(&self) -> PageId {
        self.entries[0].left_child
    }

    pub fn get_last_child_id(&self) -> PageId {
        self.entries[self.entries.len() - 1].right_child
    }

    /// Inserts a new entry in sorted key position. Adjacent entries
    /// share a child pointer (`entries[i].right_child ==
    /// entries[i+1].left_child`), and a split promoting `entry` out of
    /// one of the new entry's own children leaves the entry that used
    /// to follow it pointing at the wrong (now-left) half — if so,
    /// that entry's left child is walked forward to the new entry's
    /// right child.
    pub fn insert_entry(&mut self, entry: Entry) -> SmallResult {
        if self.entries.len() >= self.get_max_entries() {
            return Err(SmallError::db_exception("internal page is full"));
        }
        let idx = self.entries.partition_point(|e| e.key <= entry.key);
        if let Some(following) = self.entries.get_mut(idx) {
            if following.left_child == entry.left_child {
                following.left_child = entry.right_child;
            }
        }
        self.entries.insert(idx, entry);
        Ok(())
    }

    pub fn update_entry(&mut self, idx: usize, entry: Entry) {
        self.entries[idx] = entry;
    }

    pub fn entry_index_by_left_child(&self, child: PageId) -> Option<usize> {
        self.entries.iter().position(|e| e.left_child == child)
    }

    pub fn entry_index_by_right_child(&self, child: PageId) -> Option<usize> {
        self.entries.iter().position(|e| e.right_child == child)
    }

    pub fn remove_entry_at(&mut self, idx: usize) -> Entry {
        self.entries.remove(idx)
    }

    pub fn remove_first_entry(&mut self) -> Entry {
        self.entries.remove(0)
    }

    pub fn remove_last_entry(&mut self) -> Entry {
        self.entries.pop().expect("internal page has no entries")
    }

    pub fn mark_dirty(&mut self, tid: Option<TransactionID>) {
        self.dirty = tid;
    }

    pub fn is_dirty(&self) -> Option<TransactionID> {
        self.dirty
    }

    pub fn get_page_data(&self) -> Vec<u8> {
        let max = self.get_max_entries();
        let header_len = header_bytes_for(max);
        let mut header = vec![0u8; header_len];
        for i in 0..self.entries.len() {
            set_bit(&mut header, i);
        }

        let mut w = SmallWriter::new();
        w.write(&self.parent.page_num);
        w.write_bytes(&header);
        for i in 0..max {
            if let Some(entry) = self.entries.get(i) {
                w.write_bytes(&encode_entry(entry, self.key_type));
            } else {
                w.write_bytes(&vec![0u8; entry_size(self.key_type)]);
            }
        }
        w.to_padded_bytes(page_size())
    }
}

fn parent_id(table_id: i32, page_num: u32) -> PageId {
    if page_num == 0 {
        PageId::root_pointer(table_id)
    } else {
        PageId::new(table_id, page_num, PageCategory::BTreeInternal)
    }
}

fn encode_entry(entry: &Entry, key_type: Type) -> Vec<u8> {
    let mut w = SmallWriter::new();
    match (&entry.key, key_type) {
        (Cell::Int(v), Type::Int) => w.write(v),
        (Cell::Str(s), Type::String(n)) => {
            w.write(&(s.len() as u32));
            let mut padded = s.clone().into_bytes();
            padded.resize(n, 0);
            w.write_bytes(&padded);
        }
        _ => panic!("entry key does not match key type"),
    }
    w.write(&entry.left_child.page_num);
    w.write(&entry.left_child.category.to_byte());
    w.write(&entry.right_child.page_num);
    w.write(&entry.right_child.category.to_byte());
    w.to_bytes()
}

fn decode_entry(bytes: &[u8], table_id: i32, key_type: Type) -> Entry {
    let mut reader = std::io::Cursor::new(bytes);
    let key = match key_type {
        Type::Int => Cell::Int(i32::decode_from(&mut reader)),
        Type::String(n) => {
            let len = u32::decode_from(&mut reader) as usize;
            let bytes = read_exact(&mut reader, n);
            Cell::Str(String::from_utf8_lossy(&bytes[..len.min(n)]).to_string())
        }
    };
    let left_num = u32::decode_from(&mut reader);
    let left_cat = read_exact(&mut reader, 1)[0];
    let right_num = u32::decode_from(&mut reader);
    let right_cat = read_exact(&mut reader, 1)[0];

    Entry::new(
        key,
        PageId::new(table_id, left_num, PageCategory::from_byte(left_cat)),
        PageId::new(table_id, right_num, PageCategory::from_byte(right_cat)),
    )
}
