use crate::common::{page_size, TransactionID};
use crate::error::{SmallError, SmallResult};
use crate::io::{compute_slot_count, header_bytes_for, read_exact, set_bit, Decodeable, SmallWriter};
use crate::storage::{tuple_from_bytes, PageCategory, PageId, Schema, Tuple};

const FIXED_PREFIX: usize = 4 + 4 + 4; // parent + left sibling + right sibling

pub fn max_tuples(schema: &Schema) -> usize {
    compute_slot_count(page_size() - FIXED_PREFIX, schema.size())
}

/// Holds the actual rows. Tuples are kept compacted and sorted by the
/// table's key field (the same simplification `InternalPage` makes:
/// the spec does not require a leaf page's slot positions to survive
/// mutation, only a heap page's do).
pub struct LeafPage {
    pid: PageId,
    schema: Schema,
    parent: PageId,
    left_sibling: Option<PageId>,
    right_sibling: Option<PageId>,
    tuples: Vec<Tuple>,
    dirty: Option<TransactionID>,
}

impl LeafPage {
    pub fn new(pid: PageId, bytes: &[u8], schema: Schema) -> Self {
        let mut reader = std::io::Cursor::new(bytes);
        let parent_num = u32::decode_from(&mut reader);
        let left_num = u32::decode_from(&mut reader);
        let right_num = u32::decode_from(&mut reader);

        let max = max_tuples(&schema);
        let header_len = header_bytes_for(max);
        let header = read_exact(&mut reader, header_len);

        let mut tuples = Vec::new();
        for i in 0..max {
            let record = read_exact(&mut reader, schema.size());
            if crate::io::is_bit_set(&header, i) {
                tuples.push(tuple_from_bytes(&record, &schema));
            }
        }

        for (i, t) in tuples.iter_mut().enumerate() {
            t.set_record_id(crate::storage::RecordId::new(pid, i));
        }

        LeafPage {
            pid,
            schema,
            parent: parent_id(pid.table_id, parent_num),
            left_sibling: sibling_id(pid.table_id, left_num, PageCategory::BTreeLeaf),
            right_sibling: sibling_id(pid.table_id, right_num, PageCategory::BTreeLeaf),
            tuples,
            dirty: None,
        }
    }

    pub fn empty(pid: PageId, schema: Schema, parent: PageId) -> Self {
        LeafPage {
            pid,
            schema,
            parent,
            left_sibling: None,
            right_sibling: None,
            tuples: Vec::new(),
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

    pub fn get_left_sibling_id(&self) -> Option<PageId> {
        self.left_sibling
    }

    pub fn set_left_sibling_id(&mut self, id: Option<PageId>) {
        self.left_sibling = id;
    }

    pub fn get_right_sibling_id(&self) -> Option<PageId> {
        self.right_sibling
    }

    pub fn set_right_sibling_id(&mut self, id: Option<PageId>) {
        self.right_sibling = id;
    }

    pub fn get_max_tuples(&self) -> usize {
        max_tuples(&self.schema)
    }

    pub fn get_min_tuples(&self) -> usize {
        (self.get_max_tuples() + 1) / 2
    }

    pub fn num_tuples(&self) -> usize {
        self.tuples.len()
    }

    pub fn get_num_empty_slots(&self) -> usize {
        self.get_max_tuples() - self.tuples.len()
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn key_of(&self, tuple: &Tuple, key_field: usize) -> crate::storage::Cell {
        tuple.get_cell(key_field).clone()
    }

    pub fn insert_tuple(&mut self, mut tuple: Tuple, key_field: usize) -> SmallResult {
        if !tuple.conforms_to(&self.schema) {
            return Err(SmallError::db_exception("tuple does not match leaf page schema"));
        }
        if self.tuples.len() >= self.get_max_tuples() {
            return Err(SmallError::db_exception("leaf page is full"));
        }
        let key = tuple.get_cell(key_field).clone();
        let idx = self
            .tuples
            .partition_point(|t| t.get_cell(key_field) <= &key);
        tuple.set_record_id(crate::storage::RecordId::new(self.pid, idx));
        self.tuples.insert(idx, tuple);
        self.renumber_slots();
        Ok(())
    }

    pub fn delete_tuple(&mut self, tuple: &Tuple) -> SmallResult {
        let rid = tuple
            .get_record_id()
            .ok_or_else(|| SmallError::db_exception("tuple has no record id"))?;
        if rid.page_id != self.pid {
            return Err(SmallError::db_exception("tuple does not belong to this page"));
        }
        if rid.slot_index >= self.tuples.len() {
            return Err(SmallError::db_exception("slot is already empty"));
        }
        self.tuples.remove(rid.slot_index);
        self.renumber_slots();
        Ok(())
    }

    /// Removes and returns the first `n` tuples (used when splitting:
    /// the lower half moves to a new left sibling).
    pub fn remove_front(&mut self, n: usize) -> Vec<Tuple> {
        let rest = self.tuples.split_off(n);
        let removed = std::mem::replace(&mut self.tuples, rest);
        self.renumber_slots();
        removed
    }

    pub fn remove_back(&mut self, n: usize) -> Vec<Tuple> {
        let at = self.tuples.len() - n;
        let removed = self.tuples.split_off(at);
        removed
    }

    pub fn append_back(&mut self, mut tuples: Vec<Tuple>) {
        self.tuples.append(&mut tuples);
        self.renumber_slots();
    }

    pub fn prepend_front(&mut self, mut tuples: Vec<Tuple>) {
        tuples.append(&mut self.tuples);
        self.tuples = tuples;
        self.renumber_slots();
    }

    fn renumber_slots(&mut self) {
        for (i, t) in self.tuples.iter_mut().enumerate() {
            t.set_record_id(crate::storage::RecordId::new(self.pid, i));
        }
    }

    pub fn mark_dirty(&mut self, tid: Option<TransactionID>) {
        self.dirty = tid;
    }

    pub fn is_dirty(&self) -> Option<TransactionID> {
        self.dirty
    }

    pub fn get_page_data(&self) -> Vec<u8> {
        let max = self.get_max_tuples();
        let header_len = header_bytes_for(max);
        let mut header = vec![0u8; header_len];
        for i in 0..self.tuples.len() {
            set_bit(&mut header, i);
        }

        let mut w = SmallWriter::new();
        w.write(&self.parent.page_num);
        w.write(&self.left_sibling.map(|p| p.page_num).unwrap_or(0));
        w.write(&self.right_sibling.map(|p| p.page_num).unwrap_or(0));
        w.write_bytes(&header);

        let mut body = Vec::new();
        for i in 0..max {
            if let Some(t) = self.tuples.get(i) {
                t.write_to(&self.schema, &mut body);
            } else {
                body.extend(std::iter::repeat(0u8).take(self.schema.size()));
            }
        }
        w.write_bytes(&body);
        w.to_padded_bytes(page_size())
    }
}

fn sibling_id(table_id: i32, num: u32, category: PageCategory) -> Option<PageId> {
    if num == 0 {
        None
    } else {
        Some(PageId::new(table_id, num, category))
    }
}

fn parent_id(table_id: i32, page_num: u32) -> PageId {
    if page_num == 0 {
        PageId::root_pointer(table_id)
    } else {
        PageId::new(table_id, page_num, PageCategory::BTreeInternal)
    }
}
