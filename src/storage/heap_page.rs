use crate::common::{page_size, TransactionID};
use crate::error::{SmallError, SmallResult};
use crate::io::{compute_slot_count, header_bytes_for, is_bit_set, clear_bit, set_bit};
use crate::storage::page_id::{PageCategory, PageId};
use crate::storage::schema::Schema;
use crate::storage::tuple::{tuple_from_bytes, RecordId, Tuple};

/// Fixed-layout unordered slotted page. Byte layout: `[header bitmap,
/// LSB-first][tuple slots][zero padding]`.
pub struct HeapPage {
    pid: PageId,
    schema: Schema,
    header: Vec<u8>,
    num_slots: usize,
    tuple_size: usize,
    slots: Vec<Option<Tuple>>,
    before_image: Vec<u8>,
    dirty: Option<TransactionID>,
}

pub fn num_slots_for(schema: &Schema) -> usize {
    compute_slot_count(page_size(), schema.size())
}

impl HeapPage {
    /// Decodes header bytes then slot bytes; empty slots still consume
    /// `tupleSize` bytes that are read and discarded so slot offsets
    /// stay invariant. Installs the before-image from the re-encoded
    /// bytes (not the input bytes) so a subsequent `get_before_image`
    /// is guaranteed to decode cleanly.
    pub fn new(pid: PageId, bytes: &[u8], schema: &Schema) -> Self {
        let tuple_size = schema.size();
        let num_slots = num_slots_for(schema);
        let header_len = header_bytes_for(num_slots);

        let header = bytes[0..header_len].to_vec();
        let mut slots = Vec::with_capacity(num_slots);

        let mut offset = header_len;
        for i in 0..num_slots {
            let slot_bytes = &bytes[offset..offset + tuple_size];
            if is_bit_set(&header, i) {
                let mut tuple = tuple_from_bytes(slot_bytes, schema);
                tuple.set_record_id(RecordId::new(pid, i));
                slots.push(Some(tuple));
            } else {
                slots.push(None);
            }
            offset += tuple_size;
        }

        let mut page = HeapPage {
            pid,
            schema: schema.clone(),
            header,
            num_slots,
            tuple_size,
            slots,
            before_image: Vec::new(),
            dirty: None,
        };
        page.before_image = page.get_page_data();
        page
    }

    pub fn get_id(&self) -> PageId {
        self.pid
    }

    /// Re-encodes to a buffer of exactly `pageSize` bytes. Must
    /// satisfy round-trip identity with `new(pid, get_page_data())`.
    pub fn get_page_data(&self) -> Vec<u8> {
        let mut buf = self.header.clone();
        for slot in &self.slots {
            let start = buf.len();
            match slot {
                Some(tuple) => tuple.write_to(&self.schema, &mut buf),
                None => buf.resize(start + self.tuple_size, 0),
            }
        }
        buf.resize(page_size(), 0);
        buf
    }

    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> SmallResult {
        if !tuple.conforms_to(&self.schema) {
            return Err(SmallError::db_exception(
                "tuple does not conform to this page's schema",
            ));
        }
        let slot = (0..self.num_slots)
            .find(|&i| self.slots[i].is_none())
            .ok_or_else(|| SmallError::db_exception("heap page is full"))?;

        set_bit(&mut self.header, slot);
        tuple.set_record_id(RecordId::new(self.pid, slot));
        self.slots[slot] = Some(tuple);
        Ok(())
    }

    pub fn delete_tuple(&mut self, tuple: &Tuple) -> SmallResult {
        let rid = tuple
            .get_record_id()
            .ok_or_else(|| SmallError::db_exception("tuple has no record id"))?;
        if rid.page_id != self.pid {
            return Err(SmallError::db_exception(
                "tuple's record id does not belong to this page",
            ));
        }
        if self.slots[rid.slot_index].is_none() {
            return Err(SmallError::db_exception("slot is already empty"));
        }
        clear_bit(&mut self.header, rid.slot_index);
        self.slots[rid.slot_index] = None;
        Ok(())
    }

    /// Snapshots occupied slots at construction time: mutating the
    /// page after calling this does not affect the tuples already
    /// yielded, and a cleared slot cannot surface mid-iteration.
    pub fn iterator(&self) -> HeapPageIterator {
        HeapPageIterator {
            tuples: self.slots.iter().filter_map(|s| s.clone()).collect(),
            pos: 0,
        }
    }

    pub fn get_num_empty_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    pub fn get_num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn is_slot_used(&self, i: usize) -> bool {
        self.slots[i].is_some()
    }

    pub fn mark_dirty(&mut self, tid: Option<TransactionID>) {
        self.dirty = tid;
    }

    pub fn is_dirty(&self) -> Option<TransactionID> {
        self.dirty
    }

    pub fn get_before_image(&self) -> HeapPage {
        HeapPage::new(self.pid, &self.before_image, &self.schema)
    }
}

#[derive(Clone)]
pub struct HeapPageIterator {
    tuples: Vec<Tuple>,
    pos: usize,
}

impl Iterator for HeapPageIterator {
    type Item = Tuple;

    fn next(&mut self) -> Option<Tuple> {
        let item = self.tuples.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }
}

