use std::cmp::Ordering;
use std::fmt;
use std::io::Cursor;

use crate::io::{read_exact, Decodeable, Encodeable};
use crate::storage::page_id::PageId;
use crate::storage::schema::{Schema, Type};

/// A single field value. Comparing or ordering two cells of different
/// variants is a schema-invariant violation, not a recoverable
/// condition, so it panics rather than returning an error.
#[derive(Debug, Clone)]
pub enum Cell {
    Int(i32),
    Str(String),
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Int(a), Cell::Int(b)) => a == b,
            (Cell::Str(a), Cell::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Cell::Int(a), Cell::Int(b)) => a.cmp(b),
            (Cell::Str(a), Cell::Str(b)) => a.cmp(b),
            _ => panic!("cannot compare cells of mismatched field types"),
        }
    }
}

impl Encodeable for Cell {
    fn encode(&self) -> Vec<u8> {
        match self {
            Cell::Int(v) => v.to_le_bytes().to_vec(),
            Cell::Str(s) => {
                let mut buf = Vec::new();
                buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
                buf.extend_from_slice(s.as_bytes());
                buf
            }
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// (page id, slot index), uniquely identifying a tuple on disk. Unset
/// on construction; assigned when the tuple is inserted into a page;
/// cleared/reassigned on delete/move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot_index: usize,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_index: usize) -> Self {
        Self { page_id, slot_index }
    }
}

#[derive(Debug, Clone)]
pub struct Tuple {
    cells: Vec<Cell>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            record_id: None,
        }
    }

    /// Decodes one tuple's worth of bytes according to `schema`,
    /// honoring the `String` length-prefix-plus-padding rule: a field
    /// declared `String(n)` always consumes exactly `4 + n` bytes,
    /// regardless of how long the encoded string actually is.
    pub fn read_from<R: std::io::Read>(reader: &mut R, schema: &Schema) -> Self {
        let mut cells = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            match field.field_type {
                Type::Int => {
                    let v = i32::decode_from(reader);
                    cells.push(Cell::Int(v));
                }
                Type::String(n) => {
                    let len = u32::decode_from(reader) as usize;
                    let bytes = read_exact(reader, n);
                    let s = String::from_utf8_lossy(&bytes[..len.min(n)]).to_string();
                    cells.push(Cell::Str(s));
                }
            }
        }
        Tuple {
            cells,
            record_id: None,
        }
    }

    pub fn write_to(&self, schema: &Schema, buf: &mut Vec<u8>) {
        for (cell, field) in self.cells.iter().zip(schema.fields.iter()) {
            match (cell, field.field_type) {
                (Cell::Int(v), Type::Int) => {
                    buf.extend_from_slice(&v.to_le_bytes());
                }
                (Cell::Str(s), Type::String(n)) => {
                    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
                    let mut padded = s.clone().into_bytes();
                    padded.resize(n, 0);
                    buf.extend_from_slice(&padded);
                }
                _ => panic!("tuple does not conform to schema"),
            }
        }
    }

    pub fn get_cell(&self, i: usize) -> &Cell {
        &self.cells[i]
    }

    pub fn set_cell(&mut self, i: usize, cell: Cell) {
        self.cells[i] = cell;
    }

    pub fn get_cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get_record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: RecordId) {
        self.record_id = Some(rid);
    }

    pub fn clear_record_id(&mut self) {
        self.record_id = None;
    }

    pub fn conforms_to(&self, schema: &Schema) -> bool {
        if self.cells.len() != schema.fields.len() {
            return false;
        }
        self.cells.iter().zip(schema.fields.iter()).all(|(c, f)| {
            matches!(
                (c, f.field_type),
                (Cell::Int(_), Type::Int) | (Cell::Str(_), Type::String(_))
            )
        })
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self.cells.iter().map(|c| c.to_string()).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Reads a whole tuple from a byte slice (a convenience wrapper around
/// `read_from` used by page decoders).
pub fn tuple_from_bytes(bytes: &[u8], schema: &Schema) -> Tuple {
    let mut cursor = Cursor::new(bytes);
    Tuple::read_from(&mut cursor, schema)
}
