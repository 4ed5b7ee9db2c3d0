//! Converts plain-text rows into the on-disk heap file format
//! `HeapFile` reads directly — an offline bulk-load path, used to
//! stand up a table's backing file from a CSV dump without going
//! through the buffer pool or any transaction at all.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use crate::common::page_size;
use crate::error::SmallResult;
use crate::io::create_empty_page_data;
use crate::storage::heap_page::HeapPage;
use crate::storage::page_id::{PageCategory, PageId};
use crate::storage::schema::{Schema, Type, STRING_LEN};
use crate::storage::tuple::{Cell, Tuple};

/// Parses one line of comma-separated field values into a tuple
/// conforming to `schema`. Every field is trimmed; integer fields are
/// then parsed, string fields truncated to `STRING_LEN`. Returns
/// `None` for a blank line, which the caller skips rather than
/// committing as an empty row.
pub fn parse_line(line: &str, schema: &Schema) -> Option<Tuple> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return None;
    }

    let mut cells = Vec::with_capacity(schema.fields.len());
    for (field, raw) in schema.fields.iter().zip(line.split(',')) {
        let raw = raw.trim();
        let cell = match field.field_type {
            Type::Int => {
                let v: i32 = raw
                    .parse()
                    .unwrap_or_else(|_| panic!("field {:?} is not a valid integer: {:?}", field.field_name, raw));
                Cell::Int(v)
            }
            Type::String(_) => {
                let mut s = raw.to_string();
                s.truncate(STRING_LEN);
                Cell::Str(s)
            }
        };
        cells.push(cell);
    }
    Some(Tuple::new(cells))
}

fn empty_heap_page(page_num: u32, schema: &Schema) -> HeapPage {
    let pid = PageId::new(0, page_num, PageCategory::Heap);
    HeapPage::new(pid, &create_empty_page_data(page_size()), schema)
}

/// Reads CSV text from `input` and writes the resulting tuples to
/// `output` as consecutive binary heap pages — each page padded to
/// `page_size()` the same way `HeapPage::get_page_data` always pads a
/// live page, so the final page comes out zero-padded for free. A
/// trailing record with no closing newline is still committed, since
/// `BufRead::lines` already yields it. If the input holds zero
/// tuples, exactly one empty page is still written.
pub fn encode_csv<R: Read, W: Write>(input: R, mut output: W, schema: &Schema) -> SmallResult {
    let mut page_num = 0u32;
    let mut page = empty_heap_page(page_num, schema);

    for line in BufReader::new(input).lines() {
        let line = line?;
        let tuple = match parse_line(&line, schema) {
            Some(t) => t,
            None => continue,
        };

        if page.insert_tuple(tuple.clone()).is_err() {
            output.write_all(&page.get_page_data())?;
            page_num += 1;
            page = empty_heap_page(page_num, schema);
            page.insert_tuple(tuple)
                .expect("a freshly emptied page has room for one tuple");
        }
    }

    output.write_all(&page.get_page_data())?;
    Ok(())
}

/// Convenience wrapper over `encode_csv` for the common case of
/// converting a CSV file on disk straight into a new heap file.
pub fn encode_csv_file(csv_path: &Path, heap_path: &Path, schema: &Schema) -> SmallResult {
    let input = File::open(csv_path)?;
    let output = File::create(heap_path)?;
    encode_csv(input, output, schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::int_schema;

    #[test]
    fn blank_lines_are_skipped_and_fields_are_trimmed() {
        let schema = int_schema(2, "c");
        assert!(parse_line("", &schema).is_none());
        assert!(parse_line("   ", &schema).is_none());

        let tuple = parse_line(" 3 , 4 ", &schema).unwrap();
        assert_eq!(tuple.get_cell(0), &Cell::Int(3));
        assert_eq!(tuple.get_cell(1), &Cell::Int(4));
    }

    #[test]
    fn string_fields_are_trimmed_and_truncated() {
        use crate::storage::schema::FieldItem;
        let schema = Schema::new(vec![FieldItem {
            field_type: Type::String(4),
            field_name: "s".to_string(),
        }]);
        let tuple = parse_line(" hello ", &schema).unwrap();
        match tuple.get_cell(0) {
            Cell::Str(s) => assert_eq!(s, "hell"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn zero_tuples_still_emit_one_empty_page() {
        crate::common::set_page_size(crate::common::DEFAULT_PAGE_SIZE);
        let schema = int_schema(2, "c");
        let mut out = Vec::new();
        encode_csv(std::io::Cursor::new(b"\n\n".to_vec()), &mut out, &schema).unwrap();
        assert_eq!(out.len(), page_size());

        let pid = PageId::new(0, 0, PageCategory::Heap);
        let page = HeapPage::new(pid, &out, &schema);
        assert_eq!(page.get_num_empty_slots(), page.get_num_slots());
    }

    #[test]
    fn a_trailing_record_without_a_newline_is_still_committed() {
        crate::common::set_page_size(crate::common::DEFAULT_PAGE_SIZE);
        let schema = int_schema(2, "c");
        let mut out = Vec::new();
        encode_csv(std::io::Cursor::new(b"1,2\n3,4".to_vec()), &mut out, &schema).unwrap();

        let pid = PageId::new(0, 0, PageCategory::Heap);
        let page = HeapPage::new(pid, &out, &schema);
        let seen: Vec<Tuple> = page.iterator().collect();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].get_cell(1), &Cell::Int(4));
    }

    #[test]
    fn pages_fill_up_and_spill_into_a_new_page() {
        crate::common::set_page_size(100);
        let schema = int_schema(2, "c");
        let mut csv = String::new();
        for v in 0..40 {
            csv.push_str(&format!("{},{}\n", v, v));
        }
        let mut out = Vec::new();
        encode_csv(std::io::Cursor::new(csv.into_bytes()), &mut out, &schema).unwrap();

        assert_eq!(out.len() % page_size(), 0);
        assert!(out.len() / page_size() > 1, "40 rows at page_size=100 must span multiple pages");
    }
}
