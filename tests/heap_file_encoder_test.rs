mod common;

use page_store::common::{set_page_size, TransactionID};
use page_store::storage::heap_file::HeapFile;
use page_store::storage::{encode_csv_file, int_schema, Cell};

use common::{setup, temp_path};

#[test]
fn csv_rows_load_into_a_heap_file_a_table_can_scan() {
    setup();
    let schema = int_schema(2, "c");
    let csv_path = temp_path("enc_csv");
    let heap_path = temp_path("enc_heap");
    std::fs::write(&csv_path, "1, 2\n\n3,4\n5,6").unwrap();

    encode_csv_file(&csv_path, &heap_path, &schema).unwrap();

    let file = HeapFile::new(&heap_path, schema);
    let tid = TransactionID::new();
    let mut it = file.iterator(tid);
    it.open();
    let rows: Vec<(i32, i32)> = it
        .map(|t| match (t.get_cell(0), t.get_cell(1)) {
            (Cell::Int(a), Cell::Int(b)) => (*a, *b),
            _ => unreachable!(),
        })
        .collect();

    // the blank line between the first and second records is skipped,
    // not committed as an empty row.
    assert_eq!(rows, vec![(1, 2), (3, 4), (5, 6)]);
}

#[test]
fn an_empty_csv_still_produces_one_scannable_empty_page() {
    setup();
    let schema = int_schema(2, "c");
    let csv_path = temp_path("enc_empty_csv");
    let heap_path = temp_path("enc_empty_heap");
    std::fs::write(&csv_path, "").unwrap();

    encode_csv_file(&csv_path, &heap_path, &schema).unwrap();

    let file = HeapFile::new(&heap_path, schema);
    assert_eq!(file.num_pages(), 1);

    let tid = TransactionID::new();
    let mut it = file.iterator(tid);
    it.open();
    assert!(it.next().is_none());
}

#[test]
fn many_csv_rows_spill_across_multiple_heap_pages() {
    setup();
    set_page_size(100);
    let schema = int_schema(2, "c");
    let csv_path = temp_path("enc_bulk_csv");
    let heap_path = temp_path("enc_bulk_heap");

    let mut csv = String::new();
    for v in 0..60 {
        csv.push_str(&format!("{},{}\n", v, v));
    }
    std::fs::write(&csv_path, csv).unwrap();

    encode_csv_file(&csv_path, &heap_path, &schema).unwrap();

    let file = HeapFile::new(&heap_path, schema);
    assert!(file.num_pages() > 1);

    let tid = TransactionID::new();
    let mut it = file.iterator(tid);
    it.open();
    assert_eq!(it.count(), 60);
}
