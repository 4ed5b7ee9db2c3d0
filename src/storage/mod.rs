pub mod heap_file;
pub mod heap_file_encoder;
pub mod heap_page;
pub mod page_id;
pub mod schema;
pub mod tuple;

pub use heap_file_encoder::{encode_csv, encode_csv_file};
pub use page_id::{PageCategory, PageId};
pub use schema::{int_schema, FieldItem, Schema, Type, STRING_LEN};
pub use tuple::{Cell, RecordId, Tuple};
