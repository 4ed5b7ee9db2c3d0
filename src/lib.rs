pub mod btree;
pub mod buffer_pool;
pub mod catalog;
pub mod common;
pub mod error;
pub mod io;
pub mod log;
pub mod storage;
pub mod utils;

pub use buffer_pool::{AnyPage, BufferPool, BUFFER_POOL};
pub use catalog::{Catalog, DbFile};
pub use common::{page_size, set_page_size, Permission, TransactionID};
pub use error::{ErrorKind, SmallError, SmallResult};
pub use storage::{encode_csv, encode_csv_file, Cell, PageCategory, PageId, RecordId, Schema, Tuple, Type, STRING_LEN};
