pub mod page_size;
pub mod permissions;
pub mod transaction;

pub use page_size::{page_size, set_page_size, DEFAULT_PAGE_SIZE, ROOT_POINTER_PAGE_SIZE};
pub use permissions::Permission;
pub use transaction::TransactionID;
