use std::sync::atomic::{AtomicUsize, Ordering};

pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// The root-pointer page's fixed, distinct size. It never scales with
/// the configurable page size — its contents are three small fields
/// plus padding, not a slot array.
pub const ROOT_POINTER_PAGE_SIZE: usize = 128;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// The page size every heap/B+-tree page (other than the root-pointer
/// page) is encoded at. Global and mutable so tests can shrink it to
/// exercise splits/merges without generating huge fixtures.
pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::Relaxed)
}

pub fn set_page_size(size: usize) {
    PAGE_SIZE.store(size, Ordering::Relaxed);
}
