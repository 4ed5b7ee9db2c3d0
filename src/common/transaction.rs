use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// An opaque transaction token. The engine itself never inspects the
/// value; it is only ever used as a key into the buffer pool's lock
/// table. Commit/abort/log semantics live entirely outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionID(u64);

impl TransactionID {
    pub fn new() -> Self {
        TransactionID(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TransactionID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "tx_{}", self.0)
    }
}
