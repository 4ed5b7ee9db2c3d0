/// The permission a caller requests when fetching a page from the
/// buffer pool. `ReadOnly` takes a shared lock; `ReadWrite` takes an
/// exclusive one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    pub fn is_read_only(&self) -> bool {
        matches!(self, Permission::ReadOnly)
    }
}
