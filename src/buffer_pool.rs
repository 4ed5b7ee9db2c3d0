use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use once_cell::sync::Lazy;

use crate::btree::{HeaderPage, InternalPage, LeafPage, RootPointerPage};
use crate::common::{Permission, TransactionID};
use crate::storage::{HeapPage, PageCategory, PageId};

/// A tagged wrapper around every concrete page type, so one cache can
/// hold heap pages and every B+-tree page category side by side,
/// keyed by the same `PageId`.
pub enum AnyPage {
    Heap(HeapPage),
    RootPtr(RootPointerPage),
    Header(HeaderPage),
    Internal(InternalPage),
    Leaf(LeafPage),
}

impl AnyPage {
    pub fn get_id(&self) -> PageId {
        match self {
            AnyPage::Heap(p) => p.get_id(),
            AnyPage::RootPtr(p) => p.get_id(),
            AnyPage::Header(p) => p.get_id(),
            AnyPage::Internal(p) => p.get_id(),
            AnyPage::Leaf(p) => p.get_id(),
        }
    }

    pub fn mark_dirty(&mut self, tid: Option<TransactionID>) {
        match self {
            AnyPage::Heap(p) => p.mark_dirty(tid),
            AnyPage::RootPtr(p) => p.mark_dirty(tid),
            AnyPage::Header(p) => p.mark_dirty(tid),
            AnyPage::Internal(p) => p.mark_dirty(tid),
            AnyPage::Leaf(p) => p.mark_dirty(tid),
        }
    }

    pub fn get_page_data(&self) -> Vec<u8> {
        match self {
            AnyPage::Heap(p) => p.get_page_data(),
            AnyPage::RootPtr(p) => p.get_page_data(),
            AnyPage::Header(p) => p.get_page_data(),
            AnyPage::Internal(p) => p.get_page_data(),
            AnyPage::Leaf(p) => p.get_page_data(),
        }
    }

    pub fn as_heap(&self) -> &HeapPage {
        match self {
            AnyPage::Heap(p) => p,
            _ => panic!("page {} is not a heap page", self.get_id()),
        }
    }

    pub fn as_heap_mut(&mut self) -> &mut HeapPage {
        match self {
            AnyPage::Heap(p) => p,
            _ => panic!("page is not a heap page"),
        }
    }

    pub fn as_root_ptr(&self) -> &RootPointerPage {
        match self {
            AnyPage::RootPtr(p) => p,
            _ => panic!("page is not a root-pointer page"),
        }
    }

    pub fn as_root_ptr_mut(&mut self) -> &mut RootPointerPage {
        match self {
            AnyPage::RootPtr(p) => p,
            _ => panic!("page is not a root-pointer page"),
        }
    }

    pub fn as_header(&self) -> &HeaderPage {
        match self {
            AnyPage::Header(p) => p,
            _ => panic!("page is not a header page"),
        }
    }

    pub fn as_header_mut(&mut self) -> &mut HeaderPage {
        match self {
            AnyPage::Header(p) => p,
            _ => panic!("page is not a header page"),
        }
    }

    pub fn as_internal(&self) -> &InternalPage {
        match self {
            AnyPage::Internal(p) => p,
            _ => panic!("page is not an internal page"),
        }
    }

    pub fn as_internal_mut(&mut self) -> &mut InternalPage {
        match self {
            AnyPage::Internal(p) => p,
            _ => panic!("page is not an internal page"),
        }
    }

    pub fn as_leaf(&self) -> &LeafPage {
        match self {
            AnyPage::Leaf(p) => p,
            _ => panic!("page is not a leaf page"),
        }
    }

    pub fn as_leaf_mut(&mut self) -> &mut LeafPage {
        match self {
            AnyPage::Leaf(p) => p,
            _ => panic!("page is not a leaf page"),
        }
    }
}

type Bucket = Mutex<HashMap<PageId, Arc<RwLock<AnyPage>>>>;

/// Process-wide page cache. One bucket per category, each independently
/// lockable, mirroring the host repo's per-category cache split. Locking
/// is per-page (`RwLock<AnyPage>`), not per-`(tid, pageId)` — there is
/// no deadlock detection, same as the host repo's single-page-at-a-time
/// protocol.
pub struct BufferPool {
    heap: Bucket,
    root_ptr: Bucket,
    header: Bucket,
    internal: Bucket,
    leaf: Bucket,
}

impl BufferPool {
    fn new() -> Self {
        BufferPool {
            heap: Mutex::new(HashMap::new()),
            root_ptr: Mutex::new(HashMap::new()),
            header: Mutex::new(HashMap::new()),
            internal: Mutex::new(HashMap::new()),
            leaf: Mutex::new(HashMap::new()),
        }
    }

    fn bucket(&self, category: PageCategory) -> &Bucket {
        match category {
            PageCategory::Heap => &self.heap,
            PageCategory::BTreeRootPtr => &self.root_ptr,
            PageCategory::BTreeHeader => &self.header,
            PageCategory::BTreeInternal => &self.internal,
            PageCategory::BTreeLeaf => &self.leaf,
        }
    }

    /// Looks up `pid`, loading it via `loader` on a cache miss. `tid`
    /// and `perm` name the caller's intent (matching the spec's framing
    /// of the pool as keyed by transaction + page + permission); the
    /// caller is expected to take `.rl()`/`.wl()` on the returned handle
    /// according to `perm`.
    pub fn get_page<F>(&self, _tid: TransactionID, _perm: Permission, pid: PageId, loader: F) -> Arc<RwLock<AnyPage>>
    where
        F: FnOnce() -> AnyPage,
    {
        let bucket = self.bucket(pid.category);
        let mut map = bucket.lock().unwrap();
        map.entry(pid)
            .or_insert_with(|| Arc::new(RwLock::new(loader())))
            .clone()
    }

    /// Installs a freshly allocated page directly, atomically with its
    /// zeroed on-disk write (see the allocator's `get_empty_page`) — no
    /// window exists where the page exists on disk but not in the cache.
    pub fn insert_page(&self, page: AnyPage) -> Arc<RwLock<AnyPage>> {
        let pid = page.get_id();
        let bucket = self.bucket(pid.category);
        let handle = Arc::new(RwLock::new(page));
        bucket.lock().unwrap().insert(pid, handle.clone());
        handle
    }

    pub fn discard_page(&self, pid: PageId) {
        self.bucket(pid.category).lock().unwrap().remove(&pid);
    }

    pub fn clear(&self) {
        self.heap.lock().unwrap().clear();
        self.root_ptr.lock().unwrap().clear();
        self.header.lock().unwrap().clear();
        self.internal.lock().unwrap().clear();
        self.leaf.lock().unwrap().clear();
    }
}

pub static BUFFER_POOL: Lazy<BufferPool> = Lazy::new(BufferPool::new);
