use std::collections::hash_map::DefaultHasher;
use std::fs::{File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use log::debug;

use crate::buffer_pool::{AnyPage, BUFFER_POOL};
use crate::common::{page_size, Permission, TransactionID, ROOT_POINTER_PAGE_SIZE};
use crate::error::SmallResult;
use crate::io::create_empty_page_data;
use crate::storage::{PageCategory, PageId, Schema};
use crate::utils::HandyRwLock;

use super::header_page::slots_per_header;
use super::{record_dirty, DirtyPages, HeaderPage, InternalPage, LeafPage, RootPointerPage};

/// One B+-tree index file. `table_id` is a deterministic hash of the
/// absolute path alone — computed once here, never salted by wall-clock
/// time, so re-opening the same path always yields the same id.
pub struct BTreeTable {
    file_path: PathBuf,
    table_id: i32,
    key_field: usize,
    schema: Schema,
    file: Mutex<File>,
}

fn stable_hash(path: &Path) -> i32 {
    let mut hasher = DefaultHasher::new();
    path.to_string_lossy().hash(&mut hasher);
    hasher.finish() as i32
}

fn page_offset(page_num: u32) -> u64 {
    if page_num == 0 {
        0
    } else {
        (ROOT_POINTER_PAGE_SIZE + (page_num as usize - 1) * page_size()) as u64
    }
}

impl BTreeTable {
    pub fn new(file_path: &Path, key_field: usize, schema: Schema) -> Self {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(file_path)
            .unwrap_or_else(|e| panic!("failed to open {}: {}", file_path.display(), e));

        let table_id = stable_hash(
            &file_path
                .canonicalize()
                .unwrap_or_else(|_| file_path.to_path_buf()),
        );

        let table = BTreeTable {
            file_path: file_path.to_path_buf(),
            table_id,
            key_field,
            schema,
            file: Mutex::new(file),
        };

        if table.file_len() == 0 {
            table.write_page_bytes(0, &create_empty_page_data(ROOT_POINTER_PAGE_SIZE));
        }

        table
    }

    pub fn get_id(&self) -> i32 {
        self.table_id
    }

    pub fn get_key_field(&self) -> usize {
        self.key_field
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_file_path(&self) -> &Path {
        &self.file_path
    }

    fn file_len(&self) -> u64 {
        self.file.lock().unwrap().metadata().unwrap().len()
    }

    /// Number of non-root-pointer pages currently on disk.
    pub fn pages_count(&self) -> u32 {
        let len = self.file_len();
        if len <= ROOT_POINTER_PAGE_SIZE as u64 {
            0
        } else {
            ((len - ROOT_POINTER_PAGE_SIZE as u64) / page_size() as u64) as u32
        }
    }

    fn read_page_bytes(&self, page_num: u32, len: usize) -> Vec<u8> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(page_offset(page_num))).unwrap();
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).unwrap();
        buf
    }

    fn write_page_bytes(&self, page_num: u32, bytes: &[u8]) {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(page_offset(page_num))).unwrap();
        file.write_all(bytes).unwrap();
    }

    pub fn root_ptr_id(&self) -> PageId {
        PageId::root_pointer(self.table_id)
    }

    pub fn get_root_ptr_page(&self) -> Arc<RwLock<AnyPage>> {
        let pid = self.root_ptr_id();
        BUFFER_POOL.get_page(TransactionID::new(), Permission::ReadOnly, pid, || {
            let bytes = self.read_page_bytes(0, ROOT_POINTER_PAGE_SIZE);
            AnyPage::RootPtr(RootPointerPage::new(pid, &bytes))
        })
    }

    /// Current root page id, allocating a fresh empty leaf and wiring it
    /// into the root-pointer page if the tree has none yet. This only
    /// ever fires once per table, before any header page exists (the
    /// root leaf is never freed back to the allocator even when
    /// empty), so allocating its page number by plain append rather
    /// than through the tracked allocator cannot collide with a
    /// header-bitmap range.
    pub fn get_root_pid(&self, tid: TransactionID, dirty: &mut DirtyPages) -> PageId {
        let root_ptr = self.get_root_ptr_page();
        let existing = root_ptr.rl().as_root_ptr().get_root_id();
        if let Some(pid) = existing {
            return pid;
        }

        let leaf_pid = self.alloc_page_no(PageCategory::BTreeLeaf);
        let leaf = LeafPage::empty(leaf_pid, self.schema.clone(), self.root_ptr_id());
        let handle = BUFFER_POOL.insert_page(AnyPage::Leaf(leaf));
        handle.wl().mark_dirty(Some(tid));
        record_dirty(dirty, handle);

        root_ptr.wl().as_root_ptr_mut().set_root_id(leaf_pid);
        root_ptr.wl().mark_dirty(Some(tid));
        record_dirty(dirty, root_ptr);
        debug!("table {}: initialized empty root leaf {}", self.table_id, leaf_pid);
        leaf_pid
    }

    pub fn get_page(&self, tid: TransactionID, perm: Permission, pid: PageId) -> Arc<RwLock<AnyPage>> {
        if pid.category == PageCategory::BTreeRootPtr {
            return self.get_root_ptr_page();
        }
        BUFFER_POOL.get_page(tid, perm, pid, || self.load_page(pid))
    }

    fn load_page(&self, pid: PageId) -> AnyPage {
        let bytes = self.read_page_bytes(pid.page_num, page_size());
        match pid.category {
            PageCategory::BTreeHeader => AnyPage::Header(HeaderPage::new(pid, &bytes)),
            PageCategory::BTreeInternal => {
                AnyPage::Internal(InternalPage::new(pid, &bytes, self.key_type()))
            }
            PageCategory::BTreeLeaf => AnyPage::Leaf(LeafPage::new(pid, &bytes, self.schema.clone())),
            other => panic!("unexpected page category for a B+-tree file: {:?}", other),
        }
    }

    pub fn key_type(&self) -> crate::storage::Type {
        self.schema.fields[self.key_field].field_type
    }

    pub fn write_page(&self, page: &AnyPage) -> SmallResult {
        let pid = page.get_id();
        let bytes = page.get_page_data();
        self.write_page_bytes(pid.page_num, &bytes);
        Ok(())
    }

    /// Appends a brand-new zeroed page at EOF and returns its id — used
    /// by the allocator when no freed page number is available.
    pub fn alloc_page_no(&self, category: PageCategory) -> PageId {
        let next = self.pages_count() + 1;
        self.write_page_bytes(next, &create_empty_page_data(page_size()));
        PageId::new(self.table_id, next, category)
    }

    /// Zeros the on-disk region for `page_no`, extending the file if
    /// the number falls beyond the current end.
    pub fn zero_page_region(&self, page_no: u32) {
        self.write_page_bytes(page_no, &create_empty_page_data(page_size()));
    }

    pub fn slots_per_header(&self) -> usize {
        slots_per_header()
    }
}
