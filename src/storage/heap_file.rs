use std::collections::hash_map::DefaultHasher;
use std::fs::{File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use crate::buffer_pool::{AnyPage, BUFFER_POOL};
use crate::common::{page_size, Permission, TransactionID};
use crate::error::{SmallError, SmallResult};
use crate::io::create_empty_page_data;
use crate::storage::heap_page::HeapPage;
use crate::storage::page_id::{PageCategory, PageId};
use crate::storage::schema::Schema;
use crate::storage::tuple::Tuple;
use crate::utils::HandyRwLock;

/// One heap table's backing file: unordered pages, each a
/// `HeapPage`. `table_id` is a deterministic hash of the absolute path
/// alone, computed once at construction — re-opening the same path
/// always yields the same id, matching `BTreeTable`'s convention.
pub struct HeapFile {
    file_path: PathBuf,
    table_id: i32,
    schema: Schema,
    file: Mutex<File>,
}

fn stable_hash(path: &Path) -> i32 {
    let mut hasher = DefaultHasher::new();
    path.to_string_lossy().hash(&mut hasher);
    hasher.finish() as i32
}

impl HeapFile {
    pub fn new(file_path: &Path, schema: Schema) -> Self {
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

        HeapFile {
            file_path: file_path.to_path_buf(),
            table_id,
            schema,
            file: Mutex::new(file),
        }
    }

    pub fn get_id(&self) -> i32 {
        self.table_id
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

    pub fn num_pages(&self) -> u32 {
        (self.file_len() / page_size() as u64) as u32
    }

    pub fn read_page(&self, page_num: u32) -> Result<HeapPage, SmallError> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(page_num as u64 * page_size() as u64))?;
        let mut buf = vec![0u8; page_size()];
        file.read_exact(&mut buf)
            .map_err(|_| SmallError::illegal_argument("short read fetching heap page"))?;
        let pid = PageId::new(self.table_id, page_num, PageCategory::Heap);
        Ok(HeapPage::new(pid, &buf, &self.schema))
    }

    pub fn write_page(&self, page: &HeapPage) -> SmallResult {
        let pid = page.get_id();
        let bytes = page.get_page_data();
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(pid.page_num as u64 * page_size() as u64))?;
        file.write_all(&bytes)?;
        Ok(())
    }

    fn get_page(&self, tid: TransactionID, perm: Permission, page_num: u32) -> Arc<RwLock<AnyPage>> {
        let pid = PageId::new(self.table_id, page_num, PageCategory::Heap);
        BUFFER_POOL.get_page(tid, perm, pid, || {
            AnyPage::Heap(self.read_page(page_num).expect("page within current file bounds"))
        })
    }

    /// Scans existing pages for a free slot; allocates a new page past
    /// EOF, through the buffer pool, only once every existing page is
    /// full. Returns every page this mutation touched.
    pub fn insert_tuple(
        &self,
        tid: TransactionID,
        tuple: Tuple,
    ) -> Result<Vec<Arc<RwLock<AnyPage>>>, SmallError> {
        let num_pages = self.num_pages();
        for page_num in 0..num_pages {
            let handle = self.get_page(tid, Permission::ReadWrite, page_num);
            let has_room = handle.rl().as_heap().get_num_empty_slots() > 0;
            if has_room {
                let mut guard = handle.wl();
                let page = guard.as_heap_mut();
                page.insert_tuple(tuple)?;
                guard.mark_dirty(Some(tid));
                drop(guard);
                return Ok(vec![handle]);
            }
        }

        let new_page_num = num_pages;
        let pid = PageId::new(self.table_id, new_page_num, PageCategory::Heap);
        {
            let mut file = self.file.lock().unwrap();
            file.seek(SeekFrom::Start(pid.page_num as u64 * page_size() as u64))?;
            file.write_all(&create_empty_page_data(page_size()))?;
        }
        let empty = HeapPage::new(pid, &create_empty_page_data(page_size()), &self.schema);
        let handle = BUFFER_POOL.insert_page(AnyPage::Heap(empty));
        {
            let mut guard = handle.wl();
            let page = guard.as_heap_mut();
            page.insert_tuple(tuple)?;
            guard.mark_dirty(Some(tid));
        }
        Ok(vec![handle])
    }

    pub fn delete_tuple(
        &self,
        tid: TransactionID,
        tuple: &Tuple,
    ) -> Result<Arc<RwLock<AnyPage>>, SmallError> {
        let rid = tuple
            .get_record_id()
            .ok_or_else(|| SmallError::db_exception("tuple has no record id"))?;
        let handle = self.get_page(tid, Permission::ReadWrite, rid.page_id.page_num);
        {
            let mut guard = handle.wl();
            guard.as_heap_mut().delete_tuple(tuple)?;
            guard.mark_dirty(Some(tid));
        }
        Ok(handle)
    }

    pub fn iterator(&self, tid: TransactionID) -> HeapFileIterator<'_> {
        HeapFileIterator::new(self, tid)
    }
}

/// Page-by-page forward scan. `rewind()` restarts it from page 0;
/// `next()` before the first `open()`/`rewind()` call yields nothing.
pub struct HeapFileIterator<'a> {
    file: &'a HeapFile,
    tid: TransactionID,
    page_num: u32,
    num_pages: u32,
    current: Option<crate::storage::heap_page::HeapPageIterator>,
    opened: bool,
}

impl<'a> HeapFileIterator<'a> {
    fn new(file: &'a HeapFile, tid: TransactionID) -> Self {
        HeapFileIterator {
            file,
            tid,
            page_num: 0,
            num_pages: file.num_pages(),
            current: None,
            opened: false,
        }
    }

    pub fn open(&mut self) {
        self.opened = true;
        self.page_num = 0;
        self.num_pages = self.file.num_pages();
        self.current = None;
    }

    pub fn rewind(&mut self) {
        self.open();
    }

    fn advance_page(&mut self) -> bool {
        if self.page_num >= self.num_pages {
            return false;
        }
        let handle = self.file.get_page(self.tid, Permission::ReadOnly, self.page_num);
        let iter = handle.rl().as_heap().iterator();
        self.current = Some(iter);
        self.page_num += 1;
        true
    }
}

impl<'a> Iterator for HeapFileIterator<'a> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Tuple> {
        if !self.opened || self.num_pages == 0 {
            return None;
        }
        loop {
            if let Some(iter) = self.current.as_mut() {
                if let Some(tuple) = iter.next() {
                    return Some(tuple);
                }
            }
            if !self.advance_page() {
                return None;
            }
        }
    }
}
