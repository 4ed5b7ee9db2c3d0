use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::btree::BTreeTable;
use crate::error::SmallError;
use crate::storage::heap_file::HeapFile;
use crate::storage::Schema;

/// Either kind of table a table id can resolve to.
pub enum DbFile {
    BTree(Arc<RwLock<BTreeTable>>),
    Heap(Arc<RwLock<HeapFile>>),
}

impl DbFile {
    pub fn get_id(&self) -> i32 {
        match self {
            DbFile::BTree(t) => t.read().unwrap().get_id(),
            DbFile::Heap(h) => h.read().unwrap().get_id(),
        }
    }

    pub fn get_schema(&self) -> Schema {
        match self {
            DbFile::BTree(t) => t.read().unwrap().get_schema().clone(),
            DbFile::Heap(h) => h.read().unwrap().get_schema().clone(),
        }
    }
}

/// Maps a table id to the file that backs it. Populated by
/// `add_table`; never attempts schema migration or persistence of its
/// own mapping, nor any on-disk catalog of its own — a process just
/// calls `add_table` for every file it opens, each session over again.
pub struct Catalog {
    tables: HashMap<i32, DbFile>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            tables: HashMap::new(),
        }
    }

    pub fn add_table(&mut self, file: DbFile) {
        let id = file.get_id();
        self.tables.insert(id, file);
    }

    pub fn get_table(&self, table_id: i32) -> Option<&DbFile> {
        self.tables.get(&table_id)
    }

    pub fn get_tuple_scheme(&self, table_id: i32) -> Result<Schema, SmallError> {
        self.tables
            .get(&table_id)
            .map(|f| f.get_schema())
            .ok_or_else(|| SmallError::db_exception("no table registered under this id"))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
