use crate::common::{TransactionID, ROOT_POINTER_PAGE_SIZE};
use crate::io::{read_exact, Decodeable, Encodeable, SmallWriter};
use crate::storage::{PageCategory, PageId};

/// The sole instance per tree, at file offset 0. Contents: root page
/// id (nullable) and first header page id (nullable), zero-padded to
/// a fixed size distinct from every other page category.
pub struct RootPointerPage {
    pid: PageId,
    root_id: Option<PageId>,
    header_id: Option<PageId>,
    dirty: Option<TransactionID>,
}

impl RootPointerPage {
    pub fn new(pid: PageId, bytes: &[u8]) -> Self {
        let mut reader = std::io::Cursor::new(bytes);
        let root_num = u32::decode_from(&mut reader);
        let root_cat = read_exact(&mut reader, 1)[0];
        let header_num = u32::decode_from(&mut reader);

        let root_id = if root_num == 0 {
            None
        } else {
            Some(PageId::new(pid.table_id, root_num, PageCategory::from_byte(root_cat)))
        };
        let header_id = if header_num == 0 {
            None
        } else {
            Some(PageId::new(pid.table_id, header_num, PageCategory::BTreeHeader))
        };

        RootPointerPage {
            pid,
            root_id,
            header_id,
            dirty: None,
        }
    }

    pub fn empty(pid: PageId) -> Self {
        RootPointerPage {
            pid,
            root_id: None,
            header_id: None,
            dirty: None,
        }
    }

    pub fn get_id(&self) -> PageId {
        self.pid
    }

    pub fn get_root_id(&self) -> Option<PageId> {
        self.root_id
    }

    pub fn set_root_id(&mut self, id: PageId) {
        self.root_id = Some(id);
    }

    pub fn get_header_id(&self) -> Option<PageId> {
        self.header_id
    }

    pub fn set_header_id(&mut self, id: PageId) {
        self.header_id = Some(id);
    }

    pub fn mark_dirty(&mut self, tid: Option<TransactionID>) {
        self.dirty = tid;
    }

    pub fn is_dirty(&self) -> Option<TransactionID> {
        self.dirty
    }

    pub fn get_page_data(&self) -> Vec<u8> {
        let mut w = SmallWriter::new();
        match self.root_id {
            Some(pid) => {
                w.write(&pid.page_num);
                w.write(&pid.category.to_byte());
            }
            None => {
                w.write(&0u32);
                w.write(&0u8);
            }
        }
        match self.header_id {
            Some(pid) => w.write(&pid.page_num),
            None => w.write(&0u32),
        }
        w.to_padded_bytes(ROOT_POINTER_PAGE_SIZE)
    }
}
