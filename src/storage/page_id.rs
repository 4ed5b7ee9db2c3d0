use std::fmt;

/// The tagged variant every page's identity carries. Dispatch on this
/// tag happens at fetch time: it selects which buffer-pool bucket and
/// which on-disk decoder to use. Heap and B+-tree pages share one id
/// type instead of each table kind owning its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageCategory {
    Heap,
    BTreeRootPtr,
    BTreeHeader,
    BTreeInternal,
    BTreeLeaf,
}

impl PageCategory {
    pub fn to_byte(&self) -> u8 {
        match self {
            PageCategory::BTreeRootPtr => 0,
            PageCategory::BTreeHeader => 1,
            PageCategory::BTreeInternal => 2,
            PageCategory::BTreeLeaf => 3,
            PageCategory::Heap => 4,
        }
    }

    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => PageCategory::BTreeRootPtr,
            1 => PageCategory::BTreeHeader,
            2 => PageCategory::BTreeInternal,
            3 => PageCategory::BTreeLeaf,
            4 => PageCategory::Heap,
            _ => panic!("invalid page category byte: {}", b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub table_id: i32,
    pub page_num: u32,
    pub category: PageCategory,
}

impl PageId {
    pub fn new(table_id: i32, page_num: u32, category: PageCategory) -> Self {
        Self {
            table_id,
            page_num,
            category,
        }
    }

    pub fn root_pointer(table_id: i32) -> Self {
        Self::new(table_id, 0, PageCategory::BTreeRootPtr)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "PageId(table: {}, num: {}, cat: {:?})",
            self.table_id, self.page_num, self.category
        )
    }
}
