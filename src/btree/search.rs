use std::sync::{Arc, RwLock};

use crate::buffer_pool::AnyPage;
use crate::common::{Permission, TransactionID};
use crate::storage::{Cell, PageCategory, Tuple};
use crate::utils::HandyRwLock;

use super::table::BTreeTable;
use super::DirtyPages;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Equals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
}

#[derive(Debug, Clone)]
pub struct Predicate {
    pub field_index: usize,
    pub op: Op,
    pub operand: Cell,
}

impl Predicate {
    pub fn new(field_index: usize, op: Op, operand: Cell) -> Self {
        Self {
            field_index,
            op,
            operand,
        }
    }

    fn matches(&self, tuple: &Tuple) -> bool {
        let field = tuple.get_cell(self.field_index);
        match self.op {
            Op::Equals => field == &self.operand,
            Op::GreaterThan => field > &self.operand,
            Op::GreaterThanOrEq => field >= &self.operand,
            Op::LessThan => field < &self.operand,
            Op::LessThanOrEq => field <= &self.operand,
        }
    }
}

/// Descends from `root_id` to the leaf that would hold `key` (or the
/// left-most leaf when `key` is `None`), fetching the requested
/// permission only on the leaf itself — internal pages along the path
/// are always read-only, since structural writes are handled by the
/// insert/delete modules via their own parent re-fetches.
pub fn find_leaf_page(
    table: &BTreeTable,
    tid: TransactionID,
    root_id: crate::storage::PageId,
    perm: Permission,
    key: Option<&Cell>,
) -> Arc<RwLock<AnyPage>> {
    let mut pid = root_id;
    loop {
        if pid.category == PageCategory::BTreeLeaf {
            return table.get_page(tid, perm, pid);
        }

        let page = table.get_page(tid, Permission::ReadOnly, pid);
        let guard = page.rl();
        let internal = guard.as_internal();

        let next = match key {
            None => internal.entries()[0].left_child,
            Some(k) => {
                let entries = internal.entries();
                match entries.iter().find(|e| &e.key >= k) {
                    Some(e) => {
                        if k <= &e.key {
                            e.left_child
                        } else {
                            e.right_child
                        }
                    }
                    None => entries[entries.len() - 1].right_child,
                }
            }
        };
        drop(guard);
        pid = next;
    }
}

/// Forward in-order scan: left-most leaf, then follows `rightSibling`.
pub struct BTreeTableIterator<'a> {
    table: &'a BTreeTable,
    tid: TransactionID,
    current: Vec<Tuple>,
    pos: usize,
    next_leaf: Option<crate::storage::PageId>,
}

impl<'a> BTreeTableIterator<'a> {
    pub fn new(table: &'a BTreeTable, tid: TransactionID) -> Self {
        let mut dirty = DirtyPages::new();
        let root = table.get_root_pid(tid, &mut dirty);
        let leaf = find_leaf_page(table, tid, root, Permission::ReadOnly, None);
        let guard = leaf.rl();
        let leaf_page = guard.as_leaf();
        let current = leaf_page.tuples().to_vec();
        let next_leaf = leaf_page.get_right_sibling_id();
        drop(guard);

        BTreeTableIterator {
            table,
            tid,
            current,
            pos: 0,
            next_leaf,
        }
    }
}

impl<'a> Iterator for BTreeTableIterator<'a> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Tuple> {
        if self.pos >= self.current.len() {
            let next_pid = self.next_leaf?;
            let leaf = self.table.get_page(self.tid, Permission::ReadOnly, next_pid);
            let guard = leaf.rl();
            let leaf_page = guard.as_leaf();
            self.current = leaf_page.tuples().to_vec();
            self.next_leaf = leaf_page.get_right_sibling_id();
            drop(guard);
            self.pos = 0;
            if self.current.is_empty() {
                return None;
            }
        }
        let item = self.current[self.pos].clone();
        self.pos += 1;
        Some(item)
    }
}

/// Predicate-driven scan. Descends with the predicate's probe key when
/// the operator can exploit sort order (`=`, `>`, `≥`), otherwise scans
/// from the left-most leaf; short-circuits once it is certain no later
/// tuple can match.
pub struct BTreeTableSearchIterator<'a> {
    inner: BTreeTableIterator<'a>,
    predicate: Predicate,
    done: bool,
}

impl<'a> BTreeTableSearchIterator<'a> {
    pub fn new(table: &'a BTreeTable, tid: TransactionID, predicate: Predicate) -> Self {
        let probe_key = match predicate.op {
            Op::Equals | Op::GreaterThan | Op::GreaterThanOrEq => Some(predicate.operand.clone()),
            Op::LessThan | Op::LessThanOrEq => None,
        };

        let mut dirty = DirtyPages::new();
        let root = table.get_root_pid(tid, &mut dirty);
        let leaf = find_leaf_page(table, tid, root, Permission::ReadOnly, probe_key.as_ref());
        let guard = leaf.rl();
        let leaf_page = guard.as_leaf();
        let current = leaf_page.tuples().to_vec();
        let next_leaf = leaf_page.get_right_sibling_id();
        drop(guard);

        let inner = BTreeTableIterator {
            table,
            tid,
            current,
            pos: 0,
            next_leaf,
        };

        BTreeTableSearchIterator {
            inner,
            predicate,
            done: false,
        }
    }
}

impl<'a> Iterator for BTreeTableSearchIterator<'a> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Tuple> {
        if self.done {
            return None;
        }
        while let Some(tuple) = self.inner.next() {
            let key = tuple.get_cell(self.predicate.field_index);
            match self.predicate.op {
                Op::LessThan if key >= &self.predicate.operand => {
                    self.done = true;
                    return None;
                }
                Op::LessThanOrEq if key > &self.predicate.operand => {
                    self.done = true;
                    return None;
                }
                Op::Equals if key > &self.predicate.operand => {
                    self.done = true;
                    return None;
                }
                _ => {}
            }
            if self.predicate.matches(&tuple) {
                return Some(tuple);
            }
        }
        self.done = true;
        None
    }
}
