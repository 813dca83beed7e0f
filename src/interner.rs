//! Variable name interning.
//!
//! The original runtime relies on the instrumenter handing it pointers
//! into an intern table it doesn't own, so pointer equality on `char*`
//! implies string equality on the hot path (see Design Notes,
//! "Variable-name pointer identity"). Rust has no safe equivalent of
//! comparing raw caller-owned pointers, so this runtime owns the intern
//! table itself: callers pass `&str`, get back a cheap-to-clone
//! [`VarName`] handle, and two handles compare equal in O(1) via
//! `Arc::ptr_eq` without ever touching the bytes.

use std::collections::hash_map::Entry;
use std::sync::Arc;

use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct VarName(Arc<str>);

impl VarName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pointer identity, the same comparison the original runtime performs
    /// on interned `char*` values.
    pub fn ptr_eq(&self, other: &VarName) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// A stable ordering key for the pointer, used to compare variable
    /// names by address in the dependence total order.
    pub fn ptr_key(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for VarName {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}
impl Eq for VarName {}

#[derive(Debug, Default)]
pub struct Interner {
    table: FxHashMap<Box<str>, Arc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> VarName {
        match self.table.entry(name.into()) {
            Entry::Occupied(e) => VarName(e.get().clone()),
            Entry::Vacant(e) => {
                let arc: Arc<str> = Arc::from(name);
                e.insert(arc.clone());
                VarName(arc)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
