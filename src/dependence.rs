//! Dependence records and the per-sink dependence set.
//!
//! Two dependences are equal iff `(kind, source_lid, var_name)` are equal,
//! where `var_name` equality is the interner's pointer identity (see
//! `interner.rs`). The same triple defines the total order used to
//! deduplicate and to produce deterministic output.

use std::collections::BTreeSet;

use crate::interner::VarName;
use crate::signature::Lid;

/// Declaration order here is the comparison order used by [`Dependence`]'s
/// `Ord` impl; it must match the canonical output ordering exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DepKind {
    Raw,
    War,
    Waw,
    Init,
    RawIi0,
    RawIi1,
    RawIi2,
    WarIi0,
    WarIi1,
    WarIi2,
    WawIi0,
    WawIi1,
    WawIi2,
}

impl DepKind {
    /// Selects the intra-iteration variant of a base kind for the given
    /// loop-nesting level, or the plain kind if `level` is `None`.
    pub fn at_level(base: BaseDepKind, level: Option<usize>) -> DepKind {
        match (base, level) {
            (BaseDepKind::Raw, None) => DepKind::Raw,
            (BaseDepKind::War, None) => DepKind::War,
            (BaseDepKind::Waw, None) => DepKind::Waw,
            (BaseDepKind::Raw, Some(0)) => DepKind::RawIi0,
            (BaseDepKind::Raw, Some(1)) => DepKind::RawIi1,
            (BaseDepKind::Raw, Some(_)) => DepKind::RawIi2,
            (BaseDepKind::War, Some(0)) => DepKind::WarIi0,
            (BaseDepKind::War, Some(1)) => DepKind::WarIi1,
            (BaseDepKind::War, Some(_)) => DepKind::WarIi2,
            (BaseDepKind::Waw, Some(0)) => DepKind::WawIi0,
            (BaseDepKind::Waw, Some(1)) => DepKind::WawIi1,
            (BaseDepKind::Waw, Some(_)) => DepKind::WawIi2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DepKind::Raw => "RAW",
            DepKind::War => "WAR",
            DepKind::Waw => "WAW",
            DepKind::Init => "INIT",
            DepKind::RawIi0 => "RAW_II_0",
            DepKind::RawIi1 => "RAW_II_1",
            DepKind::RawIi2 => "RAW_II_2",
            DepKind::WarIi0 => "WAR_II_0",
            DepKind::WarIi1 => "WAR_II_1",
            DepKind::WarIi2 => "WAR_II_2",
            DepKind::WawIi0 => "WAW_II_0",
            DepKind::WawIi1 => "WAW_II_1",
            DepKind::WawIi2 => "WAW_II_2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseDepKind {
    Raw,
    War,
    Waw,
}

#[derive(Debug, Clone)]
pub struct Dependence {
    pub kind: DepKind,
    pub sink_lid: Lid,
    pub source_lid: Lid,
    pub var_name: VarName,
    pub aa_var: std::sync::Arc<str>,
    /// The sink access's address. Not part of equality/ordering; carried
    /// only so merge can re-resolve `aa_var` against the final Memory
    /// Manager.
    pub addr: u64,
}

impl Dependence {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: DepKind,
        sink_lid: Lid,
        source_lid: Lid,
        var_name: VarName,
        aa_var: impl Into<std::sync::Arc<str>>,
        addr: u64,
    ) -> Self {
        Self {
            kind,
            sink_lid,
            source_lid,
            var_name,
            aa_var: aa_var.into(),
            addr,
        }
    }

    fn sort_key(&self) -> (DepKind, Lid, usize) {
        (self.kind, self.source_lid, self.var_name.ptr_key())
    }
}

impl PartialEq for Dependence {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}
impl Eq for Dependence {}

impl PartialOrd for Dependence {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Dependence {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// The set of dependences recorded for a single sink LID, deduplicated
/// and ordered by the `(kind, source_lid, var_name)` total order.
pub type DepSet = BTreeSet<Dependence>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::Interner;

    #[test]
    fn dep_kind_variants_compare_in_declaration_order() {
        assert!(DepKind::Raw < DepKind::War);
        assert!(DepKind::War < DepKind::Waw);
        assert!(DepKind::Waw < DepKind::Init);
        assert!(DepKind::Init < DepKind::RawIi0);
        assert!(DepKind::WawIi1 < DepKind::WawIi2);
    }

    #[test]
    fn equal_triples_dedup_in_a_set() {
        let mut interner = Interner::new();
        let v = interner.intern("x");
        let mut set = DepSet::new();
        set.insert(Dependence::new(DepKind::Raw, Lid(2), Lid(1), v.clone(), "x", 0x10));
        set.insert(Dependence::new(DepKind::Raw, Lid(2), Lid(1), v, "x", 0x10));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn distinct_var_name_pointers_do_not_dedup() {
        let mut interner = Interner::new();
        let v1 = interner.intern("x");
        let v2 = interner.intern("y");
        let mut set = DepSet::new();
        set.insert(Dependence::new(DepKind::Raw, Lid(2), Lid(1), v1, "x", 0x10));
        set.insert(Dependence::new(DepKind::Raw, Lid(2), Lid(1), v2, "y", 0x20));
        assert_eq!(set.len(), 2);
    }
}
