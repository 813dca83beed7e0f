//! Folds per-worker dependence maps into the final, canonical dependence
//! set.

use std::collections::BTreeMap;

use crate::analyzer::DepMap;
use crate::dependence::{DepSet, Dependence};
use crate::scope::MemoryManager;
use crate::signature::Lid;

/// Unions `worker_deps` into one map keyed by sink LID, deduplicating
/// within each sink bucket via `Dependence`'s `(kind, source_lid,
/// var_name)` total order, then rewrites each dependence's `aa_var`
/// against the final Memory Manager.
///
/// The returned map is a `BTreeMap` so iterating it already yields
/// ascending sink-LID order; each bucket is a `BTreeSet` so it already
/// yields ascending `(kind, source_lid, var)` order within a sink. Ordered
/// output falls out of the chosen collection types rather than needing an
/// explicit sort.
pub fn merge(worker_deps: Vec<DepMap>, memory: &MemoryManager) -> BTreeMap<Lid, DepSet> {
    let mut merged: BTreeMap<Lid, DepSet> = BTreeMap::new();
    for worker in worker_deps {
        for (sink_lid, deps) in worker {
            let bucket = merged.entry(sink_lid).or_default();
            for dep in deps {
                bucket.insert(resolve_aa_var(dep, memory));
            }
        }
    }
    merged
}

/// Re-resolves a dependence's `aa_var` using the final Memory Manager, so
/// that allocations tracked only after the access was recorded (e.g. a
/// later `alloc` call covering an address seen earlier in the same scope)
/// still end up with the right region tag in the output.
fn resolve_aa_var(dep: Dependence, memory: &MemoryManager) -> Dependence {
    let aa_var = memory.region_id_or(&dep.aa_var, dep.addr);
    Dependence::new(dep.kind, dep.sink_lid, dep.source_lid, dep.var_name, aa_var, dep.addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependence::DepKind;
    use crate::interner::Interner;

    fn one_map(interner: &mut Interner) -> DepMap {
        let mut map = DepMap::default();
        let v = interner.intern("x");
        map.entry(Lid(2)).or_default().insert(Dependence::new(
            DepKind::Raw,
            Lid(2),
            Lid(1),
            v,
            "x",
            0x100,
        ));
        map
    }

    #[test]
    fn merging_two_workers_unions_by_sink_lid() {
        let mut interner = Interner::new();
        let a = one_map(&mut interner);
        let mut b = DepMap::default();
        let w = interner.intern("y");
        b.entry(Lid(5)).or_default().insert(Dependence::new(
            DepKind::Init,
            Lid(5),
            Lid(0),
            w,
            "y",
            0x200,
        ));

        let memory = MemoryManager::new();
        let merged = merge(vec![a, b], &memory);
        assert_eq!(merged.len(), 2);
        assert!(merged.contains_key(&Lid(2)));
        assert!(merged.contains_key(&Lid(5)));
    }

    #[test]
    fn merging_a_set_with_itself_is_idempotent() {
        let mut interner = Interner::new();
        let a = one_map(&mut interner);
        let memory = MemoryManager::new();
        let once = merge(vec![a.clone()], &memory);
        let twice = merge(vec![a.clone(), a], &memory);

        assert_eq!(once[&Lid(2)].len(), twice[&Lid(2)].len());
        assert_eq!(once[&Lid(2)], twice[&Lid(2)]);
    }

    #[test]
    fn aa_var_is_rewritten_against_final_memory_manager() {
        let mut interner = Interner::new();
        let v = interner.intern("arr");
        let mut map = DepMap::default();
        map.entry(Lid(2)).or_default().insert(Dependence::new(
            DepKind::Raw,
            Lid(2),
            Lid(1),
            v,
            "unknown_at_record_time",
            0x1008,
        ));

        let mut memory = MemoryManager::new();
        memory.record_alloc("heap_arr", 0x1000, 0x100, Lid(0), false);

        let merged = merge(vec![map], &memory);
        let dep = merged[&Lid(2)].iter().next().unwrap();
        assert_eq!(dep.aa_var.as_ref(), "heap_arr");
    }
}
