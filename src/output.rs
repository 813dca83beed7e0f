//! Canonical report writers: the dependence file, the memory region
//! report, and the profiling-time statistic.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;

use crate::dependence::DepSet;
use crate::scope::MemoryManager;
use crate::signature::Lid;

/// Writes one line per sink LID in the format
/// `<sink_lid> NOM <dep1>|<dep2>|...`, where each `<dep>` is
/// `<kind>:<source_lid>:<var>|<aa>`, followed by the `<lid> END program`
/// sentinel.
pub fn write_dependences<W: Write>(mut sink: W, merged: &BTreeMap<Lid, DepSet>) -> io::Result<()> {
    for (sink_lid, deps) in merged {
        let rendered: Vec<String> = deps
            .iter()
            .map(|d| format!("{}:{}:{}|{}", d.kind.label(), d.source_lid, d.var_name.as_str(), d.aa_var))
            .collect();
        writeln!(sink, "{} NOM {}", sink_lid, rendered.join("|"))?;
    }
    writeln!(sink, "{} END program", last_lid(merged))?;
    Ok(())
}

fn last_lid(merged: &BTreeMap<Lid, DepSet>) -> Lid {
    merged.keys().next_back().copied().unwrap_or(Lid(0))
}

pub fn write_memory_regions<W: Write>(sink: W, memory: &MemoryManager) -> io::Result<()> {
    memory.output_memory_regions(sink)
}

/// `statistics/profiling_time.txt`: `<ms> ms\n`.
pub fn write_profiling_time<W: Write>(mut sink: W, elapsed: Duration) -> io::Result<()> {
    writeln!(sink, "{} ms", elapsed.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependence::{DepKind, Dependence};
    use crate::interner::Interner;

    #[test]
    fn dependence_line_format_matches_the_canonical_syntax() {
        let mut interner = Interner::new();
        let v = interner.intern("x");
        let mut merged: BTreeMap<Lid, DepSet> = BTreeMap::new();
        merged
            .entry(Lid(3))
            .or_default()
            .insert(Dependence::new(DepKind::Raw, Lid(3), Lid(2), v, "x", 0x100));

        let mut buf = Vec::new();
        write_dependences(&mut buf, &merged).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "3 NOM RAW:2:x|x\n3 END program\n");
    }

    #[test]
    fn empty_merge_still_writes_the_end_sentinel() {
        let merged: BTreeMap<Lid, DepSet> = BTreeMap::new();
        let mut buf = Vec::new();
        write_dependences(&mut buf, &merged).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "0 END program\n");
    }

    #[test]
    fn profiling_time_is_milliseconds_suffixed() {
        let mut buf = Vec::new();
        write_profiling_time(&mut buf, Duration::from_millis(42)).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "42 ms\n");
    }
}
