//! Function call stack and entry/exit bookkeeping.

use std::collections::BTreeSet;
use std::io::{self, Write};

use crate::signature::Lid;

#[derive(Debug, Clone, Copy)]
struct FunctionFrame {
    func_lid: Lid,
    child_call_flag: bool,
}

#[derive(Debug, Default)]
pub struct FunctionManager {
    stack: Vec<FunctionFrame>,
    entry_lids: BTreeSet<Lid>,
    exit_lids: BTreeSet<Lid>,
    last_call_or_invoke: Lid,
}

impl FunctionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime call depth; -1 once every frame has exited.
    pub fn get_current_stack_level(&self) -> i64 {
        self.stack.len() as i64 - 1
    }

    pub fn enter(&mut self, lid: Lid) {
        if let Some(parent) = self.stack.last_mut() {
            parent.child_call_flag = true;
        }
        self.stack.push(FunctionFrame {
            func_lid: lid,
            child_call_flag: false,
        });
        self.entry_lids.insert(lid);
    }

    /// `is_exit`: `false` for a normal return, `true` for a synthesized
    /// finalize-time exit.
    pub fn exit(&mut self, lid: Lid, is_exit: bool) {
        self.stack.pop();
        self.last_call_or_invoke = Lid(0);
        if !is_exit {
            self.exit_lids.insert(lid);
        }
    }

    /// Called from the declaration hook to clear a stale call marker.
    pub fn reset_call(&mut self, lid: Lid) {
        self.last_call_or_invoke = lid;
    }

    pub fn record_call(&mut self, lid: Lid) {
        self.last_call_or_invoke = lid;
    }

    pub fn last_call_or_invoke(&self) -> Lid {
        self.last_call_or_invoke
    }

    pub fn output_functions<W: Write>(&self, mut sink: W) -> io::Result<()> {
        for lid in &self.entry_lids {
            writeln!(sink, "BGN\t{}", lid)?;
        }
        for lid in &self.exit_lids {
            writeln!(sink, "END\t{}", lid)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_level_is_minus_one_when_empty() {
        let mgr = FunctionManager::new();
        assert_eq!(mgr.get_current_stack_level(), -1);
    }

    #[test]
    fn enter_and_exit_track_depth() {
        let mut mgr = FunctionManager::new();
        mgr.enter(Lid(1));
        assert_eq!(mgr.get_current_stack_level(), 0);
        mgr.enter(Lid(2));
        assert_eq!(mgr.get_current_stack_level(), 1);
        mgr.exit(Lid(2), false);
        assert_eq!(mgr.get_current_stack_level(), 0);
        mgr.exit(Lid(1), false);
        assert_eq!(mgr.get_current_stack_level(), -1);
    }

    #[test]
    fn synthesized_exit_does_not_record_in_exit_lids() {
        let mut mgr = FunctionManager::new();
        mgr.enter(Lid(7));
        mgr.exit(Lid(7), true);
        let mut out = Vec::new();
        mgr.output_functions(&mut out).unwrap();
        assert!(!String::from_utf8(out).unwrap().contains("END\t7"));
    }
}
