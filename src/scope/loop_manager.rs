//! Loop stack and iteration-counter bookkeeping.

use std::collections::HashMap;
use std::io::{self, Write};

use rustc_hash::FxHashSet;

use crate::signature::{IterationCounters, Lid};

#[derive(Debug, Clone)]
struct LoopFrame {
    loop_lid: Lid,
    iteration_count: u16,
    func_stack_level: i64,
    /// Set right after a `loop_iter` call; cleared once an access has
    /// observed it, so exactly one access picks up the scope-change edge.
    scope_change_pending: bool,
    first_write_addrs: FxHashSet<u64>,
}

impl LoopFrame {
    fn new(loop_lid: Lid, func_stack_level: i64) -> Self {
        Self {
            loop_lid,
            iteration_count: 0,
            func_stack_level,
            scope_change_pending: false,
            first_write_addrs: FxHashSet::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct LoopManager {
    stack: Vec<LoopFrame>,
    /// Total iterations ever observed per loop LID, accumulated as frames
    /// pop.
    census: HashMap<Lid, u64>,
}

impl LoopManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn enter(&mut self, loop_lid: Lid, func_stack_level: i64) {
        self.stack.push(LoopFrame::new(loop_lid, func_stack_level));
    }

    /// Advances the innermost matching loop frame's iteration counter and
    /// arms the scope-change flag so the next access frozen against this
    /// frame is classified as crossing an iteration boundary.
    pub fn iter(&mut self, loop_lid: Lid) {
        if let Some(frame) = self.stack.iter_mut().rev().find(|f| f.loop_lid == loop_lid) {
            frame.iteration_count = frame.iteration_count.saturating_add(1);
            frame.scope_change_pending = true;
        }
    }

    pub fn exit(&mut self, loop_lid: Lid, _func_stack_level: i64) {
        while let Some(frame) = self.stack.pop() {
            self.fold_into_census(&frame);
            if frame.loop_lid == loop_lid {
                break;
            }
        }
    }

    /// Recovery path for non-local exits: pops every loop frame whose
    /// owning function has already left `func_stack_level`.
    pub fn clean_function_exit(&mut self, func_stack_level: i64, _current_lid: Lid) {
        while let Some(top) = self.stack.last() {
            if top.func_stack_level < func_stack_level {
                break;
            }
            let frame = self.stack.pop().unwrap();
            self.fold_into_census(&frame);
        }
    }

    fn fold_into_census(&mut self, frame: &LoopFrame) {
        *self.census.entry(frame.loop_lid).or_insert(0) += frame.iteration_count as u64;
    }

    /// The three innermost iteration counters, missing levels as zero.
    pub fn current_iteration_signature(&self) -> IterationCounters {
        let mut counters = [0u16; 3];
        for (level, frame) in self.stack.iter().rev().take(3).enumerate() {
            counters[level] = frame.iteration_count;
        }
        IterationCounters(counters)
    }

    /// Consumes and reports whether a positive scope change has occurred
    /// since the last access for the innermost frame, clearing the flag.
    pub fn take_scope_change(&mut self) -> bool {
        match self.stack.last_mut() {
            Some(frame) if frame.scope_change_pending => {
                frame.scope_change_pending = false;
                true
            }
            _ => false,
        }
    }

    /// Records a write to `addr` against the innermost loop frame and
    /// reports whether this is the first write to that address within the
    /// frame's scope.
    pub fn record_write_first_in_scope(&mut self, addr: u64) -> bool {
        match self.stack.last_mut() {
            Some(frame) => frame.first_write_addrs.insert(addr),
            None => true,
        }
    }

    pub fn output<W: Write>(&self, mut sink: W) -> io::Result<()> {
        let mut rows: Vec<_> = self.census.iter().collect();
        rows.sort_by_key(|(lid, _)| **lid);
        for (lid, count) in rows {
            writeln!(sink, "{}\t{}", lid, count)?;
        }
        Ok(())
    }
}
