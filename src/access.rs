//! The event value carried through the producer/consumer pipeline.

use crate::interner::VarName;
use crate::signature::{IterationCounters, Lid};

/// One instrumented memory access (or a synthesized stack-clear access),
/// created once by the producer and consumed exactly once by its worker.
#[derive(Debug, Clone)]
pub struct AccessRecord {
    pub is_read: bool,
    /// Hybrid-analysis hint: updates shadow memory but never becomes the
    /// source or sink of an emitted dependence.
    pub skip: bool,
    pub lid: Lid,
    pub var_name: VarName,
    pub aa_var: std::sync::Arc<str>,
    pub addr: u64,
    pub is_stack_access: bool,
    pub addr_first_written_in_scope: bool,
    pub positive_scope_change_since_last_access: bool,
    /// The loop-iteration context frozen at record time. When
    /// `positive_scope_change_since_last_access` is set, the analyzer uses
    /// this frozen snapshot instead of the Loop Manager's live state so
    /// that II-classification stays correct across loop-body boundaries.
    pub recorded_iterations: IterationCounters,
}

impl AccessRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        is_read: bool,
        lid: Lid,
        var_name: VarName,
        aa_var: impl Into<std::sync::Arc<str>>,
        addr: u64,
        recorded_iterations: IterationCounters,
    ) -> Self {
        Self {
            is_read,
            skip: false,
            lid,
            var_name,
            aa_var: aa_var.into(),
            addr,
            is_stack_access: false,
            addr_first_written_in_scope: false,
            positive_scope_change_since_last_access: false,
            recorded_iterations,
        }
    }

    /// Synthesizes the LID-0 "stack clear" access used to evict an address
    /// from shadow memory when its owning function frame exits.
    pub fn stack_clear(var_name: VarName, addr: u64) -> Self {
        Self {
            is_read: false,
            skip: false,
            lid: Lid::STACK_CLEAR,
            var_name,
            aa_var: std::sync::Arc::from(""),
            addr,
            is_stack_access: true,
            addr_first_written_in_scope: false,
            positive_scope_change_since_last_access: false,
            recorded_iterations: IterationCounters::ZERO,
        }
    }
}
