//! The process-wide runtime singleton: initialization, single-threaded vs
//! parallel mode selection, and finalization ordering.

use std::io::BufWriter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::access::AccessRecord;
use crate::analyzer::{self, DepMap, WorkerOutput};
use crate::config::Config;
use crate::dependence::DepSet;
use crate::error::RtError;
use crate::interner::Interner;
use crate::merge;
use crate::output;
use crate::pipeline::{worker_id_for, Pipeline};
use crate::scope::{FunctionManager, LoopManager, MemoryManager};
use crate::shadow::Shadow;
use crate::signature::Lid;
use std::collections::BTreeMap;

/// Either every access is analyzed inline on the producer thread
/// (`NUM_WORKERS == 0`) or fanned out across a sharded pipeline backed by
/// background analysis threads.
enum Engine {
    Inline {
        shadow: Box<dyn Shadow + Send>,
        deps: DepMap,
    },
    Parallel {
        pipeline: Pipeline,
        handles: Vec<JoinHandle<WorkerOutput>>,
    },
}

struct RuntimeState {
    interner: Interner,
    loop_mgr: LoopManager,
    func_mgr: FunctionManager,
    mem_mgr: MemoryManager,
    engine: Engine,
}

impl RuntimeState {
    fn record(&mut self, record: AccessRecord) {
        match &mut self.engine {
            Engine::Inline { shadow, deps } => {
                analyzer::analyze_single_access(shadow.as_mut(), deps, &record);
            }
            Engine::Parallel { pipeline, .. } => {
                let worker_id = worker_id_for(record.addr, pipeline.num_workers());
                pipeline.push(worker_id, record);
            }
        }
    }

    /// Synthesizes stack-clear accesses for every word in `[low, high)`,
    /// one per 4-byte-aligned address so each lands on the worker that
    /// would have seen the original access to it.
    fn clear_stack_range(&mut self, low: u64, high: u64) {
        if low >= high {
            return;
        }
        let mut addr = low & !3u64;
        while addr < high {
            let name = self.interner.intern("<stack>");
            self.record(AccessRecord::stack_clear(name, addr));
            addr += 4;
        }
    }
}

/// The process-wide singleton every `extern "C"` shim routes through. One
/// instance is created lazily on the first instrumentation call.
pub struct Runtime {
    config: Config,
    state: Mutex<RuntimeState>,
    finalized: AtomicBool,
    start: Instant,
}

impl Runtime {
    pub fn new(config: Config) -> Self {
        let _ = env_logger::try_init();
        if config.pthread_compat {
            debug!("pthread compatibility mode: serializing all instrumentation calls");
        }

        let engine = if config.num_workers == 0 {
            Engine::Inline {
                shadow: config.shadow_backend.build(),
                deps: DepMap::default(),
            }
        } else {
            let (pipeline, receivers) = Pipeline::new(config.num_workers, crate::pipeline::DEFAULT_CHUNK_SIZE);
            let handles = receivers
                .into_iter()
                .map(|receiver| {
                    let shadow = config.shadow_backend.build();
                    thread::spawn(move || analyzer::run_worker(receiver, shadow))
                })
                .collect();
            Engine::Parallel { pipeline, handles }
        };

        Runtime {
            config,
            state: Mutex::new(RuntimeState {
                interner: Interner::new(),
                loop_mgr: LoopManager::new(),
                func_mgr: FunctionManager::new(),
                mem_mgr: MemoryManager::new(),
                engine,
            }),
            finalized: AtomicBool::new(false),
            start: Instant::now(),
        }
    }

    fn guard(&self) -> Option<parking_lot::MutexGuard<'_, RuntimeState>> {
        if self.finalized.load(Ordering::Acquire) {
            // Reentry after finalize: typically destructors running after
            // main returns. Silently ignored.
            debug!("instrumentation call after finalize, ignoring");
            return None;
        }
        Some(self.state.lock())
    }

    fn intern_and_access(
        &self,
        state: &mut RuntimeState,
        is_read: bool,
        lid: Lid,
        addr: u64,
        var_name: &str,
        aa_var: &str,
    ) -> AccessRecord {
        let var = state.interner.intern(var_name);
        let iterations = state.loop_mgr.current_iteration_signature();
        let scope_changed = state.loop_mgr.take_scope_change();
        let resolved_aa = state.mem_mgr.region_id_or(aa_var, addr);
        let mut access = AccessRecord::new(is_read, lid, var, resolved_aa, addr, iterations);
        access.positive_scope_change_since_last_access = scope_changed;
        access.addr_first_written_in_scope = if !is_read {
            state.loop_mgr.record_write_first_in_scope(addr)
        } else {
            false
        };
        access
    }

    pub fn read(&self, lid: Lid, addr: u64, var_name: &str) {
        let Some(mut state) = self.guard() else { return };
        let access = self.intern_and_access(&mut state, true, lid, addr, var_name, var_name);
        state.record(access);
    }

    pub fn write(&self, lid: Lid, addr: u64, var_name: &str) {
        let Some(mut state) = self.guard() else { return };
        let access = self.intern_and_access(&mut state, false, lid, addr, var_name, var_name);
        state.record(access);
    }

    /// A declaration access: same shape as a write but always carries
    /// `skip = true`.
    pub fn decl(&self, lid: Lid, addr: u64, var_name: &str) {
        let Some(mut state) = self.guard() else { return };
        debug!("decl at lid={lid} addr={addr:#x}");
        state.func_mgr.reset_call(lid);
        let mut access = self.intern_and_access(&mut state, false, lid, addr, var_name, var_name);
        access.skip = true;
        state.record(access);
    }

    pub fn alloc(&self, lid: Lid, var_name: &str, start: u64, end: u64, is_stack: bool) {
        let Some(mut state) = self.guard() else { return };
        state
            .mem_mgr
            .record_alloc(var_name, start, end.saturating_sub(start), lid, is_stack);
    }

    pub fn new_element(&self, lid: Lid, addr: u64, num_bytes: u64) {
        let Some(mut state) = self.guard() else { return };
        state.mem_mgr.record_alloc("heap_element", addr, num_bytes, lid, false);
    }

    pub fn delete_element(&self, addr: u64) {
        let Some(mut state) = self.guard() else { return };
        state.mem_mgr.record_free(addr);
    }

    pub fn func_entry(&self, lid: Lid) {
        trace!("enter __dp_func_entry lid={lid}");
        let Some(mut state) = self.guard() else { return };
        state.func_mgr.enter(lid);
        state.mem_mgr.push_stack_frame();
    }

    /// `is_exit`: `false` for a normal return, `true` for a synthesized
    /// finalize-time exit.
    pub fn func_exit(&self, lid: Lid, is_exit: bool) {
        trace!("enter __dp_func_exit lid={lid}");
        let Some(mut state) = self.guard() else { return };
        let level = state.func_mgr.get_current_stack_level();
        state.loop_mgr.clean_function_exit(level, lid);
        state.func_mgr.exit(lid, is_exit);
        let (low, high) = state.mem_mgr.pop_last_stack_address();
        state.clear_stack_range(low, high);
        state.mem_mgr.leave_scope("function", lid);
    }

    pub fn loop_entry(&self, loop_lid: Lid) {
        let Some(mut state) = self.guard() else { return };
        let level = state.func_mgr.get_current_stack_level();
        state.loop_mgr.enter(loop_lid, level);
    }

    pub fn loop_iter(&self, loop_lid: Lid) {
        let Some(mut state) = self.guard() else { return };
        state.loop_mgr.iter(loop_lid);
    }

    pub fn loop_exit(&self, loop_lid: Lid) {
        let Some(mut state) = self.guard() else { return };
        let level = state.func_mgr.get_current_stack_level();
        state.loop_mgr.exit(loop_lid, level);
    }

    pub fn call(&self, lid: Lid) {
        let Some(mut state) = self.guard() else { return };
        state.func_mgr.record_call(lid);
    }

    /// Drains in-flight function frames by synthesizing function-exit
    /// events, asserts empty stacks, joins workers, merges, and writes the
    /// three canonical report files.
    pub fn finalize(&self) -> Result<(), RtError> {
        if self.finalized.swap(true, Ordering::AcqRel) {
            return Err(RtError::ReentryAfterFinalize("finalize"));
        }

        let mut state = self.state.lock();
        while state.func_mgr.get_current_stack_level() >= 0 {
            let lid = Lid(u64::MAX);
            let level = state.func_mgr.get_current_stack_level();
            state.loop_mgr.clean_function_exit(level, lid);
            state.func_mgr.exit(lid, true);
            let (low, high) = state.mem_mgr.pop_last_stack_address();
            state.clear_stack_range(low, high);
            state.mem_mgr.leave_scope("function", lid);
        }

        if state.func_mgr.get_current_stack_level() != -1 {
            warn!("function stack non-empty at finalize");
        }
        if !state.loop_mgr.is_empty() {
            warn!("loop stack non-empty at finalize");
        }

        let merged = match std::mem::replace(
            &mut state.engine,
            Engine::Inline {
                shadow: crate::shadow::ShadowBackend::Sparse.build(),
                deps: DepMap::default(),
            },
        ) {
            Engine::Inline { deps, .. } => merge::merge(vec![deps], &state.mem_mgr),
            Engine::Parallel { mut pipeline, handles } => {
                pipeline.flush();
                pipeline.shutdown();
                let worker_deps: Vec<DepMap> = handles
                    .into_iter()
                    .map(|h| h.join().expect("analysis worker panicked").deps)
                    .collect();
                merge::merge(worker_deps, &state.mem_mgr)
            }
        };

        self.write_reports(&state, &merged)?;
        Ok(())
    }

    fn write_reports(&self, state: &RuntimeState, merged: &BTreeMap<Lid, DepSet>) -> Result<(), RtError> {
        std::fs::create_dir_all(&self.config.dot_discopop_profiler)?;
        std::fs::create_dir_all(self.config.dot_discopop_profiler.join("statistics"))?;

        let deps_path = self.config.dot_discopop_profiler.join("dependences.txt");
        let deps_file = BufWriter::new(std::fs::File::create(deps_path)?);
        output::write_dependences(deps_file, merged)?;

        let mem_path = self.config.dot_discopop_profiler.join("memory_regions.txt");
        let mem_file = BufWriter::new(std::fs::File::create(mem_path)?);
        output::write_memory_regions(mem_file, &state.mem_mgr)?;

        let loops_path = self.config.dot_discopop_profiler.join("loops.txt");
        let mut loops_file = BufWriter::new(std::fs::File::create(loops_path)?);
        state.loop_mgr.output(&mut loops_file)?;

        let funcs_path = self.config.dot_discopop_profiler.join("functions.txt");
        let mut funcs_file = BufWriter::new(std::fs::File::create(funcs_path)?);
        state.func_mgr.output_functions(&mut funcs_file)?;

        let time_path = self
            .config
            .dot_discopop_profiler
            .join("statistics")
            .join("profiling_time.txt");
        let time_file = BufWriter::new(std::fs::File::create(time_path)?);
        output::write_profiling_time(time_file, self.start.elapsed())?;

        Ok(())
    }
}

/// Lazily-initialized global singleton, guarded by `OnceLock` so first use
/// pays for initialization and later calls are a load, avoiding
/// module-initialization order hazards.
static RUNTIME: std::sync::OnceLock<Arc<Runtime>> = std::sync::OnceLock::new();

pub fn runtime() -> Arc<Runtime> {
    RUNTIME.get_or_init(|| Arc::new(Runtime::new(Config::from_env()))).clone()
}
