//! Runtime library for a dynamic data-dependence profiler: event
//! ingestion, shadow memory, and dependence detection for an instrumented
//! target program.
//!
//! The crate is linked two ways: as a `cdylib` by the instrumented
//! target, through the `extern "C"` surface in [`ffi`], and as an `rlib`
//! by this crate's own tests, which drive [`lifecycle::Runtime`] directly
//! through its safe API.

pub mod access;
pub mod analyzer;
pub mod config;
pub mod dependence;
pub mod error;
pub mod ffi;
pub mod interner;
pub mod lifecycle;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod scope;
pub mod shadow;
pub mod signature;

pub use lifecycle::Runtime;
