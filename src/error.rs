//! Error kinds for the instrumentation-facing runtime.

use thiserror::Error;

/// Errors the lifecycle controller and FFI shims can raise. The
/// fatal/ignorable split mirrors how the instrumentation boundary is
/// supposed to react: a `Fatal` error aborts the profile after flushing
/// whatever has already been buffered, an `Ignorable` one is logged and
/// the run continues.
#[derive(Debug, Clone, Error)]
pub enum RtError {
    #[error("invariant violated at finalize: {0}")]
    InvariantViolation(&'static str),

    #[error("failed to allocate a chunk: {0}")]
    ResourceExhausted(&'static str),

    #[error("malformed instrumentation call: {0}")]
    MalformedCall(&'static str),

    #[error("instrumentation call {0} arrived after finalize")]
    ReentryAfterFinalize(&'static str),

    #[error("I/O error writing report: {0}")]
    Io(String),
}

impl RtError {
    /// Whether this error should abort the profile, as opposed to being
    /// logged and the run continuing.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RtError::ResourceExhausted(_))
    }
}

impl From<std::io::Error> for RtError {
    fn from(e: std::io::Error) -> Self {
        RtError::Io(e.to_string())
    }
}
