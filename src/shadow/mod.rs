//! Shadow memory: per-address most-recent read/write signature.
//!
//! The contract is backend-agnostic. Each worker owns exactly one
//! [`Shadow`] instance and accesses it single-threaded, so no backend
//! needs internal locking.

mod dense;
mod sparse;

pub use dense::DenseShadow;
pub use sparse::SparseShadow;

use crate::signature::Signature;

/// The address→(read-sig, write-sig) contract every backend satisfies.
/// Absent entries read back as [`Signature::ABSENT`].
pub trait Shadow {
    fn test_read(&self, addr: u64) -> Signature;
    fn test_write(&self, addr: u64) -> Signature;

    fn insert_read(&mut self, addr: u64, sig: Signature) -> Signature;
    fn insert_write(&mut self, addr: u64, sig: Signature) -> Signature;

    fn update_read(&mut self, addr: u64, sig: Signature);
    fn update_write(&mut self, addr: u64, sig: Signature);

    fn remove_read(&mut self, addr: u64);
    fn remove_write(&mut self, addr: u64);
}

/// Which [`Shadow`] backend a worker should use. The dense backend only
/// pays for itself when the target's address space is known to be dense;
/// absent that information the sparse backend is the safe default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowBackend {
    #[default]
    Sparse,
    Dense,
}

impl ShadowBackend {
    pub fn build(self) -> Box<dyn Shadow + Send> {
        match self {
            ShadowBackend::Sparse => Box::new(SparseShadow::new()),
            ShadowBackend::Dense => Box::new(DenseShadow::new()),
        }
    }
}

/// A conformance suite run against both backends so neither can drift from
/// the shared contract.
#[cfg(test)]
pub(crate) mod contract_tests {
    use super::*;
    use crate::signature::{IterationCounters, Lid};

    fn sig(n: u64) -> Signature {
        Signature::pack(Lid(n), IterationCounters::ZERO, false)
    }

    pub(crate) fn run_contract<S: Shadow>(mut shadow: S) {
        assert_eq!(shadow.test_read(42), Signature::ABSENT);
        assert_eq!(shadow.test_write(42), Signature::ABSENT);

        let prev = shadow.insert_write(42, sig(1));
        assert_eq!(prev, Signature::ABSENT);
        assert_eq!(shadow.test_write(42), sig(1));
        assert_eq!(shadow.test_read(42), Signature::ABSENT);

        let prev = shadow.insert_write(42, sig(2));
        assert_eq!(prev, sig(1));
        assert_eq!(shadow.test_write(42), sig(2));

        shadow.update_read(42, sig(3));
        assert_eq!(shadow.test_read(42), sig(3));
        shadow.update_read(42, sig(4));
        assert_eq!(shadow.test_read(42), sig(4));

        shadow.remove_write(42);
        assert_eq!(shadow.test_write(42), Signature::ABSENT);
        assert_eq!(shadow.test_read(42), sig(4));

        shadow.remove_read(42);
        assert_eq!(shadow.test_read(42), Signature::ABSENT);

        // Distinct addresses never alias.
        shadow.update_write(100, sig(5));
        shadow.update_write(200, sig(6));
        assert_eq!(shadow.test_write(100), sig(5));
        assert_eq!(shadow.test_write(200), sig(6));
    }

    #[test]
    fn sparse_backend_satisfies_contract() {
        run_contract(SparseShadow::new());
    }

    #[test]
    fn dense_backend_satisfies_contract() {
        run_contract(DenseShadow::new());
    }
}
