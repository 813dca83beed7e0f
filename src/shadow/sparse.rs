//! Sparse shadow memory backend: a plain hash map keyed by address.
//!
//! Used as the default backend since the runtime never gets to choose
//! the address range the profiled program will actually touch.

use rustc_hash::FxHashMap;

use super::Shadow;
use crate::signature::Signature;

#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    read: Signature,
    write: Signature,
}

#[derive(Debug, Default)]
pub struct SparseShadow {
    map: FxHashMap<u64, Entry>,
}

impl SparseShadow {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Shadow for SparseShadow {
    fn test_read(&self, addr: u64) -> Signature {
        self.map.get(&addr).map(|e| e.read).unwrap_or_default()
    }

    fn test_write(&self, addr: u64) -> Signature {
        self.map.get(&addr).map(|e| e.write).unwrap_or_default()
    }

    fn insert_read(&mut self, addr: u64, sig: Signature) -> Signature {
        let entry = self.map.entry(addr).or_default();
        std::mem::replace(&mut entry.read, sig)
    }

    fn insert_write(&mut self, addr: u64, sig: Signature) -> Signature {
        let entry = self.map.entry(addr).or_default();
        std::mem::replace(&mut entry.write, sig)
    }

    fn update_read(&mut self, addr: u64, sig: Signature) {
        self.map.entry(addr).or_default().read = sig;
    }

    fn update_write(&mut self, addr: u64, sig: Signature) {
        self.map.entry(addr).or_default().write = sig;
    }

    fn remove_read(&mut self, addr: u64) {
        if let Some(entry) = self.map.get_mut(&addr) {
            entry.read = Signature::ABSENT;
            if !entry.write.is_present() {
                self.map.remove(&addr);
            }
        }
    }

    fn remove_write(&mut self, addr: u64) {
        if let Some(entry) = self.map.get_mut(&addr) {
            entry.write = Signature::ABSENT;
            if !entry.read.is_present() {
                self.map.remove(&addr);
            }
        }
    }
}
