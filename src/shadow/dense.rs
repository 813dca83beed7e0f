//! Dense array-of-arrays shadow memory backend.
//!
//! Addresses are split into a high half (the leaf block id) and a low
//! half (the index within the leaf). Leaf blocks are dense arrays of
//! `2^LEAF_BITS` entries, allocated lazily on first touch, and the block
//! table itself is a hash map since the number of distinct blocks a real
//! program touches is small relative to the address space.

use rustc_hash::FxHashMap;

use super::Shadow;
use crate::signature::Signature;

const LEAF_BITS: u32 = 16;
const LEAF_SIZE: usize = 1 << LEAF_BITS;
const LEAF_MASK: u64 = (LEAF_SIZE as u64) - 1;

#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    read: Signature,
    write: Signature,
}

type Leaf = Box<[Entry]>;

#[derive(Debug, Default)]
pub struct DenseShadow {
    blocks: FxHashMap<u64, Leaf>,
}

impl DenseShadow {
    pub fn new() -> Self {
        Self::default()
    }

    fn split(addr: u64) -> (u64, usize) {
        (addr >> LEAF_BITS, (addr & LEAF_MASK) as usize)
    }

    fn leaf_mut(&mut self, block: u64) -> &mut Leaf {
        self.blocks
            .entry(block)
            .or_insert_with(|| vec![Entry::default(); LEAF_SIZE].into_boxed_slice())
    }
}

impl Shadow for DenseShadow {
    fn test_read(&self, addr: u64) -> Signature {
        let (block, idx) = Self::split(addr);
        self.blocks
            .get(&block)
            .map(|leaf| leaf[idx].read)
            .unwrap_or_default()
    }

    fn test_write(&self, addr: u64) -> Signature {
        let (block, idx) = Self::split(addr);
        self.blocks
            .get(&block)
            .map(|leaf| leaf[idx].write)
            .unwrap_or_default()
    }

    fn insert_read(&mut self, addr: u64, sig: Signature) -> Signature {
        let (block, idx) = Self::split(addr);
        let leaf = self.leaf_mut(block);
        std::mem::replace(&mut leaf[idx].read, sig)
    }

    fn insert_write(&mut self, addr: u64, sig: Signature) -> Signature {
        let (block, idx) = Self::split(addr);
        let leaf = self.leaf_mut(block);
        std::mem::replace(&mut leaf[idx].write, sig)
    }

    fn update_read(&mut self, addr: u64, sig: Signature) {
        let (block, idx) = Self::split(addr);
        self.leaf_mut(block)[idx].read = sig;
    }

    fn update_write(&mut self, addr: u64, sig: Signature) {
        let (block, idx) = Self::split(addr);
        self.leaf_mut(block)[idx].write = sig;
    }

    fn remove_read(&mut self, addr: u64) {
        let (block, idx) = Self::split(addr);
        if let Some(leaf) = self.blocks.get_mut(&block) {
            leaf[idx].read = Signature::ABSENT;
        }
    }

    fn remove_write(&mut self, addr: u64) {
        let (block, idx) = Self::split(addr);
        if let Some(leaf) = self.blocks.get_mut(&block) {
            leaf[idx].write = Signature::ABSENT;
        }
    }
}
