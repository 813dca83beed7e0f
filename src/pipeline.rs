//! Per-worker bounded queues of fixed-size access batches. A chunk is the
//! unit of producer→consumer transfer.
//!
//! `crossbeam_channel::bounded` already implements a mutex + condvar +
//! FIFO-queue contract, and its sender-drop-closes-channel behavior is
//! exactly the "producers set a termination flag and signal, workers
//! drain what's left, then exit" handshake a manual implementation would
//! need, so the termination flag never needs to be modeled explicitly.

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::access::AccessRecord;

pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;
/// Bounded queue depth per worker, in chunks. A producer blocks briefly
/// if a worker falls this far behind (a rare backpressure event).
const QUEUE_DEPTH: usize = 4;

pub type Chunk = Vec<AccessRecord>;

/// Address-hash sharding: serializes all accesses to a given address onto
/// one worker so same-address dependences never need cross-worker
/// coordination.
pub fn worker_id_for(addr: u64, num_workers: usize) -> usize {
    debug_assert!(num_workers > 0);
    (((addr & !3u64) >> 2) % num_workers as u64) as usize
}

/// Producer-side half of the pipeline: one staging buffer and one
/// channel sender per worker.
pub struct Pipeline {
    chunk_size: usize,
    senders: Vec<Sender<Chunk>>,
    staging: Vec<Chunk>,
}

impl Pipeline {
    pub fn new(num_workers: usize, chunk_size: usize) -> (Self, Vec<Receiver<Chunk>>) {
        let mut senders = Vec::with_capacity(num_workers);
        let mut receivers = Vec::with_capacity(num_workers);
        let mut staging = Vec::with_capacity(num_workers);
        for _ in 0..num_workers {
            let (tx, rx) = bounded(QUEUE_DEPTH);
            senders.push(tx);
            receivers.push(rx);
            staging.push(Vec::with_capacity(chunk_size));
        }
        (
            Pipeline {
                chunk_size,
                senders,
                staging,
            },
            receivers,
        )
    }

    pub fn num_workers(&self) -> usize {
        self.senders.len()
    }

    /// Appends `record` to the staging buffer for `worker_id`, publishing
    /// the chunk to the worker's queue once it reaches `chunk_size`.
    pub fn push(&mut self, worker_id: usize, record: AccessRecord) {
        let buf = &mut self.staging[worker_id];
        buf.push(record);
        if buf.len() >= self.chunk_size {
            let full = std::mem::replace(buf, Vec::with_capacity(self.chunk_size));
            // A worker only disappears if its thread panicked; in that
            // case the profile is already compromised and there is
            // nothing useful to do with the dropped chunk.
            let _ = self.senders[worker_id].send(full);
        }
    }

    /// Publishes every non-empty partial staging buffer. Called once at
    /// finalize, before the senders are dropped.
    pub fn flush(&mut self) {
        for (worker_id, buf) in self.staging.iter_mut().enumerate() {
            if !buf.is_empty() {
                let full = std::mem::take(buf);
                let _ = self.senders[worker_id].send(full);
            }
        }
    }

    /// Drops all senders, closing every worker's channel so that once it
    /// has drained its queue, `Receiver::recv` returns `Err` and the
    /// worker loop exits.
    pub fn shutdown(self) {
        drop(self.senders);
    }
}
