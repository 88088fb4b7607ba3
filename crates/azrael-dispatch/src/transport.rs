//! Dispatch transport (C8, §4.8): a multi-producer multi-consumer FIFO of
//! opaque package-id tokens connecting the coordinator to the worker pool.
//!
//! `crossbeam-channel` covers exactly this shape (an in-process MPMC
//! queue); it stands in for a ZeroMQ PUSH/PULL pair, which would live
//! outside this crate's boundary.

use std::time::Duration;

use azrael_core::PackageId;
use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::error::DispatchError;

/// A cloneable handle to the coordinator → worker dispatch queue.
///
/// Both ends clone trivially (`crossbeam_channel::Sender`/`Receiver` are
/// `Clone + Send + Sync`), so every worker thread holds its own receiver
/// handle onto the same underlying queue — the multi-consumer half of
/// "multi-producer multi-consumer" (§4.8).
#[derive(Clone)]
pub struct DispatchQueue {
    sender: Sender<PackageId>,
    receiver: Receiver<PackageId>,
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchQueue {
    /// Creates a new, empty dispatch queue.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Pushes a package id for some worker to pick up. Never blocks.
    pub fn push(&self, id: PackageId) -> Result<(), DispatchError> {
        self.sender
            .send(id)
            .map_err(|_| DispatchError::Transport("dispatch queue has no receivers".into()))
    }

    /// Blocks until a package id is available or the queue is closed.
    pub fn pull_blocking(&self) -> Result<PackageId, DispatchError> {
        self.receiver
            .recv()
            .map_err(|_| DispatchError::Transport("dispatch queue closed".into()))
    }

    /// Blocks up to `timeout` for a package id. Returns `None` on timeout,
    /// distinct from a transport error.
    pub fn pull_timeout(&self, timeout: Duration) -> Option<PackageId> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Non-blocking pull; `None` if nothing is queued right now.
    pub fn try_pull(&self) -> Option<PackageId> {
        self.receiver.try_recv().ok()
    }

    /// Number of package ids currently queued but not yet pulled.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
