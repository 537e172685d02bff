//! Bounded per-channel frame queue
//!
//! Producers push with [`FrameQueue::try_push`], which never blocks: when the
//! queue is full the new entry is handed back and the caller counts it as
//! dropped. Readers obtain a [`QueueReader`] and drain without blocking.

use crate::types::QueueEntry;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Result of a non-blocking push
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Entry is now in the queue
    Queued,
    /// Queue was at capacity; the entry was discarded
    Full,
    /// Every reader is gone
    Disconnected,
}

/// Multi-producer, multi-consumer bounded queue of [`QueueEntry`]
#[derive(Debug, Clone)]
pub struct FrameQueue {
    tx: Sender<QueueEntry>,
    rx: Receiver<QueueEntry>,
    capacity: usize,
}

impl FrameQueue {
    /// Create a queue; a capacity of 0 is raised to 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Push without blocking, dropping the new entry when full
    pub fn try_push(&self, entry: QueueEntry) -> PushOutcome {
        match self.tx.try_send(entry) {
            Ok(()) => PushOutcome::Queued,
            Err(TrySendError::Full(_)) => PushOutcome::Full,
            Err(TrySendError::Disconnected(_)) => PushOutcome::Disconnected,
        }
    }

    /// Read side of this queue
    pub fn reader(&self) -> QueueReader {
        QueueReader {
            rx: self.rx.clone(),
            capacity: self.capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Consumer handle for a [`FrameQueue`]
#[derive(Debug, Clone)]
pub struct QueueReader {
    rx: Receiver<QueueEntry>,
    capacity: usize,
}

impl QueueReader {
    /// Take one entry if available
    pub fn try_recv(&self) -> Option<QueueEntry> {
        self.rx.try_recv().ok()
    }

    /// Take every entry currently present
    pub fn drain(&self) -> Vec<QueueEntry> {
        self.rx.try_iter().collect()
    }

    /// Discard every entry currently present, returning how many were removed
    pub fn clear(&self) -> usize {
        self.rx.try_iter().count()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
