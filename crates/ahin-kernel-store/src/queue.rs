//! The pending-event queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ahin_kernel_core::{Clock, Event, EventId, Hasher, PayloadEncoding};

use crate::error::Result;

/// FIFO holding area for events not yet committed in a block.
///
/// `enqueue` and `drain` take the same lock, so an event is either drained
/// exactly once or still pending. Canonicalization and hashing happen before
/// the lock is taken.
pub struct EventQueue {
    hasher: Hasher,
    encoding: PayloadEncoding,
    max_payload_bytes: usize,
    clock: Arc<dyn Clock>,
    pending: Mutex<VecDeque<Event>>,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new(
        hasher: Hasher,
        encoding: PayloadEncoding,
        max_payload_bytes: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            hasher,
            encoding,
            max_payload_bytes,
            clock,
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Canonicalize `payload`, append it to the tail and return its id.
    ///
    /// Duplicate payloads are accepted and share an id.
    pub fn enqueue(&self, payload: &[u8]) -> Result<EventId> {
        let event = Event::new(
            &self.hasher,
            self.encoding,
            payload,
            self.max_payload_bytes,
            self.clock.now_millis(),
        )?;
        let id = event.id;

        let mut pending = self.lock();
        pending.push_back(event);
        tracing::trace!(event_id = %id, pending = pending.len(), "event enqueued");
        Ok(id)
    }

    /// Remove and return up to `max_count` events from the head, in order.
    pub fn drain(&self, max_count: usize) -> Vec<Event> {
        let mut pending = self.lock();
        let n = max_count.min(pending.len());
        pending.drain(..n).collect()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether an event with this id is still pending.
    pub fn contains(&self, id: &EventId) -> bool {
        self.lock().iter().any(|e| &e.id == id)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Event>> {
        // A panicking producer cannot leave the deque half-modified.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
