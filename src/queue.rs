//! The bounded sentence queue (§3, §4.1).
//!
//! Slots live in a fixed-size `Vec` allocated once at `Queue::new`; the free
//! list and the FIFO are both singly-linked chains through slot indices
//! rather than raw pointers (see the intrusive-list design note in
//! SPEC_FULL.md §9). `push` never blocks: when the free list is exhausted it
//! steals the oldest enqueued slot instead, which is the overrun policy
//! described in §3.
//!
//! `next` returns ownership of the unit directly and recycles its slot back
//! onto the free list in the same call. The spec's four-operation API names
//! a separate `Free`; this crate collapses it into `next` because Rust
//! ownership already makes the separate call redundant once the unit is
//! moved out of the array (see DESIGN.md).

use std::sync::{Condvar, Mutex};

use crate::senblk::SenBlk;

/// Errors returned by queue construction.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue size must be at least 2, got {0}")]
    TooSmall(usize),
}

struct Slot {
    unit: Option<SenBlk>,
    next: Option<usize>,
}

struct Inner {
    slots: Vec<Slot>,
    free: Option<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    active: bool,
    enqueued: usize,
    dropped: u64,
}

impl Inner {
    fn pop_free(&mut self) -> Option<usize> {
        let idx = self.free?;
        self.free = self.slots[idx].next.take();
        Some(idx)
    }

    fn push_free(&mut self, idx: usize) {
        self.slots[idx].next = self.free;
        self.free = Some(idx);
    }

    fn pop_head(&mut self) -> Option<usize> {
        let idx = self.head?;
        self.head = self.slots[idx].next.take();
        if self.head.is_none() {
            self.tail = None;
        }
        self.enqueued -= 1;
        Some(idx)
    }

    fn push_tail(&mut self, idx: usize) {
        self.slots[idx].next = None;
        match self.tail {
            Some(t) => self.slots[t].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.enqueued += 1;
    }
}

/// A bounded, lossy, mutex/condvar-guarded FIFO of [`SenBlk`] units.
///
/// Used both as the Engine's central input queue and as each output
/// endpoint's private queue.
pub struct Queue {
    inner: Mutex<Inner>,
    cond: Condvar,
}

impl Queue {
    /// Allocates `size` slots, links them all into the free list, and marks
    /// the queue active. Fails only if `size < 2`.
    pub fn new(size: usize) -> Result<Queue, QueueError> {
        if size < 2 {
            return Err(QueueError::TooSmall(size));
        }
        let mut slots = Vec::with_capacity(size);
        for i in 0..size {
            slots.push(Slot {
                unit: None,
                next: if i + 1 < size { Some(i + 1) } else { None },
            });
        }
        let inner = Inner {
            slots,
            free: Some(0),
            head: None,
            tail: None,
            active: true,
            enqueued: 0,
            dropped: 0,
        };
        Ok(Queue {
            inner: Mutex::new(inner),
            cond: Condvar::new(),
        })
    }

    /// Enqueues `unit`, or, if `unit` is `None`, closes the queue: sets
    /// `active = false` and wakes every waiter without enqueuing anything.
    ///
    /// Never blocks. If the free list is empty the oldest enqueued unit is
    /// dropped to make room (tail-preserving loss, §3).
    pub fn push(&self, unit: Option<SenBlk>) {
        let mut inner = self.inner.lock().unwrap();
        let unit = match unit {
            None => {
                inner.active = false;
                self.cond.notify_all();
                return;
            }
            Some(u) => u,
        };
        let idx = match inner.pop_free() {
            Some(idx) => idx,
            None => {
                trace!("queue overrun: dropping oldest sentence");
                inner.dropped += 1;
                inner.pop_head().expect("capacity invariant: free empty implies queue non-empty")
            }
        };
        inner.slots[idx].unit = Some(unit);
        inner.push_tail(idx);
        self.cond.notify_all();
    }

    /// Blocks until a unit is available or the queue closes, returning
    /// `None` in the latter case. Once `None` has been returned, every
    /// subsequent call also returns `None` (end-of-stream monotonicity,
    /// §8) because `active` only ever transitions true -> false.
    pub fn next(&self) -> Option<SenBlk> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(idx) = inner.pop_head() {
                let unit = inner.slots[idx].unit.take();
                inner.push_free(idx);
                return unit;
            }
            if !inner.active {
                return None;
            }
            inner = self.cond.wait(inner).unwrap();
        }
    }

    /// Number of sentences dropped to overrun since construction. Not part
    /// of the core contract (§3 says counting drops is optional) but useful
    /// for diagnostics and tests.
    pub fn dropped(&self) -> u64 {
        self.inner.lock().unwrap().dropped
    }

    /// Closes the queue without enqueuing a sentinel value. Equivalent to
    /// `push(None)`; provided for readability at call sites that are
    /// explicitly closing rather than forwarding an end-of-stream they
    /// received from elsewhere.
    pub fn close(&self) {
        self.push(None);
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().unwrap().active
    }

    /// Total slot count this queue was constructed with.
    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blk(tag: u8) -> SenBlk {
        SenBlk::new(&[tag], None)
    }

    #[test]
    fn rejects_tiny_queue() {
        assert!(Queue::new(1).is_err());
        assert!(Queue::new(0).is_err());
    }

    #[test]
    fn fifo_order() {
        let q = Queue::new(4).unwrap();
        q.push(Some(blk(1)));
        q.push(Some(blk(2)));
        q.push(Some(blk(3)));
        assert_eq!(q.next().unwrap().as_bytes(), &[1]);
        assert_eq!(q.next().unwrap().as_bytes(), &[2]);
        assert_eq!(q.next().unwrap().as_bytes(), &[3]);
    }

    #[test]
    fn closure_idempotent_and_monotone() {
        let q = Queue::new(2).unwrap();
        q.push(None);
        q.push(None);
        assert!(!q.is_active());
        assert!(q.next().is_none());
        assert!(q.next().is_none());
    }

    #[test]
    fn push_never_blocks_under_overrun() {
        let q = Queue::new(4).unwrap();
        for i in 0..100u8 {
            q.push(Some(blk(i)));
        }
        assert_eq!(q.dropped(), 96);
    }

    #[test]
    fn tail_preserving_loss() {
        let size = 4usize;
        let k = 6usize;
        let q = Queue::new(size).unwrap();
        for i in 0..(size + k) as u8 {
            q.push(Some(blk(i)));
        }
        let mut seen = Vec::new();
        while let Some(u) = q.next() {
            seen.push(u.as_bytes()[0]);
        }
        let expected: Vec<u8> = (k as u8..(size + k) as u8).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn capacity_invariant_holds_across_mixed_traffic() {
        let q = Queue::new(4).unwrap();
        for i in 0..10u8 {
            q.push(Some(blk(i)));
            if i % 3 == 0 {
                let _ = q.next();
            }
        }
        // Drain whatever is left; this must terminate without blocking.
        while q.next().is_some() {}
    }

    #[test]
    fn closed_queue_still_drains_anything_already_enqueued() {
        // Per §4.1, Next only returns end-of-stream once both the queue is
        // empty AND active is false; a unit pushed after close (which
        // well-behaved producers never do, but the queue itself does not
        // forbid) is still delivered before end-of-stream.
        let q = Queue::new(2).unwrap();
        q.push(Some(blk(7)));
        q.push(None);
        assert_eq!(q.next().unwrap().as_bytes(), &[7]);
        assert!(q.next().is_none());
    }
}
