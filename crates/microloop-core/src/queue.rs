//! Bounded single-producer / single-consumer ring queue.
//!
//! Every ordered data path that crosses the interrupt/task boundary goes
//! through one of these: MIDI clock timestamps, transport events and input
//! commands. Neither side ever blocks. A full queue rejects the newest item
//! and the producer carries on.
//!
//! The capacity `N` is a const generic that must be a power of two; indices
//! wrap with a bit mask and one slot stays empty to tell "full" from "empty",
//! so `N - 1` items fit.
//!
//! # Example
//!
//! ```
//! use microloop_core::spsc_queue;
//!
//! let (mut tx, mut rx) = spsc_queue::<u32, 4>();
//! assert!(tx.push(1));
//! assert!(tx.push(2));
//! assert!(tx.push(3));
//! assert!(!tx.push(4)); // full: capacity is N - 1
//!
//! assert_eq!(rx.pop(), Some(1));
//! ```

use crate::compat::{Arc, AtomicUsize, UnsafeCell};
use crate::Ordering;
use core::mem::MaybeUninit;

#[repr(align(64))]
struct Index(AtomicUsize);

/// Storage shared by a [`Producer`] / [`Consumer`] pair.
pub struct SpscQueue<T, const N: usize> {
    slots: [UnsafeCell<MaybeUninit<T>>; N],
    /// Next slot to write. Only the producer stores it.
    write: Index,
    /// Next slot to read. Only the consumer stores it.
    read: Index,
}

// SAFETY: A slot is written by the producer strictly before the Release store
// of `write` that publishes it, and read by the consumer strictly after the
// Acquire load that observes it; the consumer hands the slot back with a
// Release store of `read`. The split handles are not Clone, so there is only
// ever one thread on each side.
unsafe impl<T: Send, const N: usize> Sync for SpscQueue<T, N> {}
unsafe impl<T: Send, const N: usize> Send for SpscQueue<T, N> {}

impl<T: Copy, const N: usize> SpscQueue<T, N> {
    const MASK: usize = N - 1;
    const POWER_OF_TWO: () = assert!(
        N >= 2 && N.is_power_of_two(),
        "SpscQueue capacity must be a power of two >= 2"
    );

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::POWER_OF_TWO;
        Self {
            slots: core::array::from_fn(|_| UnsafeCell::new(MaybeUninit::uninit())),
            write: Index(AtomicUsize::new(0)),
            read: Index(AtomicUsize::new(0)),
        }
    }

    /// Split into the two endpoints.
    pub fn split(self) -> (Producer<T, N>, Consumer<T, N>) {
        let shared = Arc::new(self);
        (
            Producer {
                queue: Arc::clone(&shared),
            },
            Consumer { queue: shared },
        )
    }

    /// Usable capacity (`N - 1`).
    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    #[inline]
    fn len(&self) -> usize {
        let write = self.write.0.load(Ordering::Acquire);
        let read = self.read.0.load(Ordering::Acquire);
        write.wrapping_sub(read) & Self::MASK
    }
}

impl<T: Copy, const N: usize> Default for SpscQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Construct a queue and split it in one step.
pub fn spsc_queue<T: Copy, const N: usize>() -> (Producer<T, N>, Consumer<T, N>) {
    SpscQueue::new().split()
}

/// Write end of an [`SpscQueue`].
pub struct Producer<T, const N: usize> {
    queue: Arc<SpscQueue<T, N>>,
}

impl<T: Copy, const N: usize> Producer<T, N> {
    /// Append an item. Returns `false` and leaves the queue untouched when full.
    #[inline]
    pub fn push(&mut self, item: T) -> bool {
        let q = &*self.queue;
        let write = q.write.0.load(Ordering::Relaxed);
        let next = (write + 1) & SpscQueue::<T, N>::MASK;
        if next == q.read.0.load(Ordering::Acquire) {
            return false;
        }
        // SAFETY: `write` is outside the readable range [read, write), so the
        // consumer does not touch this slot until the Release store below.
        unsafe {
            (*q.slots[write].get()).write(item);
        }
        q.write.0.store(next, Ordering::Release);
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

/// Read end of an [`SpscQueue`].
pub struct Consumer<T, const N: usize> {
    queue: Arc<SpscQueue<T, N>>,
}

impl<T: Copy, const N: usize> Consumer<T, N> {
    /// Take the oldest item, or `None` when empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        let q = &*self.queue;
        let read = q.read.0.load(Ordering::Relaxed);
        if read == q.write.0.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: the Acquire load above synchronised with the producer's
        // Release store, so this slot is initialised and not being written.
        let item = unsafe { (*q.slots[read].get()).assume_init() };
        q.read
            .0
            .store((read + 1) & SpscQueue::<T, N>::MASK, Ordering::Release);
        Some(item)
    }

    /// Pop until empty, feeding each item to `f`. Returns the number drained.
    #[inline]
    pub fn drain_with(&mut self, mut f: impl FnMut(T)) -> usize {
        let mut count = 0;
        while let Some(item) = self.pop() {
            f(item);
            count += 1;
        }
        count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}
