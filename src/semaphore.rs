//! # Counting Semaphore
//!
//! A spinning counting semaphore. `wait()` does not suspend the calling
//! thread: it keeps polling inside its own time slice and the SysTick
//! preemption still lets the other threads run, including whichever one
//! will signal.
//!
//! The zero test and the decrement happen in one critical section, so
//! concurrent waiters can never drive the count below zero.

use core::cell::Cell;

use crate::sync::{self, CriticalSection, Mutex};

/// A counting semaphore guarded by critical sections.
pub struct Semaphore {
    count: Mutex<Cell<i32>>,
}

impl Semaphore {
    /// Create a semaphore holding `value`.
    pub const fn new(value: i32) -> Self {
        Self {
            count: Mutex::new(Cell::new(value)),
        }
    }

    /// Reset the count to `value`.
    pub fn init(&self, value: i32) {
        sync::critical_section(|cs| self.count.borrow(cs).set(value));
    }

    /// Decrement the count, spinning while it is zero.
    ///
    /// Has no timeout: if nothing ever signals, the caller spins forever.
    /// Must not be called from a periodic event task.
    pub fn wait(&self) {
        while !self.try_wait() {
            core::hint::spin_loop();
        }
    }

    /// Decrement the count if it is positive. Never spins.
    pub fn try_wait(&self) -> bool {
        sync::critical_section(|cs| self.try_wait_in(cs))
    }

    /// Increment the count. Never blocks, so it is safe from periodic
    /// event tasks and interrupt handlers.
    ///
    /// The count saturates at `i32::MAX`; signals beyond that are dropped.
    pub fn signal(&self) {
        sync::critical_section(|cs| {
            let count = self.count.borrow(cs);
            count.set(count.get().saturating_add(1));
        });
    }

    /// Current count.
    pub fn count(&self) -> i32 {
        sync::critical_section(|cs| self.count.borrow(cs).get())
    }

    pub(crate) fn try_wait_in(&self, cs: CriticalSection<'_>) -> bool {
        let count = self.count.borrow(cs);
        if count.get() > 0 {
            count.set(count.get() - 1);
            true
        } else {
            false
        }
    }

    /// Raise the count to 1 if it is not already positive. Returns whether
    /// it was already positive.
    pub(crate) fn signal_once_in(&self, cs: CriticalSection<'_>) -> bool {
        let count = self.count.borrow(cs);
        let pending = count.get() > 0;
        if !pending {
            count.set(count.get() + 1);
        }
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_signal_then_wait() {
        let sem = Semaphore::new(5);
        sem.init(0);
        assert_eq!(sem.count(), 0);

        sem.signal();
        assert_eq!(sem.count(), 1);
        sem.wait();
        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn test_try_wait_at_zero() {
        let sem = Semaphore::new(0);
        assert!(!sem.try_wait());
        assert_eq!(sem.count(), 0);

        sem.signal();
        sem.signal();
        assert!(sem.try_wait());
        assert!(sem.try_wait());
        assert!(!sem.try_wait());
    }

    #[test]
    fn test_wait_spins_until_signalled() {
        let sem = Semaphore::new(0);
        let done = AtomicBool::new(false);

        thread::scope(|s| {
            s.spawn(|| {
                sem.wait();
                done.store(true, Ordering::SeqCst);
            });

            thread::sleep(Duration::from_millis(50));
            assert!(!done.load(Ordering::SeqCst));

            sem.signal();
        });

        assert!(done.load(Ordering::SeqCst));
        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn test_one_permit_releases_one_waiter() {
        let sem = Semaphore::new(0);
        let passed = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    sem.wait();
                    passed.fetch_add(1, Ordering::SeqCst);
                });
            }

            // Let every waiter reach its spin loop.
            thread::sleep(Duration::from_millis(50));
            sem.signal();
            thread::sleep(Duration::from_millis(100));

            assert_eq!(passed.load(Ordering::SeqCst), 1);
            assert_eq!(sem.count(), 0);

            for _ in 0..3 {
                sem.signal();
            }
        });

        assert_eq!(passed.load(Ordering::SeqCst), 4);
        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn test_signal_saturates() {
        let sem = Semaphore::new(i32::MAX - 1);
        sem.signal();
        sem.signal();
        assert_eq!(sem.count(), i32::MAX);

        assert!(sem.try_wait());
        assert_eq!(sem.count(), i32::MAX - 1);
    }

    #[test]
    fn test_count_never_negative() {
        const PER_THREAD: i32 = 500;
        let sem = Semaphore::new(0);
        let lowest = AtomicI32::new(0);

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..PER_THREAD {
                        sem.wait();
                        lowest.fetch_min(sem.count(), Ordering::SeqCst);
                    }
                });
            }
            for _ in 0..2 {
                s.spawn(|| {
                    for _ in 0..2 * PER_THREAD {
                        sem.signal();
                    }
                });
            }
        });

        assert_eq!(sem.count(), 0);
        assert!(lowest.load(Ordering::SeqCst) >= 0);
    }
}
