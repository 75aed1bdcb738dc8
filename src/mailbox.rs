//! # Mailbox
//!
//! Single-slot producer/consumer channel built from one [`Semaphore`]
//! and a shared data cell. The usual producer is a periodic event task
//! and the consumer a main thread.
//!
//! Sending never blocks. A send while a value is still pending
//! overwrites it: the older value is lost and handed back to the
//! sender. Only the latest value is ever received, and a run of sends
//! is received once.

use core::cell::Cell;

use crate::semaphore::Semaphore;
use crate::sync::{self, Mutex};

/// A single-slot, overwrite-on-full mailbox.
pub struct Mailbox<T> {
    mail: Semaphore,
    data: Mutex<Cell<T>>,
}

impl<T: Copy> Mailbox<T> {
    /// Create an empty mailbox. `initial` fills the data cell but is
    /// never received.
    pub const fn new(initial: T) -> Self {
        Self {
            mail: Semaphore::new(0),
            data: Mutex::new(Cell::new(initial)),
        }
    }

    /// Empty the mailbox.
    pub fn init(&self) {
        self.mail.init(0);
    }

    /// Deposit `data`. Never blocks.
    ///
    /// Returns the value it overwrote if that value had not been received
    /// yet, i.e. `Some(old)` reports data loss.
    pub fn send(&self, data: T) -> Option<T> {
        sync::critical_section(|cs| {
            let old = self.data.borrow(cs).replace(data);
            self.mail.signal_once_in(cs).then_some(old)
        })
    }

    /// Take the pending value, spinning until one is sent.
    ///
    /// Must not be called from a periodic event task.
    pub fn recv(&self) -> T {
        loop {
            if let Some(data) = self.try_recv() {
                return data;
            }
            core::hint::spin_loop();
        }
    }

    /// Take the pending value if there is one. Never spins.
    pub fn try_recv(&self) -> Option<T> {
        sync::critical_section(|cs| {
            self.mail
                .try_wait_in(cs)
                .then(|| self.data.borrow(cs).get())
        })
    }

    /// Whether a value is waiting to be received.
    pub fn is_pending(&self) -> bool {
        self.mail.count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_send_then_recv() {
        let mailbox = Mailbox::new(0u32);
        mailbox.init();
        assert!(!mailbox.is_pending());

        assert_eq!(mailbox.send(42), None);
        assert!(mailbox.is_pending());
        assert_eq!(mailbox.recv(), 42);
        assert!(!mailbox.is_pending());
    }

    #[test]
    fn test_overwrite_keeps_latest() {
        let mailbox = Mailbox::new(0u32);
        mailbox.init();

        assert_eq!(mailbox.send(1), None);
        assert_eq!(mailbox.send(2), Some(1));
        assert_eq!(mailbox.recv(), 2);
        assert_eq!(mailbox.try_recv(), None);
    }

    #[test]
    fn test_initial_value_not_received() {
        let mailbox = Mailbox::new(7u32);
        assert_eq!(mailbox.try_recv(), None);
    }

    #[test]
    fn test_second_recv_waits_for_send() {
        let mailbox = Mailbox::new(0u32);
        let received = AtomicBool::new(false);

        mailbox.send(1);
        mailbox.send(2);
        assert_eq!(mailbox.recv(), 2);

        thread::scope(|s| {
            let consumer = s.spawn(|| {
                let data = mailbox.recv();
                received.store(true, Ordering::SeqCst);
                data
            });

            thread::sleep(Duration::from_millis(50));
            assert!(!received.load(Ordering::SeqCst));

            mailbox.send(3);
            assert_eq!(consumer.join().unwrap(), 3);
        });
    }

    #[test]
    fn test_recv_in_order_with_handshake() {
        let mailbox = Mailbox::new(0u32);
        let ack = Semaphore::new(0);

        thread::scope(|s| {
            s.spawn(|| {
                for data in 1..=100 {
                    assert_eq!(mailbox.send(data), None);
                    ack.wait();
                }
            });

            for expected in 1..=100 {
                assert_eq!(mailbox.recv(), expected);
                ack.signal();
            }
        });
    }
}
