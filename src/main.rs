//! # TickOS Example Firmware
//!
//! Demonstrates the round-robin kernel with three main threads, two
//! periodic event tasks, a semaphore and the kernel mailbox:
//!
//! | Thread / Event | Kind | Behavior |
//! |----------------|------|----------|
//! | `sample_event` | Periodic, every 10 ticks | Samples a counter, mails it |
//! | `second_event` | Periodic, every 1000 ticks | Signals `SECOND` |
//! | `consumer_thread` | Main | Receives mail, accumulates |
//! | `clock_thread` | Main | Waits on `SECOND`, counts seconds |
//! | `background_thread` | Main | Busy work, never blocks |
//!
//! Each main thread runs for one 1 ms time slice before SysTick moves to
//! the next one in the ring.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::entry;
#[cfg(feature = "defmt")]
use defmt_rtt as _;
use panic_halt as _;

use tickos::config::DEFAULT_TIME_SLICE;
use tickos::{kernel, Semaphore};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

static SECOND: Semaphore = Semaphore::new(0);
static SAMPLE: AtomicU32 = AtomicU32::new(0);
static TOTAL: AtomicU32 = AtomicU32::new(0);
static SECONDS: AtomicU32 = AtomicU32::new(0);
static IDLE: AtomicU32 = AtomicU32::new(0);

// ---------------------------------------------------------------------------
// Periodic event tasks
// ---------------------------------------------------------------------------

/// Runs inside SysTick every 10 ms: produce one sample.
fn sample_event() {
    let sample = SAMPLE.fetch_add(1, Ordering::Relaxed);
    kernel::mailbox_send(sample);
}

/// Runs inside SysTick every second.
fn second_event() {
    SECOND.signal();
}

// ---------------------------------------------------------------------------
// Main threads
// ---------------------------------------------------------------------------

/// Consumes samples. Overwritten samples are simply skipped.
extern "C" fn consumer_thread() -> ! {
    loop {
        let sample = kernel::mailbox_recv();
        TOTAL.fetch_add(sample, Ordering::Relaxed);
    }
}

extern "C" fn clock_thread() -> ! {
    loop {
        SECOND.wait();
        SECONDS.fetch_add(1, Ordering::Relaxed);
    }
}

/// Never blocks; only preemption takes the CPU away from it.
extern "C" fn background_thread() -> ! {
    loop {
        IDLE.fetch_add(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Firmware entry point. Initializes the kernel, registers threads and
/// events, and launches the scheduler. Does not return.
#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();

    kernel::init();
    kernel::mailbox_init();
    SECOND.init(0);

    kernel::add_threads3(consumer_thread, clock_thread, background_thread)
        .expect("Failed to add threads");
    kernel::add_periodic_event_threads(Some(&sample_event), 10, Some(&second_event), 1000)
        .expect("Failed to add periodic events");

    // Only returns if the configuration is rejected
    match kernel::launch(cp, DEFAULT_TIME_SLICE) {
        Ok(never) => match never {},
        Err(_) => loop {
            cortex_m::asm::wfi();
        },
    }
}
