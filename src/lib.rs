//! # TickOS — Tick-driven Round-Robin Kernel
//!
//! The scheduling core of a minimal real-time kernel for ARM Cortex-M4
//! microcontrollers (TM4C123-class).
//!
//! ## Overview
//!
//! A fixed pool of main threads is scheduled round-robin: every SysTick
//! interrupt preempts the running thread and switches to the next one in
//! the ring. Two periodic event tasks ride on the same tick, and threads
//! synchronize through a spinning counting semaphore and a single-slot
//! mailbox.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                  Application Threads                    │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │   init() · add_threads() · add_periodic_event_threads() │
//! │   launch() · mailbox_send() · mailbox_recv()            │
//! ├──────────────┬──────────────────┬──────────────────────┤
//! │  Scheduler   │  Semaphore       │  Mailbox             │
//! │  scheduler.rs│  semaphore.rs    │  mailbox.rs          │
//! │  ─ tick()    │  ─ wait()        │  ─ send()            │
//! │  ─ ring      │  ─ signal()      │  ─ recv()            │
//! ├──────────────┴──────────────────┴──────────────────────┤
//! │     Thread Model (task.rs) · Critical Sections (sync.rs)│
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)                │
//! │    PendSV · SysTick · First dispatch                    │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory Model
//!
//! - **No heap**: All state is statically allocated
//! - **Fixed-size TCB array**: `[ThreadControlBlock; NUM_THREADS]`
//! - **Per-thread stack**: `[u32; STACK_SIZE]` inline in each TCB
//! - **Critical sections**: `critical_section::with()` for shared state

#![no_std]

#[cfg(test)]
extern crate std;

/// Log through `defmt` when the `defmt` feature is enabled; otherwise a
/// no-op.
macro_rules! klog {
    ($level:ident, $($arg:tt)+) => {{
        #[cfg(feature = "defmt")]
        defmt::$level!($($arg)+);
    }};
}
pub(crate) use klog;

pub mod config;
pub mod errors;
pub mod task;
pub mod scheduler;
pub mod semaphore;
pub mod mailbox;
pub mod arch;
pub mod kernel;
pub mod sync;

pub use errors::{ConfigError, KernelError, KernelResult};
pub use mailbox::Mailbox;
pub use scheduler::Scheduler;
pub use semaphore::Semaphore;
pub use task::ThreadEntry;
