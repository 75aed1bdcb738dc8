//! # TickOS Configuration
//!
//! Compile-time constants governing the kernel. All limits are fixed
//! at compile time — no dynamic allocation.

/// Number of thread control blocks in the pool. The ring holds at most
/// this many main threads.
pub const NUM_THREADS: usize = 4;

/// Per-thread stack size in 32-bit words. Must hold the deepest call
/// chain plus the 17-word initial register frame.
pub const STACK_SIZE: usize = 100;

/// Number of periodic event task slots serviced by the tick handler.
pub const NUM_PERIODIC_TASKS: usize = 2;

/// Scheduler tick frequency in Hz. Periodic task rates are expressed
/// in ticks, so at 1 kHz a rate is a period in milliseconds.
pub const TICK_HZ: u32 = 1000;

/// System clock frequency in Hz (TM4C123 PLL at 80 MHz).
pub const SYSTEM_CLOCK_HZ: u32 = 80_000_000;

/// Default time slice in core clock cycles: one tick.
pub const DEFAULT_TIME_SLICE: u32 = SYSTEM_CLOCK_HZ / TICK_HZ;

/// SysTick is a 24-bit down-counter.
pub const MAX_SYSTICK_RELOAD: u32 = 0x00FF_FFFF;
