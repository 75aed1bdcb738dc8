//! # Scheduler
//!
//! Core scheduling logic for TickOS: a fixed pool of main threads
//! scheduled round-robin, one SysTick period each, plus two periodic
//! event callbacks dispatched from the tick.
//!
//! ## Scheduling Algorithm
//!
//! At each SysTick interrupt:
//! 1. **Count**: Increment the tick counter
//! 2. **Periodic slot 1**: If configured and `ticks % rate == 0`, run it
//! 3. **Periodic slot 2**: Same test, independent of slot 1
//! 4. **Advance**: Move the run pointer to the next TCB in the ring
//!
//! The SysTick handler then pends PendSV, which saves the interrupted
//! thread and resumes the one named by the run pointer.
//!
//! Periodic callbacks run to completion inside the tick. They must not
//! block, spin, or yield; they may signal semaphores and send mail.

use core::num::NonZeroU32;

use crate::config::{NUM_PERIODIC_TASKS, NUM_THREADS};
use crate::errors::{ConfigError, KernelError, KernelResult};
use crate::task::{ThreadControlBlock, ThreadEntry};

// ---------------------------------------------------------------------------
// Periodic event tasks
// ---------------------------------------------------------------------------

/// A short, non-blocking callback run every `rate` ticks.
#[derive(Clone, Copy)]
pub struct PeriodicTask<'a> {
    callback: &'a dyn Fn(),
    rate: NonZeroU32,
}

impl<'a> PeriodicTask<'a> {
    /// Build a periodic task for `slot`, rejecting a zero rate.
    pub fn new(slot: usize, callback: &'a dyn Fn(), rate: u32) -> KernelResult<Self> {
        let rate = NonZeroU32::new(rate).ok_or(ConfigError::ZeroRate { slot })?;
        Ok(Self { callback, rate })
    }

    /// Period in ticks.
    pub fn rate(&self) -> u32 {
        self.rate.get()
    }

    /// Whether the task is due on tick number `ticks`.
    #[inline]
    pub fn is_due(&self, ticks: u64) -> bool {
        ticks % u64::from(self.rate.get()) == 0
    }
}

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// The complete kernel state: TCB ring, run pointer, tick counter and
/// periodic task slots.
///
/// The firmware keeps one instance as a global in `kernel.rs`; tests
/// build as many independent instances as they like.
pub struct Scheduler<'a> {
    /// Fixed-size array of TCBs.
    pub tcbs: [ThreadControlBlock; NUM_THREADS],

    /// Index of the thread the context switch must resume.
    run_pt: usize,

    /// Index of the thread whose registers are live on the CPU. Lags
    /// `run_pt` between a tick and the PendSV that follows it.
    running: usize,

    /// Number of threads in the ring.
    ring_len: usize,

    /// Monotonic tick counter.
    ticks: u64,

    periodic: [Option<PeriodicTask<'a>>; NUM_PERIODIC_TASKS],

    launched: bool,
}

impl<'a> Scheduler<'a> {
    /// Create a scheduler with an empty ring.
    pub const fn new() -> Self {
        Self {
            tcbs: [ThreadControlBlock::EMPTY; NUM_THREADS],
            run_pt: 0,
            running: 0,
            ring_len: 0,
            ticks: 0,
            periodic: [None; NUM_PERIODIC_TASKS],
            launched: false,
        }
    }

    /// Register the main threads and build the ring.
    ///
    /// Every `Some` entry gets a fresh stack frame with the entry in its
    /// PC slot. Registered threads are linked in index order and the
    /// ring closes back on the first one, e.g. `0 → 1 → 2 → 3 → 0`, or
    /// `0 → 1 → 2 → 0` when the fourth entry is `None`. The run pointer
    /// starts at the first registered thread.
    ///
    /// # Returns
    /// - `Ok(n)` — the number of threads in the ring
    /// - `Err(CapacityExceeded)` — a non-null entry lies beyond `NUM_THREADS`
    /// - `Err(InvalidConfiguration(NoThreads))` — every entry is `None`
    /// - `Err(AlreadyLaunched)` — the scheduler is running
    ///
    /// On error the previous ring is left untouched.
    pub fn add_threads(&mut self, entries: &[Option<ThreadEntry>]) -> KernelResult<usize> {
        if self.launched {
            return Err(KernelError::AlreadyLaunched);
        }

        let requested = entries.iter().filter(|e| e.is_some()).count();
        if entries.iter().skip(NUM_THREADS).any(Option::is_some) {
            return Err(KernelError::CapacityExceeded {
                requested,
                capacity: NUM_THREADS,
            });
        }
        if requested == 0 {
            return Err(ConfigError::NoThreads.into());
        }

        let mut members = [0usize; NUM_THREADS];
        let mut count = 0;
        for (id, entry) in entries.iter().enumerate().take(NUM_THREADS) {
            let tcb = &mut self.tcbs[id];
            match entry {
                Some(entry) => {
                    tcb.init_stack();
                    tcb.set_entry(*entry);
                    tcb.active = true;
                    members[count] = id;
                    count += 1;
                }
                None => tcb.active = false,
            }
        }
        for tcb in self.tcbs.iter_mut().skip(entries.len()) {
            tcb.active = false;
        }

        for k in 0..count {
            self.tcbs[members[k]].next = members[(k + 1) % count];
        }

        self.run_pt = members[0];
        self.running = members[0];
        self.ring_len = count;
        Ok(count)
    }

    /// Configure the two periodic event slots.
    ///
    /// A `None` callback leaves its slot unconfigured and its rate is
    /// ignored. A present callback with a rate of 0 is rejected and
    /// neither slot is changed.
    pub fn add_periodic_tasks(
        &mut self,
        task1: Option<&'a dyn Fn()>,
        rate1: u32,
        task2: Option<&'a dyn Fn()>,
        rate2: u32,
    ) -> KernelResult<()> {
        if self.launched {
            return Err(KernelError::AlreadyLaunched);
        }

        let slot1 = task1.map(|cb| PeriodicTask::new(0, cb, rate1)).transpose()?;
        let slot2 = task2.map(|cb| PeriodicTask::new(1, cb, rate2)).transpose()?;
        self.periodic = [slot1, slot2];
        Ok(())
    }

    /// Mark the scheduler as running and return the thread to dispatch
    /// first. All later setup calls fail with `AlreadyLaunched`.
    pub fn launch(&mut self) -> KernelResult<usize> {
        if self.launched {
            return Err(KernelError::AlreadyLaunched);
        }
        if self.ring_len == 0 {
            return Err(ConfigError::NoThreads.into());
        }
        self.launched = true;
        self.running = self.run_pt;
        Ok(self.run_pt)
    }

    /// Called from the SysTick handler every tick.
    ///
    /// Runs due periodic tasks (slot 1 before slot 2) and advances the
    /// run pointer. Returns the index of the thread to resume.
    pub fn tick(&mut self) -> usize {
        self.ticks += 1;

        for task in self.periodic.iter().flatten() {
            if task.is_due(self.ticks) {
                (task.callback)();
            }
        }

        debug_assert!(self.ring_len == 0 || self.tcbs[self.run_pt].active);
        self.run_pt = self.tcbs[self.run_pt].next;
        self.run_pt
    }

    /// Complete a context switch: store the outgoing thread's saved
    /// stack pointer and return the incoming thread's.
    ///
    /// # Safety
    /// `psp` must point into the stack of the thread that was running.
    pub unsafe fn switch_context(&mut self, psp: *mut u32) -> *mut u32 {
        unsafe { self.tcbs[self.running].save_stack_pointer(psp) };
        self.running = self.run_pt;
        self.tcbs[self.run_pt].stack_pointer()
    }

    /// Index of the thread the next context switch resumes.
    pub fn run_pointer(&self) -> usize {
        self.run_pt
    }

    /// Index of the thread whose context is live on the CPU.
    pub fn running(&self) -> usize {
        self.running
    }

    /// Ticks elapsed since the scheduler was created.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of threads in the ring.
    pub fn ring_len(&self) -> usize {
        self.ring_len
    }

    /// Successor of thread `id` in the ring.
    pub fn next_of(&self, id: usize) -> usize {
        self.tcbs[id].next
    }

    /// TCB of thread `id`.
    pub fn tcb(&self, id: usize) -> &ThreadControlBlock {
        &self.tcbs[id]
    }

    /// Whether `launch()` has succeeded.
    pub fn is_launched(&self) -> bool {
        self.launched
    }
}

impl Default for Scheduler<'_> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
