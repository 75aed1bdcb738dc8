//! # Kernel
//!
//! Top-level kernel initialization and public API for TickOS.
//!
//! The kernel owns the global scheduler instance and the ambient
//! mailbox, and coordinates system startup. All public functions use
//! critical sections to ensure interrupt safety.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()                        ← Mask interrupts, reset state
//!         ├─► kernel::add_threads()                 ← Build the TCB ring
//!         ├─► kernel::add_periodic_event_threads()  ← Configure event slots
//!         └─► kernel::launch()                      ← Start scheduler (no return)
//!               ├─► Configure SysTick
//!               ├─► Set interrupt priorities
//!               └─► Start first thread via arch::start_first_task()
//! ```

use core::ptr::addr_of_mut;

use crate::config::MAX_SYSTICK_RELOAD;
use crate::errors::{ConfigError, KernelResult};
use crate::mailbox::Mailbox;
use crate::scheduler::Scheduler;
use crate::sync;
use crate::task::ThreadEntry;

// ---------------------------------------------------------------------------
// Global kernel state
// ---------------------------------------------------------------------------

/// Global scheduler instance.
///
/// # Safety
/// Accessed from thread mode only inside critical sections, and from the
/// SysTick and PendSV handlers, which share one priority and so never
/// preempt each other.
static mut SCHEDULER: Scheduler<'static> = Scheduler::new();

/// The kernel's ambient mailbox, used through `mailbox_*`.
pub static MAILBOX: Mailbox<u32> = Mailbox::new(0);

/// Raw access to the global scheduler for the arch layer.
///
/// # Safety
/// The caller must hold a critical section or run in the SysTick/PendSV
/// handlers, and must not keep the reference beyond that.
pub(crate) unsafe fn scheduler() -> &'static mut Scheduler<'static> {
    unsafe { &mut *addr_of_mut!(SCHEDULER) }
}

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Initialize the kernel.
///
/// Masks interrupts (they stay off until `launch()`) and resets the
/// global scheduler. Clock setup is left to the board support code.
pub fn init() {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    cortex_m::interrupt::disable();

    sync::critical_section(|_cs| unsafe {
        *scheduler() = Scheduler::new();
    });
    crate::klog!(debug, "kernel initialized");
}

/// Register four main threads. `thread3` may be `None`, leaving a ring
/// of three.
///
/// Must be called once, after `init()` and before `launch()`.
pub fn add_threads(
    thread0: ThreadEntry,
    thread1: ThreadEntry,
    thread2: ThreadEntry,
    thread3: Option<ThreadEntry>,
) -> KernelResult<()> {
    let entries = [Some(thread0), Some(thread1), Some(thread2), thread3];
    let count = sync::critical_section(|_cs| unsafe { scheduler().add_threads(&entries) })
        .inspect_err(|_err| crate::klog!(warn, "add_threads failed: {}", _err))?;
    crate::klog!(info, "registered {} threads", count);
    Ok(())
}

/// Register three main threads.
pub fn add_threads3(
    thread0: ThreadEntry,
    thread1: ThreadEntry,
    thread2: ThreadEntry,
) -> KernelResult<()> {
    add_threads(thread0, thread1, thread2, None)
}

/// Register the two periodic event threads.
///
/// Periods are in ticks (milliseconds at the default time slice). Event
/// threads run inside the SysTick handler: they must run to completion
/// quickly and must not spin, block, or sleep. They may signal
/// semaphores and send mail.
pub fn add_periodic_event_threads(
    thread1: Option<&'static (dyn Fn() + Sync)>,
    period1: u32,
    thread2: Option<&'static (dyn Fn() + Sync)>,
    period2: u32,
) -> KernelResult<()> {
    sync::critical_section(|_cs| unsafe {
        scheduler().add_periodic_tasks(
            thread1.map(|t| t as &dyn Fn()),
            period1,
            thread2.map(|t| t as &dyn Fn()),
            period2,
        )
    })
    .inspect_err(|_err| crate::klog!(warn, "add_periodic_event_threads failed: {}", _err))?;
    crate::klog!(info, "periodic events every {} and {} ticks", period1, period2);
    Ok(())
}

/// SysTick reload value for a time slice of `time_slice` core clocks.
///
/// SysTick counts down through zero, so the reload is one less than the
/// slice and the slice must lie in `1..=MAX_SYSTICK_RELOAD + 1`.
pub fn systick_reload(time_slice: u32) -> KernelResult<u32> {
    match time_slice.checked_sub(1) {
        Some(reload) if reload <= MAX_SYSTICK_RELOAD => Ok(reload),
        _ => Err(ConfigError::TimeSliceOutOfRange(time_slice).into()),
    }
}

/// Start the scheduler. **Does not return** unless the configuration is
/// rejected.
///
/// Validates `time_slice` (core clock cycles per thread) and the thread
/// ring, programs SysTick, sets interrupt priorities, and launches the
/// first thread. After this call the system is fully preemptive.
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub fn launch(
    mut core_peripherals: cortex_m::Peripherals,
    time_slice: u32,
) -> KernelResult<core::convert::Infallible> {
    use crate::arch::cortex_m4;

    let reload = systick_reload(time_slice)?;
    let first_sp = sync::critical_section(|_cs| -> KernelResult<*mut u32> {
        let scheduler = unsafe { scheduler() };
        let first = scheduler.launch()?;
        Ok(scheduler.tcbs[first].stack_pointer())
    })
    .inspect_err(|_err| crate::klog!(warn, "launch failed: {}", _err))?;
    crate::klog!(info, "launching, reload {}", reload);

    cortex_m4::configure_systick(&mut core_peripherals.SYST, reload);
    cortex_m4::set_interrupt_priorities();

    unsafe { cortex_m4::start_first_task(first_sp) }
}

// ---------------------------------------------------------------------------
// Ambient mailbox
// ---------------------------------------------------------------------------

/// Empty the kernel mailbox.
pub fn mailbox_init() {
    MAILBOX.init();
}

/// Send `data` to the kernel mailbox. Never blocks; an unreceived value
/// is overwritten and lost.
pub fn mailbox_send(data: u32) {
    if let Some(_lost) = MAILBOX.send(data) {
        crate::klog!(trace, "mailbox overwrote {}", _lost);
    }
}

/// Receive from the kernel mailbox, spinning until mail arrives.
pub fn mailbox_recv() -> u32 {
    MAILBOX.recv()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::KernelError;

    #[test]
    fn test_systick_reload_range() {
        assert_eq!(systick_reload(1), Ok(0));
        assert_eq!(systick_reload(80_000), Ok(79_999));
        assert_eq!(systick_reload(0x0100_0000), Ok(0x00FF_FFFF));
        assert_eq!(
            systick_reload(0x0100_0001),
            Err(KernelError::InvalidConfiguration(ConfigError::TimeSliceOutOfRange(0x0100_0001)))
        );
        assert_eq!(
            systick_reload(0),
            Err(KernelError::InvalidConfiguration(ConfigError::TimeSliceOutOfRange(0)))
        );
    }

    #[test]
    fn test_ambient_mailbox() {
        mailbox_init();
        mailbox_send(10);
        mailbox_send(11);
        assert_eq!(mailbox_recv(), 11);
        assert_eq!(MAILBOX.try_recv(), None);
    }
}
