//! # Synchronization Primitives
//!
//! Interrupt-safe critical section abstractions for the Cortex-M4.
//! All shared kernel state (tick counter, run pointer, semaphore counts,
//! mailbox data) must be accessed within a critical section to prevent
//! data races between threads and the SysTick handler.
//!
//! On target the `critical-section` implementation comes from
//! `cortex-m` (`critical-section-single-core`): entering masks
//! interrupts with `cpsid i` and exiting restores PRIMASK. Host tests
//! use the crate's `std` implementation.

pub use critical_section::{CriticalSection, Mutex, RestoreState};

/// Execute a closure within a critical section (interrupts disabled).
///
/// This is the primary mechanism for safely accessing shared mutable state
/// in the kernel. Interrupts are disabled on entry and restored on exit,
/// ensuring atomicity of the enclosed operation. Nesting is allowed.
///
/// # Usage
/// ```ignore
/// sync::critical_section(|cs| {
///     // Access shared state safely
/// });
/// ```
///
/// # Performance
/// Keep critical sections as short as possible: they also hold off the
/// scheduler tick, delaying thread switches and periodic tasks.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    critical_section::with(f)
}

/// Opaque saved interrupt state returned by [`enter_critical`].
#[must_use = "pass the token to exit_critical to restore interrupts"]
pub struct CriticalToken(RestoreState);

/// Mask interrupts and return the previous state.
///
/// Pairs with [`exit_critical`]. Prefer [`critical_section`] where the
/// protected region fits in a closure.
#[inline]
pub fn enter_critical() -> CriticalToken {
    // SAFETY: the token is released by `exit_critical`, in LIFO order
    // with any nested acquisitions.
    CriticalToken(unsafe { critical_section::acquire() })
}

/// Restore the interrupt state saved by the matching [`enter_critical`].
///
/// # Safety
/// Tokens must be released in reverse order of acquisition.
#[inline]
pub unsafe fn exit_critical(token: CriticalToken) {
    unsafe { critical_section::release(token.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[test]
    fn test_nested_sections() {
        let value = Mutex::new(Cell::new(0u32));

        let outer = enter_critical();
        critical_section(|cs| value.borrow(cs).set(7));
        let inner = enter_critical();
        unsafe {
            exit_critical(inner);
            exit_critical(outer);
        }

        assert_eq!(critical_section(|cs| value.borrow(cs).get()), 7);
    }
}
