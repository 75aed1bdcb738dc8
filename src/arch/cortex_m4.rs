//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2) processor.
//! Implements context switching via PendSV, SysTick timer configuration,
//! and interrupt priority setup.
//!
//! ## Context Switch Mechanism
//!
//! Threads run in Thread mode on the PSP; handlers use the MSP. On
//! exception entry the hardware stacks R0–R3, R12, LR, PC and xPSR onto
//! the process stack. The PendSV handler saves and restores R4–R11 and
//! the thread's EXC_RETURN, which completes the frame laid out by
//! `ThreadControlBlock::init_stack`.
//!
//! ## FPU Threads
//!
//! On `thumbv7em-none-eabihf` the FPU is enabled at reset. A thread that
//! has executed a floating-point instruction is preempted with an
//! extended hardware frame (S0–S15, FPSCR) and EXC_RETURN bit 4 clear.
//! PendSV then also saves S16–S31, and because EXC_RETURN is kept per
//! thread, each thread is resumed with the frame size it was stacked
//! with. On `thumbv7em-none-eabi` there is no FPU state and the S16–S31
//! step is compiled out.
//!
//! ## Interrupt Priorities
//!
//! SysTick and PendSV share the lowest priority, so the tick handler and
//! the context switch never preempt each other and never delay any
//! application interrupt.

use core::arch::{asm, naked_asm};

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;

use crate::kernel;

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Program SysTick to interrupt every `reload + 1` core clock cycles.
///
/// `reload` must already be validated against the 24-bit counter
/// (see `kernel::systick_reload`).
pub fn configure_systick(syst: &mut SYST, reload: u32) {
    syst.disable_counter();
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_interrupt();
    syst.enable_counter();
}

// ---------------------------------------------------------------------------
// PendSV trigger
// ---------------------------------------------------------------------------

/// Pend a PendSV exception to perform a context switch.
///
/// Sets the PENDSVSET bit in the Interrupt Control and State Register (ICSR).
#[inline]
pub fn trigger_pendsv() {
    cortex_m::peripheral::SCB::set_pendsv();
}

// ---------------------------------------------------------------------------
// Interrupt priority configuration
// ---------------------------------------------------------------------------

/// Set PendSV and SysTick to the lowest interrupt priority.
///
/// On the TM4C123 only the top 3 priority bits are implemented, so 0xFF
/// reads back as 0xE0 (priority 7).
pub fn set_interrupt_priorities() {
    unsafe {
        // System Handler Priority Register 3 (SHPR3): 0xE000_ED20
        // Bits [23:16] = PendSV priority
        // Bits [31:24] = SysTick priority
        let shpr3: *mut u32 = 0xE000_ED20 as *mut u32;
        let val = core::ptr::read_volatile(shpr3);
        let val = val | (0xFF << 16) | (0xFF << 24);
        core::ptr::write_volatile(shpr3, val);
    }
}

// ---------------------------------------------------------------------------
// First thread launch
// ---------------------------------------------------------------------------

/// Start the first thread by switching to PSP and branching to Thread mode.
///
/// Called once from `kernel::launch()` and never returns. Unwinds the
/// initial frame by hand, since there is no exception to return from.
///
/// # Safety
/// `psp` must point at an initial frame built by `init_stack`.
pub unsafe fn start_first_task(psp: *mut u32) -> ! {
    unsafe {
        asm!(
            // Skip the software-saved R4–R11 and EXC_RETURN words
            "adds r0, #36",
            "msr psp, r0",

            // Thread mode uses PSP (CONTROL.SPSEL = 1)
            "movs r0, #2",
            "msr control, r0",
            "isb",

            "pop {{r0-r3, r12}}",  // R0-R3, R12
            "pop {{r4}}",          // LR placeholder, threads never return
            "pop {{r5}}",          // PC (thread entry point)
            "pop {{r6}}",          // xPSR, set by the processor

            "cpsie i",
            "bx r5",

            in("r0") psp,
            options(noreturn)
        );
    }
}

// ---------------------------------------------------------------------------
// PendSV handler (context switch)
// ---------------------------------------------------------------------------

/// PendSV exception handler — performs the actual context switch.
///
/// ## Sequence
/// 1. If the outgoing thread has FPU context (EXC_RETURN bit 4 clear),
///    save S16–S31 onto its stack (PSP)
/// 2. Save R4–R11 and EXC_RETURN below them
/// 3. `switch_context` records that PSP in the outgoing TCB and returns
///    the saved PSP of the thread named by the run pointer
/// 4. Restore R4–R11 and the incoming thread's EXC_RETURN, then S16–S31
///    if that EXC_RETURN says the thread has FPU context
/// 5. Return from exception with the incoming EXC_RETURN (hardware
///    restores R0–R3, R12, LR, PC, xPSR and, for FPU frames, S0–S15)
///
/// # Safety
/// Called directly by the NVIC; follows the Cortex-M4 exception
/// entry/exit convention.
#[cfg(target_abi = "eabihf")]
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "cpsid i",
        "mrs r0, psp",
        "tst lr, #0x10",
        "it eq",
        "vstmdbeq r0!, {{s16-s31}}",
        "stmdb r0!, {{r4-r11, lr}}",

        "bl {switch}",             // r0 = switch_context(r0)

        "ldmia r0!, {{r4-r11, lr}}",
        "tst lr, #0x10",
        "it eq",
        "vldmiaeq r0!, {{s16-s31}}",
        "msr psp, r0",
        "cpsie i",
        "bx lr",

        switch = sym switch_context,
    );
}

/// PendSV exception handler for cores built without FPU support.
///
/// Same frame as the FPU variant: R4–R11 and EXC_RETURN are kept on the
/// thread's stack.
///
/// # Safety
/// Called directly by the NVIC; follows the Cortex-M4 exception
/// entry/exit convention.
#[cfg(not(target_abi = "eabihf"))]
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "cpsid i",
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11, lr}}",

        "bl {switch}",             // r0 = switch_context(r0)

        "ldmia r0!, {{r4-r11, lr}}",
        "msr psp, r0",
        "cpsie i",
        "bx lr",

        switch = sym switch_context,
    );
}

/// Save the outgoing PSP and return the incoming one. Called from PendSV.
///
/// # Safety
/// Called from assembly with interrupts disabled.
unsafe extern "C" fn switch_context(psp: *mut u32) -> *mut u32 {
    unsafe { kernel::scheduler().switch_context(psp) }
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// SysTick exception handler — scheduler tick entry point.
///
/// Runs the tick (periodic events, ring advance) and pends the switch
/// to the new run pointer.
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    unsafe { kernel::scheduler().tick() };
    trigger_pendsv();
}
