//! # Thread Control Block
//!
//! Defines the thread model for TickOS. Each main thread owns a TCB with
//! a private stack; the TCBs live in a fixed array inside the scheduler
//! and are linked into a ring by index.
//!
//! ## Initial Stack Frame
//!
//! Before launch each registered thread's stack is pre-populated with a
//! synthetic saved-register image so the PendSV handler can resume it as
//! if returning from an interrupt. From lowest to highest address:
//!
//! ```text
//!   R4 R5 R6 R7 R8 R9 R10 R11   <- saved stack pointer (popped by PendSV)
//!   EXC_RETURN                  <- per-thread exception return value
//!   R0 R1 R2 R3 R12 LR PC xPSR  <- hardware exception frame
//! ```
//!
//! The PC slot holds the thread entry point and xPSR has the Thumb
//! execution-state bit set. EXC_RETURN starts as "Thread mode, PSP, no
//! FPU context"; once a thread touches the FPU the hardware stacks an
//! extended frame and PendSV saves S16–S31 below R4 as well, recording
//! the matching EXC_RETURN so the thread is resumed with the right frame.

use crate::config::STACK_SIZE;

/// Thread entry point. Threads never return.
pub type ThreadEntry = extern "C" fn() -> !;

/// Number of words in the initial register frame.
pub const FRAME_WORDS: usize = 17;

/// EXC_RETURN for Thread mode on the PSP with a basic (non-FPU) frame.
pub const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

/// Thumb execution-state bit in xPSR.
pub const XPSR_THUMB: u32 = 0x0100_0000;

/// Word offsets of each register within the initial frame.
pub mod frame {
    pub const R4: usize = 0;
    pub const R11: usize = 7;
    pub const EXC_RETURN: usize = 8;
    pub const R0: usize = 9;
    pub const R3: usize = 12;
    pub const R12: usize = 13;
    pub const LR: usize = 14;
    pub const PC: usize = 15;
    pub const XPSR: usize = 16;
}

/// Placeholder values, lowest address first. Recognizable in a debugger.
const FRAME_TEMPLATE: [u32; FRAME_WORDS] = [
    0x0404_0404, // R4
    0x0505_0505, // R5
    0x0606_0606, // R6
    0x0707_0707, // R7
    0x0808_0808, // R8
    0x0909_0909, // R9
    0x1010_1010, // R10
    0x1111_1111, // R11
    EXC_RETURN_THREAD_PSP,
    0x0000_0000, // R0
    0x0101_0101, // R1
    0x0202_0202, // R2
    0x0303_0303, // R3
    0x1212_1212, // R12
    0x1414_1414, // LR
    0x0000_0000, // PC, filled in by set_entry()
    XPSR_THUMB,  // xPSR
];

/// Per-thread stack memory, 8-byte aligned as required by AAPCS.
#[repr(C, align(8))]
pub struct Stack(pub [u32; STACK_SIZE]);

/// Thread Control Block (TCB).
///
/// The saved stack pointer is kept as a word offset into `stack` rather
/// than a raw pointer, so a scheduler can be moved (and built on the host
/// in tests) without invalidating it. The Cortex-M4 port converts to and
/// from real addresses around each context switch.
pub struct ThreadControlBlock {
    /// Word offset of the saved context within `stack`.
    pub sp: usize,

    /// Index of the next TCB in the ring.
    pub next: usize,

    /// Whether this TCB is a member of the ring.
    pub active: bool,

    /// Private stack holding the saved register image.
    pub stack: Stack,
}

impl ThreadControlBlock {
    /// An unregistered TCB. Used to initialize the static array.
    pub const EMPTY: Self = Self {
        sp: STACK_SIZE,
        next: 0,
        active: false,
        stack: Stack([0; STACK_SIZE]),
    };

    /// Write the initial register image at the top of the stack and
    /// point the saved stack pointer at its R4 slot.
    pub fn init_stack(&mut self) {
        let base = STACK_SIZE - FRAME_WORDS;
        self.stack.0[base..].copy_from_slice(&FRAME_TEMPLATE);
        self.sp = base;
    }

    /// Store `entry` in the PC slot of the initial frame.
    pub fn set_entry(&mut self, entry: ThreadEntry) {
        self.stack.0[STACK_SIZE - FRAME_WORDS + frame::PC] = entry as usize as u32;
    }

    /// The words at the top of the stack, where the initial frame lives.
    pub fn initial_frame(&self) -> &[u32] {
        &self.stack.0[STACK_SIZE - FRAME_WORDS..]
    }

    /// Address of the saved context, for the context switch.
    pub fn stack_pointer(&mut self) -> *mut u32 {
        // `sp` never exceeds STACK_SIZE, so this stays in bounds or one past.
        unsafe { self.stack.0.as_mut_ptr().add(self.sp) }
    }

    /// Record the address the context switch saved this thread's
    /// registers at.
    ///
    /// # Safety
    /// `psp` must point into this TCB's stack.
    pub unsafe fn save_stack_pointer(&mut self, psp: *mut u32) {
        let base = self.stack.0.as_ptr() as usize;
        let offset = (psp as usize - base) / core::mem::size_of::<u32>();
        debug_assert!(offset <= STACK_SIZE);
        self.sp = offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn idle() -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    #[test]
    fn test_empty_tcb() {
        let tcb = ThreadControlBlock::EMPTY;
        assert!(!tcb.active);
        assert_eq!(tcb.sp, STACK_SIZE);
    }

    #[test]
    fn test_initial_frame_layout() {
        let mut tcb = ThreadControlBlock::EMPTY;
        tcb.init_stack();

        assert_eq!(tcb.sp, STACK_SIZE - FRAME_WORDS);
        let frame = tcb.initial_frame();
        assert_eq!(frame[frame::R4], 0x0404_0404);
        assert_eq!(frame[frame::R11], 0x1111_1111);
        assert_eq!(frame[frame::EXC_RETURN], EXC_RETURN_THREAD_PSP);
        assert_eq!(frame[frame::R0], 0);
        assert_eq!(frame[frame::R3], 0x0303_0303);
        assert_eq!(frame[frame::R12], 0x1212_1212);
        assert_eq!(frame[frame::LR], 0x1414_1414);
        assert_eq!(frame[frame::PC], 0);
        assert_eq!(frame[frame::XPSR] & XPSR_THUMB, XPSR_THUMB);
    }

    #[test]
    fn test_set_entry() {
        let mut tcb = ThreadControlBlock::EMPTY;
        tcb.init_stack();
        tcb.set_entry(idle);
        assert_eq!(tcb.initial_frame()[frame::PC], idle as usize as u32);
        assert_eq!(tcb.stack.0[STACK_SIZE - 2], idle as usize as u32);
    }

    #[test]
    fn test_stack_pointer_round_trip() {
        let mut tcb = ThreadControlBlock::EMPTY;
        tcb.init_stack();

        let psp = tcb.stack_pointer();
        assert_eq!(unsafe { *psp }, 0x0404_0404);

        // A context switch that pushed four more words below the frame.
        let deeper = unsafe { psp.sub(4) };
        unsafe { tcb.save_stack_pointer(deeper) };
        assert_eq!(tcb.sp, STACK_SIZE - FRAME_WORDS - 4);
    }

    #[test]
    fn test_stack_alignment() {
        let tcb = ThreadControlBlock::EMPTY;
        assert_eq!(tcb.stack.0.as_ptr() as usize % 8, 0);
    }

    #[test]
    fn test_hardware_frame_aligned() {
        let mut tcb = ThreadControlBlock::EMPTY;
        tcb.init_stack();

        // First dispatch leaves PSP on R0; exception entry needs it 8-byte aligned.
        let r0 = unsafe { tcb.stack_pointer().add(frame::R0) };
        assert_eq!(r0 as usize % 8, 0);
        assert_eq!(frame::XPSR, FRAME_WORDS - 1);
    }
}
