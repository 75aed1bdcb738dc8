//! # Architecture Abstraction Layer
//!
//! Hardware boundary for the kernel: SysTick, PendSV and first-thread
//! dispatch. Only built for bare-metal ARM; the rest of the crate is
//! target independent and tested on the host.

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;
