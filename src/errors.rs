//! # Errors
//!
//! Error types returned by the kernel's setup API. Every configuration
//! problem is detected synchronously and surfaced as a `KernelResult`;
//! the tick path itself never fails.

use core::fmt;

/// Result type for kernel setup operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors reported by kernel configuration and launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KernelError {
    /// More threads were registered than the TCB pool holds.
    CapacityExceeded {
        /// Number of non-null entry points supplied.
        requested: usize,
        /// Size of the pool (`NUM_THREADS`).
        capacity: usize,
    },
    /// A configuration value can never produce a working schedule.
    InvalidConfiguration(ConfigError),
    /// The scheduler is already running; setup calls are rejected.
    AlreadyLaunched,
}

/// Specific reasons for `KernelError::InvalidConfiguration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A periodic task was given a rate of zero ticks.
    ZeroRate {
        /// Periodic slot index (0 or 1).
        slot: usize,
    },
    /// No thread entry point was supplied, so the ring would be empty.
    NoThreads,
    /// The time slice does not fit the 24-bit SysTick reload register.
    TimeSliceOutOfRange(u32),
}

impl From<ConfigError> for KernelError {
    fn from(err: ConfigError) -> Self {
        KernelError::InvalidConfiguration(err)
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::CapacityExceeded { requested, capacity } => write!(
                f,
                "capacity exceeded: {} threads requested, pool holds {}",
                requested, capacity
            ),
            KernelError::InvalidConfiguration(err) => {
                write!(f, "invalid configuration: {}", err)
            }
            KernelError::AlreadyLaunched => write!(f, "scheduler already launched"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroRate { slot } => {
                write!(f, "periodic task {} has a rate of 0 ticks", slot)
            }
            ConfigError::NoThreads => write!(f, "no threads registered"),
            ConfigError::TimeSliceOutOfRange(slice) => {
                write!(f, "time slice {} does not fit SysTick reload", slice)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn test_config_error_converts() {
        let err: KernelError = ConfigError::NoThreads.into();
        assert_eq!(err, KernelError::InvalidConfiguration(ConfigError::NoThreads));
    }

    #[test]
    fn test_display() {
        let err = KernelError::CapacityExceeded { requested: 5, capacity: 4 };
        assert_eq!(
            err.to_string(),
            "capacity exceeded: 5 threads requested, pool holds 4"
        );

        let err: KernelError = ConfigError::ZeroRate { slot: 1 }.into();
        assert_eq!(
            err.to_string(),
            "invalid configuration: periodic task 1 has a rate of 0 ticks"
        );
    }
}
