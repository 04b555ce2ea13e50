//! # Cadence Configuration
//!
//! Compile-time constants governing the scheduler and the firmware platform
//! layer. All limits are fixed at compile time, with no dynamic allocation.

/// Default number of actions a scheduler can hold.
///
/// Bounds the action pool, the registry links and the per-cycle snapshot
/// buffer, which all share this capacity. Applications that need a
/// different bound pick it through the scheduler's const generic.
pub const MAX_ACTIONS: usize = 8;

/// SysTick frequency in Hz. The scheduler clock counts milliseconds, so
/// this stays at 1 kHz.
pub const TICK_HZ: u32 = 1000;

/// System clock frequency in Hz (default for STM32F4 at 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;
