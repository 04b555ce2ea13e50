//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4: the SysTick-driven
//! millisecond clock the firmware loop feeds into
//! [`Scheduler::run_cycle`](crate::scheduler::Scheduler::run_cycle).
//!
//! ## Clock
//!
//! SysTick fires at `TICK_HZ` (1 kHz) and the application's handler calls
//! [`advance_clock`], which bumps a wrapping `u32` counter.
//! The counter is shared between the SysTick handler and the main loop, so
//! both sides touch it only inside `interrupt::free`. It is the only state
//! the scheduler shares with an interrupt handler.
//!
//! ## Interrupt Priorities
//!
//! - SysTick: Priority 0xF0 (lowest on a 4-bit priority part), so the clock
//!   never delays application interrupts

use core::cell::Cell;

use cortex_m::interrupt::{self, Mutex};
use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};

use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ};
use crate::time::Instant;

/// Milliseconds since `configure_systick`, wrapping.
static MILLIS: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure the SysTick timer as the scheduler clock.
///
/// Sets up SysTick to fire at `TICK_HZ` frequency using the processor
/// clock.
///
/// # Parameters
/// - `syst`: Mutable reference to the SysTick peripheral
pub fn configure_systick(syst: &mut SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

/// Put SysTick at the lowest exception priority.
pub fn set_interrupt_priorities(scb: &mut SCB) {
    // Safety: priorities are only lowered, which cannot break a critical
    // section that relies on masking.
    unsafe {
        scb.set_priority(SystemHandler::SysTick, 0xF0);
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Current time on the scheduler clock.
pub fn now() -> Instant {
    interrupt::free(|cs| Instant::from_millis(MILLIS.borrow(cs).get()))
}

/// Advance the clock by one tick. Call this from the SysTick handler.
pub fn advance_clock() {
    interrupt::free(|cs| {
        let millis = MILLIS.borrow(cs);
        millis.set(millis.get().wrapping_add(1));
    });
}
