//! # Kernel
//!
//! Top-level firmware glue: brings up the scheduler clock and runs the
//! cooperative main loop.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()              ← Configure SysTick clock
//!         ├─► Scheduler::add_action()     ← Fill the action pool (×N)
//!         ├─► Scheduler::schedule()       ← Register the boot actions
//!         └─► kernel::run()               ← Cycle forever (no return)
//!               └─► run_cycle(now) on every pass
//! ```

use crate::arch::cortex_m4;
use crate::handler::Handler;
use crate::scheduler::Scheduler;
use crate::time::Instant;

/// Initialize the platform clock.
///
/// Must be called once, before `run()`, with the core peripherals taken
/// at reset.
pub fn init(core_peripherals: &mut cortex_m::Peripherals) {
    cortex_m4::set_interrupt_priorities(&mut core_peripherals.SCB);
    cortex_m4::configure_systick(&mut core_peripherals.SYST);
}

/// Current time on the scheduler clock.
#[inline]
pub fn now() -> Instant {
    cortex_m4::now()
}

/// Run the scheduler forever. **Does not return.**
///
/// Every pass reads the clock and runs one cycle. There is no sleeping
/// between passes: actions that need to wait express it through their
/// interval, duration and tick timeout.
pub fn run<H, S, const N: usize>(scheduler: &mut Scheduler<H, N>, shared: &mut S) -> !
where
    H: Handler<S>,
    S: ?Sized,
{
    loop {
        scheduler.run_cycle(now(), shared);
    }
}
