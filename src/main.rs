//! # Cadence Example Firmware
//!
//! Demonstrates the cooperative action scheduler with four actions sharing
//! one application context:
//!
//! | Action | Interval | Duration | Tick timeout | Frozen | Behavior |
//! |--------|----------|----------|--------------|--------|----------|
//! | `radio` | 1000 ms | - | 1 ms | yes | Brings the link up, pumps one link event per cycle |
//! | `status_led` | - | - | 1 ms | no | Mirrors link state as an RGB colour |
//! | `sensor_poll` | 1000 ms | 20 ms | 5 ms | yes | Samples a sensor once a second |
//! | `poll_indicator` | - | - | - | - | Child of `sensor_poll`, lit while it runs |
//!
//! ## Expected Behavior
//!
//! 1. **Boot**: `radio` and `status_led` start on the first cycle; the LED
//!    shows red (disconnected) then yellow (connecting).
//!
//! 2. **Link up**: after the simulated handshake the radio reports
//!    connected and the LED turns green.
//!
//! 3. **Polling**: `sensor_poll` runs for 20 ms every second. Its child
//!    indicator starts and stops with it. Being frozen, the poll never
//!    leaves the registry and restarts once its interval has elapsed.
//!
//! 4. **Link loss**: when the radio sees too many failed events it stops
//!    itself from its tick callback. It is frozen, so it stays registered
//!    and starts again once its 1 s interval has elapsed.
//!
//! Peripheral access is simulated through the shared [`App`] state; a real
//! board would drive the radio stack and LED strip from these callbacks.

#![no_std]
#![no_main]

use cortex_m_rt::{entry, exception};
use panic_halt as _;

use cadence::arch::cortex_m4;
use cadence::{kernel, ActionConfig, ActionId, Context, Handler, Instant, ScheduleError, Scheduler};

// ---------------------------------------------------------------------------
// Application context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Rgb(u8, u8, u8);

/// State shared by every action.
struct App {
    link: LinkState,
    led: Rgb,
    indicator: bool,
    samples: u32,
    last_sample: u16,
    /// Last registry call a callback could not complete.
    fault: Option<ScheduleError>,
}

impl App {
    const fn new() -> Self {
        Self {
            link: LinkState::Disconnected,
            led: Rgb(0, 0, 0),
            indicator: false,
            samples: 0,
            last_sample: 0,
            fault: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Milliseconds the simulated link handshake takes.
const HANDSHAKE_MS: u32 = 250;

/// Failed link events tolerated before the radio restarts itself.
const MAX_LINK_ERRORS: u32 = 3;

struct Radio {
    started: Instant,
    events: u32,
    errors: u32,
}

struct SensorPoll {
    accumulator: u32,
    reads: u32,
}

enum Firmware {
    Radio(Radio),
    StatusLed,
    SensorPoll(SensorPoll),
    PollIndicator,
}

impl Radio {
    /// Pump one event from the (simulated) link queue.
    fn pump(&mut self, cx: &mut Context<'_, App>) {
        self.events = self.events.wrapping_add(1);

        let up_for = cx.now().millis_since(self.started);
        let app = cx.shared_mut();
        match app.link {
            LinkState::Connecting if up_for >= HANDSHAKE_MS => app.link = LinkState::Connected,
            LinkState::Connected if self.events % 10_007 == 0 => self.errors += 1,
            _ => {}
        }
    }
}

impl Handler<App> for Firmware {
    fn can_start(&self, cx: &Context<'_, App>) -> bool {
        match self {
            // Only poll while the link can carry the reading
            Firmware::SensorPoll(_) => cx.shared().link == LinkState::Connected,
            _ => true,
        }
    }

    fn start(&mut self, cx: &mut Context<'_, App>) {
        match self {
            Firmware::Radio(radio) => {
                radio.started = cx.now();
                radio.events = 0;
                radio.errors = 0;
                cx.shared_mut().link = LinkState::Connecting;
            }
            Firmware::StatusLed => cx.shared_mut().led = Rgb(0, 0, 0),
            Firmware::SensorPoll(poll) => {
                poll.accumulator = 0;
                poll.reads = 0;
            }
            Firmware::PollIndicator => cx.shared_mut().indicator = true,
        }
    }

    fn tick(&mut self, cx: &mut Context<'_, App>) {
        match self {
            Firmware::Radio(radio) => {
                radio.pump(cx);
                if radio.errors >= MAX_LINK_ERRORS {
                    if let Err(err) = cx.stop_self() {
                        cx.shared_mut().fault = Some(err);
                    }
                }
            }
            Firmware::StatusLed => {
                let app = cx.shared_mut();
                app.led = match app.link {
                    LinkState::Connected => Rgb(0, 50, 0),
                    LinkState::Connecting => Rgb(50, 50, 0),
                    LinkState::Disconnected => Rgb(50, 0, 0),
                };
            }
            Firmware::SensorPoll(poll) => {
                // Stand-in for an ADC conversion
                let raw = cx.now().as_millis() & 0x0FFF;
                poll.accumulator = poll.accumulator.wrapping_add(raw);
                poll.reads += 1;
            }
            Firmware::PollIndicator => {}
        }
    }

    fn stop(&mut self, cx: &mut Context<'_, App>) {
        match self {
            Firmware::Radio(_) => cx.shared_mut().link = LinkState::Disconnected,
            Firmware::StatusLed => cx.shared_mut().led = Rgb(0, 0, 0),
            Firmware::SensorPoll(poll) => {
                if poll.reads > 0 {
                    let app = cx.shared_mut();
                    app.last_sample = (poll.accumulator / poll.reads) as u16;
                    app.samples = app.samples.wrapping_add(1);
                }
            }
            Firmware::PollIndicator => cx.shared_mut().indicator = false,
        }
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

#[exception]
fn SysTick() {
    cortex_m4::advance_clock();
}

/// Firmware entry point. Sets up the clock, fills the action pool and runs
/// the scheduler. Does not return.
#[entry]
fn main() -> ! {
    let mut cp = cortex_m::Peripherals::take().unwrap();
    kernel::init(&mut cp);

    let mut app = App::new();
    let mut scheduler: Scheduler<Firmware> = Scheduler::new();

    let radio = scheduler
        .add_action(
            ActionConfig::new("radio")
                .interval(1000)
                .tick_timeout(1)
                .frozen(true),
            Firmware::Radio(Radio {
                started: Instant::from_millis(0),
                events: 0,
                errors: 0,
            }),
        )
        .expect("Failed to add radio");

    let status_led = scheduler
        .add_action(
            ActionConfig::new("status_led").tick_timeout(1),
            Firmware::StatusLed,
        )
        .expect("Failed to add status_led");

    let sensor_poll = scheduler
        .add_action(
            ActionConfig::new("sensor_poll")
                .interval(1000)
                .duration(20)
                .tick_timeout(5)
                .frozen(true),
            Firmware::SensorPoll(SensorPoll {
                accumulator: 0,
                reads: 0,
            }),
        )
        .expect("Failed to add sensor_poll");

    let poll_indicator = scheduler
        .add_action(ActionConfig::new("poll_indicator"), Firmware::PollIndicator)
        .expect("Failed to add poll_indicator");

    scheduler
        .link_child(sensor_poll, poll_indicator)
        .expect("Failed to chain poll_indicator");

    let boot: [ActionId; 3] = [radio, status_led, sensor_poll];
    for id in boot {
        scheduler.schedule(id).expect("Failed to schedule boot action");
    }

    kernel::run(&mut scheduler, &mut app)
}
