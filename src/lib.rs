//! # Cadence
//!
//! A cooperative action scheduler for bare-metal firmware.
//!
//! ## Overview
//!
//! Firmware behavior is split into *actions*: named units of work with a
//! `start`, periodic `tick` and `stop` callback. The application drives the
//! scheduler from its main loop by calling
//! [`Scheduler::run_cycle`] with the current time. Each cycle walks the set
//! of scheduled actions and decides, per action, whether to start it, tick
//! it, stop it, or leave it alone. Nothing preempts anything: every callback
//! runs to completion on the caller's stack.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │            Application Actions (impl Handler)          │
//! ├────────────────────────────────────────────────────────┤
//! │              Scheduler (scheduler.rs)                  │
//! │   add_action() · schedule() · link_child() · run_cycle()│
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Registry    │   Callback API     │  Errors           │
//! │  registry.rs │   handler.rs       │  error.rs         │
//! │  ─ push_back │   ─ Handler        │  ─ ScheduleError  │
//! │  ─ remove    │   ─ Context        │                   │
//! │  ─ iter      │   ─ ActionControl  │                   │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │              Action Model (action.rs)                  │
//! │    ActionConfig · ActionState · timing predicates      │
//! ├────────────────────────────────────────────────────────┤
//! │     Firmware glue (kernel.rs, arch/cortex_m4.rs)       │
//! │        SysTick clock · main loop  [feature=firmware]   │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cycle Model
//!
//! A cycle first copies the registry into a snapshot, then evaluates the
//! snapshot in registration order:
//!
//! 1. If the action is `Scheduled`, its interval has elapsed since the last
//!    stop and its handler agrees, it starts along with its child chain.
//! 2. Otherwise, a running action past its tick timeout is ticked.
//! 3. Then, a running action past its duration (or asked to stop) is
//!    stopped, children first.
//!
//! After the walk, every action that stopped this cycle and is not
//! *frozen* leaves the registry. Frozen actions stay registered and start
//! again once their interval has elapsed.
//!
//! Schedule and deschedule calls made from callbacks change the registry
//! immediately. An action scheduled mid-cycle waits for the next snapshot;
//! one descheduled mid-cycle is skipped for the rest of the cycle.
//!
//! ## Memory Model
//!
//! - **No heap**: the action pool, registry and snapshot are fixed-capacity
//! - **Capacity**: a const generic `N`, defaulting to
//!   [`config::MAX_ACTIONS`]
//! - **Host testable**: the core builds with `std` under `cargo test`; only
//!   the `firmware` feature pulls in Cortex-M support

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod action;
pub mod config;
pub mod error;
pub mod handler;
pub mod registry;
pub mod scheduler;
pub mod time;

#[cfg(feature = "firmware")]
pub mod arch;
#[cfg(feature = "firmware")]
pub mod kernel;

pub use action::{Action, ActionConfig, ActionId, ActionState};
pub use error::{Result, ScheduleError};
pub use handler::{ActionControl, Context, Handler};
pub use scheduler::{CycleStats, Scheduler};
pub use time::Instant;
