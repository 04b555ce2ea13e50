//! # Action Record
//!
//! Defines the action model for Cadence. An action is one schedulable unit of
//! work (a radio stack pump, an LED refresh, a sensor poll) with its own
//! timing parameters, lifecycle state and an optional child chain that is
//! started and stopped together with it.
//!
//! The record holds only scheduling data. What the action actually does
//! lives in its [`Handler`](crate::handler::Handler), stored alongside the
//! record in the scheduler's pool.

use crate::time::Instant;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Stable handle to an action in a scheduler's pool.
///
/// Handles are pool indices handed out by
/// [`Scheduler::add_action`](crate::scheduler::Scheduler::add_action) and
/// never reused, so two distinct actions never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActionId(usize);

impl ActionId {
    #[inline]
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the action in the pool.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Lifecycle state machine
// ---------------------------------------------------------------------------

/// Lifecycle state of an action.
///
/// ```text
///   ┌───────────┐  schedule()  ┌───────────┐   start   ┌─────────┐
///   │ NonActive │ ───────────► │ Scheduled │ ────────► │ Running │
///   └───────────┘              └───────────┘           └─────────┘
///         ▲                          │  ▲                   │
///         │       deschedule()       │  │ restart           │ stop
///         ├──────────────────────────┘  │ (frozen)          ▼
///         │                             │             ┌─────────┐
///         └─────────────────────────────┴──────────── │ Pending │
///                 deferred clear                      └─────────┘
/// ```
///
/// Children never sit in the registry themselves. They mirror their parent
/// as `ChildScheduled` / `ChildRunning` and drop straight back to
/// `NonActive` when the parent stops or is descheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActionState {
    /// Not scheduled. Initial and terminal state.
    NonActive,
    /// Registered and waiting for its start gate to open.
    Scheduled,
    /// Start callback has fired.
    Running,
    /// Stop callback has fired; waiting for the deferred clear (or for a
    /// restart, if frozen).
    Pending,
    /// Part of a scheduled parent's child chain.
    ChildScheduled,
    /// Started through its parent's cascade.
    ChildRunning,
}

// ---------------------------------------------------------------------------
// Action configuration (immutable after creation)
// ---------------------------------------------------------------------------

/// Static configuration for an action, set when it joins the pool.
#[derive(Debug, Clone, Copy)]
pub struct ActionConfig {
    /// Label used in log output.
    pub name: &'static str,

    /// Cooldown after a stop before the action may start again.
    /// `0` means no gating.
    pub interval_ms: u32,

    /// Longest the action may run before it is stopped automatically.
    /// `0` means unbounded.
    pub duration_ms: u32,

    /// Running time after which `tick` fires on every cycle.
    /// `0` disables ticking.
    pub tick_timeout_ms: u32,

    /// Keep the action registered after it stops, so it restarts once its
    /// interval has elapsed.
    pub frozen: bool,
}

impl ActionConfig {
    /// A config with no gating, no duration limit and no ticking.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            interval_ms: 0,
            duration_ms: 0,
            tick_timeout_ms: 0,
            frozen: false,
        }
    }

    pub const fn interval(mut self, ms: u32) -> Self {
        self.interval_ms = ms;
        self
    }

    pub const fn duration(mut self, ms: u32) -> Self {
        self.duration_ms = ms;
        self
    }

    pub const fn tick_timeout(mut self, ms: u32) -> Self {
        self.tick_timeout_ms = ms;
        self
    }

    pub const fn frozen(mut self, frozen: bool) -> Self {
        self.frozen = frozen;
        self
    }
}

// ---------------------------------------------------------------------------
// Action record
// ---------------------------------------------------------------------------

/// Scheduling state of one action.
///
/// Fields are only written by the scheduler and the registry operations;
/// everything else sees the record through the accessors.
#[derive(Debug, Clone)]
pub struct Action {
    config: ActionConfig,
    pub(crate) state: ActionState,
    /// `None` until the first stop. Interval gating only applies after one.
    pub(crate) last_stop: Option<Instant>,
    pub(crate) started_at: Option<Instant>,
    pub(crate) stop_requested: bool,
    pub(crate) pending_clear: bool,
    pub(crate) child: Option<ActionId>,
}

impl Action {
    pub const fn new(config: ActionConfig) -> Self {
        Self {
            config,
            state: ActionState::NonActive,
            last_stop: None,
            started_at: None,
            stop_requested: false,
            pending_clear: false,
            child: None,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.config.name
    }

    #[inline]
    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> ActionState {
        self.state
    }

    #[inline]
    pub fn child(&self) -> Option<ActionId> {
        self.child
    }

    #[inline]
    pub fn last_stop_time(&self) -> Option<Instant> {
        self.last_stop
    }

    #[inline]
    pub fn start_time(&self) -> Option<Instant> {
        self.started_at
    }

    #[inline]
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested
    }

    #[inline]
    pub fn is_pending_clear(&self) -> bool {
        self.pending_clear
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == ActionState::Running
    }

    /// Baseline start gate: everything except the handler's own
    /// `can_start` predicate.
    pub fn start_gate_open(&self, now: Instant) -> bool {
        if self.stop_requested || self.is_running() {
            return false;
        }

        let interval = self.config.interval_ms;
        if interval > 0 {
            if let Some(stopped) = self.last_stop {
                if now.millis_since(stopped) < interval {
                    return false;
                }
            }
        }

        true
    }

    /// True once a running action has been up longer than its tick timeout.
    /// Stays true every cycle after that; the start time is not reset.
    pub fn tick_due(&self, now: Instant) -> bool {
        let timeout = self.config.tick_timeout_ms;
        match self.started_at {
            Some(started) if self.is_running() && timeout > 0 => {
                now.millis_since(started) > timeout
            }
            _ => false,
        }
    }

    /// Stop gate: an explicit request, or a running action whose duration
    /// has run out.
    pub fn should_stop(&self, now: Instant) -> bool {
        if self.stop_requested {
            return true;
        }

        let duration = self.config.duration_ms;
        match self.started_at {
            Some(started) if self.is_running() && duration > 0 => {
                now.millis_since(started) >= duration
            }
            _ => false,
        }
    }

    /// Record a start at `now`.
    pub(crate) fn mark_started(&mut self, now: Instant) {
        self.state = ActionState::Running;
        self.started_at = Some(now);
    }

    /// Record a stop at `now` and arm the deferred clear unless frozen.
    pub(crate) fn mark_stopped(&mut self, now: Instant) {
        self.last_stop = Some(now);
        self.state = ActionState::Pending;
        self.pending_clear = !self.config.frozen;
        self.stop_requested = false;
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
