//! # Scheduler
//!
//! Core scheduling logic for Cadence. Drives a fixed pool of actions through
//! their lifecycle, one cooperative cycle at a time.
//!
//! ## Cycle Algorithm
//!
//! On every call to [`Scheduler::run_cycle`]:
//! 1. **Snapshot**: Copy the registry, in insertion order, into the
//!    preallocated snapshot buffer. The snapshot length is fixed for the
//!    rest of the cycle.
//! 2. **Evaluate** each snapshot entry once, in order. Entries that left
//!    the registry earlier in the cycle are counted but skipped:
//!    a. If the start gate is open (no stop request, not running, interval
//!       elapsed since the last stop, handler's `can_start`), call `start`,
//!       mark it `Running` and start the child chain
//!    b. Otherwise, if running past its tick timeout, call `tick`; then, if
//!       a stop was requested or the duration ran out, stop the child chain,
//!       call `stop` and mark it `Pending`
//! 3. **Clear**: Deschedule every pool action whose stop armed the deferred
//!    clear (everything stopped this cycle that is not frozen).
//!
//! ## Reentrancy
//!
//! Callbacks may schedule, deschedule or stop actions through their
//! [`Context`]. Those calls only touch the registry, never the snapshot, so
//! an action scheduled mid-cycle waits for the next cycle, and the snapshot
//! length stays fixed. An action descheduled mid-cycle is not started,
//! ticked or stopped for the rest of the cycle.

use heapless::Vec;

use crate::action::{Action, ActionConfig, ActionId, ActionState};
use crate::config::MAX_ACTIONS;
use crate::error::{Result, ScheduleError};
use crate::handler::{Context, Handler};
use crate::registry::{ActionTable, Iter};
use crate::time::Instant;

// ---------------------------------------------------------------------------
// Cycle statistics
// ---------------------------------------------------------------------------

/// What one call to [`Scheduler::run_cycle`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleStats {
    /// Snapshot entries walked.
    pub evaluated: usize,
    /// Actions started (children not counted).
    pub started: usize,
    /// `tick` callbacks fired.
    pub ticked: usize,
    /// Actions stopped (children not counted).
    pub stopped: usize,
    /// Actions removed by the deferred clear.
    pub cleared: usize,
}

#[derive(Clone, Copy)]
enum Hook {
    Start,
    Tick,
    Stop,
}

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// The action scheduler.
///
/// ## Design Notes
///
/// - Action records, handlers, registry links and the snapshot buffer are
///   all sized by `N` and stored inline (no heap)
/// - Records and handlers live in separate arrays so a handler can be
///   borrowed mutably while its callback edits the registry
/// - The caller owns the clock; every cycle is handed its timestamp
pub struct Scheduler<H, const N: usize = MAX_ACTIONS> {
    /// Callback side of each pool slot, indexed like `table`.
    handlers: Vec<H, N>,

    /// Action records and the registry over them.
    table: ActionTable<N>,

    /// Registry copy for the cycle in progress.
    snapshot: Vec<ActionId, N>,

    /// Completed cycles.
    cycles: u64,
}

impl<H, const N: usize> Scheduler<H, N> {
    /// Create an empty scheduler.
    pub const fn new() -> Self {
        Self {
            handlers: Vec::new(),
            table: ActionTable::new(),
            snapshot: Vec::new(),
            cycles: 0,
        }
    }

    /// Add an action to the pool. It starts out `NonActive`.
    ///
    /// # Returns
    /// - `Ok(id)`: the action's handle
    /// - `Err(PoolFull)`: all `N` slots are taken
    pub fn add_action(&mut self, config: ActionConfig, handler: H) -> Result<ActionId> {
        self.handlers
            .push(handler)
            .map_err(|_| ScheduleError::PoolFull { capacity: N })?;

        match self.table.insert(Action::new(config)) {
            Ok(id) => {
                debug!("added action {} as {}", config.name, id);
                Ok(id)
            }
            Err(err) => {
                self.handlers.pop();
                Err(err)
            }
        }
    }

    /// Register an action. See [`ActionTable::schedule`].
    pub fn schedule(&mut self, id: ActionId) -> Result<()> {
        self.table.schedule(id)
    }

    /// Unregister an idle or stopped action. See [`ActionTable::deschedule`].
    pub fn deschedule(&mut self, id: ActionId) -> Result<()> {
        self.table.deschedule(id)
    }

    /// Ask a scheduled action to stop on its next evaluation.
    pub fn request_stop(&mut self, id: ActionId) -> Result<()> {
        self.table.request_stop(id)
    }

    /// Chain `child` under `parent`. See [`ActionTable::link_child`].
    pub fn link_child(&mut self, parent: ActionId, child: ActionId) -> Result<()> {
        self.table.link_child(parent, child)
    }

    pub fn unlink_child(&mut self, parent: ActionId) -> Result<Option<ActionId>> {
        self.table.unlink_child(parent)
    }

    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.table.get(id)
    }

    pub fn state(&self, id: ActionId) -> Option<ActionState> {
        self.table.get(id).map(Action::state)
    }

    pub fn handler(&self, id: ActionId) -> Option<&H> {
        self.handlers.get(id.index())
    }

    pub fn handler_mut(&mut self, id: ActionId) -> Option<&mut H> {
        self.handlers.get_mut(id.index())
    }

    pub fn is_scheduled(&self, id: ActionId) -> bool {
        self.table.registry().contains(id)
    }

    pub fn scheduled_count(&self) -> usize {
        self.table.registry().len()
    }

    /// Scheduled actions in registry order.
    pub fn scheduled(&self) -> Iter<'_, N> {
        self.table.registry().iter()
    }

    /// Number of actions in the pool.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of completed cycles, wrapping.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one scheduling cycle at `now`.
    ///
    /// `shared` is the application state every callback of this cycle gets
    /// through its [`Context`].
    pub fn run_cycle<S: ?Sized>(&mut self, now: Instant, shared: &mut S) -> CycleStats
    where
        H: Handler<S>,
    {
        self.take_snapshot();

        let mut stats = CycleStats {
            evaluated: self.snapshot.len(),
            ..CycleStats::default()
        };

        for i in 0..self.snapshot.len() {
            let id = self.snapshot[i];

            // Descheduled by an earlier callback this cycle
            if !self.table.registry().contains(id) {
                continue;
            }

            if self.can_start(id, now, shared) {
                self.start_action(id, now, shared);
                stats.started += 1;
                continue;
            }

            if self.table.record(id).tick_due(now) {
                self.invoke(id, now, shared, Hook::Tick);
                stats.ticked += 1;
            }

            if self.table.record(id).should_stop(now) {
                self.stop_action(id, now, shared);
                stats.stopped += 1;
            }
        }

        stats.cleared = self.clear_pending();
        self.cycles = self.cycles.wrapping_add(1);

        trace!(
            "cycle at {}ms: evaluated={} started={} ticked={} stopped={} cleared={}",
            now.as_millis(),
            stats.evaluated,
            stats.started,
            stats.ticked,
            stats.stopped,
            stats.cleared
        );

        stats
    }

    /// Copy current registry membership into the snapshot buffer.
    ///
    /// # Panics
    /// If more actions are registered than the buffer holds. The pool and
    /// the registry share capacity `N`, so this means a broken invariant,
    /// not a configuration the scheduler can recover from.
    fn take_snapshot(&mut self) {
        self.snapshot.clear();
        for id in self.table.registry().iter() {
            if self.snapshot.push(id).is_err() {
                panic!(
                    "{} scheduled actions exceed the snapshot capacity of {}",
                    self.table.registry().len(),
                    N
                );
            }
        }
    }

    fn can_start<S: ?Sized>(&mut self, id: ActionId, now: Instant, shared: &mut S) -> bool
    where
        H: Handler<S>,
    {
        if !self.table.record(id).start_gate_open(now) {
            return false;
        }

        let Self {
            handlers, table, ..
        } = self;
        let cx = Context::new(id, now, shared, table);
        handlers[id.index()].can_start(&cx)
    }

    /// Start `id`, then every child in chain order.
    fn start_action<S: ?Sized>(&mut self, id: ActionId, now: Instant, shared: &mut S)
    where
        H: Handler<S>,
    {
        self.invoke(id, now, shared, Hook::Start);
        self.table.record_mut(id).mark_started(now);
        debug!("started {} at {}ms", self.table.record(id).name(), now.as_millis());

        let mut next = self.table.record(id).child;
        while let Some(child) = next {
            self.invoke(child, now, shared, Hook::Start);
            let record = self.table.record_mut(child);
            record.state = ActionState::ChildRunning;
            next = record.child;
        }
    }

    /// Stop every child in chain order, then `id` itself.
    fn stop_action<S: ?Sized>(&mut self, id: ActionId, now: Instant, shared: &mut S)
    where
        H: Handler<S>,
    {
        let mut next = self.table.record(id).child;
        while let Some(child) = next {
            self.invoke(child, now, shared, Hook::Stop);
            let record = self.table.record_mut(child);
            record.state = ActionState::NonActive;
            next = record.child;
        }

        self.invoke(id, now, shared, Hook::Stop);
        self.table.record_mut(id).mark_stopped(now);
        debug!("stopped {} at {}ms", self.table.record(id).name(), now.as_millis());
    }

    fn invoke<S: ?Sized>(&mut self, id: ActionId, now: Instant, shared: &mut S, hook: Hook)
    where
        H: Handler<S>,
    {
        let Self {
            handlers, table, ..
        } = self;
        let handler = &mut handlers[id.index()];
        let mut cx = Context::new(id, now, shared, table);

        match hook {
            Hook::Start => handler.start(&mut cx),
            Hook::Tick => handler.tick(&mut cx),
            Hook::Stop => handler.stop(&mut cx),
        }
    }

    /// Deferred clear over the whole pool. Returns how many were removed.
    fn clear_pending(&mut self) -> usize {
        let mut cleared = 0;

        for index in 0..self.table.len() {
            let id = ActionId::new(index);
            if !self.table.record(id).pending_clear {
                continue;
            }

            match self.table.deschedule(id) {
                Ok(()) => cleared += 1,
                Err(err) => warn!("deferred clear of {} failed: {}", id, err),
            }
            self.table.record_mut(id).pending_clear = false;
        }

        cleared
    }
}

impl<H, const N: usize> Default for Scheduler<H, N> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec as StdVec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Start,
        Tick,
        Stop,
    }

    /// Shared state handed to every callback.
    #[derive(Default)]
    struct Journal {
        events: StdVec<(usize, Event)>,
        blocked: bool,
    }

    impl Journal {
        fn take(&mut self) -> StdVec<(usize, Event)> {
            core::mem::take(&mut self.events)
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum Probe {
        Plain,
        Gated,
        ScheduleOnStart(ActionId),
        DescheduleOnStart(ActionId),
        ScheduleOnStop(ActionId),
        StopSelfOnTick,
    }

    fn record(cx: &mut Context<'_, Journal>, event: Event) {
        let index = cx.id().index();
        cx.shared_mut().events.push((index, event));
    }

    impl Handler<Journal> for Probe {
        fn can_start(&self, cx: &Context<'_, Journal>) -> bool {
            match self {
                Probe::Gated => !cx.shared().blocked,
                _ => true,
            }
        }

        fn start(&mut self, cx: &mut Context<'_, Journal>) {
            record(cx, Event::Start);
            match *self {
                Probe::ScheduleOnStart(other) => cx.schedule(other).unwrap(),
                Probe::DescheduleOnStart(other) => cx.deschedule(other).unwrap(),
                _ => {}
            }
        }

        fn tick(&mut self, cx: &mut Context<'_, Journal>) {
            record(cx, Event::Tick);
            if let Probe::StopSelfOnTick = self {
                cx.stop_self().unwrap();
            }
        }

        fn stop(&mut self, cx: &mut Context<'_, Journal>) {
            record(cx, Event::Stop);
            if let Probe::ScheduleOnStop(other) = *self {
                cx.schedule(other).unwrap();
            }
        }
    }

    type TestScheduler = Scheduler<Probe, 8>;

    fn at(ms: u32) -> Instant {
        Instant::from_millis(ms)
    }

    fn add(sched: &mut TestScheduler, config: ActionConfig) -> ActionId {
        sched.add_action(config, Probe::Plain).unwrap()
    }

    #[test]
    fn test_schedule_twice_fails() {
        let mut sched = TestScheduler::new();
        let radio = add(&mut sched, ActionConfig::new("radio"));

        assert!(sched.schedule(radio).is_ok());
        assert_eq!(
            sched.schedule(radio),
            Err(ScheduleError::AlreadyScheduled(radio))
        );
        assert_eq!(sched.scheduled_count(), 1);
    }

    #[test]
    fn test_pool_capacity_is_enforced() {
        let mut sched: Scheduler<Probe, 2> = Scheduler::new();
        assert_eq!(sched.capacity(), 2);
        sched.add_action(ActionConfig::new("a"), Probe::Plain).unwrap();
        sched.add_action(ActionConfig::new("b"), Probe::Plain).unwrap();
        assert_eq!(
            sched.add_action(ActionConfig::new("c"), Probe::Plain),
            Err(ScheduleError::PoolFull { capacity: 2 })
        );
        assert_eq!(sched.len(), 2);
    }

    #[test]
    fn test_deschedule_running_fails_until_stopped() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let radio = add(&mut sched, ActionConfig::new("radio").frozen(true));

        sched.schedule(radio).unwrap();
        sched.run_cycle(at(0), &mut journal);
        assert_eq!(sched.state(radio), Some(ActionState::Running));
        assert_eq!(
            sched.deschedule(radio),
            Err(ScheduleError::StillRunning(radio))
        );

        sched.request_stop(radio).unwrap();
        sched.run_cycle(at(1), &mut journal);
        assert_eq!(sched.state(radio), Some(ActionState::Pending));
        assert!(sched.deschedule(radio).is_ok());
        assert_eq!(sched.state(radio), Some(ActionState::NonActive));
        assert!(!sched.is_scheduled(radio));
    }

    #[test]
    fn test_first_cycle_starts_scheduled_actions_in_order() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let a = add(&mut sched, ActionConfig::new("a"));
        let b = add(&mut sched, ActionConfig::new("b"));
        let c = add(&mut sched, ActionConfig::new("c"));

        sched.schedule(c).unwrap();
        sched.schedule(a).unwrap();
        sched.schedule(b).unwrap();

        let stats = sched.run_cycle(at(5), &mut journal);
        assert_eq!(stats.evaluated, 3);
        assert_eq!(stats.started, 3);
        assert_eq!(
            journal.take(),
            [
                (c.index(), Event::Start),
                (a.index(), Event::Start),
                (b.index(), Event::Start)
            ]
        );
        assert_eq!(sched.action(a).unwrap().start_time(), Some(at(5)));

        // Running actions are not started again
        let stats = sched.run_cycle(at(6), &mut journal);
        assert_eq!(stats.started, 0);
        assert!(journal.take().is_empty());
        assert_eq!(sched.cycles(), 2);
    }

    #[test]
    fn test_interval_gates_restart() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let poll = add(
            &mut sched,
            ActionConfig::new("poll").interval(100).frozen(true),
        );

        sched.schedule(poll).unwrap();
        sched.run_cycle(at(0), &mut journal);
        sched.request_stop(poll).unwrap();
        sched.run_cycle(at(1000), &mut journal);
        assert_eq!(sched.action(poll).unwrap().last_stop_time(), Some(at(1000)));
        journal.take();

        for now in [1001, 1050, 1099] {
            sched.run_cycle(at(now), &mut journal);
            assert_eq!(sched.state(poll), Some(ActionState::Pending));
        }
        assert!(journal.take().is_empty());

        sched.run_cycle(at(1100), &mut journal);
        assert_eq!(sched.state(poll), Some(ActionState::Running));
        assert_eq!(journal.take(), [(poll.index(), Event::Start)]);
        assert_eq!(sched.action(poll).unwrap().start_time(), Some(at(1100)));
    }

    #[test]
    fn test_duration_stops_and_clears() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let burst = add(&mut sched, ActionConfig::new("burst").duration(50));

        sched.schedule(burst).unwrap();
        sched.run_cycle(at(2000), &mut journal);

        let stats = sched.run_cycle(at(2049), &mut journal);
        assert_eq!(stats.stopped, 0);
        assert_eq!(sched.state(burst), Some(ActionState::Running));

        let stats = sched.run_cycle(at(2050), &mut journal);
        assert_eq!(stats.stopped, 1);
        assert_eq!(stats.cleared, 1);
        assert_eq!(
            journal.take(),
            [(burst.index(), Event::Start), (burst.index(), Event::Stop)]
        );
        assert_eq!(sched.state(burst), Some(ActionState::NonActive));
        assert!(!sched.is_scheduled(burst));
        assert_eq!(sched.action(burst).unwrap().last_stop_time(), Some(at(2050)));
    }

    #[test]
    fn test_duration_across_clock_wrap() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let burst = add(&mut sched, ActionConfig::new("burst").duration(20));

        sched.schedule(burst).unwrap();
        sched.run_cycle(at(u32::MAX - 9), &mut journal);

        sched.run_cycle(at(9), &mut journal);
        assert_eq!(sched.state(burst), Some(ActionState::Running));

        sched.run_cycle(at(10), &mut journal);
        assert_eq!(sched.state(burst), Some(ActionState::NonActive));
    }

    #[test]
    fn test_tick_fires_every_cycle_past_timeout() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let radio = add(&mut sched, ActionConfig::new("radio").tick_timeout(5));

        sched.schedule(radio).unwrap();
        sched.run_cycle(at(0), &mut journal);
        journal.take();

        let ticks: StdVec<usize> = [3, 5, 6, 7, 8]
            .into_iter()
            .map(|now| sched.run_cycle(at(now), &mut journal).ticked)
            .collect();
        assert_eq!(ticks, [0, 0, 1, 1, 1]);
        assert_eq!(
            journal.take(),
            [
                (radio.index(), Event::Tick),
                (radio.index(), Event::Tick),
                (radio.index(), Event::Tick)
            ]
        );
    }

    #[test]
    fn test_stop_requested_from_tick_stops_in_same_evaluation() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let radio = sched
            .add_action(
                ActionConfig::new("radio").tick_timeout(1),
                Probe::StopSelfOnTick,
            )
            .unwrap();

        sched.schedule(radio).unwrap();
        sched.run_cycle(at(0), &mut journal);
        sched.run_cycle(at(2), &mut journal);

        assert_eq!(
            journal.take(),
            [
                (radio.index(), Event::Start),
                (radio.index(), Event::Tick),
                (radio.index(), Event::Stop)
            ]
        );
        assert!(!sched.is_scheduled(radio));
    }

    #[test]
    fn test_can_start_predicate_is_authoritative() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal {
            blocked: true,
            ..Journal::default()
        };
        let gated = sched
            .add_action(ActionConfig::new("gated"), Probe::Gated)
            .unwrap();

        sched.schedule(gated).unwrap();
        sched.run_cycle(at(0), &mut journal);
        assert_eq!(sched.state(gated), Some(ActionState::Scheduled));

        journal.blocked = false;
        sched.run_cycle(at(1), &mut journal);
        assert_eq!(sched.state(gated), Some(ActionState::Running));
    }

    #[test]
    fn test_child_chain_starts_with_parent() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let parent = add(&mut sched, ActionConfig::new("parent"));
        let child = add(&mut sched, ActionConfig::new("child"));
        let grandchild = add(&mut sched, ActionConfig::new("grandchild"));

        sched.link_child(child, grandchild).unwrap();
        sched.link_child(parent, child).unwrap();
        sched.schedule(parent).unwrap();
        assert_eq!(sched.state(child), Some(ActionState::ChildScheduled));
        assert_eq!(sched.state(grandchild), Some(ActionState::ChildScheduled));

        sched.run_cycle(at(0), &mut journal);
        sched.run_cycle(at(1), &mut journal);

        assert_eq!(
            journal.take(),
            [
                (parent.index(), Event::Start),
                (child.index(), Event::Start),
                (grandchild.index(), Event::Start)
            ]
        );
        assert_eq!(sched.state(child), Some(ActionState::ChildRunning));
        assert_eq!(sched.state(grandchild), Some(ActionState::ChildRunning));
        assert_eq!(sched.scheduled_count(), 1);
    }

    #[test]
    fn test_child_starts_once_through_parent() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let parent = add(&mut sched, ActionConfig::new("parent"));
        let child = add(&mut sched, ActionConfig::new("child"));

        sched.link_child(parent, child).unwrap();
        assert_eq!(sched.schedule(child), Err(ScheduleError::ChildBusy(child)));
        sched.schedule(parent).unwrap();

        let stats = sched.run_cycle(at(0), &mut journal);
        assert_eq!(stats.evaluated, 1);
        assert_eq!(stats.started, 1);
        assert_eq!(
            journal.take(),
            [(parent.index(), Event::Start), (child.index(), Event::Start)]
        );
        assert!(!sched.is_scheduled(child));
    }

    #[test]
    fn test_child_chain_stops_before_parent() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let parent = add(&mut sched, ActionConfig::new("parent").frozen(true));
        let child = add(&mut sched, ActionConfig::new("child"));
        let grandchild = add(&mut sched, ActionConfig::new("grandchild"));

        sched.link_child(child, grandchild).unwrap();
        sched.link_child(parent, child).unwrap();
        sched.schedule(parent).unwrap();
        sched.run_cycle(at(0), &mut journal);
        journal.take();

        sched.request_stop(parent).unwrap();
        sched.run_cycle(at(10), &mut journal);

        assert_eq!(
            journal.take(),
            [
                (child.index(), Event::Stop),
                (grandchild.index(), Event::Stop),
                (parent.index(), Event::Stop)
            ]
        );
        assert_eq!(sched.state(parent), Some(ActionState::Pending));
        assert_eq!(sched.state(child), Some(ActionState::NonActive));
        assert_eq!(sched.state(grandchild), Some(ActionState::NonActive));
    }

    #[test]
    fn test_frozen_action_stays_registered() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let frozen = add(
            &mut sched,
            ActionConfig::new("frozen").duration(10).frozen(true),
        );
        let plain = add(&mut sched, ActionConfig::new("plain").duration(10));

        sched.schedule(frozen).unwrap();
        sched.schedule(plain).unwrap();
        sched.run_cycle(at(0), &mut journal);

        let stats = sched.run_cycle(at(10), &mut journal);
        assert_eq!(stats.stopped, 2);
        assert_eq!(stats.cleared, 1);

        assert_eq!(sched.state(frozen), Some(ActionState::Pending));
        assert!(sched.is_scheduled(frozen));
        assert!(!sched.action(frozen).unwrap().is_pending_clear());

        assert_eq!(sched.state(plain), Some(ActionState::NonActive));
        assert!(!sched.is_scheduled(plain));
    }

    #[test]
    fn test_frozen_action_reruns_after_interval() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let poll = add(
            &mut sched,
            ActionConfig::new("poll")
                .interval(100)
                .duration(10)
                .frozen(true),
        );

        sched.schedule(poll).unwrap();
        for now in (0..=220).step_by(5) {
            sched.run_cycle(at(now), &mut journal);
        }

        let starts: StdVec<usize> = journal
            .events
            .iter()
            .filter(|(_, event)| *event == Event::Start)
            .map(|(index, _)| *index)
            .collect();
        // starts at 0, 110 and 220
        assert_eq!(starts.len(), 3);
        assert_eq!(sched.state(poll), Some(ActionState::Running));
        assert_eq!(sched.action(poll).unwrap().start_time(), Some(at(220)));
    }

    #[test]
    fn test_stop_request_on_idle_action() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let idle = sched
            .add_action(ActionConfig::new("idle"), Probe::Gated)
            .unwrap();
        journal.blocked = true;

        sched.schedule(idle).unwrap();
        sched.run_cycle(at(0), &mut journal);
        sched.request_stop(idle).unwrap();
        let stats = sched.run_cycle(at(1), &mut journal);

        assert_eq!(stats.stopped, 1);
        assert_eq!(journal.take(), [(idle.index(), Event::Stop)]);
        assert!(!sched.is_scheduled(idle));
        assert!(!sched.action(idle).unwrap().is_stop_requested());
    }

    #[test]
    fn test_schedule_from_callback_waits_for_next_cycle() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let b = add(&mut sched, ActionConfig::new("b"));
        let c = add(&mut sched, ActionConfig::new("c"));
        let a = sched
            .add_action(ActionConfig::new("a"), Probe::ScheduleOnStart(c))
            .unwrap();

        sched.schedule(a).unwrap();
        sched.schedule(b).unwrap();

        let stats = sched.run_cycle(at(0), &mut journal);
        assert_eq!(stats.evaluated, 2);
        assert_eq!(stats.started, 2);
        assert_eq!(sched.scheduled_count(), 3);
        assert_eq!(sched.state(c), Some(ActionState::Scheduled));
        assert_eq!(
            journal.take(),
            [(a.index(), Event::Start), (b.index(), Event::Start)]
        );

        let stats = sched.run_cycle(at(1), &mut journal);
        assert_eq!(stats.evaluated, 3);
        assert_eq!(stats.started, 1);
        assert_eq!(journal.take(), [(c.index(), Event::Start)]);
    }

    #[test]
    fn test_deschedule_from_callback_keeps_current_snapshot() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let b = add(&mut sched, ActionConfig::new("b"));
        let a = sched
            .add_action(ActionConfig::new("a"), Probe::DescheduleOnStart(b))
            .unwrap();

        sched.schedule(a).unwrap();
        sched.schedule(b).unwrap();

        let stats = sched.run_cycle(at(0), &mut journal);
        assert_eq!(stats.evaluated, 2);
        assert_eq!(stats.started, 1);
        assert_eq!(journal.take(), [(a.index(), Event::Start)]);
        assert_eq!(sched.scheduled_count(), 1);
        assert!(!sched.is_scheduled(b));
        assert_eq!(sched.state(b), Some(ActionState::NonActive));

        // Still usable afterwards
        assert!(sched.schedule(b).is_ok());
        assert!(sched.deschedule(b).is_ok());

        let stats = sched.run_cycle(at(1), &mut journal);
        assert_eq!(stats.evaluated, 1);
        assert_eq!(sched.scheduled().collect::<StdVec<_>>(), [a]);
    }

    #[test]
    fn test_stop_request_dropped_on_deschedule() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal {
            blocked: true,
            ..Journal::default()
        };
        let idle = sched
            .add_action(ActionConfig::new("idle"), Probe::Gated)
            .unwrap();

        sched.schedule(idle).unwrap();
        sched.request_stop(idle).unwrap();
        sched.deschedule(idle).unwrap();
        assert!(!sched.action(idle).unwrap().is_stop_requested());

        let stats = sched.run_cycle(at(0), &mut journal);
        assert_eq!(stats.evaluated, 0);
        assert!(journal.take().is_empty());
        assert_eq!(sched.state(idle), Some(ActionState::NonActive));
    }

    #[test]
    fn test_stop_callback_schedules_follow_up() {
        let mut sched = TestScheduler::new();
        let mut journal = Journal::default();
        let follow_up = add(&mut sched, ActionConfig::new("follow-up"));
        let first = sched
            .add_action(
                ActionConfig::new("first").duration(10),
                Probe::ScheduleOnStop(follow_up),
            )
            .unwrap();

        sched.schedule(first).unwrap();
        sched.run_cycle(at(0), &mut journal);

        let stats = sched.run_cycle(at(10), &mut journal);
        assert_eq!(stats.started, 0);
        assert_eq!(stats.cleared, 1);
        assert_eq!(sched.state(follow_up), Some(ActionState::Scheduled));
        assert_eq!(sched.scheduled().collect::<StdVec<_>>(), [follow_up]);

        let stats = sched.run_cycle(at(11), &mut journal);
        assert_eq!(stats.started, 1);
        assert_eq!(sched.state(follow_up), Some(ActionState::Running));
    }

    #[test]
    fn test_handler_access() {
        let mut sched = TestScheduler::new();
        let gated = sched
            .add_action(ActionConfig::new("gated"), Probe::Gated)
            .unwrap();

        assert!(matches!(sched.handler(gated), Some(Probe::Gated)));
        *sched.handler_mut(gated).unwrap() = Probe::Plain;
        assert!(matches!(sched.handler(gated), Some(Probe::Plain)));
        assert_eq!(sched.action(gated).unwrap().name(), "gated");
    }
}
