//! # Action Handlers
//!
//! The callback side of an action. The scheduler decides *when* an action
//! starts, ticks and stops; a [`Handler`] decides *what* happens then.
//!
//! Handlers are usually an enum over the firmware's action kinds (radio,
//! LED, sensor poll, ...), which keeps dispatch static. Trait objects work as
//! well through the `&mut H` impl below.
//!
//! Every callback receives a [`Context`]: the action the call is for (which
//! may be a child in a cascade), the cycle timestamp, the application's
//! shared state, and the registry operations, so a callback can schedule
//! follow-up work or stop itself. Registry changes made from a callback
//! take effect from the next cycle.

use crate::action::{ActionId, ActionState};
use crate::error::Result;
use crate::time::Instant;

/// Start/tick/stop capability of one action kind.
///
/// Callbacks must return promptly: every other action waits for them.
/// Failures are the handler's own business. The scheduler does not look at
/// them, so report them through the shared state.
pub trait Handler<S: ?Sized> {
    /// Extra start gate, consulted only once the timing gates are open.
    fn can_start(&self, _cx: &Context<'_, S>) -> bool {
        true
    }

    fn start(&mut self, cx: &mut Context<'_, S>);

    /// Periodic callback for a running action past its tick timeout.
    fn tick(&mut self, _cx: &mut Context<'_, S>) {}

    fn stop(&mut self, cx: &mut Context<'_, S>);
}

impl<S: ?Sized, H: Handler<S> + ?Sized> Handler<S> for &mut H {
    fn can_start(&self, cx: &Context<'_, S>) -> bool {
        (**self).can_start(cx)
    }

    fn start(&mut self, cx: &mut Context<'_, S>) {
        (**self).start(cx)
    }

    fn tick(&mut self, cx: &mut Context<'_, S>) {
        (**self).tick(cx)
    }

    fn stop(&mut self, cx: &mut Context<'_, S>) {
        (**self).stop(cx)
    }
}

/// Registry operations available from inside a callback.
pub trait ActionControl {
    fn schedule(&mut self, id: ActionId) -> Result<()>;
    fn deschedule(&mut self, id: ActionId) -> Result<()>;
    fn request_stop(&mut self, id: ActionId) -> Result<()>;
    fn state(&self, id: ActionId) -> Option<ActionState>;
    fn is_scheduled(&self, id: ActionId) -> bool;
}

/// What a callback gets to see and touch.
pub struct Context<'a, S: ?Sized> {
    id: ActionId,
    now: Instant,
    shared: &'a mut S,
    actions: &'a mut dyn ActionControl,
}

impl<'a, S: ?Sized> Context<'a, S> {
    pub fn new(
        id: ActionId,
        now: Instant,
        shared: &'a mut S,
        actions: &'a mut dyn ActionControl,
    ) -> Self {
        Self {
            id,
            now,
            shared,
            actions,
        }
    }

    /// The action this callback runs for.
    #[inline]
    pub fn id(&self) -> ActionId {
        self.id
    }

    /// Timestamp of the current cycle.
    #[inline]
    pub fn now(&self) -> Instant {
        self.now
    }

    #[inline]
    pub fn shared(&self) -> &S {
        &*self.shared
    }

    #[inline]
    pub fn shared_mut(&mut self) -> &mut S {
        &mut *self.shared
    }

    pub fn schedule(&mut self, id: ActionId) -> Result<()> {
        self.actions.schedule(id)
    }

    pub fn deschedule(&mut self, id: ActionId) -> Result<()> {
        self.actions.deschedule(id)
    }

    pub fn request_stop(&mut self, id: ActionId) -> Result<()> {
        self.actions.request_stop(id)
    }

    /// Ask for this action to be stopped on the next cycle.
    ///
    /// Fails for children, which are never registered themselves.
    pub fn stop_self(&mut self) -> Result<()> {
        self.actions.request_stop(self.id)
    }

    pub fn state(&self, id: ActionId) -> Option<ActionState> {
        self.actions.state(id)
    }

    pub fn is_scheduled(&self, id: ActionId) -> bool {
        self.actions.is_scheduled(id)
    }
}
