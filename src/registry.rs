//! # Scheduler Registry
//!
//! Membership bookkeeping for Cadence.
//!
//! [`Registry`] is the insertion-ordered set of scheduled actions. It is an
//! intrusive doubly linked list laid over the pool's slot indices: each pool
//! slot owns one link cell, so membership tests, appends and removals are
//! O(1) and never move other entries. No heap, no reshuffling.
//!
//! [`ActionTable`] couples the registry with the pool of [`Action`] records
//! and implements the registry operations with their lifecycle rules:
//!
//! | Operation      | Rejected when                          | Effect |
//! |----------------|----------------------------------------|--------|
//! | `schedule`     | already a member, a child, or not `NonActive` | `Scheduled`, chain `ChildScheduled`, appended |
//! | `deschedule`   | not a member, or `Running`             | `NonActive`, chain `NonActive`, unlinked |
//! | `request_stop` | not a member                           | stop flag set, honoured next cycle |
//!
//! None of these operations invoke callbacks.

use heapless::Vec;

use crate::action::{Action, ActionId, ActionState};
use crate::error::{Result, ScheduleError};
use crate::handler::ActionControl;

// ---------------------------------------------------------------------------
// Ordered registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Link {
    prev: Option<ActionId>,
    next: Option<ActionId>,
    member: bool,
}

impl Link {
    const DETACHED: Link = Link {
        prev: None,
        next: None,
        member: false,
    };
}

/// Insertion-ordered set of scheduled action handles.
#[derive(Debug, Clone)]
pub struct Registry<const N: usize> {
    links: [Link; N],
    head: Option<ActionId>,
    tail: Option<ActionId>,
    len: usize,
}

impl<const N: usize> Registry<N> {
    pub const fn new() -> Self {
        Self {
            links: [Link::DETACHED; N],
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Identity lookup.
    #[inline]
    pub fn contains(&self, id: ActionId) -> bool {
        self.links.get(id.index()).is_some_and(|link| link.member)
    }

    /// Append `id`. Returns `false` if it is already a member or out of range.
    pub(crate) fn push_back(&mut self, id: ActionId) -> bool {
        if id.index() >= N || self.contains(id) {
            return false;
        }

        self.links[id.index()] = Link {
            prev: self.tail,
            next: None,
            member: true,
        };

        match self.tail {
            Some(tail) => self.links[tail.index()].next = Some(id),
            None => self.head = Some(id),
        }

        self.tail = Some(id);
        self.len += 1;
        true
    }

    /// Unlink `id`. Returns `false` if it was not a member.
    pub(crate) fn remove(&mut self, id: ActionId) -> bool {
        if !self.contains(id) {
            return false;
        }

        let Link { prev, next, .. } = self.links[id.index()];

        match prev {
            Some(prev) => self.links[prev.index()].next = next,
            None => self.head = next,
        }

        match next {
            Some(next) => self.links[next.index()].prev = prev,
            None => self.tail = prev,
        }

        self.links[id.index()] = Link::DETACHED;
        self.len -= 1;
        true
    }

    /// Members in insertion order.
    pub fn iter(&self) -> Iter<'_, N> {
        Iter {
            registry: self,
            next: self.head,
        }
    }
}

impl<const N: usize> Default for Registry<N> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a, const N: usize> {
    registry: &'a Registry<N>,
    next: Option<ActionId>,
}

impl<const N: usize> Iterator for Iter<'_, N> {
    type Item = ActionId;

    fn next(&mut self) -> Option<ActionId> {
        let current = self.next?;
        self.next = self.registry.links[current.index()].next;
        Some(current)
    }
}

// ---------------------------------------------------------------------------
// Action table: pool + registry
// ---------------------------------------------------------------------------

/// Fixed pool of action records plus the registry over them.
#[derive(Debug, Clone)]
pub struct ActionTable<const N: usize> {
    actions: Vec<Action, N>,
    registry: Registry<N>,
}

impl<const N: usize> ActionTable<N> {
    pub const fn new() -> Self {
        Self {
            actions: Vec::new(),
            registry: Registry::new(),
        }
    }

    /// Add a record to the pool.
    pub fn insert(&mut self, action: Action) -> Result<ActionId> {
        let id = ActionId::new(self.actions.len());
        self.actions
            .push(action)
            .map_err(|_| ScheduleError::PoolFull { capacity: N })?;
        Ok(id)
    }

    /// Number of actions in the pool, scheduled or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    #[inline]
    pub fn get(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(id.index())
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: ActionId) -> Option<&mut Action> {
        self.actions.get_mut(id.index())
    }

    #[inline]
    pub fn registry(&self) -> &Registry<N> {
        &self.registry
    }

    fn lookup(&self, id: ActionId) -> Result<&Action> {
        self.get(id).ok_or(ScheduleError::UnknownAction(id))
    }

    /// Record for a handle that came out of this table.
    ///
    /// # Panics
    /// If `id` is out of range.
    #[inline]
    pub(crate) fn record(&self, id: ActionId) -> &Action {
        &self.actions[id.index()]
    }

    #[inline]
    pub(crate) fn record_mut(&mut self, id: ActionId) -> &mut Action {
        &mut self.actions[id.index()]
    }

    /// The action whose chain `id` hangs directly under, if any.
    fn parent_of(&self, id: ActionId) -> Option<ActionId> {
        self.actions
            .iter()
            .position(|action| action.child == Some(id))
            .map(ActionId::new)
    }

    /// Set every action below `id` in its child chain to `state`.
    fn set_chain_state(&mut self, id: ActionId, state: ActionState) {
        let mut next = self.actions[id.index()].child;
        while let Some(child) = next {
            let action = &mut self.actions[child.index()];
            action.state = state;
            next = action.child;
        }
    }

    pub fn schedule(&mut self, id: ActionId) -> Result<()> {
        let action = self.lookup(id)?;

        if self.registry.contains(id) {
            debug!("schedule rejected: {} already scheduled", action.name());
            return Err(ScheduleError::AlreadyScheduled(id));
        }

        // Children run through their parent's cascade only
        if self.parent_of(id).is_some() {
            debug!("schedule rejected: {} is a child", action.name());
            return Err(ScheduleError::ChildBusy(id));
        }

        if action.state != ActionState::NonActive {
            debug!("schedule rejected: {} is {}", action.name(), action.state);
            return Err(ScheduleError::NotInactive {
                id,
                state: action.state,
            });
        }

        if !self.registry.push_back(id) {
            return Err(ScheduleError::PoolFull { capacity: N });
        }

        self.actions[id.index()].state = ActionState::Scheduled;
        self.set_chain_state(id, ActionState::ChildScheduled);

        debug!("scheduled {}", self.actions[id.index()].name());
        Ok(())
    }

    pub fn deschedule(&mut self, id: ActionId) -> Result<()> {
        let action = self.lookup(id)?;

        if !self.registry.contains(id) {
            return Err(ScheduleError::NotScheduled(id));
        }

        if action.is_running() {
            debug!("deschedule rejected: {} is running", action.name());
            return Err(ScheduleError::StillRunning(id));
        }

        let action = &mut self.actions[id.index()];
        action.state = ActionState::NonActive;
        action.pending_clear = false;
        action.stop_requested = false;
        self.set_chain_state(id, ActionState::NonActive);
        self.registry.remove(id);

        debug!("descheduled {}", self.actions[id.index()].name());
        Ok(())
    }

    pub fn request_stop(&mut self, id: ActionId) -> Result<()> {
        self.lookup(id)?;

        if !self.registry.contains(id) {
            return Err(ScheduleError::NotScheduled(id));
        }

        let action = &mut self.actions[id.index()];
        action.stop_requested = true;

        trace!("stop requested for {}", action.name());
        Ok(())
    }

    /// Make `child` the head of `parent`'s child chain.
    ///
    /// Both actions must be idle (`NonActive` and unregistered), the child
    /// must not already hang under another parent, and the link must not
    /// close a loop.
    pub fn link_child(&mut self, parent: ActionId, child: ActionId) -> Result<()> {
        let parent_action = self.lookup(parent)?;
        let child_action = self.lookup(child)?;

        if parent == child {
            return Err(ScheduleError::ChildCycle { parent, child });
        }

        if parent_action.state != ActionState::NonActive || self.registry.contains(parent) {
            return Err(ScheduleError::ParentBusy(parent));
        }

        if child_action.state != ActionState::NonActive || self.registry.contains(child) {
            return Err(ScheduleError::ChildBusy(child));
        }

        // A child belongs to at most one chain
        if self.parent_of(child).is_some_and(|owner| owner != parent) {
            return Err(ScheduleError::ChildBusy(child));
        }

        // Chains are acyclic, so this walk ends within the pool size.
        let mut next = Some(child);
        while let Some(id) = next {
            if id == parent {
                return Err(ScheduleError::ChildCycle { parent, child });
            }
            next = self.actions[id.index()].child;
        }

        self.actions[parent.index()].child = Some(child);
        Ok(())
    }

    /// Detach `parent`'s child chain, returning its former head.
    pub fn unlink_child(&mut self, parent: ActionId) -> Result<Option<ActionId>> {
        let action = self.lookup(parent)?;

        if action.state != ActionState::NonActive || self.registry.contains(parent) {
            return Err(ScheduleError::ParentBusy(parent));
        }

        Ok(self.actions[parent.index()].child.take())
    }
}

impl<const N: usize> Default for ActionTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ActionControl for ActionTable<N> {
    fn schedule(&mut self, id: ActionId) -> Result<()> {
        ActionTable::schedule(self, id)
    }

    fn deschedule(&mut self, id: ActionId) -> Result<()> {
        ActionTable::deschedule(self, id)
    }

    fn request_stop(&mut self, id: ActionId) -> Result<()> {
        ActionTable::request_stop(self, id)
    }

    fn state(&self, id: ActionId) -> Option<ActionState> {
        self.get(id).map(Action::state)
    }

    fn is_scheduled(&self, id: ActionId) -> bool {
        self.registry.contains(id)
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
