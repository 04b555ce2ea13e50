//! # Errors
//!
//! Rejections returned by registry and pool operations. None of these is
//! fatal: the caller gets the reason back and the scheduler state is left
//! untouched.

use crate::action::{ActionId, ActionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScheduleError {
    /// The handle does not name an action in this scheduler's pool.
    #[error("unknown action {0:?}")]
    UnknownAction(ActionId),

    /// The action is already a registry member.
    #[error("action {0:?} is already scheduled")]
    AlreadyScheduled(ActionId),

    /// Only `NonActive` actions can be scheduled.
    #[error("action {id:?} cannot be scheduled from state {state:?}")]
    NotInactive { id: ActionId, state: ActionState },

    /// The action is not a registry member.
    #[error("action {0:?} is not scheduled")]
    NotScheduled(ActionId),

    /// A running action has to stop before it leaves the registry.
    #[error("action {0:?} is running")]
    StillRunning(ActionId),

    /// The action pool is at capacity.
    #[error("action pool is full ({capacity} actions)")]
    PoolFull { capacity: usize },

    /// Linking would make the child chain loop back on itself.
    #[error("linking {child:?} under {parent:?} would create a cycle")]
    ChildCycle { parent: ActionId, child: ActionId },

    /// The action is busy with, or belongs to, another chain: it cannot
    /// become a child, and a linked child cannot be scheduled on its own.
    #[error("action {0:?} is tied to another chain")]
    ChildBusy(ActionId),

    /// Chains can only be rewired while the parent is idle.
    #[error("action {0:?} is busy and cannot change its child")]
    ParentBusy(ActionId),
}

pub type Result<T> = core::result::Result<T, ScheduleError>;
