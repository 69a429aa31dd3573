//! # Delayed-Action Scheduler
//!
//! Named, one-shot, cancellable timers advanced by the server tick.
//!
//! ## Design
//!
//! ```text
//!   schedule("respawn_7", 2s, Respawn(7))
//!          │
//!          ▼
//! ┌──────────────────┐  advance(dt)
//! │ pending (by id)  │ <──────────── clock moves, nothing fires
//! └──────────────────┘
//!          │ pop_due()     ┌─────────────┐
//!          ├─────────────> │ Dispatch<A> │ ──> owner runs it, then pops again
//!          │               └─────────────┘
//!          │ cancel(id)
//!          └──────────> Some(Dispatch { trigger: Cancelled, .. }) if OnCancel::Invoke
//! ```
//!
//! The scheduler stores *what* to do as a value of `A`, never a closure.
//! Fired and cancelled actions are handed back to the caller, which is
//! free to schedule again (even under the same id) while handling them.
//! Due actions leave the registry one at a time, so an action cancelled
//! while an earlier one is being handled never fires.
//!
//! ## Clock
//!
//! The scheduler keeps its own clock that only moves while enabled.
//! Disabling it freezes every countdown in place; re-enabling resumes
//! them with the time they had left.

use std::collections::HashMap;
use std::time::Duration;

/// Why an action was handed back to its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// The delay elapsed normally.
    Elapsed,
    /// The action was cancelled (or replaced) and asked to be told.
    Cancelled,
}

/// Whether a cancelled action is still handed back to the owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OnCancel {
    /// Cancellation silently discards the action.
    #[default]
    Discard,
    /// Cancellation returns the action once with [`Trigger::Cancelled`].
    Invoke,
}

/// An action returned to its owner for execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dispatch<A> {
    /// Id the action was registered under.
    pub id: String,
    /// The action payload.
    pub action: A,
    /// Why it is being dispatched.
    pub trigger: Trigger,
}

impl<A> Dispatch<A> {
    /// Returns true if this dispatch came from a cancellation.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.trigger == Trigger::Cancelled
    }
}

#[derive(Debug)]
struct Pending<A> {
    action: A,
    due: Duration,
    seq: u64,
    on_cancel: OnCancel,
}

/// Registry of pending one-shot actions keyed by string id.
///
/// At most one action exists per id. Scheduling under a taken id cancels
/// the previous action first.
#[derive(Debug)]
pub struct DelayScheduler<A> {
    pending: HashMap<String, Pending<A>>,
    /// Scheduler-local time, advanced only while enabled.
    clock: Duration,
    /// Registration counter used to break due-time ties.
    next_seq: u64,
    enabled: bool,
}

impl<A> Default for DelayScheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> DelayScheduler<A> {
    /// Creates an empty, enabled scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            clock: Duration::ZERO,
            next_seq: 0,
            enabled: true,
        }
    }

    /// Schedules `action` to fire after `delay`, discarded on cancel.
    ///
    /// Returns the displaced action if one was pending under `id` and it
    /// asked to be invoked on cancel.
    pub fn schedule(
        &mut self,
        id: impl Into<String>,
        delay: Duration,
        action: A,
    ) -> Option<Dispatch<A>> {
        self.schedule_with(id, delay, action, OnCancel::Discard)
    }

    /// Schedules `action` to fire after `delay` with an explicit cancel policy.
    ///
    /// # Arguments
    ///
    /// * `id` - Unique name; replaces any pending action with the same name
    /// * `delay` - Scheduler time until the action is due
    /// * `action` - Payload handed back on dispatch
    /// * `on_cancel` - Whether a later cancellation still hands the action back
    pub fn schedule_with(
        &mut self,
        id: impl Into<String>,
        delay: Duration,
        action: A,
        on_cancel: OnCancel,
    ) -> Option<Dispatch<A>> {
        let id = id.into();
        let displaced = self.cancel(&id);

        let seq = self.next_seq;
        self.next_seq += 1;
        tracing::debug!("delay scheduled: {} in {:?}", id, delay);
        self.pending.insert(
            id,
            Pending {
                action,
                due: self.clock.saturating_add(delay),
                seq,
                on_cancel,
            },
        );
        displaced
    }

    /// Cancels the action registered under `id`.
    ///
    /// Unknown ids are a no-op. The action is returned only if it was
    /// scheduled with [`OnCancel::Invoke`].
    pub fn cancel(&mut self, id: &str) -> Option<Dispatch<A>> {
        let (id, pending) = self.pending.remove_entry(id)?;
        tracing::debug!("delay cancelled: {}", id);
        Self::cancelled(id, pending)
    }

    /// Cancels every action whose id satisfies `predicate`.
    ///
    /// Returned dispatches are ordered by due time, then registration.
    pub fn cancel_matching<P>(&mut self, mut predicate: P) -> Vec<Dispatch<A>>
    where
        P: FnMut(&str) -> bool,
    {
        let ids: Vec<String> = self
            .pending
            .keys()
            .filter(|id| predicate(id))
            .cloned()
            .collect();
        self.take_ordered(ids)
            .into_iter()
            .filter_map(|(id, pending)| Self::cancelled(id, pending))
            .collect()
    }

    /// Cancels every action whose id starts with `prefix`.
    pub fn cancel_prefix(&mut self, prefix: &str) -> Vec<Dispatch<A>> {
        self.cancel_matching(|id| id.starts_with(prefix))
    }

    /// Cancels everything that is pending.
    pub fn cancel_all(&mut self) -> Vec<Dispatch<A>> {
        self.cancel_matching(|_| true)
    }

    /// Gates the clock. Disabled schedulers accept actions but never fire them.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            tracing::debug!("delay scheduler enabled: {}", enabled);
        }
        self.enabled = enabled;
    }

    /// Returns whether the clock is running.
    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Advances the clock by `dt`. Nothing fires until [`Self::pop_due`].
    ///
    /// Disabled schedulers ignore the call.
    pub fn advance(&mut self, dt: Duration) {
        if self.enabled {
            self.clock = self.clock.saturating_add(dt);
        }
    }

    /// Removes and returns the earliest action that is due.
    ///
    /// Ordered by due time, ties broken by registration order. Returns
    /// `None` once nothing is due or while the scheduler is disabled.
    pub fn pop_due(&mut self) -> Option<Dispatch<A>> {
        if !self.enabled {
            return None;
        }
        let now = self.clock;
        let id = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.due <= now)
            .min_by_key(|(_, pending)| (pending.due, pending.seq))
            .map(|(id, _)| id.clone())?;
        let (id, pending) = self.pending.remove_entry(&id)?;
        Some(Dispatch {
            id,
            action: pending.action,
            trigger: Trigger::Elapsed,
        })
    }

    /// Returns true if an action is pending under `id`.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    /// Returns the action pending under `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&A> {
        self.pending.get(id).map(|pending| &pending.action)
    }

    /// Returns how much scheduler time is left before `id` fires.
    #[must_use]
    pub fn remaining(&self, id: &str) -> Option<Duration> {
        self.pending
            .get(id)
            .map(|pending| pending.due.saturating_sub(self.clock))
    }

    /// Number of pending actions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Current scheduler time.
    #[inline]
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.clock
    }

    fn take_ordered(&mut self, ids: Vec<String>) -> Vec<(String, Pending<A>)> {
        let mut taken: Vec<(String, Pending<A>)> = ids
            .into_iter()
            .filter_map(|id| self.pending.remove_entry(&id))
            .collect();
        taken.sort_by_key(|(_, pending)| (pending.due, pending.seq));
        taken
    }

    fn cancelled(id: String, pending: Pending<A>) -> Option<Dispatch<A>> {
        match pending.on_cancel {
            OnCancel::Invoke => Some(Dispatch {
                id,
                action: pending.action,
                trigger: Trigger::Cancelled,
            }),
            OnCancel::Discard => None,
        }
    }
}
