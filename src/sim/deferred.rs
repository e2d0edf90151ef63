//! Tick-counted deferred actions
//!
//! Delayed effects (a mismatched memory pair flipping back) are queued
//! against the session tick counter and drained at the start of each tick.
//! Every action carries enough identity for the consumer to recognise that
//! its target is gone and skip it.

use serde::{Deserialize, Serialize};

/// A delayed state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeferredAction {
    /// Turn two memory cards face down and release the flip lock
    FlipBack {
        /// Deck generation the cards belong to
        deck: u32,
        first: usize,
        second: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Scheduled {
    due_tick: u64,
    action: DeferredAction,
}

/// Queue of pending actions, fired in scheduling order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeferredQueue {
    pending: Vec<Scheduled>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` once `now + delay` ticks have elapsed
    pub fn schedule(&mut self, now: u64, delay: u64, action: DeferredAction) {
        self.pending.push(Scheduled {
            due_tick: now + delay,
            action,
        });
    }

    /// Remove and return every action due at or before `now`
    pub fn drain_due(&mut self, now: u64) -> Vec<DeferredAction> {
        let mut due = Vec::new();
        self.pending.retain(|s| {
            if s.due_tick <= now {
                due.push(s.action);
                false
            } else {
                true
            }
        });
        due
    }

    /// Drop pending actions matching `pred`
    pub fn cancel_where(&mut self, pred: impl Fn(&DeferredAction) -> bool) {
        self.pending.retain(|s| !pred(&s.action));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
