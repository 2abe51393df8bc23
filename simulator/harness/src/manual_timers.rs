//! Deterministic timer scheduler
//!
//! Nothing fires on its own. Tests look up armed timers through a
//! [`TimerProbe`] and turn them into `Event::TimerFired` with
//! [`TimerProbe::fire`], then hand the event to the manager.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use imgate_core::{AccountIdentity, Event, TimerHandle, TimerId, TimerKind, TimerScheduler};

use crate::lock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmedTimer {
    pub id: TimerId,
    pub kind: TimerKind,
    pub delay: Duration,
}

#[derive(Debug, Default)]
struct TimerState {
    next_id: u64,
    armed: Vec<ArmedTimer>,
    cancelled: Vec<TimerId>,
}

#[derive(Debug, Default)]
pub struct ManualTimers {
    state: Arc<Mutex<TimerState>>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> TimerProbe {
        TimerProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl TimerScheduler for ManualTimers {
    fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerHandle {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = TimerId(state.next_id);
        state.armed.push(ArmedTimer { id, kind, delay });
        TimerHandle::new(id)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        let mut state = lock(&self.state);
        let id = handle.id();
        if let Some(index) = state.armed.iter().position(|timer| timer.id == id) {
            state.armed.remove(index);
            state.cancelled.push(id);
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimerProbe {
    state: Arc<Mutex<TimerState>>,
}

impl TimerProbe {
    pub fn armed(&self) -> Vec<ArmedTimer> {
        lock(&self.state).armed.clone()
    }

    pub fn armed_count(&self) -> usize {
        lock(&self.state).armed.len()
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        lock(&self.state).armed.iter().any(|timer| timer.id == id)
    }

    pub fn cancelled(&self) -> Vec<TimerId> {
        lock(&self.state).cancelled.clone()
    }

    pub fn find(&self, kind: &TimerKind) -> Option<ArmedTimer> {
        lock(&self.state)
            .armed
            .iter()
            .find(|timer| &timer.kind == kind)
            .cloned()
    }

    pub fn login_timeout(&self, identity: &AccountIdentity) -> Option<TimerId> {
        self.find(&TimerKind::LoginTimeout(identity.clone()))
            .map(|timer| timer.id)
    }

    pub fn queue_flush(&self) -> Option<TimerId> {
        self.find(&TimerKind::QueueFlush).map(|timer| timer.id)
    }

    pub fn queue_arm(&self, identity: &AccountIdentity) -> Option<TimerId> {
        self.find(&TimerKind::QueueArm(identity.clone()))
            .map(|timer| timer.id)
    }

    /// Disarm the timer and produce its firing event
    pub fn fire(&self, id: TimerId) -> Option<Event> {
        let mut state = lock(&self.state);
        let index = state.armed.iter().position(|timer| timer.id == id)?;
        let timer = state.armed.remove(index);
        Some(Event::TimerFired {
            timer: timer.id,
            kind: timer.kind,
        })
    }
}
