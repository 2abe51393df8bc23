//! Timer scheduling seam
//!
//! A [`TimerHandle`] is the sole owner of an armed timer: it is not `Clone`
//! and [`TimerScheduler::cancel`] consumes it. Firings come back to the core
//! loop as `Event::TimerFired` carrying the [`TimerId`], which the state
//! machine compares against the handle it still holds.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::identity::AccountIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Owned reference to one armed timer
#[derive(Debug, PartialEq, Eq)]
pub struct TimerHandle {
    id: TimerId,
}

impl TimerHandle {
    /// Only schedulers mint handles
    pub fn new(id: TimerId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn matches(&self, id: TimerId) -> bool {
        self.id == id
    }
}

/// What a timer is for; delivered back with the firing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// Bounded wait for a provider connect
    LoginTimeout(AccountIdentity),
    /// Disable-and-flush after the display turned on
    QueueFlush,
    /// Enable queueing for an account that connected while the display was off
    QueueArm(AccountIdentity),
}

pub trait TimerScheduler: Send {
    /// Arm a one-shot timer
    fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerHandle;

    /// Disarm a timer. Releasing a handle whose timer already fired is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}
