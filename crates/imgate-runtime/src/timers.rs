//! Tokio-backed timer scheduler
//!
//! Each timer is a spawned task that sleeps and then posts
//! `Event::TimerFired` into the core loop. Cancelling aborts the task; a
//! firing that was already queued is filtered by the state machine.

use std::collections::HashMap;
use std::time::Duration;

use imgate_core::{Event, EventSender, TimerHandle, TimerId, TimerKind, TimerScheduler};
use tokio::task::AbortHandle;
use tracing::{debug, trace};

pub struct TokioTimers {
    events: EventSender,
    next_id: u64,
    armed: HashMap<TimerId, AbortHandle>,
}

impl TokioTimers {
    /// Must be created inside a tokio runtime
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            next_id: 0,
            armed: HashMap::new(),
        }
    }

    pub fn armed(&self) -> usize {
        self.armed.len()
    }
}

impl TimerScheduler for TokioTimers {
    fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerHandle {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let events = self.events.clone();

        trace!(timer = %id, ?kind, ?delay, "Arming timer");
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if events.send(Event::TimerFired { timer: id, kind }).await.is_err() {
                debug!(timer = %id, "Event channel closed before timer fired");
            }
        });
        self.armed.insert(id, task.abort_handle());

        TimerHandle::new(id)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.armed.remove(&handle.id()) {
            task.abort();
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for (_, task) in self.armed.drain() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgate_core::{create_event_channel, AccountIdentity, ChannelConfig};

    #[tokio::test(start_paused = true)]
    async fn test_timer_posts_event() {
        let (sender, mut receiver) = create_event_channel(&ChannelConfig::testing());
        let mut timers = TokioTimers::new(sender);
        let identity = AccountIdentity::new("aol", "user1");
        let handle = timers.schedule(
            Duration::from_secs(30),
            TimerKind::LoginTimeout(identity.clone()),
        );

        let event = receiver.recv().await.unwrap();
        assert_eq!(
            event,
            Event::TimerFired {
                timer: handle.id(),
                kind: TimerKind::LoginTimeout(identity)
            }
        );
        timers.cancel(handle);
        assert_eq!(timers.armed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_is_silent() {
        let (sender, mut receiver) = create_event_channel(&ChannelConfig::testing());
        let mut timers = TokioTimers::new(sender);
        let cancelled = timers.schedule(Duration::from_secs(5), TimerKind::QueueFlush);
        let kept = timers.schedule(Duration::from_secs(10), TimerKind::QueueFlush);
        timers.cancel(cancelled);

        match receiver.recv().await.unwrap() {
            Event::TimerFired { timer, .. } => assert_eq!(timer, kept.id()),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
