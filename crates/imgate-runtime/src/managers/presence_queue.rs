//! Presence-queue controller
//!
//! While the device display is off, jabber servers are asked to queue
//! presence updates instead of pushing them. Turning the display back on
//! disables and flushes the queue after a debounce delay; an account that
//! connects while the display is off gets queueing enabled after a short
//! post-login delay. The controller decides *when*; the account manager
//! sends the resulting [`QueueDirective`] to the right sessions.

use std::collections::HashMap;
use std::time::Duration;

use imgate_core::{AccountIdentity, TimerHandle, TimerId, TimerKind, TimerScheduler, TimeoutConfig};
use tracing::debug;

/// Server-side queue command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueDirective {
    Enable,
    /// Disable and flush whatever was queued
    Disable,
}

impl QueueDirective {
    /// Raw stanza sent from the account's own address
    pub fn stanza(self, from: &str) -> String {
        let body = match self {
            QueueDirective::Enable => "<enable/>",
            QueueDirective::Disable => "<disable/><flush/>",
        };
        format!("<iq from='{from}' type='set'><query xmlns='google:queue'>{body}</query></iq>")
    }
}

#[derive(Debug)]
pub struct PresenceQueueController {
    display_on: bool,
    feed_registered: bool,
    pending_flush: Option<TimerHandle>,
    arm_timers: HashMap<AccountIdentity, TimerHandle>,
    flush_delay: Duration,
    post_login_delay: Duration,
}

impl PresenceQueueController {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        Self {
            display_on: true,
            feed_registered: false,
            pending_flush: None,
            arm_timers: HashMap::new(),
            flush_delay: timeouts.queue_flush_delay(),
            post_login_delay: timeouts.post_login_queue_delay(),
        }
    }

    pub fn display_on(&self) -> bool {
        self.display_on
    }

    pub fn feed_registered(&self) -> bool {
        self.feed_registered
    }

    pub fn mark_feed_registered(&mut self) {
        self.feed_registered = true;
    }

    pub fn armed_timers(&self) -> usize {
        self.arm_timers.len() + usize::from(self.pending_flush.is_some())
    }

    /// Apply a display transition. Returns a directive to send to every
    /// online account right away.
    pub fn on_display_state_changed(
        &mut self,
        display_on: bool,
        timers: &mut dyn TimerScheduler,
    ) -> Option<QueueDirective> {
        if display_on == self.display_on {
            return None;
        }
        self.display_on = display_on;

        if display_on {
            self.schedule_flush(timers);
            None
        } else {
            if let Some(handle) = self.pending_flush.take() {
                timers.cancel(handle);
            }
            Some(QueueDirective::Enable)
        }
    }

    /// (Re)arm the disable-and-flush timer
    pub fn schedule_flush(&mut self, timers: &mut dyn TimerScheduler) {
        if let Some(handle) = self.pending_flush.take() {
            timers.cancel(handle);
        }
        self.pending_flush = Some(timers.schedule(self.flush_delay, TimerKind::QueueFlush));
    }

    /// Flush timer fired. Returns the directive when it is still current.
    pub fn on_flush_fired(
        &mut self,
        timer: TimerId,
        timers: &mut dyn TimerScheduler,
    ) -> Option<QueueDirective> {
        match self.pending_flush.take() {
            Some(handle) if handle.matches(timer) => {
                timers.cancel(handle);
                self.display_on.then_some(QueueDirective::Disable)
            }
            other => {
                self.pending_flush = other;
                debug!(%timer, "Ignoring stale queue flush timer");
                None
            }
        }
    }

    /// Account came online while the display was off
    pub fn arm_for_account(&mut self, identity: &AccountIdentity, timers: &mut dyn TimerScheduler) {
        let handle = timers.schedule(
            self.post_login_delay,
            TimerKind::QueueArm(identity.clone()),
        );
        if let Some(previous) = self.arm_timers.insert(identity.clone(), handle) {
            timers.cancel(previous);
        }
    }

    /// Post-login timer fired. True when queueing should be enabled for the
    /// account (the caller still checks that it is online).
    pub fn on_arm_fired(
        &mut self,
        identity: &AccountIdentity,
        timer: TimerId,
        timers: &mut dyn TimerScheduler,
    ) -> bool {
        match self.arm_timers.remove(identity) {
            Some(handle) if handle.matches(timer) => {
                timers.cancel(handle);
                !self.display_on
            }
            Some(handle) => {
                self.arm_timers.insert(identity.clone(), handle);
                debug!(account = %identity, %timer, "Ignoring stale queue arm timer");
                false
            }
            None => false,
        }
    }

    /// Account left the online state
    pub fn cancel_for_account(&mut self, identity: &AccountIdentity, timers: &mut dyn TimerScheduler) {
        if let Some(handle) = self.arm_timers.remove(identity) {
            timers.cancel(handle);
        }
    }

    /// The display feed failed: assume the display is on, forget the
    /// registration so it is retried, and stop queueing now.
    pub fn on_feed_failed(&mut self, timers: &mut dyn TimerScheduler) -> QueueDirective {
        self.display_on = true;
        self.feed_registered = false;
        if let Some(handle) = self.pending_flush.take() {
            timers.cancel(handle);
        }
        QueueDirective::Disable
    }

    pub fn shutdown(&mut self, timers: &mut dyn TimerScheduler) {
        if let Some(handle) = self.pending_flush.take() {
            timers.cancel(handle);
        }
        for (_, handle) in self.arm_timers.drain() {
            timers.cancel(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingTimers {
        next: u64,
        scheduled: Vec<(TimerId, TimerKind)>,
        cancelled: Vec<TimerId>,
    }

    impl TimerScheduler for RecordingTimers {
        fn schedule(&mut self, _delay: Duration, kind: TimerKind) -> TimerHandle {
            self.next += 1;
            self.scheduled.push((TimerId(self.next), kind));
            TimerHandle::new(TimerId(self.next))
        }

        fn cancel(&mut self, handle: TimerHandle) {
            self.cancelled.push(handle.id());
        }
    }

    fn controller() -> PresenceQueueController {
        PresenceQueueController::new(&TimeoutConfig::default())
    }

    #[test]
    fn test_stanzas() {
        assert_eq!(
            QueueDirective::Enable.stanza("me@gmail.com/imgate"),
            "<iq from='me@gmail.com/imgate' type='set'><query xmlns='google:queue'><enable/></query></iq>"
        );
        assert_eq!(
            QueueDirective::Disable.stanza("me@gmail.com/imgate"),
            "<iq from='me@gmail.com/imgate' type='set'><query xmlns='google:queue'><disable/><flush/></query></iq>"
        );
    }

    #[test]
    fn test_display_off_enables_immediately() {
        let mut timers = RecordingTimers::default();
        let mut queue = controller();
        assert_eq!(
            queue.on_display_state_changed(false, &mut timers),
            Some(QueueDirective::Enable)
        );
        assert_eq!(queue.on_display_state_changed(false, &mut timers), None);
        assert!(timers.scheduled.is_empty());
    }

    #[test]
    fn test_display_on_flushes_after_delay() {
        let mut timers = RecordingTimers::default();
        let mut queue = controller();
        queue.on_display_state_changed(false, &mut timers);
        assert_eq!(queue.on_display_state_changed(true, &mut timers), None);
        assert_eq!(timers.scheduled, vec![(TimerId(1), TimerKind::QueueFlush)]);

        assert_eq!(
            queue.on_flush_fired(TimerId(1), &mut timers),
            Some(QueueDirective::Disable)
        );
        assert_eq!(queue.armed_timers(), 0);
    }

    #[test]
    fn test_flush_cancelled_when_display_turns_off_again() {
        let mut timers = RecordingTimers::default();
        let mut queue = controller();
        queue.on_display_state_changed(false, &mut timers);
        queue.on_display_state_changed(true, &mut timers);
        queue.on_display_state_changed(false, &mut timers);

        assert_eq!(timers.cancelled, vec![TimerId(1)]);
        assert_eq!(queue.on_flush_fired(TimerId(1), &mut timers), None);
    }

    #[test]
    fn test_arm_timer_only_enables_while_display_off() {
        let mut timers = RecordingTimers::default();
        let mut queue = controller();
        let identity = AccountIdentity::new("gmail", "me@gmail.com");
        queue.on_display_state_changed(false, &mut timers);
        queue.arm_for_account(&identity, &mut timers);
        assert!(queue.on_arm_fired(&identity, TimerId(1), &mut timers));

        queue.arm_for_account(&identity, &mut timers);
        queue.on_display_state_changed(true, &mut timers);
        assert!(!queue.on_arm_fired(&identity, TimerId(2), &mut timers));
    }

    #[test]
    fn test_rearm_replaces_previous_timer() {
        let mut timers = RecordingTimers::default();
        let mut queue = controller();
        let identity = AccountIdentity::new("gmail", "me@gmail.com");
        queue.on_display_state_changed(false, &mut timers);
        queue.arm_for_account(&identity, &mut timers);
        queue.arm_for_account(&identity, &mut timers);

        assert_eq!(timers.cancelled, vec![TimerId(1)]);
        assert!(!queue.on_arm_fired(&identity, TimerId(1), &mut timers));
        assert!(queue.on_arm_fired(&identity, TimerId(2), &mut timers));
    }

    #[test]
    fn test_feed_failure_resets() {
        let mut timers = RecordingTimers::default();
        let mut queue = controller();
        queue.mark_feed_registered();
        queue.on_display_state_changed(false, &mut timers);

        assert_eq!(queue.on_feed_failed(&mut timers), QueueDirective::Disable);
        assert!(queue.display_on());
        assert!(!queue.feed_registered());
    }

    #[test]
    fn test_shutdown_cancels_everything() {
        let mut timers = RecordingTimers::default();
        let mut queue = controller();
        let identity = AccountIdentity::new("gmail", "me@gmail.com");
        queue.on_display_state_changed(false, &mut timers);
        queue.arm_for_account(&identity, &mut timers);
        queue.on_display_state_changed(true, &mut timers);
        assert_eq!(queue.armed_timers(), 2);

        queue.shutdown(&mut timers);
        assert_eq!(queue.armed_timers(), 0);
        assert_eq!(timers.cancelled.len(), 2);
    }
}
