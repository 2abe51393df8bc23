//! Notification fan-out to subscribers

use imgate_core::{Notification, NotificationReceiver, NotificationSender};
use tracing::trace;

/// Broadcasts subscription pushes. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    sender: NotificationSender,
}

impl NotificationHub {
    pub fn new(sender: NotificationSender) -> Self {
        Self { sender }
    }

    pub fn publish(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            trace!("No subscribers for notification");
        }
    }

    pub fn subscribe(&self) -> NotificationReceiver {
        self.sender.subscribe()
    }
}
