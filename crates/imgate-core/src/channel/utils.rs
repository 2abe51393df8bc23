//! Channel Utilities for CSP Communication

use tracing::debug;

use crate::channel::communication::{Command, Event, Notification};
use crate::config::ChannelConfig;

pub type CommandSender = tokio::sync::mpsc::Sender<Command>;
pub type CommandReceiver = tokio::sync::mpsc::Receiver<Command>;
pub type EventSender = tokio::sync::mpsc::Sender<Event>;
pub type EventReceiver = tokio::sync::mpsc::Receiver<Event>;
pub type NotificationSender = tokio::sync::broadcast::Sender<Notification>;
pub type NotificationReceiver = tokio::sync::broadcast::Receiver<Notification>;

// ----------------------------------------------------------------------------
// Channel Creation Utilities
// ----------------------------------------------------------------------------

/// Create bounded command channel (clients → Core Logic)
pub fn create_command_channel(config: &ChannelConfig) -> (CommandSender, CommandReceiver) {
    tokio::sync::mpsc::channel(config.command_buffer_size)
}

/// Create bounded event channel (collaborators → Core Logic)
pub fn create_event_channel(config: &ChannelConfig) -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::channel(config.event_buffer_size)
}

/// Create broadcast notification channel (One-to-Many: Core Logic → subscribers)
/// Subscribers get their receivers from `sender.subscribe()`
pub fn create_notification_channel(
    config: &ChannelConfig,
) -> (NotificationSender, NotificationReceiver) {
    tokio::sync::broadcast::channel(config.notification_buffer_size)
}

/// Post an event from synchronous provider code. The send finishes on its
/// own task, so a full buffer delays the event rather than losing it.
pub fn spawn_send_event(sender: &EventSender, event: Event) {
    let sender = sender.clone();
    tokio::spawn(async move {
        if sender.send(event).await.is_err() {
            debug!("Event channel closed, provider event dropped");
        }
    });
}
