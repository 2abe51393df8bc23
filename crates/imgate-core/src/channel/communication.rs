//! CSP Channel Communication Protocol Types
//!
//! All traffic into and out of the core logic task flows through these
//! types: [`Command`]s from clients, [`Event`]s from the provider, timers and
//! display feed, and [`Notification`]s fanned out to subscribers. Each
//! command carries a [`Responder`] for its reply.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use crate::api::{
    AccountReply, BuddyListSnapshot, BuddyStatus, DeviceConnectionClosedRequest,
    GetBuddyListRequest, IncomingMessage, LoginRequest, LogoutRequest,
    RegisterForIncomingMessagesRequest, SendMessageRequest, SetMyAvailabilityRequest,
    SetMyCustomMessageRequest, SimpleReply, StatusReply, StatusReport,
};
use crate::display::DisplayEvent;
use crate::provider::ProviderEvent;
use crate::timer::{TimerId, TimerKind};

// ----------------------------------------------------------------------------
// Reply Correlation
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reply slot for one client request. `send` consumes the responder, so a
/// request can be answered at most once.
#[derive(Debug)]
pub struct Responder<T> {
    id: RequestId,
    sender: oneshot::Sender<T>,
}

impl<T> Responder<T> {
    pub fn new() -> (Self, oneshot::Receiver<T>) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                id: RequestId::new(),
                sender,
            },
            receiver,
        )
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn send(self, reply: T) {
        if self.sender.send(reply).is_err() {
            debug!(request = %self.id, "Client went away before the reply was sent");
        }
    }
}

// ----------------------------------------------------------------------------
// Command: Clients → Core Logic
// ----------------------------------------------------------------------------

#[derive(Debug)]
pub enum Command {
    Login {
        request: LoginRequest,
        reply: Responder<AccountReply>,
    },
    Logout {
        request: LogoutRequest,
        reply: Responder<AccountReply>,
    },
    SetMyAvailability {
        request: SetMyAvailabilityRequest,
        reply: Responder<StatusReply>,
    },
    SetMyCustomMessage {
        request: SetMyCustomMessageRequest,
        reply: Responder<StatusReply>,
    },
    SendMessage {
        request: SendMessageRequest,
        reply: Responder<SimpleReply>,
    },
    GetBuddyList {
        request: GetBuddyListRequest,
        reply: Responder<SimpleReply>,
    },
    RegisterForIncomingMessages {
        request: RegisterForIncomingMessagesRequest,
        reply: Responder<SimpleReply>,
    },
    /// A network interface went away; drop every account bound to it
    DeviceConnectionClosed {
        request: DeviceConnectionClosedRequest,
        reply: Responder<SimpleReply>,
    },
    EnablePresenceQueue {
        reply: Responder<SimpleReply>,
    },
    DisablePresenceQueue {
        reply: Responder<SimpleReply>,
    },
    /// Request detailed system status report
    GetStatus {
        reply: Responder<StatusReport>,
    },
    /// Shutdown the gateway gracefully
    Shutdown,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login { .. } => "login",
            Command::Logout { .. } => "logout",
            Command::SetMyAvailability { .. } => "setMyAvailability",
            Command::SetMyCustomMessage { .. } => "setMyCustomMessage",
            Command::SendMessage { .. } => "sendMessage",
            Command::GetBuddyList { .. } => "getBuddyList",
            Command::RegisterForIncomingMessages { .. } => "registerForIncomingMessages",
            Command::DeviceConnectionClosed { .. } => "deviceConnectionClosed",
            Command::EnablePresenceQueue { .. } => "enablePresenceQueue",
            Command::DisablePresenceQueue { .. } => "disablePresenceQueue",
            Command::GetStatus { .. } => "getStatus",
            Command::Shutdown => "shutdown",
        }
    }
}

// ----------------------------------------------------------------------------
// Event: Collaborators → Core Logic
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Provider(ProviderEvent),
    TimerFired { timer: TimerId, kind: TimerKind },
    Display(DisplayEvent),
}

impl From<ProviderEvent> for Event {
    fn from(event: ProviderEvent) -> Self {
        Event::Provider(event)
    }
}

impl From<DisplayEvent> for Event {
    fn from(event: DisplayEvent) -> Self {
        Event::Display(event)
    }
}

// ----------------------------------------------------------------------------
// Notification: Core Logic → Subscribers
// ----------------------------------------------------------------------------

/// Subscription pushes. Serialized as `{"subscription": ..., "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "subscription", content = "payload", rename_all = "camelCase")]
pub enum Notification {
    BuddyList(BuddyListSnapshot),
    BuddyStatus(BuddyStatus),
    IncomingMessage(IncomingMessage),
    /// Unsolicited session drop
    AccountStatus(AccountReply),
}

impl Notification {
    /// Service and username of the account the push concerns
    pub fn account(&self) -> (&str, &str) {
        match self {
            Notification::BuddyList(n) => (&n.service_name, &n.username),
            Notification::BuddyStatus(n) => (&n.service_name, &n.username),
            Notification::IncomingMessage(n) => (&n.service_name, &n.username),
            Notification::AccountStatus(n) => (&n.service_name, &n.username),
        }
    }
}
