//! Protocol Provider seam
//!
//! The provider owns the actual IM protocols. The gateway drives it through
//! the synchronous [`ProtocolProvider`] calls and learns about outcomes from
//! [`ProviderEvent`]s that the provider posts back on the runtime's event
//! channel. Calls are fire-and-forget; a synchronous `Err` only means the
//! provider refused to start the operation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::ErrorCode;
use crate::availability::ProviderStatus;
use crate::errors::ProviderResult;

// ----------------------------------------------------------------------------
// Handles
// ----------------------------------------------------------------------------

/// Opaque provider-side account handle, reused across reconnects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderHandle(pub u64);

impl fmt::Display for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle-{}", self.0)
    }
}

/// Generation counter for login attempts on one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct LoginAttempt(pub u64);

impl LoginAttempt {
    pub fn next(self) -> Self {
        LoginAttempt(self.0 + 1)
    }
}

impl fmt::Display for LoginAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One provider connection attempt. Echoed back on connect and disconnect
/// events so late notices from a superseded attempt can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderSession {
    pub handle: ProviderHandle,
    pub attempt: LoginAttempt,
}

// ----------------------------------------------------------------------------
// Login Parameters and Events
// ----------------------------------------------------------------------------

/// Everything the provider needs to start a login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginParams {
    pub protocol_id: String,
    /// Username in provider form
    pub username: String,
    pub password: String,
    pub status: ProviderStatus,
    pub custom_message: String,
    /// Local interface to bind; `None` uses the provider default
    pub local_address: Option<String>,
    pub connect_server: Option<String>,
}

/// Reason class of a provider disconnect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisconnectKind {
    InvalidUsername,
    AuthenticationFailed,
    NetworkError,
    NameInUse,
    Other,
}

impl From<DisconnectKind> for ErrorCode {
    fn from(kind: DisconnectKind) -> Self {
        match kind {
            DisconnectKind::InvalidUsername => ErrorCode::BadUsername,
            DisconnectKind::AuthenticationFailed => ErrorCode::BadAuthentication,
            DisconnectKind::NetworkError => ErrorCode::NetworkError,
            DisconnectKind::NameInUse => ErrorCode::NameInUse,
            DisconnectKind::Other => ErrorCode::GenericError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectError {
    pub kind: DisconnectKind,
    pub description: String,
}

impl DisconnectError {
    pub fn new(kind: DisconnectKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }
}

/// A buddy as the provider reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuddyRecord {
    pub username: String,
    pub display_name: String,
    pub avatar_location: String,
    pub custom_message: String,
    pub status: ProviderStatus,
    pub group_name: String,
}

/// Asynchronous notifications from the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderEvent {
    /// Login attempt completed
    Connected { session: ProviderSession },
    /// Connection ended; `error` is `None` for a clean sign-off
    Disconnected {
        session: ProviderSession,
        error: Option<DisconnectError>,
    },
    IncomingMessage {
        handle: ProviderHandle,
        from: String,
        text: String,
        /// False for echoes of our own outgoing messages
        received: bool,
    },
    PresenceChanged {
        handle: ProviderHandle,
        buddy: BuddyRecord,
    },
}

// ----------------------------------------------------------------------------
// Provider Trait
// ----------------------------------------------------------------------------

/// Operations the gateway issues to the protocol layer
pub trait ProtocolProvider: Send {
    /// Create the provider-side account object
    fn create_account(&mut self, protocol_id: &str, username: &str)
        -> ProviderResult<ProviderHandle>;

    /// Start connecting; completion arrives as [`ProviderEvent::Connected`]
    /// or [`ProviderEvent::Disconnected`] carrying `session`
    fn login(&mut self, session: ProviderSession, params: LoginParams) -> ProviderResult<()>;

    /// Tear down whatever connection the handle has. Idempotent.
    fn disconnect(&mut self, handle: ProviderHandle);

    fn set_status(
        &mut self,
        handle: ProviderHandle,
        status: ProviderStatus,
        custom_message: &str,
    ) -> ProviderResult<()>;

    fn send_message(&mut self, handle: ProviderHandle, to: &str, text: &str)
        -> ProviderResult<()>;

    /// Write a raw protocol stanza on the connection
    fn send_raw(&mut self, handle: ProviderHandle, stanza: &str) -> ProviderResult<()>;

    /// Name the server knows the connected account by
    fn display_name(&self, handle: ProviderHandle) -> Option<String>;

    fn buddy_list(&self, handle: ProviderHandle) -> Vec<BuddyRecord>;

    /// Start delivering presence and message events. Called once.
    fn subscribe_presence(&mut self) -> ProviderResult<()>;
}
