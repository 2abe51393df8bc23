//! imgate Core
//!
//! Stable API definitions for the imgate account-session gateway:
//! - Account identity resolution and availability mapping
//! - Client-facing request, reply and notification payloads
//! - The collaborator seams (protocol provider, timers, display feed)
//! - Channel message types for the CSP-style runtime
//! - Error taxonomy and centralized configuration
//!
//! The stateful engine lives in `imgate-runtime`.

pub mod api;
pub mod availability;
pub mod channel;
pub mod config;
pub mod display;
pub mod errors;
pub mod identity;
pub mod provider;
pub mod text;
pub mod timer;

pub use api::{
    AccountReply, BuddyEntry, BuddyListSnapshot, BuddyStatus, ConnectionStatus, DeviceConnectionClosedRequest,
    ErrorCode, GetBuddyListRequest, IncomingMessage, LoginRequest, LogoutRequest,
    RegisterForIncomingMessagesRequest, SendMessageRequest, SessionCounts,
    SetMyAvailabilityRequest, SetMyCustomMessageRequest, SimpleReply, StatusReply, StatusReport,
};
pub use availability::{ClientAvailability, ProviderStatus};
pub use channel::{
    utils::{
        create_command_channel, create_event_channel, create_notification_channel,
        spawn_send_event, CommandReceiver, CommandSender, EventReceiver, EventSender,
        NotificationReceiver, NotificationSender,
    },
    Command, Event, Notification, RequestId, Responder,
};
pub use config::{ChannelConfig, GatewayConfig, TimeoutConfig};
pub use display::{DisplayEvent, DisplayMonitor};
pub use errors::{GatewayError, GatewayResult, ProviderError, ProviderResult, SessionError};
pub use identity::AccountIdentity;
pub use provider::{
    BuddyRecord, DisconnectError, DisconnectKind, LoginAttempt, LoginParams, ProtocolProvider,
    ProviderEvent, ProviderHandle, ProviderSession,
};
pub use timer::{TimerHandle, TimerId, TimerKind, TimerScheduler};
