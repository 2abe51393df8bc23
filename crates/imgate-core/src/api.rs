//! Client-facing request, reply and notification payloads
//!
//! All payloads are camelCase JSON. Request string fields default to empty
//! so that a missing field and an empty one are rejected the same way by
//! `validate()`. Reply constructors carry the fixed error texts clients
//! match on.

use serde::{Deserialize, Serialize};

use crate::availability::{to_client_code, ClientAvailability};
use crate::errors::SessionError;
use crate::identity::AccountIdentity;
use crate::provider::{BuddyRecord, DisconnectKind};

pub const INVALID_PARAMETERS_TEXT: &str =
    "Invalid parameter. Please double check the passed parameters.";
pub const LOGOUT_NOT_LOGGED_IN_TEXT: &str = "Trying to logout from an account that is not logged in";
pub const SEND_NOT_LOGGED_IN_TEXT: &str = "Trying to send from an account that is not logged in";
pub const NOT_LOGGED_IN_TEXT: &str = "Account is not logged in";
pub const TIMEOUT_TEXT: &str = "Connection timed out";
pub const CONNECTION_FAILURE_TEXT: &str = "Connection failure";
pub const SIGNED_OFF_TEXT: &str = "Signed off";
pub const LOCAL_ADDRESS_MISSING_TEXT: &str = "localIpAddress was null or empty";
pub const SUBSCRIBE_EXPECTED_TEXT: &str =
    "We were expecting a subscribe type message, but we did not receive one.";

// ----------------------------------------------------------------------------
// Error Codes
// ----------------------------------------------------------------------------

/// Error codes surfaced to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "AcctMgr_Bad_Username")]
    BadUsername,
    #[serde(rename = "AcctMgr_Bad_Authentication")]
    BadAuthentication,
    #[serde(rename = "AcctMgr_Network_Error")]
    NetworkError,
    #[serde(rename = "AcctMgr_Name_In_Use")]
    NameInUse,
    #[serde(rename = "AcctMgr_Generic_Error")]
    GenericError,
    /// Request-level rejection: bad parameters or account not logged in
    #[serde(rename = "1")]
    InvalidRequest,
    /// Send attempted from an account that is not online
    #[serde(rename = "11")]
    SendWhileOffline,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadUsername => "AcctMgr_Bad_Username",
            ErrorCode::BadAuthentication => "AcctMgr_Bad_Authentication",
            ErrorCode::NetworkError => "AcctMgr_Network_Error",
            ErrorCode::NameInUse => "AcctMgr_Name_In_Use",
            ErrorCode::GenericError => "AcctMgr_Generic_Error",
            ErrorCode::InvalidRequest => "1",
            ErrorCode::SendWhileOffline => "11",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[serde(rename = "loggedOut")]
    LoggedOut,
}

// ----------------------------------------------------------------------------
// Requests
// ----------------------------------------------------------------------------

fn require(value: &str, field: &str) -> Result<(), SessionError> {
    if value.is_empty() {
        return Err(SessionError::InvalidParameters {
            reason: format!("{field} is missing or empty"),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    pub service_name: String,
    pub username: String,
    pub password: String,
    pub availability: i32,
    pub custom_message: String,
    pub local_ip_address: String,
    pub connection_type: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), SessionError> {
        require(&self.service_name, "serviceName")?;
        require(&self.username, "username")?;
        require(&self.password, "password")
    }

    pub fn local_address(&self) -> Option<String> {
        non_empty(&self.local_ip_address)
    }

    pub fn connection_type(&self) -> Option<String> {
        non_empty(&self.connection_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogoutRequest {
    pub service_name: String,
    pub username: String,
}

impl LogoutRequest {
    pub fn validate(&self) -> Result<(), SessionError> {
        require(&self.service_name, "serviceName")?;
        require(&self.username, "username")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetMyAvailabilityRequest {
    pub service_name: String,
    pub username: String,
    pub availability: i32,
}

impl SetMyAvailabilityRequest {
    pub fn validate(&self) -> Result<(), SessionError> {
        require(&self.service_name, "serviceName")?;
        require(&self.username, "username")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetMyCustomMessageRequest {
    pub service_name: String,
    pub username: String,
    pub custom_message: String,
}

impl SetMyCustomMessageRequest {
    pub fn validate(&self) -> Result<(), SessionError> {
        require(&self.service_name, "serviceName")?;
        require(&self.username, "username")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendMessageRequest {
    pub service_name: String,
    pub username: String,
    pub username_to: String,
    pub message_text: String,
}

impl SendMessageRequest {
    pub fn validate(&self) -> Result<(), SessionError> {
        require(&self.service_name, "serviceName")?;
        require(&self.username, "username")?;
        require(&self.username_to, "usernameTo")?;
        require(&self.message_text, "messageText")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetBuddyListRequest {
    pub service_name: String,
    pub username: String,
    pub subscribe: bool,
}

impl GetBuddyListRequest {
    pub fn validate(&self) -> Result<(), SessionError> {
        require(&self.service_name, "serviceName")?;
        require(&self.username, "username")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterForIncomingMessagesRequest {
    pub subscribe: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceConnectionClosedRequest {
    pub ip_address: String,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

// ----------------------------------------------------------------------------
// Replies
// ----------------------------------------------------------------------------

/// Reply to login and logout, also pushed on the `accountStatus` stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountReply {
    pub service_name: String,
    pub username: String,
    pub return_value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_was_already_logged_in: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_status: Option<ConnectionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded: Option<bool>,
}

impl AccountReply {
    pub fn success(service_name: &str, username: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            username: username.to_string(),
            return_value: true,
            account_was_already_logged_in: None,
            error_code: None,
            error_text: None,
            local_ip_address: None,
            connection_status: None,
            connection_type: None,
            superseded: None,
        }
    }

    pub fn already_logged_in(service_name: &str, username: &str) -> Self {
        Self {
            account_was_already_logged_in: Some(true),
            ..Self::success(service_name, username)
        }
    }

    pub fn failure(
        service_name: &str,
        username: &str,
        code: ErrorCode,
        text: impl Into<String>,
    ) -> Self {
        Self {
            return_value: false,
            error_code: Some(code),
            error_text: Some(text.into()),
            ..Self::success(service_name, username)
        }
    }

    pub fn invalid_parameters(service_name: &str, username: &str) -> Self {
        Self::failure(
            service_name,
            username,
            ErrorCode::InvalidRequest,
            INVALID_PARAMETERS_TEXT,
        )
    }

    /// Failure reply carrying the client code and text of a session error
    pub fn from_error(service_name: &str, username: &str, error: &SessionError) -> Self {
        Self::failure(service_name, username, error.error_code(), error.client_text())
    }

    /// Interface went away under the account
    pub fn connection_failure(
        service_name: &str,
        username: &str,
        connection_type: Option<String>,
        was_online: bool,
    ) -> Self {
        let error = SessionError::ConnectionFailed {
            account: AccountIdentity::new(service_name, username).to_string(),
            kind: DisconnectKind::NetworkError,
            description: CONNECTION_FAILURE_TEXT.to_string(),
        };
        let reply = Self::from_error(service_name, username, &error)
            .with_connection_type(connection_type);
        if was_online {
            reply.logged_out()
        } else {
            reply
        }
    }

    /// Terminal reply for a request displaced by a newer one
    pub fn superseded(service_name: &str, username: &str, operation: &str) -> Self {
        Self {
            superseded: Some(true),
            ..Self::failure(
                service_name,
                username,
                ErrorCode::GenericError,
                format!("{operation} request superseded by a newer request"),
            )
        }
    }

    pub fn with_local_ip(mut self, local_ip_address: Option<String>) -> Self {
        self.local_ip_address = local_ip_address;
        self
    }

    pub fn with_connection_type(mut self, connection_type: Option<String>) -> Self {
        self.connection_type = connection_type;
        self
    }

    pub fn logged_out(mut self) -> Self {
        self.connection_status = Some(ConnectionStatus::LoggedOut);
        self
    }
}

/// Reply to setMyAvailability and setMyCustomMessage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReply {
    pub service_name: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_message: Option<String>,
    pub return_value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl StatusReply {
    pub fn availability(service_name: &str, username: &str, availability: i32) -> Self {
        Self {
            service_name: service_name.to_string(),
            username: username.to_string(),
            availability: Some(availability),
            custom_message: None,
            return_value: true,
            error_code: None,
            error_text: None,
        }
    }

    pub fn custom_message(service_name: &str, username: &str, custom_message: &str) -> Self {
        Self {
            availability: None,
            custom_message: Some(custom_message.to_string()),
            ..Self::availability(service_name, username, 0)
        }
    }

    pub fn failure(service_name: &str, username: &str, code: ErrorCode, text: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            username: username.to_string(),
            availability: None,
            custom_message: None,
            return_value: false,
            error_code: Some(code),
            error_text: Some(text.to_string()),
        }
    }
}

/// Reply carrying only an outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleReply {
    pub return_value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl SimpleReply {
    pub fn ok() -> Self {
        Self {
            return_value: true,
            subscribed: None,
            error_code: None,
            error_text: None,
        }
    }

    pub fn subscribed() -> Self {
        Self {
            subscribed: Some(true),
            ..Self::ok()
        }
    }

    pub fn error(code: ErrorCode, text: &str) -> Self {
        Self {
            return_value: false,
            subscribed: None,
            error_code: Some(code),
            error_text: Some(text.to_string()),
        }
    }

    /// Subscription request that did not ask to subscribe
    pub fn not_subscribed() -> Self {
        Self {
            return_value: false,
            subscribed: Some(false),
            error_code: None,
            error_text: Some(SUBSCRIBE_EXPECTED_TEXT.to_string()),
        }
    }
}

// ----------------------------------------------------------------------------
// Subscription Payloads
// ----------------------------------------------------------------------------

/// Buddy fields as clients see them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuddyEntry {
    pub buddy_username: String,
    pub display_name: String,
    pub avatar_location: String,
    pub custom_message: String,
    /// Client availability code, as a decimal string
    pub availability: String,
    pub group_name: String,
}

impl BuddyEntry {
    pub fn from_record(service_name: &str, record: &BuddyRecord) -> Self {
        Self {
            buddy_username: crate::identity::client_username(service_name, &record.username),
            display_name: record.display_name.clone(),
            avatar_location: record.avatar_location.clone(),
            custom_message: record.custom_message.clone(),
            availability: to_client_code(record.status).to_string(),
            group_name: record.group_name.clone(),
        }
    }

    pub fn availability(&self) -> ClientAvailability {
        ClientAvailability::from_code(self.availability.parse().unwrap_or(-1))
    }
}

/// One buddy's presence changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuddyStatus {
    pub service_name: String,
    pub username: String,
    #[serde(flatten)]
    pub buddy: BuddyEntry,
}

/// Full list pushed when a client subscribes to an online account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuddyListSnapshot {
    pub service_name: String,
    pub username: String,
    pub full_buddy_list: bool,
    pub buddies: Vec<BuddyEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub service_name: String,
    pub username: String,
    pub username_from: String,
    pub message_text: String,
}

// ----------------------------------------------------------------------------
// Status Report
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCounts {
    pub offline: usize,
    pub pending: usize,
    pub online: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub sessions: SessionCounts,
    pub display_on: bool,
    pub armed_queue_timers: usize,
    pub held_logins: usize,
    pub held_logouts: usize,
    pub uptime_secs: u64,
    pub commands_processed: u64,
    pub events_processed: u64,
    pub logins_succeeded: u64,
    pub logins_failed: u64,
    pub login_timeouts: u64,
    pub requests_superseded: u64,
}
