//! Error types for the imgate gateway
//!
//! Session errors describe why a client request could not be satisfied and
//! map onto the client-facing [`ErrorCode`]s. Provider errors cover the
//! protocol layer refusing a call synchronously. [`GatewayError`] unifies
//! them together with the channel and configuration failures of the runtime.

use crate::api::{ErrorCode, INVALID_PARAMETERS_TEXT, LOGOUT_NOT_LOGGED_IN_TEXT, TIMEOUT_TEXT};
use crate::provider::DisconnectKind;

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Errors that end a client request at the session boundary
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid parameters: {reason}")]
    InvalidParameters { reason: String },
    #[error("Account {account} is not logged in")]
    NotLoggedIn { account: String },
    #[error("Login for {account} timed out after {timeout_ms}ms")]
    NetworkTimeout { account: String, timeout_ms: u64 },
    #[error("Connection for {account} failed ({kind:?}): {description}")]
    ConnectionFailed {
        account: String,
        kind: DisconnectKind,
        description: String,
    },
}

impl SessionError {
    /// Client-facing code for this error
    pub fn error_code(&self) -> ErrorCode {
        match self {
            SessionError::InvalidParameters { .. } | SessionError::NotLoggedIn { .. } => {
                ErrorCode::InvalidRequest
            }
            SessionError::NetworkTimeout { .. } => ErrorCode::NetworkError,
            SessionError::ConnectionFailed { kind, .. } => ErrorCode::from(*kind),
        }
    }

    /// Text shown to the client alongside the code
    pub fn client_text(&self) -> String {
        match self {
            SessionError::InvalidParameters { .. } => INVALID_PARAMETERS_TEXT.to_string(),
            SessionError::NotLoggedIn { .. } => LOGOUT_NOT_LOGGED_IN_TEXT.to_string(),
            SessionError::NetworkTimeout { .. } => TIMEOUT_TEXT.to_string(),
            SessionError::ConnectionFailed { description, .. } => description.clone(),
        }
    }
}

/// Synchronous refusals from the protocol provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Could not create account {username} for {protocol_id}")]
    AccountCreation {
        protocol_id: String,
        username: String,
    },
    #[error("Unknown provider handle {handle}")]
    UnknownHandle { handle: u64 },
    #[error("Provider rejected request: {reason}")]
    Rejected { reason: String },
}

/// Core error type for the gateway
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Channel communication error (internal to CSP architecture)
    #[error("Channel error: {message}")]
    Channel { message: String },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl GatewayError {
    /// Create a channel error with a message
    pub fn channel_error<T: Into<String>>(message: T) -> Self {
        GatewayError::Channel {
            message: message.into(),
        }
    }

    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        GatewayError::Configuration {
            reason: reason.into(),
        }
    }

    /// Create an invalid parameters error
    pub fn invalid_parameters<T: Into<String>>(reason: T) -> Self {
        GatewayError::Session(SessionError::InvalidParameters {
            reason: reason.into(),
        })
    }

    /// Whether the runtime can keep processing after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            GatewayError::Channel { .. } | GatewayError::Configuration { .. }
        )
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, GatewayError>;
pub type GatewayResult<T> = Result<T>;
pub type ProviderResult<T> = core::result::Result<T, ProviderError>;
