//! Centralized Configuration Management
//!
//! Timeouts, channel sizing and device flags for the gateway, with presets
//! for tests.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{GatewayError, GatewayResult};

// ----------------------------------------------------------------------------
// Timeout Configuration
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long a login may stay pending before it is failed
    pub login_timeout_secs: u64,
    /// Delay before disabling the presence queue once the display is on
    pub queue_flush_delay_secs: u64,
    /// Delay before enabling the queue for an account that connected while
    /// the display was off
    pub post_login_queue_delay_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            login_timeout_secs: 30,
            queue_flush_delay_secs: 10,
            post_login_queue_delay_secs: 10,
        }
    }
}

impl TimeoutConfig {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn queue_flush_delay(&self) -> Duration {
        Duration::from_secs(self.queue_flush_delay_secs)
    }

    pub fn post_login_queue_delay(&self) -> Duration {
        Duration::from_secs(self.post_login_queue_delay_secs)
    }
}

// ----------------------------------------------------------------------------
// Channel Configuration
// ----------------------------------------------------------------------------

/// Configuration for CSP channel buffer sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Buffer size for Command channels (clients → Core Logic)
    pub command_buffer_size: usize,
    /// Buffer size for Event channels (provider, timers, display → Core Logic)
    pub event_buffer_size: usize,
    /// Capacity of the notification broadcast (Core Logic → subscribers)
    pub notification_buffer_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command_buffer_size: 32,
            event_buffer_size: 128,      // provider callbacks can be bursty
            notification_buffer_size: 256,
        }
    }
}

impl ChannelConfig {
    /// Create configuration optimized for testing
    pub fn testing() -> Self {
        Self {
            command_buffer_size: 100,
            event_buffer_size: 100,
            notification_buffer_size: 100,
        }
    }
}

// ----------------------------------------------------------------------------
// Gateway Configuration
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub timeouts: TimeoutConfig,
    pub channels: ChannelConfig,
    /// Reject logins that do not name a local interface (device builds)
    pub require_local_address: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeouts: TimeoutConfig::default(),
            channels: ChannelConfig::default(),
            require_local_address: false,
        }
    }
}

impl GatewayConfig {
    /// Create configuration for tests
    pub fn testing() -> Self {
        Self {
            channels: ChannelConfig::testing(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if self.timeouts.login_timeout_secs == 0 {
            return Err(GatewayError::config_error("login_timeout_secs must be positive"));
        }
        let channels = &self.channels;
        if channels.command_buffer_size == 0
            || channels.event_buffer_size == 0
            || channels.notification_buffer_size == 0
        {
            return Err(GatewayError::config_error("channel buffer sizes must be positive"));
        }
        Ok(())
    }
}
