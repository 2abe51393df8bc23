//! Device display-state feed

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::GatewayResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayEvent {
    On,
    Off,
    /// The feed reported `returnValue: false`
    FeedFailed,
}

impl DisplayEvent {
    /// Parse a display-feed payload.
    ///
    /// Accepts `{"returnValue": bool, "state": "on"|"off"}` and the
    /// `{"event": "displayOn"|"displayOff"}` form. Anything else is `None`.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        if payload.get("returnValue").and_then(Value::as_bool) == Some(false) {
            return Some(DisplayEvent::FeedFailed);
        }

        if let Some(state) = payload.get("state").and_then(Value::as_str) {
            return match state {
                "on" => Some(DisplayEvent::On),
                "off" => Some(DisplayEvent::Off),
                _ => None,
            };
        }

        match payload.get("event").and_then(Value::as_str) {
            Some("displayOn") => Some(DisplayEvent::On),
            Some("displayOff") => Some(DisplayEvent::Off),
            _ => None,
        }
    }

    /// Display state this event leaves behind
    pub fn display_on(self) -> bool {
        !matches!(self, DisplayEvent::Off)
    }
}

/// Subscription side of the display feed. Events themselves arrive on the
/// runtime's event channel.
pub trait DisplayMonitor: Send {
    fn subscribe(&mut self) -> GatewayResult<()>;
}
