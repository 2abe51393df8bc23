//! imgate Runtime Engine
//!
//! The stateful half of the gateway:
//! - `AccountManager`: the login/logout state machine, account operations and
//!   presence-queue control
//! - `CoreLogicTask`: the single loop that owns the manager
//! - Session table, request correlation and presence-queue managers
//! - `TokioTimers` and the `NotificationHub` fan-out
//!
//! `imgate-core` provides the stable API definitions this crate drives.

pub mod builder;
pub mod hub;
pub mod logic;
pub mod managers;
pub mod timers;

pub use builder::{RuntimeBuilder, RuntimeClient, RuntimeHandle};
pub use hub::NotificationHub;
pub use logic::{AccountManager, CoreLogicTask, ManagerStats};
pub use managers::*;
pub use timers::TokioTimers;

// Re-export core types for convenience
pub use imgate_core::{
    AccountIdentity, AccountReply, Command, Event, GatewayConfig, GatewayError, GatewayResult,
    Notification, SimpleReply, StatusReply, StatusReport,
};
