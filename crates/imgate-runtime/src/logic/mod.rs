//! Core Logic Module
//!
//! - `manager`: the `AccountManager` state machine and its event dispatch
//! - `lifecycle`: login, logout and interface-loss transitions
//! - `account_ops`: status, messaging and buddy operations
//! - `task`: the `CoreLogicTask` loop that feeds commands and events to the
//!   manager
//!
//! All account state is owned by the single core logic task. Commands from
//! clients and events from the provider, timers and display feed are handled
//! one at a time to completion, so no state is shared and nothing is locked.

mod account_ops;
mod lifecycle;
pub mod manager;
pub mod task;

pub use manager::{AccountManager, ManagerStats};
pub use task::CoreLogicTask;
