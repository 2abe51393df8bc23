//! CSP channel types and helpers

pub mod communication;
pub mod utils;

pub use communication::{Command, Event, Notification, RequestId, Responder};
