//! imgate Harness
//!
//! Stand-in collaborators for the gateway runtime:
//! - `MockProvider`: records every provider call for assertions
//! - `ManualTimers`: deterministic timer scheduling, fired explicitly by tests
//! - `MockDisplayMonitor`: counts display-feed subscriptions
//! - `LoopbackProvider`: tokio-backed provider that completes logins after a
//!   simulated latency, used by the CLI's `serve` mode and end-to-end tests

pub mod display;
pub mod loopback;
pub mod manual_timers;
pub mod mock_provider;

pub use display::{DisplayProbe, MockDisplayMonitor};
pub use loopback::{LoopbackConfig, LoopbackProvider};
pub use manual_timers::{ArmedTimer, ManualTimers, TimerProbe};
pub use mock_provider::{MockProvider, ProviderCall, ProviderProbe};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock shared probe state, ignoring poisoning from a panicked test thread
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
