//! Stateful managers owned by the account manager

pub mod correlation;
pub mod presence_queue;
pub mod session;

pub use correlation::{HeldRequest, RequestCorrelation};
pub use presence_queue::{PresenceQueueController, QueueDirective};
pub use session::{AccountSession, SessionPhase, SessionState, SessionTable};
