//! Session table for the imgate runtime
//!
//! One [`AccountSession`] per [`AccountIdentity`], created on the first login
//! attempt and kept for the life of the process. The login timeout handle
//! lives inside [`SessionState::Pending`], and [`SessionTable::transition`]
//! is the only way the state changes, so a pending session always owns an
//! armed timer and no other session does.

use std::collections::HashMap;

use imgate_core::{
    AccountIdentity, ClientAvailability, LoginAttempt, ProviderHandle, SessionCounts, TimerHandle,
    TimerId, TimerScheduler,
};

// ----------------------------------------------------------------------------
// Session State
// ----------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
pub enum SessionState {
    Offline,
    Pending { login_timeout: TimerHandle },
    Online,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Offline => SessionPhase::Offline,
            SessionState::Pending { .. } => SessionPhase::Pending,
            SessionState::Online => SessionPhase::Online,
        }
    }
}

/// Copyable view of [`SessionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Offline,
    Pending,
    Online,
}

impl SessionPhase {
    pub fn is_active(self) -> bool {
        !matches!(self, SessionPhase::Offline)
    }
}

// ----------------------------------------------------------------------------
// Account Session
// ----------------------------------------------------------------------------

#[derive(Debug)]
pub struct AccountSession {
    pub identity: AccountIdentity,
    /// Cached across reconnects
    pub provider_handle: Option<ProviderHandle>,
    /// Generation of the current (or last) login attempt
    pub attempt: LoginAttempt,
    state: SessionState,
    pub bound_local_address: Option<String>,
    pub connection_type: Option<String>,
    pub availability: ClientAvailability,
    pub custom_message: String,
}

impl AccountSession {
    fn new(identity: AccountIdentity) -> Self {
        Self {
            identity,
            provider_handle: None,
            attempt: LoginAttempt::default(),
            state: SessionState::Offline,
            bound_local_address: None,
            connection_type: None,
            availability: ClientAvailability::default(),
            custom_message: String::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn is_online(&self) -> bool {
        self.phase() == SessionPhase::Online
    }

    /// Whether `timer` is this session's live login timeout
    pub fn owns_login_timeout(&self, timer: TimerId) -> bool {
        matches!(&self.state, SessionState::Pending { login_timeout } if login_timeout.matches(timer))
    }

    pub fn service_name(&self) -> &str {
        self.identity.service_name()
    }
}

// ----------------------------------------------------------------------------
// Session Table
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<AccountIdentity, AccountSession>,
    by_handle: HashMap<ProviderHandle, AccountIdentity>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &AccountIdentity) -> Option<&AccountSession> {
        self.sessions.get(identity)
    }

    pub fn get_mut(&mut self, identity: &AccountIdentity) -> Option<&mut AccountSession> {
        self.sessions.get_mut(identity)
    }

    pub fn get_or_create(&mut self, identity: &AccountIdentity) -> &mut AccountSession {
        self.sessions
            .entry(identity.clone())
            .or_insert_with(|| AccountSession::new(identity.clone()))
    }

    pub fn phase(&self, identity: &AccountIdentity) -> Option<SessionPhase> {
        self.sessions.get(identity).map(AccountSession::phase)
    }

    /// Record the provider handle created for an account
    pub fn bind_handle(&mut self, identity: &AccountIdentity, handle: ProviderHandle) {
        if let Some(session) = self.sessions.get_mut(identity) {
            session.provider_handle = Some(handle);
            self.by_handle.insert(handle, identity.clone());
        }
    }

    /// Account a provider handle belongs to
    pub fn resolve(&self, handle: ProviderHandle) -> Option<&AccountIdentity> {
        self.by_handle.get(&handle)
    }

    /// Move to the next login attempt and return it
    pub fn begin_attempt(&mut self, identity: &AccountIdentity) -> Option<LoginAttempt> {
        let session = self.sessions.get_mut(identity)?;
        session.attempt = session.attempt.next();
        Some(session.attempt)
    }

    /// Single mutation point for session state.
    ///
    /// A login timeout owned by the outgoing state is released through
    /// `timers`. Entering `Offline` clears the interface binding. Returns the
    /// previous phase, or `None` when the account has no session (in which
    /// case a timer carried by `next` is released as well).
    pub fn transition(
        &mut self,
        identity: &AccountIdentity,
        next: SessionState,
        timers: &mut dyn TimerScheduler,
    ) -> Option<SessionPhase> {
        let Some(session) = self.sessions.get_mut(identity) else {
            if let SessionState::Pending { login_timeout } = next {
                timers.cancel(login_timeout);
            }
            return None;
        };

        let previous = std::mem::replace(&mut session.state, next);
        let phase = previous.phase();
        if let SessionState::Pending { login_timeout } = previous {
            timers.cancel(login_timeout);
        }
        if session.phase() == SessionPhase::Offline {
            session.bound_local_address = None;
            session.connection_type = None;
        }
        Some(phase)
    }

    pub fn online(&self) -> Vec<AccountIdentity> {
        self.sessions
            .values()
            .filter(|s| s.is_online())
            .map(|s| s.identity.clone())
            .collect()
    }

    /// Active accounts bound to a local interface
    pub fn bound_to(&self, address: &str) -> Vec<AccountIdentity> {
        self.sessions
            .values()
            .filter(|s| s.phase().is_active())
            .filter(|s| s.bound_local_address.as_deref() == Some(address))
            .map(|s| s.identity.clone())
            .collect()
    }

    pub fn counts(&self) -> SessionCounts {
        let mut counts = SessionCounts::default();
        for session in self.sessions.values() {
            match session.phase() {
                SessionPhase::Offline => counts.offline += 1,
                SessionPhase::Pending => counts.pending += 1,
                SessionPhase::Online => counts.online += 1,
            }
        }
        counts
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountSession> {
        self.sessions.values()
    }
}
