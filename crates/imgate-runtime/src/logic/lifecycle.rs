//! Login/logout state machine
//!
//! Transitions per account:
//!
//! | From           | Trigger                          | To      |
//! |----------------|----------------------------------|---------|
//! | Offline        | login                            | Pending |
//! | Pending        | provider connected               | Online  |
//! | Pending        | provider disconnected / timeout  | Offline |
//! | Online         | provider disconnected            | Offline |
//! | Pending/Online | login on another interface       | Pending (new attempt) |
//! | Pending/Online | interface closed                 | Offline |
//!
//! Every accepted login or logout gets exactly one reply. Provider events
//! are matched on `(handle, attempt)`, so notices for an attempt that was
//! superseded or already timed out are dropped.

use imgate_core::{
    api::{LOCAL_ADDRESS_MISSING_TEXT, SIGNED_OFF_TEXT},
    AccountIdentity, AccountReply, ClientAvailability, DeviceConnectionClosedRequest,
    DisconnectError, DisconnectKind, ErrorCode, LoginParams, LoginRequest, LogoutRequest,
    Notification, ProviderHandle, ProviderResult, ProviderSession, Responder, SessionError,
    SimpleReply, TimerId, TimerKind,
};
use tracing::{debug, info, warn};

use super::manager::AccountManager;
use crate::managers::{HeldRequest, SessionPhase, SessionState};

/// What an account looked like just before it was forced offline
#[derive(Debug)]
pub(crate) struct EndedSession {
    pub phase: SessionPhase,
    pub local_address: Option<String>,
    pub connection_type: Option<String>,
}

impl AccountManager {
    // ------------------------------------------------------------------------
    // Login
    // ------------------------------------------------------------------------

    pub fn attempt_login(&mut self, request: LoginRequest, reply: Responder<AccountReply>) {
        if let Err(err) = request.validate() {
            debug!(request = %reply.id(), %err, "Rejecting login");
            reply.send(AccountReply::from_error(
                &request.service_name,
                &request.username,
                &err,
            ));
            return;
        }

        let local_address = request.local_address();
        let connection_type = request.connection_type();
        if self.config.require_local_address && local_address.is_none() {
            reply.send(
                AccountReply::failure(
                    &request.service_name,
                    &request.username,
                    ErrorCode::NetworkError,
                    LOCAL_ADDRESS_MISSING_TEXT,
                )
                .with_connection_type(connection_type),
            );
            return;
        }

        let identity = AccountIdentity::new(&request.service_name, &request.username);
        let held = HeldRequest::new(request.username.clone(), reply);

        let current = self
            .sessions
            .get(&identity)
            .map(|s| (s.phase(), s.bound_local_address.clone()));
        if let Some((phase, bound)) = current {
            let same_interface = bound == local_address;
            match phase {
                SessionPhase::Online if same_interface => {
                    info!(account = %identity, "Account already logged in");
                    held.reply_with(|username| {
                        AccountReply::already_logged_in(&request.service_name, username)
                    });
                    return;
                }
                SessionPhase::Pending if same_interface => {
                    debug!(account = %identity, "Login already in progress");
                    self.hold_login(&identity, held);
                    return;
                }
                SessionPhase::Online | SessionPhase::Pending => {
                    info!(
                        account = %identity,
                        old = ?bound,
                        new = ?local_address,
                        "Local interface changed, forcing relogin"
                    );
                    self.abandon_session(&identity);
                }
                SessionPhase::Offline => {}
            }
        }

        self.start_login(identity, request, local_address, connection_type, held);
    }

    fn start_login(
        &mut self,
        identity: AccountIdentity,
        request: LoginRequest,
        local_address: Option<String>,
        connection_type: Option<String>,
        held: HeldRequest,
    ) {
        let handle = match self.ensure_provider_handle(&identity) {
            Ok(handle) => handle,
            Err(err) => {
                warn!(account = %identity, %err, "Provider refused account");
                self.stats.logins_failed += 1;
                held.reply_with(|username|
                    AccountReply::failure(
                        identity.service_name(),
                        username,
                        ErrorCode::GenericError,
                        err.to_string(),
                    )
                    .with_local_ip(local_address)
                    .with_connection_type(connection_type),
                );
                return;
            }
        };

        let availability = ClientAvailability::from_code(request.availability);
        let session = self.sessions.get_or_create(&identity);
        session.bound_local_address = local_address.clone();
        session.connection_type = connection_type;
        session.availability = availability;
        session.custom_message = request.custom_message.clone();
        let attempt = self.sessions.begin_attempt(&identity).unwrap_or_default();

        let login_timeout = self.timers.schedule(
            self.config.timeouts.login_timeout(),
            TimerKind::LoginTimeout(identity.clone()),
        );
        self.sessions.transition(
            &identity,
            SessionState::Pending { login_timeout },
            self.timers.as_mut(),
        );
        self.hold_login(&identity, held);

        let params = LoginParams {
            protocol_id: identity.protocol_id(),
            username: identity.provider_username(),
            password: request.password,
            status: availability.to_provider(),
            custom_message: request.custom_message,
            local_address,
            connect_server: identity.connect_server().map(str::to_string),
        };
        info!(account = %identity, %handle, %attempt, "Starting login");

        if let Err(err) = self.provider.login(ProviderSession { handle, attempt }, params) {
            warn!(account = %identity, %err, "Provider refused login");
            let ended = self.end_session(&identity);
            self.stats.logins_failed += 1;
            if let Some(held) = self.correlation.take_login(&identity) {
                held.reply_with(|username|
                    AccountReply::failure(
                        identity.service_name(),
                        username,
                        ErrorCode::GenericError,
                        err.to_string(),
                    )
                    .with_local_ip(ended.local_address)
                    .with_connection_type(ended.connection_type),
                );
            }
        }
    }

    fn ensure_provider_handle(&mut self, identity: &AccountIdentity) -> ProviderResult<ProviderHandle> {
        if let Some(handle) = self.sessions.get_or_create(identity).provider_handle {
            return Ok(handle);
        }
        let handle = self
            .provider
            .create_account(&identity.protocol_id(), &identity.provider_username())?;
        self.sessions.bind_handle(identity, handle);
        Ok(handle)
    }

    /// Tear down the current attempt ahead of a relogin. The old attempt's
    /// notices become stale once the new attempt begins.
    fn abandon_session(&mut self, identity: &AccountIdentity) {
        if let Some(handle) = self.sessions.get(identity).and_then(|s| s.provider_handle) {
            self.provider.disconnect(handle);
        }
        self.end_session(identity);
        if let Some(held) = self.correlation.take_login(identity) {
            self.stats.requests_superseded += 1;
            held.reply_with(|username| AccountReply::superseded(
                identity.service_name(),
                username,
                "Login",
            ));
        }
        self.answer_logout(identity);
    }

    /// Provider finished a login attempt
    pub fn on_provider_connected(&mut self, session: ProviderSession) {
        let Some(identity) = self.current_attempt(session) else {
            return;
        };

        match self.sessions.phase(&identity) {
            Some(SessionPhase::Pending) => {}
            Some(SessionPhase::Online) => {
                warn!(account = %identity, "Duplicate connect notification");
                return;
            }
            _ => {
                info!(account = %identity, "Connect after the attempt ended, ignoring");
                return;
            }
        }

        self.sessions
            .transition(&identity, SessionState::Online, self.timers.as_mut());
        self.stats.logins_succeeded += 1;
        info!(account = %identity, "Account online");

        match self.correlation.take_login(&identity) {
            Some(held) => held.reply_with(|username| AccountReply::success(
                identity.service_name(),
                username,
            )),
            None => debug!(account = %identity, "No login request held for connect"),
        }

        let feed_was_registered = self.register_process_signals();
        if feed_was_registered && !self.presence.display_on() {
            self.presence
                .arm_for_account(&identity, self.timers.as_mut());
        }
    }

    /// Provider reported the connection ended or a login failed
    pub fn on_provider_disconnected(
        &mut self,
        session: ProviderSession,
        error: Option<DisconnectError>,
    ) {
        let Some(identity) = self.current_attempt(session) else {
            return;
        };
        if !self
            .sessions
            .phase(&identity)
            .is_some_and(SessionPhase::is_active)
        {
            debug!(account = %identity, "Disconnect for offline account, ignoring");
            return;
        }

        let ended = self.end_session(&identity);
        let (kind, description) = match error {
            Some(error) => (error.kind, error.description),
            None => (DisconnectKind::Other, SIGNED_OFF_TEXT.to_string()),
        };
        let err = SessionError::ConnectionFailed {
            account: identity.to_string(),
            kind,
            description,
        };
        let code = err.error_code();

        match ended.phase {
            SessionPhase::Pending => {
                self.stats.logins_failed += 1;
                info!(account = %identity, code = code.as_str(), "Login failed");
                if let Some(held) = self.correlation.take_login(&identity) {
                    held.reply_with(|username|
                        AccountReply::from_error(identity.service_name(), username, &err)
                        .with_local_ip(ended.local_address)
                        .with_connection_type(ended.connection_type),
                    );
                }
                self.answer_logout(&identity);
            }
            SessionPhase::Online => {
                if self.answer_logout(&identity) {
                    info!(account = %identity, "Logged out");
                } else {
                    info!(account = %identity, code = code.as_str(), "Session dropped");
                    self.hub.publish(Notification::AccountStatus(
                        AccountReply::from_error(
                            identity.service_name(),
                            identity.username(),
                            &err,
                        )
                        .with_local_ip(ended.local_address)
                        .logged_out()
                        .with_connection_type(ended.connection_type),
                    ));
                }
            }
            SessionPhase::Offline => {}
        }
    }

    pub fn on_login_timeout_expired(&mut self, identity: &AccountIdentity, timer: TimerId) {
        let Some(session) = self.sessions.get(identity) else {
            return;
        };
        if !session.owns_login_timeout(timer) {
            debug!(account = %identity, %timer, "Stale login timeout, ignoring");
            return;
        }
        if let Some(handle) = session.provider_handle {
            self.provider.disconnect(handle);
        }

        let ended = self.end_session(identity);
        self.stats.login_timeouts += 1;
        let err = SessionError::NetworkTimeout {
            account: identity.to_string(),
            timeout_ms: self.config.timeouts.login_timeout_secs.saturating_mul(1000),
        };
        warn!("{}", err);

        if let Some(held) = self.correlation.take_login(identity) {
            held.reply_with(|username|
                AccountReply::from_error(identity.service_name(), username, &err)
                    .with_connection_type(ended.connection_type),
            );
        }
        self.answer_logout(identity);
    }

    // ------------------------------------------------------------------------
    // Logout
    // ------------------------------------------------------------------------

    pub fn attempt_logout(&mut self, request: LogoutRequest, reply: Responder<AccountReply>) {
        if request.validate().is_err() {
            reply.send(AccountReply::invalid_parameters(
                &request.service_name,
                &request.username,
            ));
            return;
        }

        let identity = AccountIdentity::new(&request.service_name, &request.username);
        let handle = match self.sessions.get(&identity) {
            Some(session) if session.phase().is_active() => session.provider_handle,
            _ => {
                let err = SessionError::NotLoggedIn {
                    account: identity.to_string(),
                };
                debug!("Rejecting logout: {}", err);
                reply.send(AccountReply::from_error(
                    &request.service_name,
                    &request.username,
                    &err,
                ));
                return;
            }
        };

        let disconnect_requested = self.correlation.has_logout(&identity);
        self.hold_logout(&identity, HeldRequest::new(request.username, reply));
        if disconnect_requested {
            return;
        }

        info!(account = %identity, "Logging out");
        if let Some(handle) = handle {
            self.provider.disconnect(handle);
        }
    }

    // ------------------------------------------------------------------------
    // Interface Loss
    // ------------------------------------------------------------------------

    pub fn device_connection_closed(
        &mut self,
        request: DeviceConnectionClosedRequest,
        reply: Responder<SimpleReply>,
    ) {
        let address = request.ip_address;
        if address.is_empty() {
            debug!("Interface closed without an address, nothing bound");
            reply.send(SimpleReply::ok());
            return;
        }

        for identity in self.sessions.bound_to(&address) {
            if let Some(handle) = self.sessions.get(&identity).and_then(|s| s.provider_handle) {
                self.provider.disconnect(handle);
            }
            let ended = self.end_session(&identity);
            let was_online = ended.phase == SessionPhase::Online;
            if ended.phase == SessionPhase::Pending {
                self.stats.logins_failed += 1;
            }
            info!(account = %identity, %address, was_online, "Interface closed, account offline");

            let logout_answered = self.answer_logout(&identity);
            if let Some(held) = self.correlation.take_login(&identity) {
                held.reply_with(|username| AccountReply::connection_failure(
                    identity.service_name(),
                    username,
                    ended.connection_type,
                    was_online,
                ));
            } else if was_online && !logout_answered {
                self.hub.publish(Notification::AccountStatus(
                    AccountReply::connection_failure(
                        identity.service_name(),
                        identity.username(),
                        ended.connection_type,
                        true,
                    ),
                ));
            }
        }

        reply.send(SimpleReply::ok());
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Resolve a provider session to its account if it is the live attempt
    fn current_attempt(&self, session: ProviderSession) -> Option<AccountIdentity> {
        let Some(identity) = self.sessions.resolve(session.handle) else {
            debug!(handle = %session.handle, "Event for unknown provider handle");
            return None;
        };
        let current = self.sessions.get(identity).map(|s| s.attempt);
        if current != Some(session.attempt) {
            debug!(
                account = %identity,
                attempt = %session.attempt,
                "Event for superseded login attempt, ignoring"
            );
            return None;
        }
        Some(identity.clone())
    }

    /// Force an account offline, releasing its timers
    pub(crate) fn end_session(&mut self, identity: &AccountIdentity) -> EndedSession {
        let (local_address, connection_type) = self
            .sessions
            .get(identity)
            .map(|s| (s.bound_local_address.clone(), s.connection_type.clone()))
            .unwrap_or_default();
        let phase = self
            .sessions
            .transition(identity, SessionState::Offline, self.timers.as_mut())
            .unwrap_or(SessionPhase::Offline);
        self.presence
            .cancel_for_account(identity, self.timers.as_mut());
        EndedSession {
            phase,
            local_address,
            connection_type,
        }
    }

    pub(crate) fn hold_login(&mut self, identity: &AccountIdentity, held: HeldRequest) {
        if let Some(evicted) = self.correlation.hold_login(identity, held) {
            self.stats.requests_superseded += 1;
            info!(account = %identity, request = %evicted.id(), "Login request superseded");
            evicted.reply_with(|username| AccountReply::superseded(
                identity.service_name(),
                username,
                "Login",
            ));
        }
    }

    fn hold_logout(&mut self, identity: &AccountIdentity, held: HeldRequest) {
        if let Some(evicted) = self.correlation.hold_logout(identity, held) {
            self.stats.requests_superseded += 1;
            info!(account = %identity, request = %evicted.id(), "Logout request superseded");
            evicted.reply_with(|username| AccountReply::superseded(
                identity.service_name(),
                username,
                "Logout",
            ));
        }
    }

    /// Answer a held logout with success. Returns whether one was held.
    pub(crate) fn answer_logout(&mut self, identity: &AccountIdentity) -> bool {
        match self.correlation.take_logout(identity) {
            Some(held) => {
                held.reply_with(|username| AccountReply::success(
                    identity.service_name(),
                    username,
                ));
                true
            }
            None => false,
        }
    }
}
