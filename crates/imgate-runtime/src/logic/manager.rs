//! Account Manager
//!
//! The synchronous state machine at the heart of the gateway. It owns the
//! session table, the correlation store and the presence-queue controller,
//! plus the collaborators they drive. Every method runs to completion on the
//! core logic task; nothing here blocks or awaits.
//!
//! Login/logout transitions live in `lifecycle.rs`, per-account operations
//! in `account_ops.rs`.

use std::time::Instant;

use imgate_core::{
    AccountIdentity, AccountReply, DisplayEvent, DisplayMonitor, ErrorCode, Event, GatewayConfig,
    ProtocolProvider, ProviderEvent, SimpleReply, StatusReport, TimerId, TimerKind,
    TimerScheduler,
};
use tracing::{debug, info, warn};

use crate::hub::NotificationHub;
use crate::managers::{
    PresenceQueueController, QueueDirective, RequestCorrelation, SessionPhase, SessionState,
    SessionTable,
};

const SHUTDOWN_TEXT: &str = "Gateway shutting down";

/// Counters reported by `getStatus`
#[derive(Debug, Clone, Default)]
pub struct ManagerStats {
    pub commands_processed: u64,
    pub events_processed: u64,
    pub logins_succeeded: u64,
    pub logins_failed: u64,
    pub login_timeouts: u64,
    pub requests_superseded: u64,
}

pub struct AccountManager {
    pub(crate) config: GatewayConfig,
    pub(crate) sessions: SessionTable,
    pub(crate) correlation: RequestCorrelation,
    pub(crate) presence: PresenceQueueController,
    pub(crate) provider: Box<dyn ProtocolProvider>,
    pub(crate) timers: Box<dyn TimerScheduler>,
    pub(crate) display: Box<dyn DisplayMonitor>,
    pub(crate) hub: NotificationHub,
    /// Provider presence/message signals are registered once per process
    pub(crate) presence_subscribed: bool,
    pub(crate) stats: ManagerStats,
    started: Instant,
}

impl AccountManager {
    pub fn new(
        config: GatewayConfig,
        provider: Box<dyn ProtocolProvider>,
        timers: Box<dyn TimerScheduler>,
        display: Box<dyn DisplayMonitor>,
        hub: NotificationHub,
    ) -> Self {
        let presence = PresenceQueueController::new(&config.timeouts);
        Self {
            config,
            sessions: SessionTable::new(),
            correlation: RequestCorrelation::new(),
            presence,
            provider,
            timers,
            display,
            hub,
            presence_subscribed: false,
            stats: ManagerStats::default(),
            started: Instant::now(),
        }
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    pub fn correlation(&self) -> &RequestCorrelation {
        &self.correlation
    }

    pub fn presence(&self) -> &PresenceQueueController {
        &self.presence
    }

    pub fn stats(&self) -> &ManagerStats {
        &self.stats
    }

    pub fn phase(&self, identity: &AccountIdentity) -> Option<SessionPhase> {
        self.sessions.phase(identity)
    }

    pub(crate) fn record_command(&mut self) {
        self.stats.commands_processed += 1;
    }

    // ------------------------------------------------------------------------
    // Event Dispatch
    // ------------------------------------------------------------------------

    /// Route a collaborator event to its handler
    pub fn handle_event(&mut self, event: Event) {
        self.stats.events_processed += 1;
        match event {
            Event::Provider(ProviderEvent::Connected { session }) => {
                self.on_provider_connected(session)
            }
            Event::Provider(ProviderEvent::Disconnected { session, error }) => {
                self.on_provider_disconnected(session, error)
            }
            Event::Provider(ProviderEvent::IncomingMessage {
                handle,
                from,
                text,
                received,
            }) => self.on_incoming_message(handle, &from, text, received),
            Event::Provider(ProviderEvent::PresenceChanged { handle, buddy }) => {
                self.on_presence_changed(handle, &buddy)
            }
            Event::TimerFired { timer, kind } => self.on_timer_fired(timer, kind),
            Event::Display(event) => self.on_display_event(event),
        }
    }

    fn on_timer_fired(&mut self, timer: TimerId, kind: TimerKind) {
        match kind {
            TimerKind::LoginTimeout(identity) => self.on_login_timeout_expired(&identity, timer),
            TimerKind::QueueFlush => {
                if let Some(directive) = self.presence.on_flush_fired(timer, self.timers.as_mut()) {
                    self.send_directive_to_online(directive);
                }
            }
            TimerKind::QueueArm(identity) => {
                let still_online = self
                    .sessions
                    .get(&identity)
                    .is_some_and(|session| session.is_online());
                if self.presence.on_arm_fired(&identity, timer, self.timers.as_mut()) && still_online
                {
                    self.send_directive(&identity, QueueDirective::Enable);
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Presence Queue
    // ------------------------------------------------------------------------

    pub fn on_display_event(&mut self, event: DisplayEvent) {
        let directive = match event {
            DisplayEvent::FeedFailed => {
                warn!("Display feed failed, disabling presence queue");
                Some(self.presence.on_feed_failed(self.timers.as_mut()))
            }
            DisplayEvent::On | DisplayEvent::Off => {
                debug!(display_on = event.display_on(), "Display state event");
                self.presence
                    .on_display_state_changed(event.display_on(), self.timers.as_mut())
            }
        };
        if let Some(directive) = directive {
            self.send_directive_to_online(directive);
        }
    }

    pub fn enable_presence_queue(&mut self) -> SimpleReply {
        self.send_directive_to_online(QueueDirective::Enable);
        SimpleReply::ok()
    }

    /// Disabling goes through the flush delay, like a display-on transition
    pub fn disable_presence_queue(&mut self) -> SimpleReply {
        self.presence.schedule_flush(self.timers.as_mut());
        SimpleReply::ok()
    }

    fn send_directive_to_online(&mut self, directive: QueueDirective) {
        for identity in self.sessions.online() {
            self.send_directive(&identity, directive);
        }
    }

    pub(crate) fn send_directive(&mut self, identity: &AccountIdentity, directive: QueueDirective) {
        if !identity.supports_presence_queue() {
            return;
        }
        let Some(handle) = self.sessions.get(identity).and_then(|s| s.provider_handle) else {
            return;
        };
        let Some(from) = self.provider.display_name(handle) else {
            warn!(account = %identity, "No display name, skipping queue directive");
            return;
        };
        match self.provider.send_raw(handle, &directive.stanza(&from)) {
            Ok(()) => info!(account = %identity, ?directive, "Sent presence queue directive"),
            Err(err) => warn!(account = %identity, ?directive, %err, "Queue directive failed"),
        }
    }

    /// Register process-wide signals after a connect. Returns whether the
    /// display feed had already been registered before this call.
    pub(crate) fn register_process_signals(&mut self) -> bool {
        if !self.presence_subscribed {
            match self.provider.subscribe_presence() {
                Ok(()) => self.presence_subscribed = true,
                Err(err) => warn!(%err, "Could not subscribe to provider presence"),
            }
        }

        if self.presence.feed_registered() {
            return true;
        }
        match self.display.subscribe() {
            Ok(()) => {
                info!("Subscribed to display events");
                self.presence.mark_feed_registered();
            }
            Err(err) => warn!(%err, "Could not subscribe to display events"),
        }
        false
    }

    // ------------------------------------------------------------------------
    // Status and Shutdown
    // ------------------------------------------------------------------------

    pub fn status(&self) -> StatusReport {
        let (held_logins, held_logouts) = self.correlation.counts();
        StatusReport {
            sessions: self.sessions.counts(),
            display_on: self.presence.display_on(),
            armed_queue_timers: self.presence.armed_timers(),
            held_logins,
            held_logouts,
            uptime_secs: self.started.elapsed().as_secs(),
            commands_processed: self.stats.commands_processed,
            events_processed: self.stats.events_processed,
            logins_succeeded: self.stats.logins_succeeded,
            logins_failed: self.stats.logins_failed,
            login_timeouts: self.stats.login_timeouts,
            requests_superseded: self.stats.requests_superseded,
        }
    }

    /// Disconnect every active account, answer every held request and
    /// release every armed timer
    pub fn shutdown(&mut self) {
        info!("Account manager shutting down");
        self.presence.shutdown(self.timers.as_mut());

        let active: Vec<AccountIdentity> = self
            .sessions
            .iter()
            .filter(|s| s.phase().is_active())
            .map(|s| s.identity.clone())
            .collect();
        for identity in active {
            if let Some(handle) = self.sessions.get(&identity).and_then(|s| s.provider_handle) {
                self.provider.disconnect(handle);
            }
            self.sessions
                .transition(&identity, SessionState::Offline, self.timers.as_mut());
            if let Some(held) = self.correlation.take_login(&identity) {
                held.reply_with(|username| AccountReply::failure(
                    identity.service_name(),
                    username,
                    ErrorCode::GenericError,
                    SHUTDOWN_TEXT,
                ));
            }
            self.answer_logout(&identity);
        }

        for (identity, held) in self.correlation.drain() {
            held.reply_with(|username| AccountReply::failure(
                identity.service_name(),
                username,
                ErrorCode::GenericError,
                SHUTDOWN_TEXT,
            ));
        }
    }
}
