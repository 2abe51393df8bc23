//! Shared fixture: an `AccountManager` wired to harness collaborators and
//! driven synchronously, one call or event at a time.

#![allow(dead_code)]

use imgate_core::{
    create_notification_channel, AccountIdentity, AccountReply, DeviceConnectionClosedRequest,
    DisconnectError, DisconnectKind, DisplayEvent, Event, GatewayConfig, LoginRequest,
    LogoutRequest, Notification, NotificationReceiver, ProviderEvent, ProviderSession, Responder,
    SimpleReply,
};
use imgate_harness::{
    DisplayProbe, ManualTimers, MockDisplayMonitor, MockProvider, ProviderProbe, TimerProbe,
};
use imgate_runtime::{AccountManager, NotificationHub, SessionPhase};
use tokio::sync::oneshot;

pub struct Fixture {
    pub manager: AccountManager,
    pub provider: ProviderProbe,
    pub timers: TimerProbe,
    pub display: DisplayProbe,
    pub notifications: NotificationReceiver,
}

pub fn fixture() -> Fixture {
    fixture_with(GatewayConfig::testing())
}

pub fn fixture_with(config: GatewayConfig) -> Fixture {
    let provider = MockProvider::new();
    let timers = ManualTimers::new();
    let display = MockDisplayMonitor::new();
    let (sender, notifications) = create_notification_channel(&config.channels);

    Fixture {
        provider: provider.probe(),
        timers: timers.probe(),
        display: display.probe(),
        manager: AccountManager::new(
            config,
            Box::new(provider),
            Box::new(timers),
            Box::new(display),
            NotificationHub::new(sender),
        ),
        notifications,
    }
}

pub fn login_request(service: &str, username: &str, local_ip: &str) -> LoginRequest {
    LoginRequest {
        service_name: service.to_string(),
        username: username.to_string(),
        password: "p".to_string(),
        availability: 0,
        local_ip_address: local_ip.to_string(),
        connection_type: "wifi".to_string(),
        ..Default::default()
    }
}

impl Fixture {
    pub fn login(
        &mut self,
        service: &str,
        username: &str,
        local_ip: &str,
    ) -> oneshot::Receiver<AccountReply> {
        self.login_with(login_request(service, username, local_ip))
    }

    pub fn login_with(&mut self, request: LoginRequest) -> oneshot::Receiver<AccountReply> {
        let (reply, receiver) = Responder::new();
        self.manager.attempt_login(request, reply);
        receiver
    }

    pub fn logout(&mut self, service: &str, username: &str) -> oneshot::Receiver<AccountReply> {
        let (reply, receiver) = Responder::new();
        self.manager.attempt_logout(
            LogoutRequest {
                service_name: service.to_string(),
                username: username.to_string(),
            },
            reply,
        );
        receiver
    }

    pub fn device_closed(&mut self, address: &str) -> oneshot::Receiver<SimpleReply> {
        let (reply, receiver) = Responder::new();
        self.manager.device_connection_closed(
            DeviceConnectionClosedRequest {
                ip_address: address.to_string(),
            },
            reply,
        );
        receiver
    }

    /// Session handed to the most recent provider login
    pub fn last_session(&self) -> ProviderSession {
        self.provider
            .last_login()
            .map(|(session, _)| session)
            .expect("no provider login recorded")
    }

    pub fn connect(&mut self, session: ProviderSession) {
        self.manager
            .handle_event(Event::Provider(ProviderEvent::Connected { session }));
    }

    pub fn disconnect(&mut self, session: ProviderSession, error: Option<DisconnectError>) {
        self.manager
            .handle_event(Event::Provider(ProviderEvent::Disconnected { session, error }));
    }

    pub fn fail(&mut self, session: ProviderSession, kind: DisconnectKind, description: &str) {
        self.disconnect(session, Some(DisconnectError::new(kind, description)));
    }

    /// Log an account in and complete the connect
    pub fn online(&mut self, service: &str, username: &str, local_ip: &str) -> ProviderSession {
        let mut receiver = self.login(service, username, local_ip);
        let session = self.last_session();
        self.connect(session);
        let reply = receiver.try_recv().expect("login not answered");
        assert!(reply.return_value);
        session
    }

    pub fn fire_login_timeout(&mut self, identity: &AccountIdentity) {
        let timer = self
            .timers
            .login_timeout(identity)
            .expect("no login timeout armed");
        let event = self.timers.fire(timer).expect("timer vanished");
        self.manager.handle_event(event);
    }

    pub fn display(&mut self, event: DisplayEvent) {
        self.manager.handle_event(Event::Display(event));
    }

    pub fn phase(&self, service: &str, username: &str) -> Option<SessionPhase> {
        self.manager.phase(&AccountIdentity::new(service, username))
    }

    /// Drain every push published so far
    pub fn pushes(&mut self) -> Vec<Notification> {
        let mut pushes = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            pushes.push(notification);
        }
        pushes
    }
}
