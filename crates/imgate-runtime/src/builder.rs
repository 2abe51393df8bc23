//! Runtime Builder API
//!
//! Consumers (CLI, tests) hand the builder a provider factory and optionally a
//! display monitor, and get back a [`RuntimeHandle`] whose [`RuntimeClient`]
//! issues typed requests against the running core logic task.

use std::time::Duration;

use imgate_core::{
    create_command_channel, create_event_channel, create_notification_channel, AccountReply,
    Command, CommandSender, DeviceConnectionClosedRequest, DisplayEvent, DisplayMonitor, Event,
    EventSender, GatewayConfig, GatewayError, GatewayResult, GetBuddyListRequest, LoginRequest,
    LogoutRequest, NotificationReceiver, ProtocolProvider, RegisterForIncomingMessagesRequest,
    Responder, SendMessageRequest, SetMyAvailabilityRequest, SetMyCustomMessageRequest,
    SimpleReply, StatusReply, StatusReport,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::hub::NotificationHub;
use crate::logic::{AccountManager, CoreLogicTask};
use crate::timers::TokioTimers;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

type ProviderFactory = Box<dyn FnOnce(EventSender) -> Box<dyn ProtocolProvider> + Send>;
type DisplayFactory = Box<dyn FnOnce(EventSender) -> Box<dyn DisplayMonitor> + Send>;

/// Display monitor for hosts that inject display events through
/// [`RuntimeClient::display_event`] instead of a live feed
struct InjectedDisplay;

impl DisplayMonitor for InjectedDisplay {
    fn subscribe(&mut self) -> GatewayResult<()> {
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Runtime Builder
// ----------------------------------------------------------------------------

pub struct RuntimeBuilder {
    config: GatewayConfig,
    provider: Option<ProviderFactory>,
    display: Option<DisplayFactory>,
}

impl RuntimeBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            provider: None,
            display: None,
        }
    }

    /// Register the protocol provider. The factory receives the sender the
    /// provider must post its events on.
    pub fn with_provider<F>(mut self, factory: F) -> Self
    where
        F: FnOnce(EventSender) -> Box<dyn ProtocolProvider> + Send + 'static,
    {
        self.provider = Some(Box::new(factory));
        self
    }

    /// Register a live display feed
    pub fn with_display_monitor<F>(mut self, factory: F) -> Self
    where
        F: FnOnce(EventSender) -> Box<dyn DisplayMonitor> + Send + 'static,
    {
        self.display = Some(Box::new(factory));
        self
    }

    /// Build and start the runtime. Must be called inside a tokio runtime.
    pub async fn build_and_start(self) -> GatewayResult<RuntimeHandle> {
        self.config.validate()?;
        let provider_factory = self
            .provider
            .ok_or_else(|| GatewayError::config_error("No protocol provider registered"))?;

        let channels = &self.config.channels;
        let (command_sender, command_receiver) = create_command_channel(channels);
        let (event_sender, event_receiver) = create_event_channel(channels);
        let (notification_sender, _) = create_notification_channel(channels);
        let hub = NotificationHub::new(notification_sender);

        let provider = provider_factory(event_sender.clone());
        let display = match self.display {
            Some(factory) => factory(event_sender.clone()),
            None => Box::new(InjectedDisplay),
        };
        let timers = Box::new(TokioTimers::new(event_sender.clone()));

        let manager = AccountManager::new(self.config, provider, timers, display, hub.clone());
        let mut task = CoreLogicTask::new(manager, command_receiver, event_receiver);
        let task_handle = tokio::spawn(async move { task.run().await });

        info!("imgate runtime started");

        Ok(RuntimeHandle {
            client: RuntimeClient {
                command_sender,
                event_sender,
                hub,
            },
            task_handle: Some(task_handle),
        })
    }
}

// ----------------------------------------------------------------------------
// Runtime Client
// ----------------------------------------------------------------------------

/// Typed request API for the running gateway. Cheap to clone.
#[derive(Clone)]
pub struct RuntimeClient {
    command_sender: CommandSender,
    event_sender: EventSender,
    hub: NotificationHub,
}

impl RuntimeClient {
    pub async fn send_command(&self, command: Command) -> GatewayResult<()> {
        self.command_sender
            .send(command)
            .await
            .map_err(|_| GatewayError::channel_error("Failed to send command to runtime"))
    }

    async fn request<T>(&self, build: impl FnOnce(Responder<T>) -> Command) -> GatewayResult<T> {
        let (responder, receiver) = Responder::new();
        self.send_command(build(responder)).await?;
        receiver
            .await
            .map_err(|_| GatewayError::channel_error("Runtime dropped the request"))
    }

    pub async fn login(&self, request: LoginRequest) -> GatewayResult<AccountReply> {
        self.request(|reply| Command::Login { request, reply }).await
    }

    pub async fn logout(&self, request: LogoutRequest) -> GatewayResult<AccountReply> {
        self.request(|reply| Command::Logout { request, reply }).await
    }

    pub async fn set_my_availability(
        &self,
        request: SetMyAvailabilityRequest,
    ) -> GatewayResult<StatusReply> {
        self.request(|reply| Command::SetMyAvailability { request, reply })
            .await
    }

    pub async fn set_my_custom_message(
        &self,
        request: SetMyCustomMessageRequest,
    ) -> GatewayResult<StatusReply> {
        self.request(|reply| Command::SetMyCustomMessage { request, reply })
            .await
    }

    pub async fn send_message(&self, request: SendMessageRequest) -> GatewayResult<SimpleReply> {
        self.request(|reply| Command::SendMessage { request, reply })
            .await
    }

    /// Subscribes before asking, so the snapshot pushed for an online account
    /// is not missed
    pub async fn get_buddy_list(
        &self,
        request: GetBuddyListRequest,
    ) -> GatewayResult<(SimpleReply, NotificationReceiver)> {
        let receiver = self.subscribe();
        let reply = self
            .request(|reply| Command::GetBuddyList { request, reply })
            .await?;
        Ok((reply, receiver))
    }

    pub async fn register_for_incoming_messages(
        &self,
        request: RegisterForIncomingMessagesRequest,
    ) -> GatewayResult<(SimpleReply, NotificationReceiver)> {
        let receiver = self.subscribe();
        let reply = self
            .request(|reply| Command::RegisterForIncomingMessages { request, reply })
            .await?;
        Ok((reply, receiver))
    }

    pub async fn device_connection_closed(
        &self,
        request: DeviceConnectionClosedRequest,
    ) -> GatewayResult<SimpleReply> {
        self.request(|reply| Command::DeviceConnectionClosed { request, reply })
            .await
    }

    pub async fn enable_presence_queue(&self) -> GatewayResult<SimpleReply> {
        self.request(|reply| Command::EnablePresenceQueue { reply })
            .await
    }

    pub async fn disable_presence_queue(&self) -> GatewayResult<SimpleReply> {
        self.request(|reply| Command::DisablePresenceQueue { reply })
            .await
    }

    pub async fn status(&self) -> GatewayResult<StatusReport> {
        self.request(|reply| Command::GetStatus { reply }).await
    }

    /// Feed a display-state event into the core loop
    pub async fn display_event(&self, event: DisplayEvent) -> GatewayResult<()> {
        self.event_sender
            .send(Event::Display(event))
            .await
            .map_err(|_| GatewayError::channel_error("Failed to send display event to runtime"))
    }

    /// Receive every subscription push from now on
    pub fn subscribe(&self) -> NotificationReceiver {
        self.hub.subscribe()
    }
}

// ----------------------------------------------------------------------------
// Runtime Handle
// ----------------------------------------------------------------------------

/// Handle to a running gateway
pub struct RuntimeHandle {
    client: RuntimeClient,
    task_handle: Option<JoinHandle<()>>,
}

impl RuntimeHandle {
    pub fn client(&self) -> RuntimeClient {
        self.client.clone()
    }

    pub fn subscribe(&self) -> NotificationReceiver {
        self.client.subscribe()
    }

    pub async fn status(&self) -> GatewayResult<StatusReport> {
        self.client.status().await
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Wait for the core logic task to stop on its own
    pub async fn wait(&mut self) -> GatewayResult<()> {
        match self.task_handle.take() {
            Some(handle) => handle.await.map_err(|err| {
                GatewayError::channel_error(format!("Core logic task panicked: {err}"))
            }),
            None => Ok(()),
        }
    }

    /// Disconnect every account, answer every held request and stop the task
    pub async fn shutdown(&mut self) -> GatewayResult<()> {
        info!("Shutting down imgate runtime");
        if self.client.send_command(Command::Shutdown).await.is_err() {
            warn!("Core logic task already stopped");
        }

        if let Some(handle) = self.task_handle.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                warn!("Core logic task did not stop within the grace period");
            }
        }

        info!("imgate runtime shut down");
        Ok(())
    }
}
