//! Loopback Protocol Provider
//!
//! Simulates an IM network in-process. Logins complete after a configurable
//! latency, posted back on the runtime's event channel from spawned tokio
//! tasks. Failure rules are keyed off the login parameters so scenarios can
//! be driven from plain requests:
//!
//! - password `bad` is rejected as an authentication failure
//! - a username containing `timeout` never completes
//!
//! `login` spawns onto the current tokio runtime.

use std::collections::HashMap;
use std::time::Duration;

use imgate_core::{
    spawn_send_event, BuddyRecord, DisconnectError, DisconnectKind, Event, EventSender,
    LoginParams, ProtocolProvider, ProviderError, ProviderEvent, ProviderHandle, ProviderResult,
    ProviderSession, ProviderStatus,
};
use serde::{Deserialize, Serialize};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

const REJECTED_PASSWORD: &str = "bad";
const NEVER_CONNECTS: &str = "timeout";

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackConfig {
    /// Base delay before a login completes
    pub connect_latency_ms: u64,
    /// Random extra delay added to each completion
    pub jitter_ms: u64,
    /// Answer every sent message with an incoming echo from the recipient
    pub echo_messages: bool,
    /// Buddy list reported for every account
    pub buddies: Vec<BuddyRecord>,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            connect_latency_ms: 200,
            jitter_ms: 50,
            echo_messages: true,
            buddies: vec![
                BuddyRecord {
                    username: "alice".to_string(),
                    display_name: "Alice".to_string(),
                    avatar_location: String::new(),
                    custom_message: "around".to_string(),
                    status: ProviderStatus::Available,
                    group_name: "Buddies".to_string(),
                },
                BuddyRecord {
                    username: "bob".to_string(),
                    display_name: "Bob".to_string(),
                    avatar_location: String::new(),
                    custom_message: String::new(),
                    status: ProviderStatus::Away,
                    group_name: "Buddies".to_string(),
                },
            ],
        }
    }
}

impl LoopbackConfig {
    /// Fixed latency, no randomness
    pub fn testing() -> Self {
        Self {
            connect_latency_ms: 100,
            jitter_ms: 0,
            ..Self::default()
        }
    }

    fn completion_delay(&self) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            fastrand::u64(0..=self.jitter_ms)
        };
        Duration::from_millis(self.connect_latency_ms + jitter)
    }
}

// ----------------------------------------------------------------------------
// Loopback Provider
// ----------------------------------------------------------------------------

#[derive(Debug)]
struct LoopbackAccount {
    username: String,
    session: Option<ProviderSession>,
    completion: Option<AbortHandle>,
}

pub struct LoopbackProvider {
    events: EventSender,
    config: LoopbackConfig,
    accounts: HashMap<ProviderHandle, LoopbackAccount>,
    next_handle: u64,
}

impl LoopbackProvider {
    pub fn new(events: EventSender, config: LoopbackConfig) -> Self {
        Self {
            events,
            config,
            accounts: HashMap::new(),
            next_handle: 0,
        }
    }

    fn account_mut(&mut self, handle: ProviderHandle) -> ProviderResult<&mut LoopbackAccount> {
        self.accounts
            .get_mut(&handle)
            .ok_or(ProviderError::UnknownHandle { handle: handle.0 })
    }

    fn post(&self, event: ProviderEvent) {
        spawn_send_event(&self.events, Event::Provider(event));
    }
}

impl ProtocolProvider for LoopbackProvider {
    fn create_account(
        &mut self,
        protocol_id: &str,
        username: &str,
    ) -> ProviderResult<ProviderHandle> {
        self.next_handle += 1;
        let handle = ProviderHandle(self.next_handle);
        debug!(%handle, protocol_id, username, "Loopback account created");
        self.accounts.insert(
            handle,
            LoopbackAccount {
                username: username.to_string(),
                session: None,
                completion: None,
            },
        );
        Ok(handle)
    }

    fn login(&mut self, session: ProviderSession, params: LoginParams) -> ProviderResult<()> {
        let delay = self.config.completion_delay();
        let events = self.events.clone();
        let account = self.account_mut(session.handle)?;
        if let Some(previous) = account.completion.take() {
            previous.abort();
        }
        account.session = Some(session);

        if params.username.contains(NEVER_CONNECTS) {
            info!(username = %params.username, "Loopback login will never complete");
            return Ok(());
        }

        let outcome = if params.password == REJECTED_PASSWORD {
            ProviderEvent::Disconnected {
                session,
                error: Some(DisconnectError::new(
                    DisconnectKind::AuthenticationFailed,
                    "Incorrect password",
                )),
            }
        } else {
            ProviderEvent::Connected { session }
        };

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if events.send(Event::Provider(outcome)).await.is_err() {
                debug!("Event channel closed before loopback login completed");
            }
        });
        account.completion = Some(task.abort_handle());
        Ok(())
    }

    fn disconnect(&mut self, handle: ProviderHandle) {
        let Ok(account) = self.account_mut(handle) else {
            warn!(%handle, "Disconnect for unknown loopback account");
            return;
        };
        if let Some(completion) = account.completion.take() {
            completion.abort();
        }
        if let Some(session) = account.session.take() {
            self.post(ProviderEvent::Disconnected {
                session,
                error: None,
            });
        }
    }

    fn set_status(
        &mut self,
        handle: ProviderHandle,
        status: ProviderStatus,
        custom_message: &str,
    ) -> ProviderResult<()> {
        self.account_mut(handle)?;
        debug!(%handle, ?status, custom_message, "Loopback status set");
        Ok(())
    }

    fn send_message(&mut self, handle: ProviderHandle, to: &str, text: &str) -> ProviderResult<()> {
        self.account_mut(handle)?;
        if self.config.echo_messages {
            self.post(ProviderEvent::IncomingMessage {
                handle,
                from: to.to_string(),
                text: format!("echo: {text}"),
                received: true,
            });
        }
        Ok(())
    }

    fn send_raw(&mut self, handle: ProviderHandle, stanza: &str) -> ProviderResult<()> {
        self.account_mut(handle)?;
        debug!(%handle, stanza, "Loopback raw stanza");
        Ok(())
    }

    fn display_name(&self, handle: ProviderHandle) -> Option<String> {
        self.accounts
            .get(&handle)
            .map(|account| format!("{}/loopback", account.username))
    }

    fn buddy_list(&self, _handle: ProviderHandle) -> Vec<BuddyRecord> {
        self.config.buddies.clone()
    }

    fn subscribe_presence(&mut self) -> ProviderResult<()> {
        Ok(())
    }
}

impl Drop for LoopbackProvider {
    fn drop(&mut self) {
        for account in self.accounts.values_mut() {
            if let Some(completion) = account.completion.take() {
                completion.abort();
            }
        }
    }
}
