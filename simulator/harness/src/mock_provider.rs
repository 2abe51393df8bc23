//! Recording Protocol Provider
//!
//! Every call is appended to shared state that a [`ProviderProbe`] can read
//! after the provider has been boxed and handed to the account manager. No
//! events are produced; tests inject provider events themselves.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use imgate_core::{
    BuddyRecord, LoginParams, ProtocolProvider, ProviderError, ProviderHandle, ProviderResult,
    ProviderSession, ProviderStatus,
};

use crate::lock;

/// One call made on the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    CreateAccount {
        protocol_id: String,
        username: String,
    },
    Login {
        session: ProviderSession,
        params: LoginParams,
    },
    Disconnect {
        handle: ProviderHandle,
    },
    SetStatus {
        handle: ProviderHandle,
        status: ProviderStatus,
        custom_message: String,
    },
    SendMessage {
        handle: ProviderHandle,
        to: String,
        text: String,
    },
    SendRaw {
        handle: ProviderHandle,
        stanza: String,
    },
    SubscribePresence,
}

#[derive(Debug, Default)]
struct ProviderState {
    calls: Vec<ProviderCall>,
    next_handle: u64,
    accounts: HashMap<ProviderHandle, String>,
    buddies: Vec<BuddyRecord>,
    hide_display_names: bool,
    reject_create: bool,
    reject_login: bool,
    reject_send: bool,
}

// ----------------------------------------------------------------------------
// Mock Provider
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MockProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read side of this provider's state; stays valid after the provider
    /// moves into the runtime
    pub fn probe(&self) -> ProviderProbe {
        ProviderProbe {
            state: Arc::clone(&self.state),
        }
    }

    fn record(&self, call: ProviderCall) {
        lock(&self.state).calls.push(call);
    }
}

impl ProtocolProvider for MockProvider {
    fn create_account(
        &mut self,
        protocol_id: &str,
        username: &str,
    ) -> ProviderResult<ProviderHandle> {
        let mut state = lock(&self.state);
        state.calls.push(ProviderCall::CreateAccount {
            protocol_id: protocol_id.to_string(),
            username: username.to_string(),
        });
        if state.reject_create {
            return Err(ProviderError::AccountCreation {
                protocol_id: protocol_id.to_string(),
                username: username.to_string(),
            });
        }
        state.next_handle += 1;
        let handle = ProviderHandle(state.next_handle);
        state.accounts.insert(handle, username.to_string());
        Ok(handle)
    }

    fn login(&mut self, session: ProviderSession, params: LoginParams) -> ProviderResult<()> {
        let mut state = lock(&self.state);
        state.calls.push(ProviderCall::Login { session, params });
        if state.reject_login {
            return Err(ProviderError::Rejected {
                reason: "login refused".to_string(),
            });
        }
        Ok(())
    }

    fn disconnect(&mut self, handle: ProviderHandle) {
        self.record(ProviderCall::Disconnect { handle });
    }

    fn set_status(
        &mut self,
        handle: ProviderHandle,
        status: ProviderStatus,
        custom_message: &str,
    ) -> ProviderResult<()> {
        self.record(ProviderCall::SetStatus {
            handle,
            status,
            custom_message: custom_message.to_string(),
        });
        Ok(())
    }

    fn send_message(&mut self, handle: ProviderHandle, to: &str, text: &str) -> ProviderResult<()> {
        let mut state = lock(&self.state);
        state.calls.push(ProviderCall::SendMessage {
            handle,
            to: to.to_string(),
            text: text.to_string(),
        });
        if state.reject_send {
            return Err(ProviderError::Rejected {
                reason: "send refused".to_string(),
            });
        }
        Ok(())
    }

    fn send_raw(&mut self, handle: ProviderHandle, stanza: &str) -> ProviderResult<()> {
        self.record(ProviderCall::SendRaw {
            handle,
            stanza: stanza.to_string(),
        });
        Ok(())
    }

    fn display_name(&self, handle: ProviderHandle) -> Option<String> {
        let state = lock(&self.state);
        if state.hide_display_names {
            return None;
        }
        state
            .accounts
            .get(&handle)
            .map(|username| format!("{username}/imgate"))
    }

    fn buddy_list(&self, _handle: ProviderHandle) -> Vec<BuddyRecord> {
        lock(&self.state).buddies.clone()
    }

    fn subscribe_presence(&mut self) -> ProviderResult<()> {
        self.record(ProviderCall::SubscribePresence);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Probe
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProviderProbe {
    state: Arc<Mutex<ProviderState>>,
}

impl ProviderProbe {
    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.state).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    /// Sessions passed to `login`, oldest first
    pub fn logins(&self) -> Vec<ProviderSession> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::Login { session, .. } => Some(session),
                _ => None,
            })
            .collect()
    }

    pub fn last_login(&self) -> Option<(ProviderSession, LoginParams)> {
        self.calls().into_iter().rev().find_map(|call| match call {
            ProviderCall::Login { session, params } => Some((session, params)),
            _ => None,
        })
    }

    pub fn disconnects(&self) -> Vec<ProviderHandle> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::Disconnect { handle } => Some(handle),
                _ => None,
            })
            .collect()
    }

    pub fn raw_stanzas(&self) -> Vec<(ProviderHandle, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::SendRaw { handle, stanza } => Some((handle, stanza)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&ProviderCall) -> bool) -> usize {
        lock(&self.state).calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn set_buddies(&self, buddies: Vec<BuddyRecord>) {
        lock(&self.state).buddies = buddies;
    }

    pub fn hide_display_names(&self, hide: bool) {
        lock(&self.state).hide_display_names = hide;
    }

    pub fn reject_create(&self, reject: bool) {
        lock(&self.state).reject_create = reject;
    }

    pub fn reject_login(&self, reject: bool) {
        lock(&self.state).reject_login = reject;
    }

    pub fn reject_send(&self, reject: bool) {
        lock(&self.state).reject_send = reject;
    }
}
