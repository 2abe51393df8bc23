//! Request correlation store
//!
//! Login and logout replies are deferred until the provider reports back.
//! Each account has one slot per direction; holding a second request in an
//! occupied slot hands back the displaced one so the caller can answer it.

use std::collections::HashMap;

use imgate_core::{AccountIdentity, AccountReply, RequestId, Responder};

/// A deferred client request and the username spelling it arrived with
#[derive(Debug)]
pub struct HeldRequest {
    pub username: String,
    responder: Responder<AccountReply>,
}

impl HeldRequest {
    pub fn new(username: impl Into<String>, responder: Responder<AccountReply>) -> Self {
        Self {
            username: username.into(),
            responder,
        }
    }

    pub fn id(&self) -> RequestId {
        self.responder.id()
    }

    pub fn reply(self, reply: AccountReply) {
        self.responder.send(reply);
    }

    /// Reply with a payload built from the request's username
    pub fn reply_with(self, build: impl FnOnce(&str) -> AccountReply) {
        let reply = build(&self.username);
        self.responder.send(reply);
    }
}

#[derive(Debug, Default)]
pub struct RequestCorrelation {
    logins: HashMap<AccountIdentity, HeldRequest>,
    logouts: HashMap<AccountIdentity, HeldRequest>,
}

impl RequestCorrelation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold a login request; returns the request it displaced
    pub fn hold_login(
        &mut self,
        identity: &AccountIdentity,
        request: HeldRequest,
    ) -> Option<HeldRequest> {
        self.logins.insert(identity.clone(), request)
    }

    pub fn take_login(&mut self, identity: &AccountIdentity) -> Option<HeldRequest> {
        self.logins.remove(identity)
    }

    /// Hold a logout request; returns the request it displaced
    pub fn hold_logout(
        &mut self,
        identity: &AccountIdentity,
        request: HeldRequest,
    ) -> Option<HeldRequest> {
        self.logouts.insert(identity.clone(), request)
    }

    pub fn take_logout(&mut self, identity: &AccountIdentity) -> Option<HeldRequest> {
        self.logouts.remove(identity)
    }

    pub fn has_login(&self, identity: &AccountIdentity) -> bool {
        self.logins.contains_key(identity)
    }

    pub fn has_logout(&self, identity: &AccountIdentity) -> bool {
        self.logouts.contains_key(identity)
    }

    /// Held (logins, logouts)
    pub fn counts(&self) -> (usize, usize) {
        (self.logins.len(), self.logouts.len())
    }

    /// Empty both tables, e.g. on shutdown
    pub fn drain(&mut self) -> Vec<(AccountIdentity, HeldRequest)> {
        self.logins.drain().chain(self.logouts.drain()).collect()
    }
}
