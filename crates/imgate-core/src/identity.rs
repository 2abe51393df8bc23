//! Account identity resolution
//!
//! Clients and protocol providers spell the same account differently: an AIM
//! client may send `user1` or `user1@aol.com`, and a jabber provider reports
//! `name@gmail.com/resource`. [`AccountIdentity`] canonicalises the username
//! into client form so that every spelling of an account maps to one key.

use std::fmt;

use serde::{Deserialize, Serialize};

const AOL_SERVICE: &str = "aol";
const YAHOO_SERVICE: &str = "yahoo";
const GMAIL_SERVICE: &str = "gmail";

const AOL_DOMAIN: &str = "@aol.com";
const YAHOO_DOMAIN: &str = "@yahoo.com";
const GMAIL_DOMAIN: &str = "@gmail.com";

const PROTOCOL_PREFIX: &str = "prpl-";
const AIM_PROTOCOL: &str = "prpl-aim";
const JABBER_PROTOCOL: &str = "prpl-jabber";

/// Connect server used for hosted-domain Google Talk accounts
pub const GOOGLE_TALK_SERVER: &str = "talk.google.com";

// ----------------------------------------------------------------------------
// Account Identity
// ----------------------------------------------------------------------------

/// Canonical key for one account on one service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountIdentity {
    service_name: String,
    username: String,
}

impl AccountIdentity {
    /// Build an identity from the names a client sent
    pub fn new(service_name: &str, username: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            username: client_username(service_name, username),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Canonical (client form) username
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn protocol_id(&self) -> String {
        protocol_id(&self.service_name)
    }

    pub fn provider_username(&self) -> String {
        provider_username(&self.service_name, &self.username)
    }

    /// Server override the provider should dial for this account
    pub fn connect_server(&self) -> Option<&'static str> {
        connect_server(&self.service_name, &self.provider_username())
    }

    pub fn supports_presence_queue(&self) -> bool {
        supports_presence_queue(&self.service_name)
    }
}

impl fmt::Display for AccountIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service_name, self.username)
    }
}

// ----------------------------------------------------------------------------
// Name Mapping
// ----------------------------------------------------------------------------

/// Provider protocol id for a client service name
pub fn protocol_id(service_name: &str) -> String {
    match service_name {
        AOL_SERVICE => AIM_PROTOCOL.to_string(),
        GMAIL_SERVICE => JABBER_PROTOCOL.to_string(),
        other => format!("{PROTOCOL_PREFIX}{other}"),
    }
}

/// Username in the form the provider expects
pub fn provider_username(service_name: &str, username: &str) -> String {
    let domain = match service_name {
        AOL_SERVICE => AOL_DOMAIN,
        YAHOO_SERVICE => YAHOO_DOMAIN,
        _ => return username.to_string(),
    };
    username.strip_suffix(domain).unwrap_or(username).to_string()
}

/// Username in the form clients see. Idempotent.
pub fn client_username(service_name: &str, username: &str) -> String {
    match service_name {
        AOL_SERVICE | YAHOO_SERVICE if !username.contains('@') => {
            let domain = if service_name == AOL_SERVICE {
                AOL_DOMAIN
            } else {
                YAHOO_DOMAIN
            };
            format!("{username}{domain}")
        }
        GMAIL_SERVICE => strip_resource(username).to_string(),
        _ => username.to_string(),
    }
}

/// Drop a jabber `/resource` suffix
pub fn strip_resource(username: &str) -> &str {
    username.split('/').next().unwrap_or(username)
}

pub fn connect_server(service_name: &str, provider_username: &str) -> Option<&'static str> {
    (service_name == GMAIL_SERVICE && !provider_username.ends_with(GMAIL_DOMAIN))
        .then_some(GOOGLE_TALK_SERVER)
}

/// Only jabber sessions understand the google:queue directives
pub fn supports_presence_queue(service_name: &str) -> bool {
    service_name == GMAIL_SERVICE
}

/// AOL delivers service notices as ordinary IMs from these senders
pub fn is_system_sender(service_name: &str, sender: &str) -> bool {
    service_name == AOL_SERVICE && (sender == "aolsystemmsg" || sender == "AOL System Msg")
}
