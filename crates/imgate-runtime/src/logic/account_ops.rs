//! Per-account operations on online sessions, plus the provider's message and
//! presence signals.

use imgate_core::{
    api::{INVALID_PARAMETERS_TEXT, NOT_LOGGED_IN_TEXT, SEND_NOT_LOGGED_IN_TEXT},
    identity::{client_username, is_system_sender, provider_username, strip_resource},
    text::unescape,
    AccountIdentity, BuddyEntry, BuddyListSnapshot, BuddyRecord, BuddyStatus, ClientAvailability,
    ErrorCode, GetBuddyListRequest, IncomingMessage, Notification, ProviderHandle,
    RegisterForIncomingMessagesRequest, Responder, SendMessageRequest, SetMyAvailabilityRequest,
    SetMyCustomMessageRequest, SimpleReply, StatusReply,
};
use tracing::{debug, info, trace, warn};

use super::manager::AccountManager;

impl AccountManager {
    /// Provider handle of an online account
    fn online_handle(&self, identity: &AccountIdentity) -> Option<ProviderHandle> {
        self.sessions
            .get(identity)
            .filter(|session| session.is_online())
            .and_then(|session| session.provider_handle)
    }

    // ------------------------------------------------------------------------
    // Own Status
    // ------------------------------------------------------------------------

    pub fn set_my_availability(
        &mut self,
        request: SetMyAvailabilityRequest,
        reply: Responder<StatusReply>,
    ) {
        let (service, username) = (&request.service_name, &request.username);
        if request.validate().is_err() {
            reply.send(StatusReply::failure(
                service,
                username,
                ErrorCode::InvalidRequest,
                INVALID_PARAMETERS_TEXT,
            ));
            return;
        }

        let identity = AccountIdentity::new(service, username);
        let Some(handle) = self.online_handle(&identity) else {
            reply.send(StatusReply::failure(
                service,
                username,
                ErrorCode::InvalidRequest,
                NOT_LOGGED_IN_TEXT,
            ));
            return;
        };

        let availability = ClientAvailability::from_code(request.availability);
        let custom_message = self
            .sessions
            .get(&identity)
            .map(|session| session.custom_message.clone())
            .unwrap_or_default();
        if let Err(err) =
            self.provider
                .set_status(handle, availability.to_provider(), &custom_message)
        {
            warn!(account = %identity, %err, "Could not set availability");
            reply.send(StatusReply::failure(
                service,
                username,
                ErrorCode::GenericError,
                &err.to_string(),
            ));
            return;
        }

        if let Some(session) = self.sessions.get_mut(&identity) {
            session.availability = availability;
        }
        info!(account = %identity, ?availability, "Availability changed");
        reply.send(StatusReply::availability(
            service,
            username,
            request.availability,
        ));
    }

    pub fn set_my_custom_message(
        &mut self,
        request: SetMyCustomMessageRequest,
        reply: Responder<StatusReply>,
    ) {
        let (service, username) = (&request.service_name, &request.username);
        if request.validate().is_err() {
            reply.send(StatusReply::failure(
                service,
                username,
                ErrorCode::InvalidRequest,
                INVALID_PARAMETERS_TEXT,
            ));
            return;
        }

        let identity = AccountIdentity::new(service, username);
        let Some(handle) = self.online_handle(&identity) else {
            reply.send(StatusReply::failure(
                service,
                username,
                ErrorCode::InvalidRequest,
                NOT_LOGGED_IN_TEXT,
            ));
            return;
        };

        let availability = self
            .sessions
            .get(&identity)
            .map(|session| session.availability)
            .unwrap_or_default();
        if let Err(err) =
            self.provider
                .set_status(handle, availability.to_provider(), &request.custom_message)
        {
            warn!(account = %identity, %err, "Could not set custom message");
            reply.send(StatusReply::failure(
                service,
                username,
                ErrorCode::GenericError,
                &err.to_string(),
            ));
            return;
        }

        if let Some(session) = self.sessions.get_mut(&identity) {
            session.custom_message = request.custom_message.clone();
        }
        debug!(account = %identity, "Custom message changed");
        reply.send(StatusReply::custom_message(
            service,
            username,
            &request.custom_message,
        ));
    }

    // ------------------------------------------------------------------------
    // Messaging
    // ------------------------------------------------------------------------

    pub fn send_message(&mut self, request: SendMessageRequest, reply: Responder<SimpleReply>) {
        if request.validate().is_err() {
            reply.send(SimpleReply::error(
                ErrorCode::InvalidRequest,
                INVALID_PARAMETERS_TEXT,
            ));
            return;
        }

        let identity = AccountIdentity::new(&request.service_name, &request.username);
        let Some(handle) = self.online_handle(&identity) else {
            debug!(account = %identity, "Send from account that is not online");
            reply.send(SimpleReply::error(
                ErrorCode::SendWhileOffline,
                SEND_NOT_LOGGED_IN_TEXT,
            ));
            return;
        };

        let to = provider_username(identity.service_name(), &request.username_to);
        let text = unescape(&request.message_text);
        match self.provider.send_message(handle, &to, &text) {
            Ok(()) => {
                trace!(account = %identity, %to, "Message sent");
                reply.send(SimpleReply::ok());
            }
            Err(err) => {
                warn!(account = %identity, %to, %err, "Message send failed");
                reply.send(SimpleReply::error(ErrorCode::GenericError, &err.to_string()));
            }
        }
    }

    pub fn register_for_incoming_messages(
        &mut self,
        request: RegisterForIncomingMessagesRequest,
        reply: Responder<SimpleReply>,
    ) {
        if request.subscribe {
            reply.send(SimpleReply::subscribed());
        } else {
            reply.send(SimpleReply::not_subscribed());
        }
    }

    pub fn on_incoming_message(
        &mut self,
        handle: ProviderHandle,
        from: &str,
        text: String,
        received: bool,
    ) {
        let Some(identity) = self.sessions.resolve(handle).cloned() else {
            debug!(%handle, "Message for unknown provider handle");
            return;
        };
        if !received {
            trace!(account = %identity, "Ignoring echo of sent message");
            return;
        }

        let service = identity.service_name();
        if is_system_sender(service, from) {
            debug!(account = %identity, %from, "Dropping system message");
            return;
        }
        let sender = client_username(service, strip_resource(from));
        if sender == identity.username() {
            trace!(account = %identity, "Ignoring message from self");
            return;
        }

        self.hub
            .publish(Notification::IncomingMessage(IncomingMessage {
                service_name: service.to_string(),
                username: identity.username().to_string(),
                username_from: sender,
                message_text: text,
            }));
    }

    // ------------------------------------------------------------------------
    // Buddies
    // ------------------------------------------------------------------------

    pub fn get_buddy_list(&mut self, request: GetBuddyListRequest, reply: Responder<SimpleReply>) {
        if request.validate().is_err() {
            reply.send(SimpleReply::error(
                ErrorCode::InvalidRequest,
                INVALID_PARAMETERS_TEXT,
            ));
            return;
        }
        if !request.subscribe {
            reply.send(SimpleReply::not_subscribed());
            return;
        }
        reply.send(SimpleReply::subscribed());

        let identity = AccountIdentity::new(&request.service_name, &request.username);
        let Some(handle) = self.online_handle(&identity) else {
            debug!(account = %identity, "Buddy subscription for offline account, no snapshot");
            return;
        };
        let service = identity.service_name();
        let buddies: Vec<BuddyEntry> = self
            .provider
            .buddy_list(handle)
            .iter()
            .map(|record| BuddyEntry::from_record(service, record))
            .collect();
        debug!(account = %identity, count = buddies.len(), "Pushing buddy list");

        self.hub.publish(Notification::BuddyList(BuddyListSnapshot {
            service_name: service.to_string(),
            username: identity.username().to_string(),
            full_buddy_list: true,
            buddies,
        }));
    }

    pub fn on_presence_changed(&mut self, handle: ProviderHandle, buddy: &BuddyRecord) {
        let Some(identity) = self.sessions.resolve(handle) else {
            debug!(%handle, "Presence for unknown provider handle");
            return;
        };
        let service = identity.service_name();
        self.hub.publish(Notification::BuddyStatus(BuddyStatus {
            service_name: service.to_string(),
            username: identity.username().to_string(),
            buddy: BuddyEntry::from_record(service, buddy),
        }));
    }
}
