//! Status, messaging and buddy operations on online accounts

mod common;

use common::fixture;
use imgate_core::{
    api::{NOT_LOGGED_IN_TEXT, SEND_NOT_LOGGED_IN_TEXT, SUBSCRIBE_EXPECTED_TEXT},
    BuddyRecord, ClientAvailability, ErrorCode, Event, GetBuddyListRequest, Notification,
    ProviderEvent, ProviderStatus, RegisterForIncomingMessagesRequest, Responder,
    SendMessageRequest, SetMyAvailabilityRequest, SetMyCustomMessageRequest,
};
use imgate_harness::ProviderCall;

fn buddy(username: &str, status: ProviderStatus) -> BuddyRecord {
    BuddyRecord {
        username: username.to_string(),
        display_name: username.to_uppercase(),
        avatar_location: String::new(),
        custom_message: "hi".to_string(),
        status,
        group_name: "Friends".to_string(),
    }
}

// ----------------------------------------------------------------------------
// Own Status
// ----------------------------------------------------------------------------

#[test]
fn test_set_availability_keeps_custom_message() {
    let mut fx = fixture();
    let mut request = common::login_request("aol", "user1", "10.0.0.1");
    request.custom_message = "at lunch".to_string();
    let mut login = fx.login_with(request);
    let session = fx.last_session();
    fx.connect(session);
    assert!(login.try_recv().unwrap().return_value);

    let (reply, mut receiver) = Responder::new();
    fx.manager.set_my_availability(
        SetMyAvailabilityRequest {
            service_name: "aol".into(),
            username: "user1".into(),
            availability: 2,
        },
        reply,
    );

    let reply = receiver.try_recv().unwrap();
    assert!(reply.return_value);
    assert_eq!(reply.availability, Some(2));
    assert!(fx.provider.calls().contains(&ProviderCall::SetStatus {
        handle: session.handle,
        status: ProviderStatus::Away,
        custom_message: "at lunch".into(),
    }));
    let identity = imgate_core::AccountIdentity::new("aol", "user1");
    assert_eq!(
        fx.manager.sessions().get(&identity).unwrap().availability,
        ClientAvailability::Away
    );
}

#[test]
fn test_set_custom_message_keeps_availability() {
    let mut fx = fixture();
    let session = fx.online("aol", "user1", "10.0.0.1");

    let (reply, mut receiver) = Responder::new();
    fx.manager.set_my_custom_message(
        SetMyCustomMessageRequest {
            service_name: "aol".into(),
            username: "user1".into(),
            custom_message: "busy".into(),
        },
        reply,
    );

    let reply = receiver.try_recv().unwrap();
    assert!(reply.return_value);
    assert_eq!(reply.custom_message.as_deref(), Some("busy"));
    assert!(fx.provider.calls().contains(&ProviderCall::SetStatus {
        handle: session.handle,
        status: ProviderStatus::Available,
        custom_message: "busy".into(),
    }));
}

#[test]
fn test_status_requires_online() {
    let mut fx = fixture();
    fx.login("aol", "user1", "10.0.0.1");

    let (reply, mut receiver) = Responder::new();
    fx.manager.set_my_availability(
        SetMyAvailabilityRequest {
            service_name: "aol".into(),
            username: "user1".into(),
            availability: 0,
        },
        reply,
    );

    let reply = receiver.try_recv().unwrap();
    assert!(!reply.return_value);
    assert_eq!(reply.error_code, Some(ErrorCode::InvalidRequest));
    assert_eq!(reply.error_text.as_deref(), Some(NOT_LOGGED_IN_TEXT));
    assert_eq!(
        fx.provider
            .count(|c| matches!(c, ProviderCall::SetStatus { .. })),
        0
    );
}

// ----------------------------------------------------------------------------
// Messaging
// ----------------------------------------------------------------------------

#[test]
fn test_send_message_unescapes_and_maps_recipient() {
    let mut fx = fixture();
    let session = fx.online("aol", "user1", "10.0.0.1");

    let (reply, mut receiver) = Responder::new();
    fx.manager.send_message(
        SendMessageRequest {
            service_name: "aol".into(),
            username: "user1".into(),
            username_to: "buddy@aol.com".into(),
            message_text: "line\\none \\\"quoted\\\"".into(),
        },
        reply,
    );

    assert!(receiver.try_recv().unwrap().return_value);
    assert!(fx.provider.calls().contains(&ProviderCall::SendMessage {
        handle: session.handle,
        to: "buddy".into(),
        text: "line\none \"quoted\"".into(),
    }));
}

#[test]
fn test_send_message_from_offline_account() {
    let mut fx = fixture();
    let (reply, mut receiver) = Responder::new();
    fx.manager.send_message(
        SendMessageRequest {
            service_name: "aol".into(),
            username: "user1".into(),
            username_to: "buddy".into(),
            message_text: "hello".into(),
        },
        reply,
    );

    let reply = receiver.try_recv().unwrap();
    assert!(!reply.return_value);
    assert_eq!(reply.error_code, Some(ErrorCode::SendWhileOffline));
    assert_eq!(reply.error_text.as_deref(), Some(SEND_NOT_LOGGED_IN_TEXT));
    let json = serde_json::to_value(&reply).unwrap();
    assert_eq!(json["errorCode"], "11");
}

#[test]
fn test_incoming_message_filtering() {
    let mut fx = fixture();
    let aol = fx.online("aol", "user1", "10.0.0.1");
    let gmail = fx.online("gmail", "me@gmail.com", "10.0.0.1");
    fx.pushes();

    let deliver = |handle, from: &str, received| {
        Event::Provider(ProviderEvent::IncomingMessage {
            handle,
            from: from.to_string(),
            text: "hello".to_string(),
            received,
        })
    };
    fx.manager.handle_event(deliver(aol.handle, "buddy", false));
    fx.manager.handle_event(deliver(aol.handle, "aolsystemmsg", true));
    fx.manager.handle_event(deliver(aol.handle, "AOL System Msg", true));
    fx.manager.handle_event(deliver(gmail.handle, "me@gmail.com/phone", true));
    assert!(fx.pushes().is_empty());

    fx.manager.handle_event(deliver(aol.handle, "buddy", true));
    fx.manager.handle_event(deliver(gmail.handle, "friend@gmail.com/home", true));
    let pushes = fx.pushes();
    assert_eq!(pushes.len(), 2);

    match &pushes[0] {
        Notification::IncomingMessage(message) => {
            assert_eq!(message.service_name, "aol");
            assert_eq!(message.username, "user1@aol.com");
            assert_eq!(message.username_from, "buddy@aol.com");
            assert_eq!(message.message_text, "hello");
        }
        other => panic!("unexpected push {other:?}"),
    }
    match &pushes[1] {
        Notification::IncomingMessage(message) => {
            assert_eq!(message.username_from, "friend@gmail.com")
        }
        other => panic!("unexpected push {other:?}"),
    }
}

#[test]
fn test_register_for_incoming_messages() {
    let mut fx = fixture();

    let (reply, mut receiver) = Responder::new();
    fx.manager
        .register_for_incoming_messages(RegisterForIncomingMessagesRequest { subscribe: true }, reply);
    let reply = receiver.try_recv().unwrap();
    assert!(reply.return_value);
    assert_eq!(reply.subscribed, Some(true));

    let (reply, mut receiver) = Responder::new();
    fx.manager
        .register_for_incoming_messages(RegisterForIncomingMessagesRequest { subscribe: false }, reply);
    let reply = receiver.try_recv().unwrap();
    assert!(!reply.return_value);
    assert_eq!(reply.error_text.as_deref(), Some(SUBSCRIBE_EXPECTED_TEXT));
}

// ----------------------------------------------------------------------------
// Buddies
// ----------------------------------------------------------------------------

#[test]
fn test_buddy_list_snapshot_for_online_account() {
    let mut fx = fixture();
    fx.provider.set_buddies(vec![
        buddy("alice", ProviderStatus::ExtendedAway),
        buddy("bob", ProviderStatus::Tune),
    ]);
    fx.online("aol", "user1", "10.0.0.1");
    fx.pushes();

    let (reply, mut receiver) = Responder::new();
    fx.manager.get_buddy_list(
        GetBuddyListRequest {
            service_name: "aol".into(),
            username: "user1".into(),
            subscribe: true,
        },
        reply,
    );
    assert_eq!(receiver.try_recv().unwrap().subscribed, Some(true));

    let pushes = fx.pushes();
    assert_eq!(pushes.len(), 1);
    let json = serde_json::to_value(&pushes[0]).unwrap();
    assert_eq!(json["subscription"], "buddyList");
    assert_eq!(json["payload"]["fullBuddyList"], true);
    assert_eq!(json["payload"]["username"], "user1@aol.com");
    assert_eq!(json["payload"]["buddies"][0]["buddyUsername"], "alice@aol.com");
    assert_eq!(json["payload"]["buddies"][0]["availability"], "2");
    assert_eq!(json["payload"]["buddies"][1]["availability"], "0");
}

#[test]
fn test_buddy_list_for_offline_account_has_no_snapshot() {
    let mut fx = fixture();
    let (reply, mut receiver) = Responder::new();
    fx.manager.get_buddy_list(
        GetBuddyListRequest {
            service_name: "aol".into(),
            username: "user1".into(),
            subscribe: true,
        },
        reply,
    );
    assert!(receiver.try_recv().unwrap().return_value);
    assert!(fx.pushes().is_empty());
}

#[test]
fn test_presence_change_pushes_buddy_status() {
    let mut fx = fixture();
    let session = fx.online("gmail", "me@gmail.com", "10.0.0.1");
    fx.pushes();

    fx.manager.handle_event(Event::Provider(ProviderEvent::PresenceChanged {
        handle: session.handle,
        buddy: buddy("friend@gmail.com/laptop", ProviderStatus::Mobile),
    }));

    let pushes = fx.pushes();
    let json = serde_json::to_value(&pushes[0]).unwrap();
    assert_eq!(json["subscription"], "buddyStatus");
    assert_eq!(json["payload"]["serviceName"], "gmail");
    assert_eq!(json["payload"]["username"], "me@gmail.com");
    assert_eq!(json["payload"]["buddyUsername"], "friend@gmail.com");
    assert_eq!(json["payload"]["availability"], "1");
    assert_eq!(json["payload"]["groupName"], "Friends");
}
