//! Client wire-format tests
//!
//! Requests are parsed and replies rendered exactly as a JSON client sees
//! them, through the crate's public API only.

use imgate_core::{
    api::{INVALID_PARAMETERS_TEXT, LOGOUT_NOT_LOGGED_IN_TEXT},
    AccountReply, ClientAvailability, DisconnectKind, ErrorCode, GatewayError, LoginRequest,
    Notification, ProviderError, ProviderStatus, SessionError, SetMyAvailabilityRequest,
    SimpleReply, StatusReply,
};
use serde_json::json;

// ----------------------------------------------------------------------------
// Requests
// ----------------------------------------------------------------------------

#[test]
fn test_login_request_from_client_json() {
    let request: LoginRequest = serde_json::from_value(json!({
        "serviceName": "gmail",
        "username": "me@gmail.com",
        "password": "secret",
        "availability": 2,
        "customMessage": "away",
        "localIpAddress": "10.0.0.1",
        "connectionType": "wan"
    }))
    .unwrap();

    assert!(request.validate().is_ok());
    assert_eq!(request.local_address().as_deref(), Some("10.0.0.1"));
    assert_eq!(request.connection_type().as_deref(), Some("wan"));
    assert_eq!(
        ClientAvailability::from_code(request.availability).to_provider(),
        ProviderStatus::Away
    );
}

#[test]
fn test_missing_credentials_fail_validation() {
    let request: LoginRequest =
        serde_json::from_value(json!({"serviceName": "aol", "username": "user1"})).unwrap();
    let err = request.validate().unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::InvalidRequest);

    let request: SetMyAvailabilityRequest =
        serde_json::from_value(json!({"serviceName": "aol", "availability": 0})).unwrap();
    assert!(request.validate().is_err());
}

// ----------------------------------------------------------------------------
// Replies
// ----------------------------------------------------------------------------

#[test]
fn test_superseded_login_payload() {
    let reply = AccountReply::superseded("aol", "user1", "Login");
    assert_eq!(
        serde_json::to_value(&reply).unwrap(),
        json!({
            "serviceName": "aol",
            "username": "user1",
            "returnValue": false,
            "errorCode": "AcctMgr_Generic_Error",
            "errorText": "Login request superseded by a newer request",
            "superseded": true
        })
    );
}

#[test]
fn test_invalid_parameters_payload() {
    let json = serde_json::to_value(AccountReply::invalid_parameters("aol", "")).unwrap();
    assert_eq!(json["errorCode"], "1");
    assert_eq!(json["errorText"], INVALID_PARAMETERS_TEXT);
    assert!(json.get("connectionStatus").is_none());
}

#[test]
fn test_status_and_simple_replies() {
    let json = serde_json::to_value(StatusReply::availability("aol", "user1@aol.com", 3)).unwrap();
    assert_eq!(json["availability"], 3);
    assert_eq!(json["returnValue"], true);

    let json = serde_json::to_value(SimpleReply::ok()).unwrap();
    assert_eq!(json, json!({"returnValue": true}));
}

#[test]
fn test_drop_notice_envelope() {
    let notice = AccountReply::failure("aol", "user1@aol.com", ErrorCode::NetworkError, "reset")
        .with_local_ip(Some("10.0.0.1".into()))
        .logged_out();
    let json = serde_json::to_value(Notification::AccountStatus(notice)).unwrap();

    assert_eq!(json["subscription"], "accountStatus");
    assert_eq!(json["payload"]["connectionStatus"], "loggedOut");
    assert_eq!(json["payload"]["localIpAddress"], "10.0.0.1");
}

// ----------------------------------------------------------------------------
// Error Taxonomy
// ----------------------------------------------------------------------------

#[test]
fn test_disconnect_kinds_map_to_client_codes() {
    let cases = [
        (DisconnectKind::InvalidUsername, "AcctMgr_Bad_Username"),
        (DisconnectKind::AuthenticationFailed, "AcctMgr_Bad_Authentication"),
        (DisconnectKind::NetworkError, "AcctMgr_Network_Error"),
        (DisconnectKind::NameInUse, "AcctMgr_Name_In_Use"),
        (DisconnectKind::Other, "AcctMgr_Generic_Error"),
    ];
    for (kind, expected) in cases {
        let err = SessionError::ConnectionFailed {
            account: "aol:user1@aol.com".into(),
            kind,
            description: "failed".into(),
        };
        assert_eq!(err.error_code().as_str(), expected);
    }
}

#[test]
fn test_session_errors_render_as_account_replies() {
    let err = SessionError::NotLoggedIn {
        account: "aol:user1@aol.com".into(),
    };
    let json = serde_json::to_value(AccountReply::from_error("aol", "user1", &err)).unwrap();
    assert_eq!(json["errorCode"], "1");
    assert_eq!(json["errorText"], LOGOUT_NOT_LOGGED_IN_TEXT);

    let err = SessionError::ConnectionFailed {
        account: "aol:user1@aol.com".into(),
        kind: DisconnectKind::NameInUse,
        description: "Signed on elsewhere".into(),
    };
    let json = serde_json::to_value(AccountReply::from_error("aol", "user1", &err)).unwrap();
    assert_eq!(json["returnValue"], false);
    assert_eq!(json["errorCode"], "AcctMgr_Name_In_Use");
    assert_eq!(json["errorText"], "Signed on elsewhere");

    let json = serde_json::to_value(AccountReply::connection_failure("aol", "user1", None, true))
        .unwrap();
    assert_eq!(json["errorCode"], "AcctMgr_Network_Error");
    assert_eq!(json["connectionStatus"], "loggedOut");
}

#[test]
fn test_recoverable_errors() {
    assert!(GatewayError::invalid_parameters("bad").is_recoverable());
    let rejected = ProviderError::Rejected {
        reason: "busy".into(),
    };
    assert!(GatewayError::from(rejected).is_recoverable());
    assert!(!GatewayError::channel_error("closed").is_recoverable());
    assert!(!GatewayError::config_error("zero buffer").is_recoverable());
}
