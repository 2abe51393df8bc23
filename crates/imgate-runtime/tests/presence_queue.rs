//! Presence-queue control driven by display events

mod common;

use common::fixture;
use imgate_core::{AccountIdentity, DisplayEvent, ProviderHandle};

const ENABLE: &str = "<query xmlns='google:queue'><enable/></query>";
const DISABLE: &str = "<query xmlns='google:queue'><disable/><flush/></query>";

fn stanzas_to(fx: &common::Fixture, handle: ProviderHandle) -> Vec<String> {
    fx.provider
        .raw_stanzas()
        .into_iter()
        .filter(|(h, _)| *h == handle)
        .map(|(_, stanza)| stanza)
        .collect()
}

#[test]
fn test_display_off_enables_queue_for_jabber_only() {
    let mut fx = fixture();
    let gmail = fx.online("gmail", "user1@gmail.com", "10.0.0.1");
    let aol = fx.online("aol", "user2", "10.0.0.1");

    fx.display(DisplayEvent::Off);

    let sent = stanzas_to(&fx, gmail.handle);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains(ENABLE));
    assert!(sent[0].starts_with("<iq from='user1@gmail.com/imgate' type='set'>"));
    assert!(stanzas_to(&fx, aol.handle).is_empty());
    assert!(!fx.manager.presence().display_on());
}

#[test]
fn test_display_on_flushes_after_delay() {
    let mut fx = fixture();
    let gmail = fx.online("gmail", "user1@gmail.com", "10.0.0.1");
    fx.display(DisplayEvent::Off);
    fx.provider.clear_calls();

    fx.display(DisplayEvent::On);
    assert!(stanzas_to(&fx, gmail.handle).is_empty());
    let flush = fx.timers.queue_flush().expect("flush timer armed");

    let event = fx.timers.fire(flush).unwrap();
    fx.manager.handle_event(event);
    let sent = stanzas_to(&fx, gmail.handle);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains(DISABLE));
}

#[test]
fn test_display_off_again_cancels_flush() {
    let mut fx = fixture();
    let gmail = fx.online("gmail", "user1@gmail.com", "10.0.0.1");
    fx.display(DisplayEvent::Off);
    fx.display(DisplayEvent::On);
    let flush = fx.timers.queue_flush().unwrap();
    fx.provider.clear_calls();

    fx.display(DisplayEvent::Off);
    assert!(fx.timers.cancelled().contains(&flush));
    assert!(fx.timers.queue_flush().is_none());
    let sent = stanzas_to(&fx, gmail.handle);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains(ENABLE));
}

#[test]
fn test_repeated_display_state_is_noop() {
    let mut fx = fixture();
    fx.online("gmail", "user1@gmail.com", "10.0.0.1");
    fx.display(DisplayEvent::On);
    assert!(fx.timers.queue_flush().is_none());
    assert!(fx.provider.raw_stanzas().is_empty());
}

#[test]
fn test_connect_while_display_off_arms_account() {
    let mut fx = fixture();
    // First connect registers the display feed
    fx.online("aol", "user0", "10.0.0.1");
    fx.display(DisplayEvent::Off);

    let gmail = fx.online("gmail", "user1@gmail.com", "10.0.0.1");
    let other = fx.online("gmail", "user2@gmail.com", "10.0.0.1");
    let identity = AccountIdentity::new("gmail", "user1@gmail.com");
    let arm = fx.timers.queue_arm(&identity).expect("arm timer");
    assert_eq!(fx.manager.presence().armed_timers(), 2);

    let event = fx.timers.fire(arm).unwrap();
    fx.manager.handle_event(event);

    let sent = stanzas_to(&fx, gmail.handle);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains(ENABLE));
    assert!(stanzas_to(&fx, other.handle).is_empty());
}

#[test]
fn test_arm_timer_skipped_once_display_on() {
    let mut fx = fixture();
    fx.online("aol", "user0", "10.0.0.1");
    fx.display(DisplayEvent::Off);
    let gmail = fx.online("gmail", "user1@gmail.com", "10.0.0.1");
    let identity = AccountIdentity::new("gmail", "user1@gmail.com");
    let arm = fx.timers.queue_arm(&identity).unwrap();

    fx.display(DisplayEvent::On);
    let event = fx.timers.fire(arm).unwrap();
    fx.manager.handle_event(event);
    assert!(stanzas_to(&fx, gmail.handle).is_empty());
}

#[test]
fn test_arm_timer_released_when_account_drops() {
    let mut fx = fixture();
    fx.online("aol", "user0", "10.0.0.1");
    fx.display(DisplayEvent::Off);
    let gmail = fx.online("gmail", "user1@gmail.com", "10.0.0.1");
    let identity = AccountIdentity::new("gmail", "user1@gmail.com");
    let arm = fx.timers.queue_arm(&identity).unwrap();

    fx.disconnect(gmail, None);
    assert!(fx.timers.cancelled().contains(&arm));
    assert_eq!(fx.manager.presence().armed_timers(), 0);
}

#[test]
fn test_first_connect_does_not_arm() {
    let mut fx = fixture();
    fx.display(DisplayEvent::Off);
    fx.online("gmail", "user1@gmail.com", "10.0.0.1");
    assert_eq!(fx.manager.presence().armed_timers(), 0);
    assert_eq!(fx.display.subscriptions(), 1);
}

#[test]
fn test_feed_failure_disables_and_resubscribes() {
    let mut fx = fixture();
    let gmail = fx.online("gmail", "user1@gmail.com", "10.0.0.1");
    fx.display(DisplayEvent::Off);
    fx.provider.clear_calls();

    fx.display(DisplayEvent::FeedFailed);
    let sent = stanzas_to(&fx, gmail.handle);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains(DISABLE));
    assert!(fx.manager.presence().display_on());
    assert!(!fx.manager.presence().feed_registered());

    fx.online("aol", "user2", "10.0.0.1");
    assert_eq!(fx.display.subscriptions(), 2);
}

#[test]
fn test_manual_queue_controls() {
    let mut fx = fixture();
    let gmail = fx.online("gmail", "user1@gmail.com", "10.0.0.1");

    assert!(fx.manager.enable_presence_queue().return_value);
    assert!(stanzas_to(&fx, gmail.handle)[0].contains(ENABLE));

    fx.provider.clear_calls();
    assert!(fx.manager.disable_presence_queue().return_value);
    assert!(stanzas_to(&fx, gmail.handle).is_empty());
    let flush = fx.timers.queue_flush().unwrap();
    let event = fx.timers.fire(flush).unwrap();
    fx.manager.handle_event(event);
    assert!(stanzas_to(&fx, gmail.handle)[0].contains(DISABLE));
}

#[test]
fn test_missing_display_name_skips_directive() {
    let mut fx = fixture();
    fx.online("gmail", "user1@gmail.com", "10.0.0.1");
    fx.provider.hide_display_names(true);
    fx.display(DisplayEvent::Off);
    assert!(fx.provider.raw_stanzas().is_empty());
}
