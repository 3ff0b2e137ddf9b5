//! Emergency manager scenarios
//!
//! Fake invoker ghi lại mọi call/text/location; ManualClock cho gesture window,
//! paused tokio time cho debounce.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::*;
use crate::logic::clock::ManualClock;
use crate::logic::mode::{ModeCoordinator, SecurityMode};
use crate::logic::storage::{keys, ConfigStore, MemoryStore};

// ============================================================================
// FAKES
// ============================================================================

#[derive(Default)]
struct RecordingInvoker {
    fail_call: AtomicBool,
    fail_text: AtomicBool,
    calls: Mutex<Vec<String>>,
    texts: Mutex<Vec<(String, String)>>,
    locations: AtomicUsize,
}

#[async_trait]
impl ActionInvoker for RecordingInvoker {
    async fn place_call(&self, number: &str) -> Result<(), InvokeError> {
        self.calls.lock().push(number.to_string());
        if self.fail_call.load(Ordering::SeqCst) {
            return Err(InvokeError::PermissionDenied("CALL_PHONE".into()));
        }
        Ok(())
    }

    async fn send_text(&self, number: &str, message: &str) -> Result<(), InvokeError> {
        self.texts.lock().push((number.to_string(), message.to_string()));
        if self.fail_text.load(Ordering::SeqCst) {
            return Err(InvokeError::Failed("no signal".into()));
        }
        Ok(())
    }

    async fn share_location(&self) -> Result<(), InvokeError> {
        self.locations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct CountingGuard {
    bypasses: AtomicUsize,
}

#[async_trait]
impl ScreenGuard for CountingGuard {
    async fn emergency_bypass(&self) -> Result<(), InvokeError> {
        self.bypasses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// HARNESS
// ============================================================================

struct Harness {
    manager: EmergencyManager,
    invoker: Arc<RecordingInvoker>,
    guard: Arc<CountingGuard>,
    mode: Arc<ModeCoordinator>,
    clock: Arc<ManualClock>,
    store: Arc<MemoryStore>,
}

impl Harness {
    fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    fn with_store(store: Arc<MemoryStore>) -> Self {
        let invoker = Arc::new(RecordingInvoker::default());
        let guard = Arc::new(CountingGuard::default());
        let clock = Arc::new(ManualClock::new());
        let mode = Arc::new(ModeCoordinator::with_clock(clock.clone()));
        let manager = EmergencyManager::new(store.clone(), invoker.clone(), mode.clone())
            .with_screen_guard(guard.clone())
            .with_clock(clock.clone());
        Self { manager, invoker, guard, mode, clock, store }
    }

    async fn with_contacts(self, names: &[(&str, &str, bool)]) -> Self {
        for (name, phone, primary) in names {
            let mut contact = EmergencyContact::new(*name, *phone);
            contact.is_primary = *primary;
            self.manager.add_contact(contact).await.unwrap();
        }
        self
    }

    async fn tap_after(&self, ms: i64) -> TapOutcome {
        self.clock.advance_ms(ms);
        self.manager.register_tap().await
    }
}

// ============================================================================
// PANIC GESTURE
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_five_fast_taps_trigger_once() {
    let h = Harness::new().with_contacts(&[("Mom", "111", true)]).await;

    for i in 1..=4 {
        assert_eq!(h.tap_after(200).await, TapOutcome::Pending(i));
    }
    match h.tap_after(200).await {
        TapOutcome::Triggered(Ok(event)) => {
            assert_eq!(event.source, EmergencySource::PanicGesture);
        }
        other => panic!("expected trigger, got {:?}", other),
    }

    assert!(h.manager.is_emergency_active());
    assert_eq!(h.manager.event_log().len(), 1);
    assert_eq!(h.manager.pending_taps(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_taps_never_trigger() {
    let h = Harness::new();
    for _ in 0..12 {
        assert!(matches!(h.tap_after(800).await, TapOutcome::Pending(_)));
    }
    assert!(!h.manager.is_emergency_active());
    assert!(h.manager.event_log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sixth_tap_starts_fresh_sequence() {
    let h = Harness::new();
    for _ in 0..5 {
        h.tap_after(100).await;
    }
    assert!(h.manager.is_emergency_active());
    assert_eq!(h.tap_after(100).await, TapOutcome::Pending(1));
}

#[tokio::test(start_paused = true)]
async fn test_idle_window_clears_partial_sequence() {
    let h = Harness::new();
    for _ in 0..3 {
        h.tap_after(100).await;
    }
    assert_eq!(h.manager.pending_taps(), 3);

    tokio::time::sleep(StdDuration::from_millis(3100)).await;
    assert_eq!(h.manager.pending_taps(), 0);
}

#[tokio::test]
async fn test_taps_ignored_when_gesture_disabled() {
    let h = Harness::new();
    let config = EmergencyConfig {
        panic_gesture_enabled: false,
        ..EmergencyConfig::default()
    };
    h.manager.update_config(config).await;

    for _ in 0..5 {
        assert_eq!(h.tap_after(100).await, TapOutcome::Ignored);
    }
    assert!(!h.manager.is_emergency_active());
}

// ============================================================================
// TRIGGER
// ============================================================================

#[tokio::test]
async fn test_concurrent_triggers_only_one_wins() {
    let h = Harness::new().with_contacts(&[("Mom", "111", true)]).await;

    let (a, b) = tokio::join!(
        h.manager.trigger_emergency(EmergencySource::Manual),
        h.manager.trigger_emergency(EmergencySource::Remote),
    );

    let oks = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(oks, 1);
    assert!([a, b].contains(&Err(EmergencyError::AlreadyActive)));
    assert_eq!(h.manager.event_log().len(), 1);
    assert_eq!(h.invoker.calls.lock().len(), 1);
}

#[tokio::test]
async fn test_disabled_protocols_reject_trigger() {
    let h = Harness::new();
    let config = EmergencyConfig {
        is_enabled: false,
        ..EmergencyConfig::default()
    };
    h.manager.update_config(config).await;

    let result = h.manager.trigger_emergency(EmergencySource::Manual).await;
    assert_eq!(result, Err(EmergencyError::Disabled));
    assert_eq!(h.mode.current(), SecurityMode::Normal);
    assert!(h.manager.event_log().is_empty());
}

#[tokio::test]
async fn test_failed_call_does_not_block_texts() {
    let h = Harness::new()
        .with_contacts(&[("Mom", "111", true), ("Dad", "222", false)])
        .await;
    h.invoker.fail_call.store(true, Ordering::SeqCst);

    let event = h.manager.trigger_emergency(EmergencySource::Manual).await.unwrap();

    assert!(event.attempted(EmergencyChannel::PrimaryCall));
    assert!(!event.delivered(EmergencyChannel::PrimaryCall));
    assert!(event.attempted(EmergencyChannel::TextBroadcast));
    assert!(event.delivered(EmergencyChannel::TextBroadcast));
    assert!(event.delivered(EmergencyChannel::LocationShare));
    assert_eq!(h.invoker.texts.lock().len(), 2);

    // Stored entry carries the outcomes too
    let stored = h.manager.event_log();
    assert_eq!(stored[0].outcomes, event.outcomes);
}

#[tokio::test]
async fn test_no_primary_skips_call_but_still_texts() {
    let h = Harness::new().with_contacts(&[("Friend", "333", false)]).await;

    let event = h.manager.trigger_emergency(EmergencySource::Manual).await.unwrap();
    assert!(!event.attempted(EmergencyChannel::PrimaryCall));
    assert!(event.attempted(EmergencyChannel::TextBroadcast));
    assert!(h.invoker.calls.lock().is_empty());
}

#[tokio::test]
async fn test_texts_go_to_first_three_contacts() {
    let h = Harness::new()
        .with_contacts(&[
            ("A", "1", false),
            ("B", "2", false),
            ("C", "3", false),
            ("D", "4", false),
        ])
        .await;

    h.manager.trigger_emergency(EmergencySource::Manual).await.unwrap();

    let texts = h.invoker.texts.lock().clone();
    let numbers: Vec<&str> = texts.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(numbers, vec!["1", "2", "3"]);
    assert!(texts.iter().all(|(_, m)| m == &h.manager.config().emergency_message));
}

#[tokio::test]
async fn test_trigger_enters_emergency_and_deactivate_restores_normal() {
    let h = Harness::new();
    h.mode.toggle();

    h.manager.trigger_emergency(EmergencySource::Manual).await.unwrap();
    assert_eq!(h.mode.current(), SecurityMode::Emergency);
    assert!(h.manager.config().last_emergency_time.is_some());
    assert!(h.manager.protection_status().emergency_active);

    assert!(h.manager.deactivate_emergency());
    assert!(!h.manager.deactivate_emergency());
    assert_eq!(h.mode.current(), SecurityMode::Normal);

    // A new emergency is accepted after deactivation
    assert!(h.manager.trigger_emergency(EmergencySource::Manual).await.is_ok());
}

#[tokio::test]
async fn test_quick_reset_moves_to_stealth_and_bypasses_screen() {
    let h = Harness::new();
    let config = EmergencyConfig {
        quick_reset_enabled: true,
        ..EmergencyConfig::default()
    };
    h.manager.update_config(config).await;

    let event = h.manager.trigger_emergency(EmergencySource::Manual).await.unwrap();
    assert!(event.quick_reset);
    assert_eq!(h.mode.current(), SecurityMode::Stealth);
    assert_eq!(h.guard.bypasses.load(Ordering::SeqCst), 1);

    // Still active until deactivated; mode stays in stealth
    assert!(h.manager.is_emergency_active());
    assert!(h.manager.deactivate_emergency());
    assert_eq!(h.mode.current(), SecurityMode::Stealth);
}

#[tokio::test]
async fn test_event_log_keeps_last_ten() {
    let h = Harness::new();
    for _ in 0..12 {
        h.manager.trigger_emergency(EmergencySource::Manual).await.unwrap();
        h.manager.deactivate_emergency();
        h.clock.advance_secs(1);
    }

    let log = h.manager.event_log();
    assert_eq!(log.len(), 10);
    assert!(log.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

#[tokio::test]
async fn test_saving_stale_config_keeps_last_emergency_time() {
    let h = Harness::new();
    let stale = h.manager.config();
    assert!(stale.last_emergency_time.is_none());

    let event = h.manager.trigger_emergency(EmergencySource::Manual).await.unwrap();

    let edited = EmergencyConfig {
        emergency_message: "Call me now".to_string(),
        ..stale
    };
    h.manager.update_config(edited).await;

    let config = h.manager.config();
    assert_eq!(config.emergency_message, "Call me now");
    assert_eq!(config.last_emergency_time, Some(event.timestamp));
}

// ============================================================================
// CONTACTS / PERSISTENCE
// ============================================================================

#[tokio::test]
async fn test_single_primary_through_manager() {
    let h = Harness::new()
        .with_contacts(&[("Mom", "111", true), ("Dad", "222", true)])
        .await;

    let primaries: Vec<_> = h.manager.contacts().into_iter().filter(|c| c.is_primary).collect();
    assert_eq!(primaries.len(), 1);
    assert_eq!(h.manager.primary_contact().unwrap().name, "Dad");
    assert!(h.store.contains(keys::EMERGENCY_CONTACTS));
}

#[tokio::test]
async fn test_state_survives_reinitialize() {
    let store = Arc::new(MemoryStore::new());
    {
        let h = Harness::with_store(store.clone())
            .with_contacts(&[("Mom", "111", true)])
            .await;
        h.manager.trigger_emergency(EmergencySource::Manual).await.unwrap();
    }

    let h = Harness::with_store(store);
    h.manager.initialize().await;
    assert_eq!(h.manager.contacts().len(), 1);
    assert_eq!(h.manager.event_log().len(), 1);
    assert!(h.manager.config().last_emergency_time.is_some());
    // Active flag is not persisted
    assert!(!h.manager.is_emergency_active());
}

#[tokio::test]
async fn test_initialize_falls_back_on_corrupt_blobs() {
    let store = Arc::new(MemoryStore::new());
    store.set(keys::EMERGENCY_CONFIG, b"{oops".to_vec()).await.unwrap();
    store.set(keys::EMERGENCY_CONTACTS, b"[1,2".to_vec()).await.unwrap();

    let h = Harness::with_store(store);
    h.manager.initialize().await;

    assert_eq!(h.manager.config(), EmergencyConfig::default());
    assert!(h.manager.contacts().is_empty());
}

#[tokio::test]
async fn test_initialize_repairs_multiple_primaries() {
    let store = Arc::new(MemoryStore::new());
    let stored = vec![
        EmergencyContact::new("A", "1").primary(),
        EmergencyContact::new("B", "2").primary(),
    ];
    store
        .set(keys::EMERGENCY_CONTACTS, serde_json::to_vec(&stored).unwrap())
        .await
        .unwrap();

    let h = Harness::with_store(store);
    h.manager.initialize().await;
    assert_eq!(h.manager.primary_contact().unwrap().name, "B");
    assert_eq!(h.manager.contacts().iter().filter(|c| c.is_primary).count(), 1);
}

#[tokio::test]
async fn test_protection_status_reflects_contacts() {
    let h = Harness::new();
    let status = h.manager.protection_status();
    assert!(status.enabled);
    assert_eq!(status.contact_count, 0);
    assert!(!status.has_primary_contact);

    let h = h.with_contacts(&[("Mom", "111", true)]).await;
    let status = h.manager.protection_status();
    assert_eq!(status.contact_count, 1);
    assert!(status.has_primary_contact);
    assert_eq!(status.mode, SecurityMode::Normal);
}
