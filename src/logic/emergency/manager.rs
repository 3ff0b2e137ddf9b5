//! Emergency Protocol Manager
//!
//! - Panic gesture: 5 taps trong 3s => trigger (source PanicGesture)
//! - Trigger: at most one active emergency; fan-out call/text/location song song,
//!   mỗi channel fail độc lập
//! - Contacts: single-primary invariant
//!
//! Policy rejections come back as `EmergencyError`; collaborator failures are
//! logged per channel and never fail the trigger.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use parking_lot::Mutex;
use uuid::Uuid;

use super::contacts;
use super::gesture::PanicGesture;
use super::invoker::{ActionInvoker, ScreenGuard};
use super::types::*;
use crate::constants::{MAX_EMERGENCY_LOG, MAX_TEXT_RECIPIENTS, PANIC_GESTURE_WINDOW_MS};
use crate::logic::clock::{Clock, SystemClock};
use crate::logic::error::ConfigError;
use crate::logic::mode::ModeCoordinator;
use crate::logic::scheduler::Debouncer;
use crate::logic::storage::{keys, load_or_default, persist, ConfigStore};

// ============================================================================
// STATE
// ============================================================================

#[derive(Default)]
struct EmergencyState {
    config: EmergencyConfig,
    contacts: Vec<EmergencyContact>,
    log: VecDeque<EmergencyEvent>,
}

/// Channels and targets decided before the fan-out
struct BroadcastPlan {
    call: Option<String>,
    texts: Vec<String>,
    location: bool,
    message: String,
}

impl BroadcastPlan {
    fn channels(&self) -> Vec<EmergencyChannel> {
        let mut channels = Vec::new();
        if self.call.is_some() {
            channels.push(EmergencyChannel::PrimaryCall);
        }
        if !self.texts.is_empty() {
            channels.push(EmergencyChannel::TextBroadcast);
        }
        if self.location {
            channels.push(EmergencyChannel::LocationShare);
        }
        channels
    }
}

// ============================================================================
// MANAGER
// ============================================================================

pub struct EmergencyManager {
    state: Mutex<EmergencyState>,
    gesture: Arc<Mutex<PanicGesture>>,
    debouncer: Debouncer,
    active: AtomicBool,
    store: Arc<dyn ConfigStore>,
    invoker: Arc<dyn ActionInvoker>,
    screen_guard: Option<Arc<dyn ScreenGuard>>,
    mode: Arc<ModeCoordinator>,
    clock: Arc<dyn Clock>,
}

impl EmergencyManager {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        invoker: Arc<dyn ActionInvoker>,
        mode: Arc<ModeCoordinator>,
    ) -> Self {
        Self {
            state: Mutex::new(EmergencyState::default()),
            gesture: Arc::new(Mutex::new(PanicGesture::default())),
            debouncer: Debouncer::new(),
            active: AtomicBool::new(false),
            store,
            invoker,
            screen_guard: None,
            mode,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_screen_guard(mut self, guard: Arc<dyn ScreenGuard>) -> Self {
        self.screen_guard = Some(guard);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Load config, contacts and event log; defaults on any failure
    pub async fn initialize(&self) {
        let store = self.store.as_ref();
        let config: EmergencyConfig = load_or_default(store, keys::EMERGENCY_CONFIG).await;
        let mut loaded: Vec<EmergencyContact> = load_or_default(store, keys::EMERGENCY_CONTACTS).await;
        let log: Vec<EmergencyEvent> = load_or_default(store, keys::EMERGENCY_LOG).await;

        if contacts::enforce_single_primary(&mut loaded) {
            log::warn!("Stored contacts had several primaries, kept the last one");
        }

        let mut state = self.state.lock();
        state.config = config;
        state.contacts = loaded;
        state.log = log.into_iter().collect();
        while state.log.len() > MAX_EMERGENCY_LOG {
            state.log.pop_front();
        }
        log::info!(
            "Emergency manager initialized ({} contacts, {} past events)",
            state.contacts.len(),
            state.log.len()
        );
    }

    // ------------------------------------------------------------------------
    // Panic gesture
    // ------------------------------------------------------------------------

    /// Feed one tap into the gesture detector
    pub async fn register_tap(&self) -> TapOutcome {
        {
            let state = self.state.lock();
            if !state.config.is_enabled || !state.config.panic_gesture_enabled {
                return TapOutcome::Ignored;
            }
        }

        let now = self.clock.now();
        let (fired, pending) = {
            let mut gesture = self.gesture.lock();
            let fired = gesture.register(now);
            (fired, gesture.len())
        };

        if !fired {
            let gesture = Arc::clone(&self.gesture);
            self.debouncer
                .arm(StdDuration::from_millis(PANIC_GESTURE_WINDOW_MS as u64), move || {
                    gesture.lock().clear();
                });
            return TapOutcome::Pending(pending);
        }

        self.debouncer.cancel();
        log::warn!("Panic gesture recognized");
        TapOutcome::Triggered(self.trigger_emergency(EmergencySource::PanicGesture).await)
    }

    /// Taps currently inside the gesture window
    pub fn pending_taps(&self) -> usize {
        self.gesture.lock().len()
    }

    // ------------------------------------------------------------------------
    // Trigger / deactivate
    // ------------------------------------------------------------------------

    pub fn is_emergency_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Start emergency protocols. Rejected while disabled or already active.
    pub async fn trigger_emergency(&self, source: EmergencySource) -> Result<EmergencyEvent, EmergencyError> {
        if !self.state.lock().config.is_enabled {
            log::warn!("Emergency trigger ({:?}) rejected: protocols disabled", source);
            return Err(EmergencyError::Disabled);
        }
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::warn!("Emergency trigger ({:?}) rejected: already active", source);
            return Err(EmergencyError::AlreadyActive);
        }

        let now = self.clock.now();
        let (plan, quick_reset) = {
            let mut state = self.state.lock();
            state.config.last_emergency_time = Some(now);
            (self.plan_broadcast(&state), state.config.quick_reset_enabled)
        };

        let mut event = EmergencyEvent {
            id: Uuid::new_v4(),
            timestamp: now,
            source,
            channels_attempted: plan.channels(),
            outcomes: Vec::new(),
            quick_reset,
        };

        log::warn!(
            "EMERGENCY ACTIVATED ({:?}), channels: [{}]",
            source,
            event
                .channels_attempted
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        self.mode.enter_emergency();
        self.append_event(event.clone()).await;
        self.save_config().await;

        event.outcomes = self.broadcast(&plan).await;

        if quick_reset {
            self.mode.reset_to_stealth();
            if let Some(guard) = &self.screen_guard {
                if let Err(e) = guard.emergency_bypass().await {
                    log::error!("Screen protection bypass failed: {}", e);
                }
            }
        }

        self.complete_event(&event).await;
        Ok(event)
    }

    /// Clear the active flag. Mode leaves Emergency unless quick reset already did.
    pub fn deactivate_emergency(&self) -> bool {
        if !self.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.mode.exit_emergency();
        log::info!("Emergency deactivated");
        true
    }

    fn plan_broadcast(&self, state: &EmergencyState) -> BroadcastPlan {
        let config = &state.config;

        let call = if config.auto_call_enabled {
            let primary = contacts::primary(&state.contacts).map(|c| c.phone_number.clone());
            if primary.is_none() {
                log::warn!("Auto-call enabled but no primary contact, call skipped");
            }
            primary
        } else {
            None
        };

        let texts = if config.auto_text_enabled {
            state
                .contacts
                .iter()
                .take(MAX_TEXT_RECIPIENTS)
                .map(|c| c.phone_number.clone())
                .collect()
        } else {
            Vec::new()
        };

        BroadcastPlan {
            call,
            texts,
            location: config.location_sharing_enabled,
            message: config.emergency_message.clone(),
        }
    }

    /// Run every planned channel concurrently; failures are isolated per channel
    async fn broadcast(&self, plan: &BroadcastPlan) -> Vec<ChannelOutcome> {
        let invoker = self.invoker.as_ref();

        let call = async {
            let mut outcomes = Vec::new();
            if let Some(number) = &plan.call {
                let status = match invoker.place_call(number).await {
                    Ok(()) => ChannelStatus::Delivered,
                    Err(e) => {
                        log::error!("Emergency call to primary contact failed: {}", e);
                        ChannelStatus::Failed { reason: e.to_string() }
                    }
                };
                outcomes.push(ChannelOutcome {
                    channel: EmergencyChannel::PrimaryCall,
                    target: Some(number.clone()),
                    status,
                });
            }
            outcomes
        };

        let texts = async {
            let mut outcomes = Vec::with_capacity(plan.texts.len());
            for number in &plan.texts {
                let status = match invoker.send_text(number, &plan.message).await {
                    Ok(()) => ChannelStatus::Delivered,
                    Err(e) => {
                        log::error!("Emergency text to {} failed: {}", number, e);
                        ChannelStatus::Failed { reason: e.to_string() }
                    }
                };
                outcomes.push(ChannelOutcome {
                    channel: EmergencyChannel::TextBroadcast,
                    target: Some(number.clone()),
                    status,
                });
            }
            outcomes
        };

        let location = async {
            let mut outcomes = Vec::new();
            if plan.location {
                let status = match invoker.share_location().await {
                    Ok(()) => ChannelStatus::Delivered,
                    Err(e) => {
                        log::error!("Location sharing failed: {}", e);
                        ChannelStatus::Failed { reason: e.to_string() }
                    }
                };
                outcomes.push(ChannelOutcome {
                    channel: EmergencyChannel::LocationShare,
                    target: None,
                    status,
                });
            }
            outcomes
        };

        let (mut all, text_outcomes, location_outcomes) = tokio::join!(call, texts, location);
        all.extend(text_outcomes);
        all.extend(location_outcomes);

        let delivered = all.iter().filter(|o| o.is_delivered()).count();
        log::info!("Emergency broadcast settled: {}/{} delivered", delivered, all.len());
        all
    }

    // ------------------------------------------------------------------------
    // Event log
    // ------------------------------------------------------------------------

    async fn append_event(&self, event: EmergencyEvent) {
        let snapshot = {
            let mut state = self.state.lock();
            state.log.push_back(event);
            while state.log.len() > MAX_EMERGENCY_LOG {
                state.log.pop_front();
            }
            state.log.iter().cloned().collect::<Vec<_>>()
        };
        persist(self.store.as_ref(), keys::EMERGENCY_LOG, &snapshot).await;
    }

    /// Store channel outcomes on the entry written at trigger time
    async fn complete_event(&self, event: &EmergencyEvent) {
        let snapshot = {
            let mut state = self.state.lock();
            if let Some(entry) = state.log.iter_mut().find(|e| e.id == event.id) {
                entry.outcomes = event.outcomes.clone();
            }
            state.log.iter().cloned().collect::<Vec<_>>()
        };
        persist(self.store.as_ref(), keys::EMERGENCY_LOG, &snapshot).await;
    }

    pub fn event_log(&self) -> Vec<EmergencyEvent> {
        self.state.lock().log.iter().cloned().collect()
    }

    // ------------------------------------------------------------------------
    // Config
    // ------------------------------------------------------------------------

    pub fn config(&self) -> EmergencyConfig {
        self.state.lock().config.clone()
    }

    /// Apply caller policy. `last_emergency_time` is owned by the trigger path
    /// and keeps its stored value.
    pub async fn update_config(&self, mut config: EmergencyConfig) {
        if !config.panic_gesture_enabled {
            self.debouncer.cancel();
            self.gesture.lock().clear();
        }
        {
            let mut state = self.state.lock();
            config.last_emergency_time = state.config.last_emergency_time;
            state.config = config;
        }
        self.save_config().await;
    }

    async fn save_config(&self) {
        let config = self.config();
        persist(self.store.as_ref(), keys::EMERGENCY_CONFIG, &config).await;
    }

    // ------------------------------------------------------------------------
    // Contacts
    // ------------------------------------------------------------------------

    pub fn contacts(&self) -> Vec<EmergencyContact> {
        self.state.lock().contacts.clone()
    }

    pub fn primary_contact(&self) -> Option<EmergencyContact> {
        contacts::primary(&self.state.lock().contacts).cloned()
    }

    pub async fn add_contact(&self, contact: EmergencyContact) -> Result<(), ConfigError> {
        contacts::add(&mut self.state.lock().contacts, contact)?;
        self.save_contacts().await;
        Ok(())
    }

    pub async fn update_contact(&self, contact: EmergencyContact) -> Result<(), ConfigError> {
        contacts::update(&mut self.state.lock().contacts, contact)?;
        self.save_contacts().await;
        Ok(())
    }

    pub async fn remove_contact(&self, id: &str) -> bool {
        let removed = contacts::remove(&mut self.state.lock().contacts, id);
        if removed {
            self.save_contacts().await;
        }
        removed
    }

    async fn save_contacts(&self) {
        let snapshot = self.contacts();
        persist(self.store.as_ref(), keys::EMERGENCY_CONTACTS, &snapshot).await;
    }

    // ------------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------------

    pub fn protection_status(&self) -> ProtectionStatus {
        let state = self.state.lock();
        ProtectionStatus {
            enabled: state.config.is_enabled,
            emergency_active: self.is_emergency_active(),
            panic_gesture_enabled: state.config.panic_gesture_enabled,
            contact_count: state.contacts.len(),
            has_primary_contact: contacts::primary(&state.contacts).is_some(),
            last_emergency_time: state.config.last_emergency_time,
            mode: self.mode.current(),
        }
    }
}
