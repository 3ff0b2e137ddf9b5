//! Panic Gesture Detector
//!
//! Leaky-bucket over tap timestamps: rate matters, không phải tổng số tap.
//! Taps older than the window are pruned on every tap; reaching the tap
//! count inside the window fires and resets the sequence.

use chrono::{DateTime, Duration, Utc};

use crate::constants::{PANIC_GESTURE_TAPS, PANIC_GESTURE_WINDOW_MS};

#[derive(Debug, Clone)]
pub struct PanicGesture {
    taps: Vec<DateTime<Utc>>,
    window: Duration,
    required: usize,
}

impl Default for PanicGesture {
    fn default() -> Self {
        Self::new(Duration::milliseconds(PANIC_GESTURE_WINDOW_MS), PANIC_GESTURE_TAPS)
    }
}

impl PanicGesture {
    pub fn new(window: Duration, required: usize) -> Self {
        Self {
            taps: Vec::with_capacity(required),
            window,
            required: required.max(1),
        }
    }

    /// Record a tap. True when the gesture fires.
    pub fn register(&mut self, now: DateTime<Utc>) -> bool {
        self.taps.push(now);
        let cutoff = now - self.window;
        self.taps.retain(|t| *t >= cutoff);

        if self.taps.len() >= self.required {
            self.taps.clear();
            return true;
        }
        false
    }

    pub fn clear(&mut self) {
        self.taps.clear();
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}
