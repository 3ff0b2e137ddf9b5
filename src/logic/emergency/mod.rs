//! Emergency Module
//!
//! Panic gesture, emergency trigger và contact management.
//!
//! ## Structure
//! - `types`: Contacts, config, event log entries
//! - `gesture`: Tap-rate detector
//! - `contacts`: Single-primary contact list helpers
//! - `invoker`: Device collaborator traits (call, text, location, screen guard)
//! - `manager`: EmergencyManager
//!
//! ## Usage
//! ```ignore
//! let manager = EmergencyManager::new(store, invoker, mode);
//! manager.initialize().await;
//!
//! if let TapOutcome::Triggered(Ok(event)) = manager.register_tap().await {
//!     show_emergency_banner(&event);
//! }
//! ```

pub mod types;
pub mod gesture;
pub mod contacts;
pub mod invoker;
pub mod manager;

#[cfg(test)]
mod tests;

pub use types::{
    ChannelOutcome,
    ChannelStatus,
    EmergencyChannel,
    EmergencyConfig,
    EmergencyContact,
    EmergencyError,
    EmergencyEvent,
    EmergencySource,
    ProtectionStatus,
    TapOutcome,
};

pub use gesture::PanicGesture;

pub use invoker::{ActionInvoker, InvokeError, ScreenGuard};

pub use manager::EmergencyManager;
