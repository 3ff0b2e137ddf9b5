//! Safeguard Security Core
//!
//! Threat detection, panic-gesture emergency response và mode arbitration
//! cho một personal-safety app. UI layer đi qua `api::SecurityCore`.

pub mod constants;
pub mod api;
pub mod logic;

pub use api::SecurityCore;
