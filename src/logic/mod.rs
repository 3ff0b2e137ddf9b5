//! Logic Module - Engines & Coordination
//!
//! Chứa threat engine, emergency manager và mode coordinator, cùng các
//! building block chung (clock, store, timers).
//!
//! ## Architecture
//! - `mode` - Single authority for the security mode
//! - `threat/` - Threat detection, risk scoring, usage anomalies
//! - `response/` - Automated response actions
//! - `emergency/` - Panic gesture, emergency broadcast, contacts
//! - `storage` / `scheduler` / `clock` - Shared infrastructure

// Shared infrastructure
pub mod clock;
pub mod error;
pub mod scheduler;
pub mod storage;

// Engines
pub mod mode;
pub mod threat;
pub mod response;
pub mod emergency;
