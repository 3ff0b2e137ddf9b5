//! API Module
//!
//! UI-facing surface of the core.
//!
//! Structure:
//! - commands.rs: `SecurityCore` facade + builder, one method per UI command
//!
//! Usage:
//! ```ignore
//! let core = SecurityCore::builder(store, invoker).with_check(check).build();
//! core.initialize().await;
//! let status = core.get_status();
//! ```

pub mod commands;

pub use commands::*;
