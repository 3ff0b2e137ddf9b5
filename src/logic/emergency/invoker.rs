//! Device collaborators
//!
//! - `ActionInvoker`: place-call, send-text, share-location (each independent)
//! - `ScreenGuard`: screen-protection bypass requested on quick reset

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait ActionInvoker: Send + Sync {
    async fn place_call(&self, number: &str) -> Result<(), InvokeError>;
    async fn send_text(&self, number: &str, message: &str) -> Result<(), InvokeError>;
    async fn share_location(&self) -> Result<(), InvokeError>;
}

#[async_trait]
pub trait ScreenGuard: Send + Sync {
    async fn emergency_bypass(&self) -> Result<(), InvokeError>;
}
