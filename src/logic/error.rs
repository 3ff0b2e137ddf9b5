//! Policy / config errors shared by both engines.
//! Persistence and collaborator failures have their own types next to their traits.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid regex in pattern '{id}': {message}")]
    InvalidPattern { id: String, message: String },

    #[error("invalid contact: {0}")]
    InvalidContact(String),

    #[error("invalid response action: {0}")]
    InvalidAction(String),

    #[error("'{0}' not found")]
    NotFound(String),
}
