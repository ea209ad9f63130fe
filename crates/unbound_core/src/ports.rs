//! crates/unbound_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of where preferences live or who answers chat questions.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Theme;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Client-local preferences, keyed by the id the client presents on connect.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Returns `None` when nothing usable is stored for this client.
    async fn load_theme(&self, client_id: Uuid) -> PortResult<Option<Theme>>;

    async fn save_theme(&self, client_id: Uuid, theme: Theme) -> PortResult<()>;
}

#[async_trait]
pub trait TutorService: Send + Sync {
    /// Answers a chat question about the named document.
    async fn answer_question(&self, question: &str, document: &str) -> PortResult<String>;
}
