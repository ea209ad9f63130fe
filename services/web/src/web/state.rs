//! services/web/src/web/state.rs
//!
//! Defines the application's shared and session-specific states.

use crate::{config::Config, web::protocol::{ServerMessage, ViewSnapshot}};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use unbound_core::{
    ports::{PreferenceStore, TutorService},
    ClientSession, Theme,
};
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub tutor: Arc<dyn TutorService>,
}

/// Messages queued for the connection's socket writer.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

//=========================================================================================
// SessionState (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single, active WebSocket connection.
pub struct SessionState {
    pub client_id: Uuid,
    pub flow: ClientSession,
    /// Cancelled when the connection goes away. Parent of every visit token.
    pub connection_token: CancellationToken,
    /// Cancelled whenever the screen changes, stopping timers scheduled on the
    /// screen being left.
    pub visit_token: CancellationToken,
}

impl SessionState {
    /// Starts a session for `client_id`, restoring its saved theme when there is one.
    pub async fn new(app_state: &AppState, client_id: Uuid, prefers_dark: bool) -> Self {
        let saved_theme = match app_state.preferences.load_theme(client_id).await {
            Ok(theme) => theme,
            Err(e) => {
                warn!("Failed to load theme for client {}: {}", client_id, e);
                None
            }
        };
        let connection_token = CancellationToken::new();
        let visit_token = connection_token.child_token();

        Self {
            client_id,
            flow: ClientSession::start(saved_theme, Theme::from_system(prefers_dark)),
            connection_token,
            visit_token,
        }
    }

    /// Ends the current screen visit: pending timers from it are cancelled.
    pub fn rotate_visit_token(&mut self) {
        self.visit_token.cancel();
        self.visit_token = self.connection_token.child_token();
    }

    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::View(ViewSnapshot::from(&self.flow))
    }
}
