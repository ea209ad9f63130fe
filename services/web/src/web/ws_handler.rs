//! services/web/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! It owns one client session, applies the client's intents to it, and
//! schedules the deferred tasks.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, Outbox, SessionState},
    tasks::{reply_process, settle, upload_process},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, Stream, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use unbound_core::{Credentials, Rejection, SelectedFile};
use uuid::Uuid;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    let (mut sender, mut receiver) = socket.split();

    // --- 1. Initialization Phase ---
    let (client_id, prefers_dark) = match read_init(&mut receiver).await {
        Ok(init) => init,
        Err(InitFailure::Disconnected) => {
            info!("Client disconnected before sending Init message.");
            return;
        }
        Err(failure) => {
            error!("Could not start session: {}", failure);
            let err_msg = ServerMessage::Error {
                message: "Expected an init message.".to_string(),
            };
            let _ = send_json(&mut sender, &err_msg).await;
            return;
        }
    };

    info!("Initializing session for client {}", client_id);
    let session = SessionState::new(&app_state, client_id, prefers_dark).await;
    let connection_token = session.connection_token.clone();
    let session_state_lock = Arc::new(Mutex::new(session));

    // Every outgoing message goes through the outbox so the deferred tasks
    // never need the socket itself.
    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let writer = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            if send_json(&mut sender, &msg).await.is_err() {
                error!("Failed to send message to client. Stopping writer.");
                break;
            }
        }
    });

    let _ = outbox.send(ServerMessage::SessionInitialized { client_id });
    let _ = outbox.send(session_state_lock.lock().await.snapshot());

    // --- 2. Main Message Loop ---
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(&app_state, &session_state_lock, &outbox, client_msg)
                        .await;
                }
                Err(e) => warn!("Failed to deserialize client message: {}", e),
            },
            Ok(Message::Close(_)) => {
                info!("Client sent close message.");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    // --- 3. Cleanup ---
    connection_token.cancel();
    drop(outbox);
    writer.abort();
    info!("WebSocket connection for client {} closed.", client_id);
}

/// Why a connection never got past its first message.
#[derive(Debug, thiserror::Error)]
enum InitFailure {
    #[error("client disconnected before sending init")]
    Disconnected,
    #[error("first message was a {0} frame, expected text")]
    UnexpectedFrame(&'static str),
    #[error("first message was not a valid init message")]
    NotInit,
}

/// Waits for the client's `init` message. Ping and pong frames before it are
/// skipped; anything else ends the handshake.
async fn read_init<S>(receiver: &mut S) -> Result<(Uuid, bool), InitFailure>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(frame) = receiver.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Binary(_)) => return Err(InitFailure::UnexpectedFrame("binary")),
            Ok(Message::Close(_)) => return Err(InitFailure::Disconnected),
            Err(e) => {
                warn!("WebSocket receive error before init: {}", e);
                return Err(InitFailure::Disconnected);
            }
        };
        return match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Init {
                client_id,
                prefers_dark,
            }) => Ok((client_id.unwrap_or_else(Uuid::new_v4), prefers_dark)),
            _ => Err(InitFailure::NotInit),
        };
    }
    Err(InitFailure::Disconnected)
}

async fn send_json(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}

/// Applies one client intent to the session.
///
/// Accepted intents publish a fresh snapshot. Refused ones leave the session
/// untouched and are only logged. A repeated `init` is refused the same way.
pub async fn handle_client_message(
    app_state: &Arc<AppState>,
    session_state_lock: &Arc<Mutex<SessionState>>,
    outbox: &Outbox,
    msg: ClientMessage,
) {
    if matches!(msg, ClientMessage::Init { .. }) {
        warn!("Received subsequent Init message, which is ignored.");
        return;
    }

    let mut session = session_state_lock.lock().await;
    let visit_before = session.flow.visit();

    let outcome = apply(app_state, session_state_lock, outbox, &mut session, msg).await;
    match outcome {
        Ok(()) => settle(app_state, session_state_lock, outbox, &mut session, visit_before),
        Err(rejection) => debug!(
            "Ignored intent from client {}: {}",
            session.client_id, rejection
        ),
    }
}

async fn apply(
    app_state: &Arc<AppState>,
    session_state_lock: &Arc<Mutex<SessionState>>,
    outbox: &Outbox,
    session: &mut SessionState,
    msg: ClientMessage,
) -> Result<(), Rejection> {
    match msg {
        // Filtered out by `handle_client_message`.
        ClientMessage::Init { .. } => {}
        ClientMessage::ToggleTheme => {
            let theme = session.flow.toggle_theme();
            if let Err(e) = app_state
                .preferences
                .save_theme(session.client_id, theme)
                .await
            {
                warn!("Failed to persist theme for client {}: {}", session.client_id, e);
            }
        }
        ClientMessage::OpenAuth { mode } => session.flow.open_auth(mode.into())?,
        ClientMessage::CloseAuth => session.flow.close_auth()?,
        ClientMessage::SubmitAuth { email, password } => {
            let credentials = Credentials::new(email, password)?;
            session.flow.submit_auth(&credentials)?;
            info!("Client {} signed in as {}", session.client_id, credentials.email());
        }
        ClientMessage::ToggleBilling => {
            session.flow.toggle_billing()?;
        }
        ClientMessage::SelectTab { tab } => session.flow.select_tab(tab.into())?,
        ClientMessage::SelectFile { files } => {
            let file = SelectedFile::from_picked(files)?;
            let pending = session.flow.select_file(file)?;
            tokio::spawn(upload_process(
                app_state.clone(),
                session_state_lock.clone(),
                outbox.clone(),
                pending,
                session.visit_token.clone(),
            ));
        }
        ClientMessage::OpenLibraryEntry { index } => session.flow.open_library_entry(index)?,
        ClientMessage::OpenWorkspace { file_name } => {
            session.flow.open_workspace(file_name.as_deref());
        }
        ClientMessage::BackToDashboard => session.flow.back_to_dashboard()?,
        ClientMessage::ToggleOutline => {
            session.flow.toggle_outline()?;
        }
        ClientMessage::SendChat { text } => {
            let pending = session.flow.send_chat(&text)?;
            tokio::spawn(reply_process(
                app_state.clone(),
                session_state_lock.clone(),
                outbox.clone(),
                pending,
                session.visit_token.clone(),
            ));
        }
        ClientMessage::Logout => {
            session.flow.logout();
            info!("Client {} logged out.", session.client_id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapters::{MemoryPreferenceStore, ScriptedTutor},
        config::{Config, Delays},
        web::protocol::{RoleName, ScreenName, ThemeName, UploadName, ViewSnapshot},
    };
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use unbound_core::{Screen, Theme, SCRIPTED_REPLY};

    struct Harness {
        app_state: Arc<AppState>,
        session: Arc<Mutex<SessionState>>,
        outbox: Outbox,
        inbox: UnboundedReceiver<ServerMessage>,
    }

    impl Harness {
        async fn new() -> Self {
            Self::with_store(Arc::new(MemoryPreferenceStore::new()), Uuid::new_v4(), false).await
        }

        async fn with_store(
            preferences: Arc<MemoryPreferenceStore>,
            client_id: Uuid,
            prefers_dark: bool,
        ) -> Self {
            let config = Config::from_lookup(|_| None).unwrap();
            assert_eq!(config.delays, Delays::default());
            let app_state = Arc::new(AppState {
                config: Arc::new(config),
                preferences,
                tutor: Arc::new(ScriptedTutor::new()),
            });
            let session = SessionState::new(&app_state, client_id, prefers_dark).await;
            let (outbox, inbox) = mpsc::unbounded_channel();
            Self {
                app_state,
                session: Arc::new(Mutex::new(session)),
                outbox,
                inbox,
            }
        }

        async fn send(&self, msg: ClientMessage) {
            handle_client_message(&self.app_state, &self.session, &self.outbox, msg).await;
        }

        async fn screen(&self) -> Screen {
            self.session.lock().await.flow.screen()
        }

        async fn transcript_len(&self) -> usize {
            self.session
                .lock()
                .await
                .flow
                .workspace()
                .map_or(0, |ws| ws.transcript.len())
        }

        fn drain(&mut self) -> Vec<ViewSnapshot> {
            let mut views = Vec::new();
            while let Ok(msg) = self.inbox.try_recv() {
                if let ServerMessage::View(view) = msg {
                    views.push(view);
                }
            }
            views
        }

        async fn sign_in(&self) {
            self.send(ClientMessage::SubmitAuth {
                email: "reader@example.com".to_string(),
                password: "secret".to_string(),
            })
            .await;
        }
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sign_in_requires_both_fields() {
        let mut h = Harness::new().await;
        h.send(ClientMessage::SubmitAuth {
            email: String::new(),
            password: "secret".to_string(),
        })
        .await;
        assert_eq!(h.screen().await, Screen::Landing);
        assert!(h.drain().is_empty());

        h.sign_in().await;
        assert_eq!(h.screen().await, Screen::Dashboard);
        let views = h.drain();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].screen, ScreenName::Dashboard);
    }

    #[tokio::test(start_paused = true)]
    async fn upload_opens_workspace_after_delay() {
        let mut h = Harness::new().await;
        h.sign_in().await;
        h.send(ClientMessage::SelectFile {
            files: vec!["x.pdf".to_string()],
        })
        .await;

        let views = h.drain();
        let uploading = views.last().unwrap().dashboard.as_ref().unwrap();
        assert_eq!(uploading.upload_status, UploadName::Uploading);
        assert_eq!(uploading.uploading_file.as_deref(), Some("x.pdf"));

        advance(1999).await;
        assert_eq!(h.screen().await, Screen::Dashboard);

        advance(2).await;
        assert_eq!(h.screen().await, Screen::Workspace);
        let views = h.drain();
        let ws = views.last().unwrap().workspace.as_ref().unwrap();
        assert_eq!(ws.title, "x.pdf");
        assert!(!ws.rendered);

        advance(1500).await;
        let views = h.drain();
        assert!(views.last().unwrap().workspace.as_ref().unwrap().rendered);
    }

    #[tokio::test(start_paused = true)]
    async fn non_pdf_selection_is_ignored() {
        let mut h = Harness::new().await;
        h.sign_in().await;
        h.drain();
        h.send(ClientMessage::SelectFile {
            files: vec!["notes.txt".to_string()],
        })
        .await;
        assert!(h.drain().is_empty());

        advance(3000).await;
        assert_eq!(h.screen().await, Screen::Dashboard);
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_dashboard_cancels_pending_upload() {
        let mut h = Harness::new().await;
        h.sign_in().await;
        h.send(ClientMessage::SelectFile {
            files: vec!["x.pdf".to_string()],
        })
        .await;
        h.send(ClientMessage::Logout).await;
        h.drain();

        advance(5000).await;
        assert_eq!(h.screen().await, Screen::Landing);
        assert!(h.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn chat_reply_arrives_after_delay() {
        let mut h = Harness::new().await;
        h.send(ClientMessage::OpenWorkspace { file_name: None }).await;
        assert_eq!(h.transcript_len().await, 1);

        h.send(ClientMessage::SendChat {
            text: "   ".to_string(),
        })
        .await;
        assert_eq!(h.transcript_len().await, 1);

        h.send(ClientMessage::SendChat {
            text: "hi".to_string(),
        })
        .await;
        assert_eq!(h.transcript_len().await, 2);

        advance(999).await;
        assert_eq!(h.transcript_len().await, 2);

        advance(2).await;
        assert_eq!(h.transcript_len().await, 3);
        let views = h.drain();
        let ws = views.last().unwrap().workspace.as_ref().unwrap();
        assert_eq!(ws.title, "New Document");
        assert_eq!(ws.transcript[2].role, RoleName::Assistant);
        assert_eq!(ws.transcript[2].text, SCRIPTED_REPLY);
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_workspace_drops_pending_reply() {
        let mut h = Harness::new().await;
        h.send(ClientMessage::OpenWorkspace {
            file_name: Some("a.pdf".to_string()),
        })
        .await;
        h.send(ClientMessage::SendChat {
            text: "question".to_string(),
        })
        .await;
        h.send(ClientMessage::OpenWorkspace {
            file_name: Some("b.pdf".to_string()),
        })
        .await;

        advance(2000).await;
        let session = h.session.lock().await;
        let ws = session.flow.workspace().unwrap();
        assert_eq!(ws.title, "b.pdf");
        assert_eq!(ws.transcript.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn theme_toggle_persists_for_next_session() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let client_id = Uuid::new_v4();

        let mut h = Harness::with_store(store.clone(), client_id, false).await;
        h.send(ClientMessage::ToggleTheme).await;
        let views = h.drain();
        assert_eq!(views.last().unwrap().theme, ThemeName::Dark);

        let fresh = Harness::with_store(store.clone(), client_id, false).await;
        assert_eq!(fresh.session.lock().await.flow.theme(), Theme::Dark);

        let stranger = Harness::with_store(store, Uuid::new_v4(), true).await;
        assert_eq!(stranger.session.lock().await.flow.theme(), Theme::Dark);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_init_is_ignored() {
        let mut h = Harness::new().await;
        h.send(ClientMessage::Init {
            client_id: None,
            prefers_dark: true,
        })
        .await;
        assert_eq!(h.screen().await, Screen::Landing);
        assert_eq!(h.session.lock().await.flow.theme(), Theme::Light);
        assert!(h.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_workspace_cancels_pending_render() {
        let mut h = Harness::new().await;
        h.send(ClientMessage::OpenWorkspace {
            file_name: Some("a.pdf".to_string()),
        })
        .await;
        advance(1000).await;
        h.send(ClientMessage::BackToDashboard).await;
        h.drain();

        advance(600).await;
        assert!(h.drain().is_empty());
        assert_eq!(h.screen().await, Screen::Dashboard);

        // Coming back starts a fresh render timer for the new visit.
        h.send(ClientMessage::OpenWorkspace {
            file_name: Some("b.pdf".to_string()),
        })
        .await;
        h.drain();
        advance(1000).await;
        assert!(h.drain().is_empty());
        assert!(!h.session.lock().await.flow.workspace().unwrap().rendered);

        advance(501).await;
        let views = h.drain();
        assert_eq!(views.len(), 1);
        let ws = views[0].workspace.as_ref().unwrap();
        assert_eq!(ws.title, "b.pdf");
        assert!(ws.rendered);
    }

    fn text(json: &str) -> Result<Message, axum::Error> {
        Ok(Message::Text(json.to_string().into()))
    }

    #[tokio::test]
    async fn init_handshake_skips_pings() {
        let client_id = Uuid::new_v4();
        let init = format!(r#"{{"type":"init","client_id":"{}","prefers_dark":true}}"#, client_id);
        let mut frames = futures::stream::iter(vec![
            Ok(Message::Ping(Vec::<u8>::new().into())),
            Ok(Message::Pong(Vec::<u8>::new().into())),
            text(&init),
        ]);
        let (id, prefers_dark) = read_init(&mut frames).await.unwrap();
        assert_eq!(id, client_id);
        assert!(prefers_dark);
    }

    #[tokio::test]
    async fn init_handshake_failures_are_told_apart() {
        let mut closed = futures::stream::iter(Vec::<Result<Message, axum::Error>>::new());
        assert!(matches!(
            read_init(&mut closed).await,
            Err(InitFailure::Disconnected)
        ));

        let mut close_frame = futures::stream::iter(vec![Ok(Message::Close(None))]);
        assert!(matches!(
            read_init(&mut close_frame).await,
            Err(InitFailure::Disconnected)
        ));

        let mut binary = futures::stream::iter(vec![Ok(Message::Binary(vec![1u8].into()))]);
        assert!(matches!(
            read_init(&mut binary).await,
            Err(InitFailure::UnexpectedFrame("binary"))
        ));

        let mut wrong = futures::stream::iter(vec![text(r#"{"type":"logout"}"#)]);
        assert!(matches!(read_init(&mut wrong).await, Err(InitFailure::NotInit)));
    }
}
