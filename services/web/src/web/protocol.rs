//! services/web/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the
//! server, plus the view snapshot the browser renders from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unbound_core::{
    session::View, AuthMode, BillingPeriod, ClientSession, DashboardTab, LibraryEntry,
    OutlineEntry, Role, Screen, Theme, Turn, UploadStatus,
};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// The user intents a client can send. Each maps to one session operation.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Must be the first message on the connection. `client_id` is whatever the
    /// browser stored from a previous `session_initialized`; `prefers_dark` is
    /// its colour-scheme media query.
    Init {
        #[serde(default)]
        client_id: Option<Uuid>,
        #[serde(default)]
        prefers_dark: bool,
    },

    ToggleTheme,
    OpenAuth { mode: AuthModeName },
    CloseAuth,
    SubmitAuth { email: String, password: String },
    ToggleBilling,

    SelectTab { tab: TabName },
    /// Names of the files picked; only the first one is used.
    SelectFile { files: Vec<String> },
    OpenLibraryEntry { index: usize },

    /// Direct navigation to the workspace route.
    OpenWorkspace {
        #[serde(default)]
        file_name: Option<String>,
    },
    BackToDashboard,
    ToggleOutline,
    SendChat { text: String },

    Logout,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the handshake. The client should keep `client_id` for its next visit.
    SessionInitialized { client_id: Uuid },

    /// The full state to render. Sent after every accepted intent and every
    /// completed timer.
    View(ViewSnapshot),

    /// Reports a fatal protocol error before the connection is dropped.
    Error { message: String },
}

//=========================================================================================
// Wire names for core enums
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    Light,
    Dark,
}

impl From<Theme> for ThemeName {
    fn from(theme: Theme) -> Self {
        match theme {
            Theme::Light => ThemeName::Light,
            Theme::Dark => ThemeName::Dark,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScreenName {
    Landing,
    Dashboard,
    Workspace,
}

impl From<Screen> for ScreenName {
    fn from(screen: Screen) -> Self {
        match screen {
            Screen::Landing => ScreenName::Landing,
            Screen::Dashboard => ScreenName::Dashboard,
            Screen::Workspace => ScreenName::Workspace,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AuthModeName {
    SignIn,
    SignUp,
}

impl From<AuthModeName> for AuthMode {
    fn from(mode: AuthModeName) -> Self {
        match mode {
            AuthModeName::SignIn => AuthMode::SignIn,
            AuthModeName::SignUp => AuthMode::SignUp,
        }
    }
}

impl From<AuthMode> for AuthModeName {
    fn from(mode: AuthMode) -> Self {
        match mode {
            AuthMode::SignIn => AuthModeName::SignIn,
            AuthMode::SignUp => AuthModeName::SignUp,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TabName {
    Upload,
    History,
}

impl From<TabName> for DashboardTab {
    fn from(tab: TabName) -> Self {
        match tab {
            TabName::Upload => DashboardTab::Upload,
            TabName::History => DashboardTab::History,
        }
    }
}

impl From<DashboardTab> for TabName {
    fn from(tab: DashboardTab) -> Self {
        match tab {
            DashboardTab::Upload => TabName::Upload,
            DashboardTab::History => TabName::History,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingName {
    Monthly,
    Annual,
}

impl From<BillingPeriod> for BillingName {
    fn from(period: BillingPeriod) -> Self {
        match period {
            BillingPeriod::Monthly => BillingName::Monthly,
            BillingPeriod::Annual => BillingName::Annual,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UploadName {
    Idle,
    Uploading,
    Done,
}

impl From<UploadStatus> for UploadName {
    fn from(status: UploadStatus) -> Self {
        match status {
            UploadStatus::Idle => UploadName::Idle,
            UploadStatus::Uploading => UploadName::Uploading,
            UploadStatus::Done => UploadName::Done,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    User,
    Assistant,
}

impl From<Role> for RoleName {
    fn from(role: Role) -> Self {
        match role {
            Role::User => RoleName::User,
            Role::Assistant => RoleName::Assistant,
        }
    }
}

//=========================================================================================
// Snapshots
//=========================================================================================

/// One row of the document outline.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct OutlineItem {
    pub title: String,
    pub page: u32,
}

impl From<&OutlineEntry> for OutlineItem {
    fn from(entry: &OutlineEntry) -> Self {
        Self {
            title: entry.title.to_string(),
            page: entry.page,
        }
    }
}

/// One previously opened document on the dashboard's history tab.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct LibraryItem {
    /// Position to send back in `open_library_entry`.
    pub index: usize,
    pub name: String,
    pub opened: String,
    pub kind: String,
}

impl LibraryItem {
    pub fn listing(entries: &[LibraryEntry]) -> Vec<Self> {
        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| Self {
                index,
                name: entry.name.to_string(),
                opened: entry.opened.to_string(),
                kind: entry.kind.to_string(),
            })
            .collect()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TurnSnapshot {
    pub role: RoleName,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl From<&Turn> for TurnSnapshot {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.into(),
            text: turn.text.clone(),
            sent_at: turn.sent_at,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LandingSnapshot {
    pub auth_open: bool,
    pub auth_mode: AuthModeName,
    pub billing: BillingName,
    pub featured_price: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub tab: TabName,
    pub upload_status: UploadName,
    pub uploading_file: Option<String>,
    pub library: Vec<LibraryItem>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WorkspaceSnapshot {
    pub title: String,
    pub transcript: Vec<TurnSnapshot>,
    pub outline_open: bool,
    pub outline: Vec<OutlineItem>,
    pub rendered: bool,
}

/// Everything the browser needs to draw the current screen. Exactly one of the
/// per-screen fields is present, matching `screen`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub theme: ThemeName,
    pub screen: ScreenName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landing: Option<LandingSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<DashboardSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<WorkspaceSnapshot>,
}

impl From<&ClientSession> for ViewSnapshot {
    fn from(session: &ClientSession) -> Self {
        let mut snapshot = ViewSnapshot {
            theme: session.theme().into(),
            screen: session.screen().into(),
            landing: None,
            dashboard: None,
            workspace: None,
        };
        match session.view() {
            View::Landing(landing) => {
                snapshot.landing = Some(LandingSnapshot {
                    auth_open: landing.auth_open,
                    auth_mode: landing.auth_mode.into(),
                    billing: landing.billing.into(),
                    featured_price: landing.billing.featured_price(),
                });
            }
            View::Dashboard(dashboard) => {
                snapshot.dashboard = Some(DashboardSnapshot {
                    tab: dashboard.tab.into(),
                    upload_status: dashboard.upload_status().into(),
                    uploading_file: dashboard
                        .upload
                        .as_ref()
                        .map(|task| task.source_file_name.clone()),
                    library: LibraryItem::listing(&unbound_core::LIBRARY),
                });
            }
            View::Workspace(ws) => {
                snapshot.workspace = Some(WorkspaceSnapshot {
                    title: ws.title.clone(),
                    transcript: ws.transcript.iter().map(TurnSnapshot::from).collect(),
                    outline_open: ws.outline_open,
                    outline: unbound_core::DOCUMENT_OUTLINE
                        .iter()
                        .map(OutlineItem::from)
                        .collect(),
                    rendered: ws.rendered,
                });
            }
        }
        snapshot
    }
}
