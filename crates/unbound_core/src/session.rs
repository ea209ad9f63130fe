//! crates/unbound_core/src/session.rs
//!
//! The client session state machine: which screen is showing, what each screen
//! holds, and which intents are legal from where.
//!
//! Nothing here sleeps or performs I/O. Operations that start deferred work hand
//! back a pending value tagged with the current screen visit; the caller runs
//! the delay and feeds the completion back in. A completion whose visit has
//! ended is refused as [`Rejection::Stale`].

use crate::domain::{
    greeting_for, resolve_title, AuthMode, BillingPeriod, Credentials, DashboardTab, Rejection,
    Screen, SelectedFile, Theme, Turn, UploadStatus, UploadTask, LIBRARY,
};

#[derive(Debug, Clone, Default)]
pub struct LandingView {
    pub auth_open: bool,
    pub auth_mode: AuthMode,
    pub billing: BillingPeriod,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    pub tab: DashboardTab,
    /// At most one upload exists at a time.
    pub upload: Option<UploadTask>,
}

impl DashboardView {
    pub fn upload_status(&self) -> UploadStatus {
        self.upload
            .as_ref()
            .map_or(UploadStatus::Idle, |task| task.status)
    }
}

#[derive(Debug, Clone)]
pub struct WorkspaceView {
    pub title: String,
    pub transcript: Vec<Turn>,
    pub outline_open: bool,
    pub rendered: bool,
}

impl WorkspaceView {
    fn open(title: String) -> Self {
        let greeting = Turn::assistant(greeting_for(&title));
        Self {
            title,
            transcript: vec![greeting],
            outline_open: true,
            rendered: false,
        }
    }
}

/// The screen currently shown, together with the state that only lives while
/// that screen is shown.
#[derive(Debug, Clone)]
pub enum View {
    Landing(LandingView),
    Dashboard(DashboardView),
    Workspace(WorkspaceView),
}

impl View {
    pub fn screen(&self) -> Screen {
        match self {
            View::Landing(_) => Screen::Landing,
            View::Dashboard(_) => Screen::Dashboard,
            View::Workspace(_) => Screen::Workspace,
        }
    }
}

/// Upload accepted; complete it with [`ClientSession::complete_upload`] once the
/// simulated conversion delay has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub visit: u64,
    pub file_name: String,
}

/// Chat message accepted; answer it with [`ClientSession::deliver_reply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub visit: u64,
    pub question: String,
    pub document: String,
}

#[derive(Debug, Clone)]
pub struct ClientSession {
    theme: Theme,
    view: View,
    visit: u64,
}

impl ClientSession {
    /// Starts on the landing screen. A saved theme wins over the system signal.
    pub fn start(saved_theme: Option<Theme>, system_theme: Theme) -> Self {
        Self {
            theme: saved_theme.unwrap_or(system_theme),
            view: View::Landing(LandingView::default()),
            visit: 0,
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn screen(&self) -> Screen {
        self.view.screen()
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Increments every time the screen changes, including re-entering the same screen.
    pub fn visit(&self) -> u64 {
        self.visit
    }

    pub fn workspace(&self) -> Option<&WorkspaceView> {
        match &self.view {
            View::Workspace(ws) => Some(ws),
            _ => None,
        }
    }

    fn enter(&mut self, view: View) {
        self.view = view;
        self.visit += 1;
    }

    fn wrong_screen(&self, action: &'static str) -> Rejection {
        Rejection::WrongScreen {
            action,
            screen: self.screen(),
        }
    }

    fn landing_mut(&mut self, action: &'static str) -> Result<&mut LandingView, Rejection> {
        let screen = self.screen();
        match &mut self.view {
            View::Landing(landing) => Ok(landing),
            _ => Err(Rejection::WrongScreen { action, screen }),
        }
    }

    fn dashboard_mut(&mut self, action: &'static str) -> Result<&mut DashboardView, Rejection> {
        let screen = self.screen();
        match &mut self.view {
            View::Dashboard(dashboard) => Ok(dashboard),
            _ => Err(Rejection::WrongScreen { action, screen }),
        }
    }

    fn workspace_mut(&mut self, action: &'static str) -> Result<&mut WorkspaceView, Rejection> {
        let screen = self.screen();
        match &mut self.view {
            View::Workspace(ws) => Ok(ws),
            _ => Err(Rejection::WrongScreen { action, screen }),
        }
    }

    // --- Session-wide ---

    /// Flips the theme and returns the new value, which the caller persists.
    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    pub fn logout(&mut self) {
        self.enter(View::Landing(LandingView::default()));
    }

    /// Direct navigation to the workspace route, from any screen.
    pub fn open_workspace(&mut self, file_name: Option<&str>) {
        self.enter(View::Workspace(WorkspaceView::open(resolve_title(file_name))));
    }

    // --- Landing ---

    pub fn open_auth(&mut self, mode: AuthMode) -> Result<(), Rejection> {
        let landing = self.landing_mut("open_auth")?;
        landing.auth_open = true;
        landing.auth_mode = mode;
        Ok(())
    }

    pub fn close_auth(&mut self) -> Result<(), Rejection> {
        self.landing_mut("close_auth")?.auth_open = false;
        Ok(())
    }

    pub fn toggle_billing(&mut self) -> Result<BillingPeriod, Rejection> {
        let landing = self.landing_mut("toggle_billing")?;
        landing.billing = landing.billing.toggled();
        Ok(landing.billing)
    }

    /// Any well-formed credentials are accepted; there is no account store.
    pub fn submit_auth(&mut self, _credentials: &Credentials) -> Result<(), Rejection> {
        self.landing_mut("submit_auth")?;
        self.enter(View::Dashboard(DashboardView::default()));
        Ok(())
    }

    // --- Dashboard ---

    pub fn select_tab(&mut self, tab: DashboardTab) -> Result<(), Rejection> {
        self.dashboard_mut("select_tab")?.tab = tab;
        Ok(())
    }

    pub fn select_file(&mut self, file: SelectedFile) -> Result<PendingUpload, Rejection> {
        let visit = self.visit;
        let dashboard = self.dashboard_mut("select_file")?;
        if dashboard.upload_status() != UploadStatus::Idle {
            return Err(Rejection::UploadInProgress);
        }
        let file_name = file.into_name();
        dashboard.upload = Some(UploadTask {
            source_file_name: file_name.clone(),
            status: UploadStatus::Uploading,
        });
        Ok(PendingUpload { visit, file_name })
    }

    /// Finishes the upload started during `visit` and opens it in the workspace.
    pub fn complete_upload(&mut self, visit: u64) -> Result<(), Rejection> {
        if visit != self.visit {
            return Err(Rejection::Stale);
        }
        let dashboard = self.dashboard_mut("complete_upload")?;
        let task = dashboard.upload.as_mut().ok_or(Rejection::Stale)?;
        if task.status != UploadStatus::Uploading {
            return Err(Rejection::Stale);
        }
        task.status = UploadStatus::Done;
        let title = task.source_file_name.clone();
        self.open_workspace(Some(&title));
        Ok(())
    }

    pub fn open_library_entry(&mut self, index: usize) -> Result<(), Rejection> {
        self.dashboard_mut("open_library_entry")?;
        let entry = LIBRARY.get(index).ok_or(Rejection::UnknownEntry(index))?;
        self.open_workspace(Some(entry.name));
        Ok(())
    }

    // --- Workspace ---

    pub fn back_to_dashboard(&mut self) -> Result<(), Rejection> {
        if self.screen() != Screen::Workspace {
            return Err(self.wrong_screen("back_to_dashboard"));
        }
        self.enter(View::Dashboard(DashboardView::default()));
        Ok(())
    }

    /// Returns whether the outline panel is now open.
    pub fn toggle_outline(&mut self) -> Result<bool, Rejection> {
        let ws = self.workspace_mut("toggle_outline")?;
        ws.outline_open = !ws.outline_open;
        Ok(ws.outline_open)
    }

    pub fn mark_rendered(&mut self, visit: u64) -> Result<(), Rejection> {
        if visit != self.visit {
            return Err(Rejection::Stale);
        }
        self.workspace_mut("mark_rendered")?.rendered = true;
        Ok(())
    }

    /// Appends the user's turn as typed. Blank messages are refused.
    pub fn send_chat(&mut self, text: &str) -> Result<PendingReply, Rejection> {
        let visit = self.visit;
        let ws = self.workspace_mut("send_chat")?;
        if text.trim().is_empty() {
            return Err(Rejection::EmptyMessage);
        }
        ws.transcript.push(Turn::user(text));
        Ok(PendingReply {
            visit,
            question: text.to_string(),
            document: ws.title.clone(),
        })
    }

    pub fn deliver_reply(&mut self, visit: u64, text: impl Into<String>) -> Result<(), Rejection> {
        if visit != self.visit {
            return Err(Rejection::Stale);
        }
        self.workspace_mut("deliver_reply")?
            .transcript
            .push(Turn::assistant(text));
        Ok(())
    }
}
