//! crates/unbound_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These types are independent of any transport or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;

/// Title shown in the workspace when it is opened without a file name.
pub const UNTITLED_DOCUMENT: &str = "New Document";

/// The canned assistant answer used while there is no real tutor behind the chat.
pub const SCRIPTED_REPLY: &str = "This is a simulated response based on the document context.";

//=========================================================================================
// Rejections
//=========================================================================================

/// Why an intent was refused. The session never surfaces these to the client;
/// they exist so the boundary can log what was ignored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("only .pdf files are accepted, got '{0}'")]
    InvalidFileType(String),
    #[error("no file was selected")]
    NoFileSelected,
    #[error("message is empty")]
    EmptyMessage,
    #[error("email and password are both required")]
    EmptyCredentials,
    #[error("an upload is already in progress")]
    UploadInProgress,
    #[error("'{action}' is not available on the {screen} screen")]
    WrongScreen { action: &'static str, screen: Screen },
    #[error("no library entry at index {0}")]
    UnknownEntry(usize),
    #[error("the screen visit that scheduled this has ended")]
    Stale,
}

//=========================================================================================
// Session-wide enums
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Landing,
    Dashboard,
    Workspace,
}

impl Screen {
    pub fn as_str(self) -> &'static str {
        match self {
            Screen::Landing => "landing",
            Screen::Dashboard => "dashboard",
            Screen::Workspace => "workspace",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Maps the environment's "prefers dark" signal to a theme.
    pub fn from_system(prefers_dark: bool) -> Self {
        if prefers_dark {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    /// Parses a stored preference. Anything other than `light` or `dark` is
    /// treated as absent.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

/// Pricing toggle on the landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BillingPeriod {
    #[default]
    Monthly,
    Annual,
}

impl BillingPeriod {
    pub fn toggled(self) -> Self {
        match self {
            BillingPeriod::Monthly => BillingPeriod::Annual,
            BillingPeriod::Annual => BillingPeriod::Monthly,
        }
    }

    /// Monthly price, in dollars, of the featured plan.
    pub fn featured_price(self) -> u32 {
        match self {
            BillingPeriod::Monthly => 29,
            BillingPeriod::Annual => 24,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashboardTab {
    #[default]
    Upload,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    Uploading,
    Done,
}

//=========================================================================================
// Entities
//=========================================================================================

/// The simulated upload of a single picked file. Only its name is ever kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub source_file_name: String,
    pub status: UploadStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One message in the workspace chat.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            sent_at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            sent_at: Utc::now(),
        }
    }
}

/// A table-of-contents row shown next to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutlineEntry {
    pub title: &'static str,
    pub page: u32,
}

pub const DOCUMENT_OUTLINE: [OutlineEntry; 6] = [
    OutlineEntry {
        title: "Executive Summary",
        page: 1,
    },
    OutlineEntry {
        title: "Key Topics",
        page: 1,
    },
    OutlineEntry {
        title: "Introduction",
        page: 2,
    },
    OutlineEntry {
        title: "Methodology",
        page: 5,
    },
    OutlineEntry {
        title: "Results",
        page: 8,
    },
    OutlineEntry {
        title: "Conclusion",
        page: 12,
    },
];

/// A previously opened document listed on the dashboard's history tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryEntry {
    pub name: &'static str,
    pub opened: &'static str,
    pub kind: &'static str,
}

pub const LIBRARY: [LibraryEntry; 4] = [
    LibraryEntry {
        name: "Biology_Notes_Ch3.pdf",
        opened: "2 hours ago",
        kind: "PDF",
    },
    LibraryEntry {
        name: "Chemistry_Lab_Report.pdf",
        opened: "Yesterday",
        kind: "PDF",
    },
    LibraryEntry {
        name: "History_Essay_Draft.pdf",
        opened: "3 days ago",
        kind: "PDF",
    },
    LibraryEntry {
        name: "Math_Assignment_5.pdf",
        opened: "Last week",
        kind: "PDF",
    },
];

//=========================================================================================
// Boundary values
//=========================================================================================

/// A checked sign-in or sign-up form submission. Both fields were non-empty;
/// the password is only checked, never kept.
#[derive(Debug, Clone)]
pub struct Credentials {
    email: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Result<Self, Rejection> {
        let email = email.into();
        if email.trim().is_empty() || password.into().is_empty() {
            return Err(Rejection::EmptyCredentials);
        }
        Ok(Self { email })
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

/// The single file taken from a picker. Only `.pdf` names are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
}

impl SelectedFile {
    /// Takes the first picked name; the rest are ignored.
    pub fn from_picked<I>(names: I) -> Result<Self, Rejection>
    where
        I: IntoIterator<Item = String>,
    {
        let name = names.into_iter().next().ok_or(Rejection::NoFileSelected)?;
        let is_pdf = name.len() > 4
            && name
                .get(name.len() - 4..)
                .is_some_and(|ext| ext.eq_ignore_ascii_case(".pdf"));
        if !is_pdf {
            return Err(Rejection::InvalidFileType(name));
        }
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_name(self) -> String {
        self.name
    }
}

/// Resolves the workspace title from an optional navigation parameter.
pub fn resolve_title(file_name: Option<&str>) -> String {
    match file_name {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => UNTITLED_DOCUMENT.to_string(),
    }
}

/// The assistant's opening message for a freshly opened document.
pub fn greeting_for(document: &str) -> String {
    format!(
        "Hello! I am your AI assistant. I've analyzed \"{}\". Ask me anything about it.",
        document
    )
}
