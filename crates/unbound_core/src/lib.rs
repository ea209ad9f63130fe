pub mod domain;
pub mod ports;
pub mod session;

pub use domain::{
    AuthMode, BillingPeriod, Credentials, DashboardTab, LibraryEntry, OutlineEntry, Rejection,
    Role, Screen, SelectedFile, Theme, Turn, UploadStatus, UploadTask, DOCUMENT_OUTLINE, LIBRARY,
    SCRIPTED_REPLY, UNTITLED_DOCUMENT,
};
pub use ports::{PortError, PortResult, PreferenceStore, TutorService};
pub use session::{ClientSession, PendingReply, PendingUpload, View};
