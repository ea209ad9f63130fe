pub mod prefs;
pub mod tutor;

pub use prefs::{JsonFilePreferenceStore, MemoryPreferenceStore};
pub use tutor::ScriptedTutor;
