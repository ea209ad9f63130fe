//! services/web/src/adapters/prefs.rs
//!
//! Adapters implementing the `PreferenceStore` port.
//!
//! The file layout is one JSON object per client id, each holding plain string
//! keys, e.g. `{"<client-id>": {"theme": "dark"}}`.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use unbound_core::{
    domain::Theme,
    ports::{PortError, PortResult, PreferenceStore},
};
use uuid::Uuid;

const THEME_KEY: &str = "theme";

type Document = Map<String, Value>;

/// Stores preferences in a single JSON file on disk.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// reader never sees a partially written file.
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    // Readers share; a save holds it for its whole read-modify-write cycle.
    file_lock: RwLock<()>,
}

impl JsonFilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_lock: RwLock::new(()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("preferences"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Reads the whole file. A missing file is empty; anything that is not a
    /// JSON object is an error.
    async fn read_document(&self) -> PortResult<Document> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(doc)) => Ok(doc),
            Ok(_) => Err(PortError::Unexpected(format!(
                "preference file {} is not a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(PortError::Unexpected(format!(
                "preference file {} is unreadable: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn write_document(&self, doc: &Document) -> PortResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

#[async_trait]
impl PreferenceStore for JsonFilePreferenceStore {
    async fn load_theme(&self, client_id: Uuid) -> PortResult<Option<Theme>> {
        let _guard = self.file_lock.read().await;
        let doc = match self.read_document().await {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Ignoring stored preferences: {}", e);
                return Ok(None);
            }
        };
        let theme = doc
            .get(&client_id.to_string())
            .and_then(|prefs| prefs.get(THEME_KEY))
            .and_then(Value::as_str)
            .and_then(Theme::parse);
        Ok(theme)
    }

    /// Refuses to write when the existing file cannot be parsed, so other
    /// clients' preferences are never replaced by an empty document.
    async fn save_theme(&self, client_id: Uuid, theme: Theme) -> PortResult<()> {
        let _guard = self.file_lock.write().await;
        let mut doc = self.read_document().await?;
        let entry = doc
            .entry(client_id.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(prefs) = entry {
            prefs.insert(THEME_KEY.to_string(), Value::String(theme.as_str().to_string()));
        }
        self.write_document(&doc).await?;
        debug!("Saved theme '{}' for client {}", theme, client_id);
        Ok(())
    }
}

/// Keeps preferences in memory for the lifetime of the process.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    themes: Mutex<HashMap<Uuid, Theme>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn load_theme(&self, client_id: Uuid) -> PortResult<Option<Theme>> {
        Ok(self.themes.lock().await.get(&client_id).copied())
    }

    async fn save_theme(&self, client_id: Uuid, theme: Theme) -> PortResult<()> {
        self.themes.lock().await.insert(client_id, theme);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_means_no_preference() {
        let dir = tempdir().unwrap();
        let store = JsonFilePreferenceStore::new(dir.path().join("prefs.json"));
        assert_eq!(store.load_theme(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn theme_survives_a_new_store_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");
        let client = Uuid::new_v4();

        JsonFilePreferenceStore::new(&path)
            .save_theme(client, Theme::Dark)
            .await
            .unwrap();

        let reopened = JsonFilePreferenceStore::new(&path);
        assert_eq!(reopened.load_theme(client).await.unwrap(), Some(Theme::Dark));
        assert_eq!(reopened.load_theme(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn clients_do_not_share_preferences() {
        let dir = tempdir().unwrap();
        let store = JsonFilePreferenceStore::new(dir.path().join("prefs.json"));
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        store.save_theme(a, Theme::Dark).await.unwrap();
        store.save_theme(b, Theme::Light).await.unwrap();
        store.save_theme(a, Theme::Light).await.unwrap();

        assert_eq!(store.load_theme(a).await.unwrap(), Some(Theme::Light));
        assert_eq!(store.load_theme(b).await.unwrap(), Some(Theme::Light));
    }

    #[tokio::test]
    async fn unknown_or_corrupt_values_read_as_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let client = Uuid::new_v4();

        tokio::fs::write(&path, format!(r#"{{"{}": {{"theme": "sepia"}}}}"#, client))
            .await
            .unwrap();
        let store = JsonFilePreferenceStore::new(&path);
        assert_eq!(store.load_theme(client).await.unwrap(), None);

        tokio::fs::write(&path, "not json").await.unwrap();
        assert_eq!(store.load_theme(client).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_does_not_overwrite_a_damaged_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let store = JsonFilePreferenceStore::new(&path);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        store.save_theme(a, Theme::Dark).await.unwrap();
        let intact = tokio::fs::read_to_string(&path).await.unwrap();
        let torn = &intact[..intact.len() - 2];
        tokio::fs::write(&path, torn).await.unwrap();

        let err = store.save_theme(b, Theme::Light).await.unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), torn);

        // Once the file is repaired, A's theme is still there.
        tokio::fs::write(&path, &intact).await.unwrap();
        assert_eq!(store.load_theme(a).await.unwrap(), Some(Theme::Dark));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn loads_during_concurrent_saves_see_the_saved_theme() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonFilePreferenceStore::new(dir.path().join("prefs.json")));
        let reader = Uuid::new_v4();
        store.save_theme(reader, Theme::Dark).await.unwrap();

        let writer_store = store.clone();
        let writer = tokio::spawn(async move {
            for i in 0..200 {
                let theme = if i % 2 == 0 { Theme::Dark } else { Theme::Light };
                writer_store.save_theme(Uuid::new_v4(), theme).await.unwrap();
            }
        });

        let mut loads = 0;
        while !writer.is_finished() {
            assert_eq!(store.load_theme(reader).await.unwrap(), Some(Theme::Dark));
            loads += 1;
        }
        writer.await.unwrap();
        assert!(loads > 0);
        assert_eq!(store.load_theme(reader).await.unwrap(), Some(Theme::Dark));
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryPreferenceStore::new();
        let client = Uuid::new_v4();
        assert_eq!(store.load_theme(client).await.unwrap(), None);
        store.save_theme(client, Theme::Dark).await.unwrap();
        assert_eq!(store.load_theme(client).await.unwrap(), Some(Theme::Dark));
    }
}
