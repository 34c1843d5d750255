//! Remote file store seam.
//!
//! The songbook never talks HTTP itself. Anything that can list, read and
//! write files in a folder implements [`FileStore`]:
//! - [`MemoryFileStore`]: in-process store for tests and demos, with switches
//!   to simulate a signed-out user or an unreachable service
//! - [`FolderStore`]: a local directory, used by the CLI

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::category::FileRef;
use crate::error::{Result, SongbookError};

#[cfg(not(target_arch = "wasm32"))]
mod folder;
#[cfg(not(target_arch = "wasm32"))]
pub use folder::{guess_mime_type, FolderStore};

pub const JSON_MIME_TYPE: &str = "application/json";

/// Image listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    #[serde(flatten)]
    pub file: FileRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_link: Option<String>,
}

/// One page of an image listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImagePage {
    pub images: Vec<ImageRef>,
    pub next_page_token: Option<String>,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Files directly inside `folder_id`.
    async fn list(&self, folder_id: &str) -> Result<Vec<FileRef>>;

    /// One page of images inside `folder_id`.
    async fn list_images_page(&self, folder_id: &str, page_token: Option<&str>) -> Result<ImagePage>;

    /// Text content of a file.
    async fn get_content(&self, file_id: &str) -> Result<String>;

    /// Store a new file in `folder_id`.
    async fn upload(&self, folder_id: &str, name: &str, mime_type: &str, bytes: Vec<u8>) -> Result<FileRef>;

    /// Look up a file by exact name in the store's home folder.
    async fn find_by_name(&self, name: &str) -> Result<Option<FileRef>>;

    /// Create a JSON document in the home folder, returning its id.
    async fn create_json_document(&self, name: &str, body: &serde_json::Value) -> Result<String>;

    /// Overwrite an existing JSON document.
    async fn update_json_document(&self, id: &str, body: &serde_json::Value) -> Result<()>;
}

/// Follow `next_page_token` until the listing is exhausted.
pub async fn list_all_images(store: &dyn FileStore, folder_id: &str) -> Result<Vec<ImageRef>> {
    let mut images = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = store.list_images_page(folder_id, token.as_deref()).await?;
        images.extend(page.images);
        match page.next_page_token {
            Some(next) => token = Some(next),
            None => return Ok(images),
        }
    }
}

fn is_image(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Clone)]
struct StoredFile {
    file: FileRef,
    folder: String,
    bytes: Vec<u8>,
}

#[derive(Debug)]
struct MemoryState {
    files: Vec<StoredFile>,
    next_id: u64,
    authenticated: bool,
    offline: bool,
    writes: usize,
}

#[derive(Debug)]
pub struct MemoryFileStore {
    home_folder: String,
    page_size: usize,
    state: Mutex<MemoryState>,
}

impl MemoryFileStore {
    pub fn new(home_folder: impl Into<String>) -> Self {
        Self {
            home_folder: home_folder.into(),
            page_size: 100,
            state: Mutex::new(MemoryState {
                files: Vec::new(),
                next_id: 1,
                authenticated: true,
                offline: false,
                writes: 0,
            }),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| SongbookError::RemoteStore("store state poisoned".to_string()))
    }

    /// Lock after checking sign-in and connectivity
    fn session(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        let state = self.lock()?;
        if state.offline {
            return Err(SongbookError::RemoteStore("service unreachable".to_string()));
        }
        if !state.authenticated {
            return Err(SongbookError::NotAuthenticated);
        }
        Ok(state)
    }

    /// Seed a file directly (bypasses auth checks).
    pub fn insert(&self, folder_id: &str, name: &str, mime_type: &str, bytes: impl Into<Vec<u8>>) -> Result<FileRef> {
        let mut state = self.lock()?;
        Ok(Self::store_file(&mut state, folder_id, name, mime_type, bytes.into()))
    }

    fn store_file(state: &mut MemoryState, folder_id: &str, name: &str, mime_type: &str, bytes: Vec<u8>) -> FileRef {
        let file = FileRef::new(format!("file-{}", state.next_id), name, mime_type);
        state.next_id += 1;
        state.files.push(StoredFile {
            file: file.clone(),
            folder: folder_id.to_string(),
            bytes,
        });
        file
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.authenticated = authenticated;
        }
    }

    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.offline = offline;
        }
    }

    /// Number of successful document creations and updates
    pub fn write_count(&self) -> usize {
        self.state.lock().map(|s| s.writes).unwrap_or(0)
    }

    /// Parsed JSON body of the document called `name`, if any
    pub fn document(&self, name: &str) -> Option<serde_json::Value> {
        let state = self.state.lock().ok()?;
        let stored = state.files.iter().find(|f| f.file.name == name)?;
        serde_json::from_slice(&stored.bytes).ok()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn list(&self, folder_id: &str) -> Result<Vec<FileRef>> {
        let state = self.session()?;
        Ok(state
            .files
            .iter()
            .filter(|f| f.folder == folder_id)
            .map(|f| f.file.clone())
            .collect())
    }

    async fn list_images_page(&self, folder_id: &str, page_token: Option<&str>) -> Result<ImagePage> {
        let state = self.session()?;
        let start = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| SongbookError::RemoteStore(format!("invalid page token {:?}", token)))?,
            None => 0,
        };
        let all: Vec<&StoredFile> = state
            .files
            .iter()
            .filter(|f| f.folder == folder_id && is_image(&f.file.mime_type))
            .collect();

        let end = (start + self.page_size).min(all.len());
        let images = all
            .get(start..end)
            .unwrap_or(&[])
            .iter()
            .map(|f| ImageRef {
                file: f.file.clone(),
                thumbnail_link: Some(format!("memory://thumbnails/{}", f.file.id)),
            })
            .collect();
        let next_page_token = (end < all.len()).then(|| end.to_string());
        Ok(ImagePage { images, next_page_token })
    }

    async fn get_content(&self, file_id: &str) -> Result<String> {
        let state = self.session()?;
        let stored = state
            .files
            .iter()
            .find(|f| f.file.id == file_id)
            .ok_or_else(|| SongbookError::DocumentNotFound(file_id.to_string()))?;
        Ok(String::from_utf8_lossy(&stored.bytes).into_owned())
    }

    async fn upload(&self, folder_id: &str, name: &str, mime_type: &str, bytes: Vec<u8>) -> Result<FileRef> {
        let mut state = self.session()?;
        Ok(Self::store_file(&mut state, folder_id, name, mime_type, bytes))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<FileRef>> {
        let state = self.session()?;
        Ok(state
            .files
            .iter()
            .find(|f| f.folder == self.home_folder && f.file.name == name)
            .map(|f| f.file.clone()))
    }

    async fn create_json_document(&self, name: &str, body: &serde_json::Value) -> Result<String> {
        let bytes = serde_json::to_vec(body)?;
        let mut state = self.session()?;
        let file = Self::store_file(&mut state, &self.home_folder, name, JSON_MIME_TYPE, bytes);
        state.writes += 1;
        Ok(file.id)
    }

    async fn update_json_document(&self, id: &str, body: &serde_json::Value) -> Result<()> {
        let bytes = serde_json::to_vec(body)?;
        let mut state = self.session()?;
        let stored = state
            .files
            .iter_mut()
            .find(|f| f.file.id == id)
            .ok_or_else(|| SongbookError::DocumentNotFound(id.to_string()))?;
        stored.bytes = bytes;
        state.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_image_pages_are_followed() {
        let store = MemoryFileStore::new("root").with_page_size(2);
        for i in 0..5 {
            store.insert("imgs", &format!("{}.png", i), "image/png", vec![]).unwrap();
        }
        store.insert("imgs", "notes.txt", "text/plain", "C G").unwrap();

        let first = store.list_images_page("imgs", None).await.unwrap();
        assert_eq!(first.images.len(), 2);
        assert_eq!(first.next_page_token.as_deref(), Some("2"));

        let all = list_all_images(&store, "imgs").await.unwrap();
        let names: Vec<_> = all.iter().map(|i| i.file.name.as_str()).collect();
        assert_eq!(names, vec!["0.png", "1.png", "2.png", "3.png", "4.png"]);
    }

    #[tokio::test]
    async fn test_signed_out_and_offline() {
        let store = MemoryFileStore::new("root");
        store.set_authenticated(false);
        assert!(matches!(store.list("root").await, Err(SongbookError::NotAuthenticated)));

        store.set_authenticated(true);
        store.set_offline(true);
        assert!(matches!(store.find_by_name("x").await, Err(SongbookError::RemoteStore(_))));
    }

    #[tokio::test]
    async fn test_json_documents() {
        let store = MemoryFileStore::new("root");
        let id = store
            .create_json_document("app-data.json", &serde_json::json!({ "a": 1 }))
            .await
            .unwrap();
        store
            .update_json_document(&id, &serde_json::json!({ "a": 2 }))
            .await
            .unwrap();

        assert_eq!(store.document("app-data.json"), Some(serde_json::json!({ "a": 2 })));
        assert_eq!(store.find_by_name("app-data.json").await.unwrap().unwrap().id, id);
        assert_eq!(store.write_count(), 2);
        assert!(matches!(
            store.update_json_document("nope", &serde_json::json!({})).await,
            Err(SongbookError::DocumentNotFound(_))
        ));
    }
}
