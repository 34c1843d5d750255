//! # Songbook Session
//!
//! [`Songbook`] composes the independent parts of the app for one session:
//!
//! | Part | Role |
//! |------|------|
//! | [`CategoryStore`] | categories, visibility, membership, selection |
//! | [`CacheStore`] | last known state across restarts |
//! | [`SyncService`] + [`PushQueue`] | remote snapshot pull and ordered pushes |
//! | [`LocalAssetRegistry`] | session-only device files |
//! | [`Library`] | remote listing, search and image catalog |
//! | [`EventBus`] | "state changed, re-render" notifications |
//!
//! Every persisted mutation goes through one path: write the local cache,
//! emit an event, then queue a push of the full snapshot. Cache and push
//! failures are logged and never returned; the UI keeps working off local
//! state.
//!
//! ```no_run
//! use std::sync::Arc;
//! use songbook::{CacheStore, MemoryCache, MemoryFileStore, Songbook, SongbookConfig};
//!
//! # async fn demo() {
//! let remote = Arc::new(MemoryFileStore::new("root"));
//! let cache = CacheStore::new(Box::new(MemoryCache::new()));
//! let (mut songbook, writer) = Songbook::new(SongbookConfig::default(), remote, cache);
//! tokio::spawn(writer.run());
//!
//! songbook.start_session().await;
//! songbook.add_category("Natal").unwrap();
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use crate::assets::{DisplayHandle, LocalAsset, LocalAssetRegistry};
use crate::cache::CacheStore;
use crate::category::{Category, CategoryStore, FileRef};
use crate::config::SongbookConfig;
use crate::error::{Result, SongbookError};
use crate::events::{EventBus, SongbookEvent};
use crate::library::{display_name, ItemKind, Library};
use crate::remote::{FileStore, ImageRef};
use crate::snapshot::RemoteSnapshot;
use crate::sync::{push_queue, PushQueue, SnapshotWriter, SyncService, SyncState};
use crate::viewer::SheetViewer;

/// One card in a category's song list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongEntry {
    pub file: FileRef,
    pub title: String,
    pub is_local: bool,
    /// Position within its own list (local or remote), for removal
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<DisplayHandle>,
}

/// Result of opening a song card or search hit
#[derive(Debug, Clone)]
pub enum OpenedItem {
    Folder(FileRef),
    Image {
        file: FileRef,
        handle: Option<DisplayHandle>,
    },
    Sheet(SheetViewer),
}

pub struct Songbook {
    config: SongbookConfig,
    remote: Arc<dyn FileStore>,
    categories: CategoryStore,
    cache: CacheStore,
    sync: Arc<Mutex<SyncService>>,
    queue: PushQueue,
    assets: LocalAssetRegistry,
    library: Library,
    events: EventBus,
}

impl Songbook {
    /// Build a session seeded from the local cache. The returned writer must
    /// be run (spawned) for pushes to reach the remote store.
    pub fn new(config: SongbookConfig, remote: Arc<dyn FileStore>, cache: CacheStore) -> (Self, SnapshotWriter) {
        let categories = CategoryStore::with_state(
            config.fixed_categories.clone(),
            cache.custom_categories(),
            cache.membership(),
        );
        let sync = Arc::new(Mutex::new(SyncService::new(remote.clone(), config.snapshot_name.clone())));
        let events = EventBus::default();
        let (queue, writer) = push_queue(sync.clone());
        let library = Library::new(
            config.drive_folder_id.clone(),
            config.images_folder().to_string(),
            config.search_limit,
        );

        let songbook = Self {
            config,
            remote,
            categories,
            cache,
            sync,
            queue,
            assets: LocalAssetRegistry::new(),
            library,
            events: events.clone(),
        };
        (songbook, writer.with_events(events))
    }

    pub fn config(&self) -> &SongbookConfig {
        &self.config
    }

    pub fn categories(&self) -> &CategoryStore {
        &self.categories
    }

    pub fn category_list(&self) -> Vec<Category> {
        self.categories.categories()
    }

    pub fn selected_category(&self) -> &str {
        self.categories.selected()
    }

    /// Title shown above the song list
    pub fn selected_category_name(&self) -> &str {
        self.categories.name_of(self.categories.selected())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SongbookEvent> {
        self.events.subscribe()
    }

    pub async fn sync_state(&self) -> SyncState {
        self.sync.lock().await.state().clone()
    }

    // ------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------

    /// Locate the remote snapshot and merge it over the cached state.
    pub async fn start_session(&mut self) -> bool {
        self.pull_and_merge().await
    }

    /// Returns `true` if a remote snapshot was merged.
    pub async fn pull_and_merge(&mut self) -> bool {
        let merged = self
            .sync
            .lock()
            .await
            .pull_and_merge(&mut self.categories)
            .await;
        if merged {
            self.release_orphaned_assets();
            self.persist();
            self.events.emit(SongbookEvent::SnapshotMerged);
            self.events.emit(SongbookEvent::CategoriesChanged);
        }
        merged
    }

    /// Queue a push of the current state. Returns its version stamp.
    pub fn push(&mut self) -> u64 {
        let snapshot = RemoteSnapshot::capture(&self.categories, Utc::now());
        self.queue.enqueue(snapshot)
    }

    /// Release assets whose category a merge removed.
    fn release_orphaned_assets(&mut self) {
        let orphaned: Vec<String> = self
            .assets
            .categories()
            .filter(|c| !self.categories.contains(c))
            .map(str::to_string)
            .collect();
        for category in orphaned {
            self.assets.remove_category(&category);
            self.events.emit(SongbookEvent::AssetsChanged { category });
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.cache.set_custom_categories(self.categories.records()) {
            warn!(error = %e, "failed to cache categories");
        }
        if let Err(e) = self.cache.set_membership(self.categories.membership()) {
            warn!(error = %e, "failed to cache membership");
        }
    }

    fn commit(&mut self, event: SongbookEvent) {
        self.persist();
        self.events.emit(event);
        let version = self.push();
        debug!(version, "state committed");
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub fn add_category(&mut self, name: &str) -> Result<String> {
        let id = self.categories.add_category(name)?;
        self.commit(SongbookEvent::CategoriesChanged);
        Ok(id)
    }

    /// Delete a custom category, releasing its local assets too.
    pub fn delete_category(&mut self, id: &str) -> bool {
        if !self.categories.delete_category(id) {
            return false;
        }
        if self.assets.remove_category(id) > 0 {
            self.events.emit(SongbookEvent::AssetsChanged { category: id.to_string() });
        }
        self.commit(SongbookEvent::CategoriesChanged);
        true
    }

    pub fn toggle_visibility(&mut self, id: &str) -> Option<bool> {
        let public = self.categories.toggle_visibility(id)?;
        self.commit(SongbookEvent::CategoriesChanged);
        Some(public)
    }

    /// Selection is view state only; it is neither cached nor pushed.
    pub fn select_category(&mut self, id: &str) -> bool {
        let selected = self.categories.select(id);
        if selected {
            self.events.emit(SongbookEvent::CategoriesChanged);
        }
        selected
    }

    // ------------------------------------------------------------------
    // Songs
    // ------------------------------------------------------------------

    pub fn add_file_to_category(&mut self, category: &str, file: FileRef) -> bool {
        if !self.categories.add_file_to_category(category, file) {
            return false;
        }
        self.commit(SongbookEvent::MembersChanged {
            category: category.to_string(),
        });
        true
    }

    /// Upload a device file into the songs folder and add it to `category`.
    ///
    /// `Ok(None)` when `category` is unknown; nothing is uploaded then. A
    /// store failure is returned and leaves the category untouched.
    pub async fn upload_song(
        &mut self,
        category: &str,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Option<FileRef>> {
        if !self.categories.contains(category) {
            return Ok(None);
        }
        let file = self
            .remote
            .upload(&self.config.drive_folder_id, name, mime_type, bytes)
            .await?;
        debug!(category, id = %file.id, "song uploaded");
        self.library.insert(file.clone());
        self.add_file_to_category(category, file.clone());
        Ok(Some(file))
    }

    pub fn add_to_selected(&mut self, file: FileRef) -> bool {
        let category = self.categories.selected().to_string();
        self.add_file_to_category(&category, file)
    }

    /// Remove the card at `index` of the local or remote list of `category`.
    pub fn remove_song(&mut self, category: &str, index: usize, is_local: bool) -> bool {
        if is_local {
            let removed = self.assets.remove_at(category, index).is_some();
            if removed {
                self.events.emit(SongbookEvent::AssetsChanged {
                    category: category.to_string(),
                });
            }
            return removed;
        }
        if self.categories.remove_file_from_category(category, index).is_none() {
            return false;
        }
        self.commit(SongbookEvent::MembersChanged {
            category: category.to_string(),
        });
        true
    }

    pub fn rename_file(&mut self, category: &str, index: usize, new_name: &str) -> bool {
        if !self.categories.rename_file(category, index, new_name) {
            return false;
        }
        self.commit(SongbookEvent::MembersChanged {
            category: category.to_string(),
        });
        true
    }

    /// Add a device file to `category` for this session only.
    pub fn add_local_asset(&mut self, category: &str, name: &str, mime_type: &str, bytes: Vec<u8>) -> Option<LocalAsset> {
        if !self.categories.contains(category) {
            return None;
        }
        let asset = self.assets.add(category, name, mime_type, bytes);
        self.events.emit(SongbookEvent::AssetsChanged {
            category: category.to_string(),
        });
        Some(asset)
    }

    pub fn local_assets(&self, category: &str) -> &[LocalAsset] {
        self.assets.list(category)
    }

    /// Song list of `category`: local assets first, then remote members.
    pub fn songs(&self, category: &str) -> Vec<SongEntry> {
        let local = self.assets.list(category).iter().enumerate().map(|(index, asset)| SongEntry {
            file: asset.to_file_ref(),
            title: display_name(&asset.name).to_string(),
            is_local: true,
            index,
            handle: Some(asset.handle.clone()),
        });
        let remote = self.categories.members(category).iter().enumerate().map(|(index, file)| SongEntry {
            file: file.clone(),
            title: display_name(&file.name).to_string(),
            is_local: false,
            index,
            handle: None,
        });
        local.chain(remote).collect()
    }

    // ------------------------------------------------------------------
    // Library
    // ------------------------------------------------------------------

    pub async fn refresh_library(&mut self) -> Result<usize> {
        self.library.refresh(self.remote.as_ref()).await
    }

    pub fn search(&self, query: &str) -> Vec<&FileRef> {
        self.library.search(query)
    }

    /// Image catalog filtered by `query`, loaded on first use.
    pub async fn image_catalog(&mut self, query: &str) -> Result<Vec<ImageRef>> {
        self.library.load_images(self.remote.as_ref()).await?;
        Ok(self.library.filter_images(query).into_iter().cloned().collect())
    }

    /// Resolve a card or search hit into what the viewer should show.
    ///
    /// Local assets are read from their handle; remote chord sheets are
    /// fetched, and that read error is returned for inline display.
    pub async fn open_item(&self, file: &FileRef) -> Result<OpenedItem> {
        let local = self.assets.find(&file.id);

        match ItemKind::classify(Some(&file.mime_type), &file.name) {
            ItemKind::Folder => Ok(OpenedItem::Folder(file.clone())),
            ItemKind::Image => Ok(OpenedItem::Image {
                file: file.clone(),
                handle: local.map(|a| a.handle.clone()),
            }),
            ItemKind::ChordSheet => {
                let text = match local {
                    Some(asset) => match self.assets.allocator().resolve(&asset.handle) {
                        Some((_, bytes)) => String::from_utf8_lossy(bytes).into_owned(),
                        None => {
                            warn!(id = %asset.id, handle = %asset.handle, "local asset handle no longer resolves");
                            return Err(SongbookError::DocumentNotFound(file.id.clone()));
                        }
                    },
                    None => self.remote.get_content(&file.id).await?,
                };
                Ok(OpenedItem::Sheet(SheetViewer::open(file.clone(), text)))
            }
        }
    }

    // ------------------------------------------------------------------
    // Preferences
    // ------------------------------------------------------------------

    pub fn dark_mode(&self) -> bool {
        self.cache.dark_mode()
    }

    pub fn set_dark_mode(&mut self, enabled: bool) {
        if let Err(e) = self.cache.set_dark_mode(enabled) {
            warn!(error = %e, "failed to cache dark mode");
        }
        self.events.emit(SongbookEvent::PreferencesChanged);
    }

    pub fn toggle_dark_mode(&mut self) -> bool {
        let enabled = !self.dark_mode();
        self.set_dark_mode(enabled);
        enabled
    }

    pub fn user_roles(&self) -> BTreeMap<String, String> {
        self.cache.user_roles()
    }

    pub fn role_of(&self, email: &str) -> Option<String> {
        self.cache.user_roles().remove(email)
    }

    pub fn set_user_role(&mut self, email: &str, role: &str) {
        let mut roles = self.cache.user_roles();
        roles.insert(email.to_string(), role.to_string());
        if let Err(e) = self.cache.set_user_roles(&roles) {
            warn!(error = %e, "failed to cache user roles");
        }
        self.events.emit(SongbookEvent::PreferencesChanged);
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Release every local asset handle. Returns how many were released.
    pub fn teardown(&mut self) -> usize {
        let released = self.assets.teardown();
        if released > 0 {
            debug!(released, "session torn down");
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::remote::MemoryFileStore;
    use pretty_assertions::assert_eq;

    fn session() -> (Songbook, SnapshotWriter, Arc<MemoryFileStore>) {
        let remote = Arc::new(MemoryFileStore::new("root"));
        let cache = CacheStore::new(Box::new(MemoryCache::new()));
        let (songbook, writer) = Songbook::new(SongbookConfig::default(), remote.clone(), cache);
        (songbook, writer, remote)
    }

    #[test]
    fn test_local_songs_listed_first() {
        let (mut songbook, _writer, _) = session();
        songbook.add_file_to_category("quarta", FileRef::new("r1", "Remota.txt", "text/plain"));
        songbook.add_local_asset("quarta", "Foto.jpg", "image/jpeg", vec![1]).unwrap();

        let songs = songbook.songs("quarta");
        let titles: Vec<_> = songs.iter().map(|s| (s.title.as_str(), s.is_local, s.index)).collect();
        assert_eq!(titles, vec![("Foto", true, 0), ("Remota", false, 0)]);
    }

    #[test]
    fn test_remove_song_routes_by_origin() {
        let (mut songbook, _writer, _) = session();
        songbook.add_file_to_category("quarta", FileRef::new("r1", "Remota.txt", "text/plain"));
        songbook.add_local_asset("quarta", "Foto.jpg", "image/jpeg", vec![1]).unwrap();

        assert!(songbook.remove_song("quarta", 0, true));
        assert_eq!(songbook.songs("quarta").len(), 1);
        assert!(!songbook.remove_song("quarta", 0, true));
        assert!(songbook.remove_song("quarta", 0, false));
        assert!(songbook.songs("quarta").is_empty());
    }

    #[test]
    fn test_local_asset_needs_known_category() {
        let (mut songbook, _writer, _) = session();
        assert!(songbook.add_local_asset("nope", "a.txt", "text/plain", vec![]).is_none());
    }

    #[test]
    fn test_selection_is_not_pushed() {
        let (mut songbook, _writer, _) = session();
        assert!(songbook.select_category("quarta"));
        assert_eq!(songbook.selected_category_name(), "Quarta");
        assert_eq!(songbook.queue.latest_version(), 0);
    }

    #[tokio::test]
    async fn test_open_local_sheet_reads_handle() {
        let (mut songbook, _writer, _) = session();
        let asset = songbook
            .add_local_asset("quarta", "Hino.txt", "text/plain", b"C G".to_vec())
            .unwrap();

        match songbook.open_item(&asset.to_file_ref()).await.unwrap() {
            OpenedItem::Sheet(viewer) => assert_eq!(viewer.original(), "C G"),
            other => panic!("expected sheet, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_remote_items() {
        let (songbook, _writer, remote) = session();
        let sheet = remote.insert("root", "Hino.txt", "text/plain", "D A").unwrap();
        let image = FileRef::new("img", "capa.png", "image/png");
        let folder = FileRef::new("dir", "Pasta", crate::library::FOLDER_MIME_TYPE);

        assert!(matches!(
            songbook.open_item(&sheet).await.unwrap(),
            OpenedItem::Sheet(v) if v.original() == "D A"
        ));
        assert!(matches!(
            songbook.open_item(&image).await.unwrap(),
            OpenedItem::Image { handle: None, .. }
        ));
        assert!(matches!(songbook.open_item(&folder).await.unwrap(), OpenedItem::Folder(_)));

        remote.set_offline(true);
        assert!(songbook.open_item(&sheet).await.is_err());
    }

    #[tokio::test]
    async fn test_open_released_local_sheet_fails() {
        use crate::assets::HandleAllocator;

        let (mut songbook, _writer, _) = session();
        let asset = songbook
            .add_local_asset("quarta", "Hino.txt", "text/plain", b"C G".to_vec())
            .unwrap();
        assert!(songbook.assets.allocator_mut().release(&asset.handle));

        assert!(matches!(
            songbook.open_item(&asset.to_file_ref()).await,
            Err(SongbookError::DocumentNotFound(id)) if id == asset.id
        ));
    }

    #[tokio::test]
    async fn test_upload_song_adds_to_category_and_library() {
        let (mut songbook, _writer, remote) = session();
        let mut events = songbook.subscribe();

        let file = songbook
            .upload_song("quarta", "Carcará.txt", "text/plain", b"Am E".to_vec())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(songbook.categories().members("quarta"), &[file.clone()]);
        assert_eq!(songbook.search("carcar").len(), 1);
        assert_eq!(remote.get_content(&file.id).await.unwrap(), "Am E");
        assert_eq!(
            events.recv().await.unwrap(),
            SongbookEvent::MembersChanged { category: "quarta".into() }
        );
        assert_eq!(songbook.queue.latest_version(), 1);

        assert!(songbook.upload_song("nope", "x.txt", "", vec![]).await.unwrap().is_none());

        remote.set_offline(true);
        assert!(songbook.upload_song("quarta", "y.txt", "", vec![]).await.is_err());
        assert_eq!(songbook.categories().members("quarta").len(), 1);
    }

    #[test]
    fn test_preferences() {
        let (mut songbook, _writer, _) = session();
        assert!(!songbook.dark_mode());
        assert!(songbook.toggle_dark_mode());
        assert!(songbook.dark_mode());

        songbook.set_user_role("ana@example.com", "admin");
        assert_eq!(songbook.role_of("ana@example.com").as_deref(), Some("admin"));
        assert_eq!(songbook.role_of("bob@example.com"), None);
    }
}
