//! Remote library: the song listing and image catalog of the configured
//! folders, cached for the session, with the quick search the sidebar uses.

use serde::Serialize;

use crate::category::FileRef;
use crate::error::Result;
use crate::remote::{list_all_images, FileStore, ImageRef};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// How an opened item is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    Folder,
    Image,
    ChordSheet,
}

impl ItemKind {
    /// Route by stored MIME type first, then by file extension.
    pub fn classify(mime_type: Option<&str>, name: &str) -> Self {
        if mime_type == Some(FOLDER_MIME_TYPE) {
            return ItemKind::Folder;
        }
        let image_mime = mime_type.map_or(false, |m| m.contains("image"));
        let image_ext = name
            .rsplit_once('.')
            .map_or(false, |(_, ext)| IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)));
        if image_mime || image_ext {
            ItemKind::Image
        } else {
            ItemKind::ChordSheet
        }
    }
}

/// File name without its last extension: `"Asa Branca.txt"` → `"Asa Branca"`.
pub fn display_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() && !name[dot + 1..].contains('/') => &name[..dot],
        _ => name,
    }
}

fn matches(name: &str, needle: &str) -> bool {
    name.to_lowercase().contains(needle)
}

#[derive(Debug, Clone)]
pub struct Library {
    folder_id: String,
    images_folder_id: String,
    search_limit: usize,
    files: Vec<FileRef>,
    images: Option<Vec<ImageRef>>,
}

impl Library {
    pub fn new(folder_id: impl Into<String>, images_folder_id: impl Into<String>, search_limit: usize) -> Self {
        Self {
            folder_id: folder_id.into(),
            images_folder_id: images_folder_id.into(),
            search_limit,
            files: Vec::new(),
            images: None,
        }
    }

    /// Reload the song listing. On error the previous listing is kept.
    pub async fn refresh(&mut self, store: &dyn FileStore) -> Result<usize> {
        let files = store.list(&self.folder_id).await?;
        tracing::debug!(folder = %self.folder_id, count = files.len(), "library listing refreshed");
        self.files = files;
        Ok(self.files.len())
    }

    pub fn files(&self) -> &[FileRef] {
        &self.files
    }

    /// Add a file uploaded during the session. Returns `false` when the
    /// listing already has it.
    pub fn insert(&mut self, file: FileRef) -> bool {
        if self.files.iter().any(|f| f.id == file.id) {
            return false;
        }
        self.files.push(file);
        true
    }

    /// Image catalog, fetched once (all pages) and then served from memory.
    pub async fn load_images(&mut self, store: &dyn FileStore) -> Result<&[ImageRef]> {
        if self.images.is_none() {
            let images = list_all_images(store, &self.images_folder_id).await?;
            tracing::debug!(folder = %self.images_folder_id, count = images.len(), "image catalog loaded");
            self.images = Some(images);
        }
        Ok(self.images.as_deref().unwrap_or(&[]))
    }

    /// Forget the image catalog so the next load refetches it.
    pub fn invalidate_images(&mut self) {
        self.images = None;
    }

    /// Songs whose name contains `query` (case-insensitive), at most
    /// `search_limit` of them. A blank query finds nothing.
    pub fn search(&self, query: &str) -> Vec<&FileRef> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.files
            .iter()
            .filter(|f| matches(&f.name, &needle))
            .take(self.search_limit)
            .collect()
    }

    /// Cached images whose name contains `query`; a blank query keeps all.
    pub fn filter_images(&self, query: &str) -> Vec<&ImageRef> {
        let needle = query.trim().to_lowercase();
        self.images
            .iter()
            .flatten()
            .filter(|img| matches(&img.file.name, &needle))
            .collect()
    }
}
