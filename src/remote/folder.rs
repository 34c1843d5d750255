//! Directory-backed [`FileStore`], used by the CLI.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use walkdir::WalkDir;

use super::{is_image, FileStore, ImagePage, ImageRef, JSON_MIME_TYPE};
use crate::category::FileRef;
use crate::error::{Result, SongbookError};

/// Files under a root directory. Folder ids and file ids are paths relative
/// to the root; `""` is the root itself and the home folder.
#[derive(Debug, Clone)]
pub struct FolderStore {
    root: PathBuf,
}

impl FolderStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a relative id, refusing anything that escapes the root.
    fn resolve(&self, id: &str) -> Result<PathBuf> {
        let relative = Path::new(id);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(SongbookError::DocumentNotFound(id.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn file_ref(&self, path: &Path) -> Option<FileRef> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let name = path.file_name()?.to_string_lossy().into_owned();
        let mime_type = guess_mime_type(&name);
        Some(FileRef::new(
            relative.to_string_lossy().replace('\\', "/"),
            name,
            mime_type,
        ))
    }

    /// Scan one directory level on the blocking pool.
    async fn files_in(&self, folder_id: &str) -> Result<Vec<FileRef>> {
        let dir = self.resolve(folder_id)?;
        let store = self.clone();
        let scan = tokio::task::spawn_blocking(move || {
            let mut files: Vec<FileRef> = WalkDir::new(&dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter_map(|e| store.file_ref(e.path()))
                .collect();
            files.sort_by(|a, b| a.name.cmp(&b.name));
            files
        });
        scan.await
            .map_err(|e| SongbookError::RemoteStore(format!("folder scan failed: {}", e)))
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

/// Extension-based MIME type for the file kinds a songbook holds
pub fn guess_mime_type(name: &str) -> &'static str {
    let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("txt") | Some("chord") | Some("cho") => "text/plain",
        Some("json") => JSON_MIME_TYPE,
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl FileStore for FolderStore {
    async fn list(&self, folder_id: &str) -> Result<Vec<FileRef>> {
        self.files_in(folder_id).await
    }

    async fn list_images_page(&self, folder_id: &str, _page_token: Option<&str>) -> Result<ImagePage> {
        let images = self
            .files_in(folder_id)
            .await?
            .into_iter()
            .filter(|f| is_image(&f.mime_type))
            .map(|file| ImageRef {
                file,
                thumbnail_link: None,
            })
            .collect();
        Ok(ImagePage {
            images,
            next_page_token: None,
        })
    }

    async fn get_content(&self, file_id: &str) -> Result<String> {
        let path = self.resolve(file_id)?;
        if !is_file(&path).await {
            return Err(SongbookError::DocumentNotFound(file_id.to_string()));
        }
        Ok(fs::read_to_string(path).await?)
    }

    async fn upload(&self, folder_id: &str, name: &str, _mime_type: &str, bytes: Vec<u8>) -> Result<FileRef> {
        let dir = self.resolve(folder_id)?;
        fs::create_dir_all(&dir).await?;
        let path = dir.join(name);
        fs::write(&path, bytes).await?;
        self.file_ref(&path)
            .ok_or_else(|| SongbookError::RemoteStore(format!("cannot address {}", path.display())))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<FileRef>> {
        let path = self.resolve(name)?;
        Ok(if is_file(&path).await { self.file_ref(&path) } else { None })
    }

    async fn create_json_document(&self, name: &str, body: &serde_json::Value) -> Result<String> {
        let path = self.resolve(name)?;
        fs::write(&path, serde_json::to_string_pretty(body)?).await?;
        Ok(name.to_string())
    }

    async fn update_json_document(&self, id: &str, body: &serde_json::Value) -> Result<()> {
        let path = self.resolve(id)?;
        if !is_file(&path).await {
            return Err(SongbookError::DocumentNotFound(id.to_string()));
        }
        fs::write(&path, serde_json::to_string_pretty(body)?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::list_all_images;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_folder_store_lists_and_reads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Asa Branca.txt"), "C F G").unwrap();
        std::fs::write(dir.path().join("capa.JPG"), [0u8, 1, 2]).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("hidden.txt"), "x").unwrap();

        let store = FolderStore::new(dir.path());
        let files = store.list("").await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Asa Branca.txt", "capa.JPG"]);
        assert_eq!(files[1].mime_type, "image/jpeg");

        assert_eq!(store.get_content("Asa Branca.txt").await.unwrap(), "C F G");
        assert_eq!(store.get_content("sub/hidden.txt").await.unwrap(), "x");
        assert!(store.get_content("../etc/passwd").await.is_err());
        assert!(matches!(
            store.get_content("missing.txt").await,
            Err(SongbookError::DocumentNotFound(_))
        ));

        let images = list_all_images(&store, "").await.unwrap();
        assert_eq!(images.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_folder_store_from_worker_threads() {
        let dir = tempfile::tempdir().unwrap();
        let store = FolderStore::new(dir.path());

        let uploaded = store
            .upload("capas", "natal.png", "image/png", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(uploaded.id, "capas/natal.png");
        assert_eq!(uploaded.mime_type, "image/png");

        let listings: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.list("capas").await })
            })
            .collect();
        for listing in listings {
            assert_eq!(listing.await.unwrap().unwrap(), vec![uploaded.clone()]);
        }
    }

    #[tokio::test]
    async fn test_folder_store_json_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FolderStore::new(dir.path());
        assert!(store.find_by_name("app-data.json").await.unwrap().is_none());

        let id = store
            .create_json_document("app-data.json", &serde_json::json!({ "updatedAt": "x" }))
            .await
            .unwrap();
        assert_eq!(id, "app-data.json");
        assert!(store.find_by_name("app-data.json").await.unwrap().is_some());
        store
            .update_json_document(&id, &serde_json::json!({ "updatedAt": "y" }))
            .await
            .unwrap();
        assert!(store.get_content(&id).await.unwrap().contains("\"y\""));
    }
}
