//! # Ephemeral Local Asset Registry
//!
//! Files the user adds from their own device during a session. They are never
//! uploaded or persisted; each one is shown through a display handle (an
//! object URL in the browser) that must be released when the asset goes away.
//!
//! The registry owns every handle it allocates and releases it on each removal
//! path: [`LocalAssetRegistry::remove`], [`LocalAssetRegistry::remove_at`],
//! [`LocalAssetRegistry::remove_category`], [`LocalAssetRegistry::teardown`]
//! and `Drop`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::category::{FileRef, DEFAULT_MIME_TYPE};

/// Opaque display handle, e.g. `blob:songbook/3`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DisplayHandle(String);

impl DisplayHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of display handles
pub trait HandleAllocator {
    fn allocate(&mut self, bytes: Vec<u8>, mime_type: &str) -> DisplayHandle;

    /// Release a handle. Returns `false` if it was not live.
    fn release(&mut self, handle: &DisplayHandle) -> bool;
}

/// In-process object URL table: handle to bytes.
#[derive(Debug, Default)]
pub struct ObjectUrls {
    next: u64,
    live: HashMap<DisplayHandle, (String, Vec<u8>)>,
}

impl ObjectUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// MIME type and bytes behind a live handle
    pub fn resolve(&self, handle: &DisplayHandle) -> Option<(&str, &[u8])> {
        self.live
            .get(handle)
            .map(|(mime, bytes)| (mime.as_str(), bytes.as_slice()))
    }
}

impl HandleAllocator for ObjectUrls {
    fn allocate(&mut self, bytes: Vec<u8>, mime_type: &str) -> DisplayHandle {
        self.next += 1;
        let handle = DisplayHandle(format!("blob:songbook/{}", self.next));
        self.live.insert(handle.clone(), (mime_type.to_string(), bytes));
        handle
    }

    fn release(&mut self, handle: &DisplayHandle) -> bool {
        self.live.remove(handle).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalAsset {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub handle: DisplayHandle,
}

impl LocalAsset {
    /// The asset as a file reference, for listing beside remote members.
    pub fn to_file_ref(&self) -> FileRef {
        FileRef::new(self.id.clone(), self.name.clone(), self.mime_type.clone())
    }
}

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `local-<unix millis>-<9 random base36 chars>`. Unique enough for one
/// session, not a guarantee.
pub fn new_asset_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("local-{}-{}", Utc::now().timestamp_millis(), suffix)
}

pub struct LocalAssetRegistry<A: HandleAllocator = ObjectUrls> {
    allocator: A,
    assets: BTreeMap<String, Vec<LocalAsset>>,
}

impl LocalAssetRegistry<ObjectUrls> {
    pub fn new() -> Self {
        Self::with_allocator(ObjectUrls::new())
    }
}

impl Default for LocalAssetRegistry<ObjectUrls> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: HandleAllocator> LocalAssetRegistry<A> {
    pub fn with_allocator(allocator: A) -> Self {
        Self {
            allocator,
            assets: BTreeMap::new(),
        }
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    #[cfg(test)]
    pub(crate) fn allocator_mut(&mut self) -> &mut A {
        &mut self.allocator
    }

    /// Register a file under `category` with a fresh handle and id.
    pub fn add(&mut self, category: &str, name: &str, mime_type: &str, bytes: Vec<u8>) -> LocalAsset {
        let mime_type = if mime_type.is_empty() { DEFAULT_MIME_TYPE } else { mime_type };
        let handle = self.allocator.allocate(bytes, mime_type);
        let asset = LocalAsset {
            id: new_asset_id(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            handle,
        };
        debug!(category, id = %asset.id, handle = %asset.handle, "local asset added");
        self.assets
            .entry(category.to_string())
            .or_default()
            .push(asset.clone());
        asset
    }

    /// Assets of `category` in insertion order
    pub fn list(&self, category: &str) -> &[LocalAsset] {
        self.assets.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Categories that currently hold at least one asset
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    /// Look an asset up by id in any category.
    pub fn find(&self, asset_id: &str) -> Option<&LocalAsset> {
        self.assets.values().flatten().find(|a| a.id == asset_id)
    }

    pub fn len(&self) -> usize {
        self.assets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release and drop the asset with `asset_id`.
    pub fn remove(&mut self, category: &str, asset_id: &str) -> bool {
        let index = self
            .assets
            .get(category)
            .and_then(|list| list.iter().position(|a| a.id == asset_id));
        match index {
            Some(index) => self.remove_at(category, index).is_some(),
            None => false,
        }
    }

    /// Release and drop the asset at `index`; out of range does nothing.
    pub fn remove_at(&mut self, category: &str, index: usize) -> Option<LocalAsset> {
        let list = self.assets.get_mut(category)?;
        if index >= list.len() {
            return None;
        }
        let asset = list.remove(index);
        if list.is_empty() {
            self.assets.remove(category);
        }
        self.allocator.release(&asset.handle);
        debug!(category, id = %asset.id, "local asset released");
        Some(asset)
    }

    /// Release every asset of `category`. Returns how many were released.
    pub fn remove_category(&mut self, category: &str) -> usize {
        let Some(list) = self.assets.remove(category) else {
            return 0;
        };
        for asset in &list {
            self.allocator.release(&asset.handle);
        }
        debug!(category, released = list.len(), "local assets of category released");
        list.len()
    }

    /// Release everything. Returns how many were released.
    pub fn teardown(&mut self) -> usize {
        let categories: Vec<String> = self.assets.keys().cloned().collect();
        categories
            .iter()
            .map(|category| self.remove_category(category))
            .sum()
    }
}

impl<A: HandleAllocator> Drop for LocalAssetRegistry<A> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Allocator that records releases in a log shared with the test
    #[derive(Default, Clone)]
    struct Recording {
        next: u64,
        released: Rc<RefCell<Vec<String>>>,
    }

    impl HandleAllocator for Recording {
        fn allocate(&mut self, _bytes: Vec<u8>, _mime_type: &str) -> DisplayHandle {
            self.next += 1;
            DisplayHandle::new(format!("h{}", self.next))
        }

        fn release(&mut self, handle: &DisplayHandle) -> bool {
            self.released.borrow_mut().push(handle.to_string());
            true
        }
    }

    #[test]
    fn test_asset_id_format() {
        let id = new_asset_id();
        let parts: Vec<_> = id.splitn(3, '-').collect();
        assert_eq!(parts[0], "local");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(new_asset_id(), new_asset_id());
    }

    #[test]
    fn test_list_keeps_insertion_order() {
        let mut registry = LocalAssetRegistry::new();
        registry.add("quarta", "b.jpg", "image/jpeg", vec![1]);
        registry.add("quarta", "a.jpg", "image/jpeg", vec![2]);
        registry.add("segunda", "c.txt", "", b"C G".to_vec());

        let names: Vec<_> = registry.list("quarta").iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["b.jpg", "a.jpg"]);
        assert_eq!(registry.list("segunda")[0].mime_type, "text/plain");
        assert!(registry.list("domingo").is_empty());
        assert_eq!(registry.allocator().live_count(), 3);
    }

    #[test]
    fn test_remove_releases_handle() {
        let mut registry = LocalAssetRegistry::new();
        let asset = registry.add("quarta", "capa.png", "image/png", vec![9, 9]);
        assert_eq!(
            registry.allocator().resolve(&asset.handle),
            Some(("image/png", &[9u8, 9][..]))
        );

        assert_eq!(registry.find(&asset.id), Some(&asset));
        assert!(registry.remove("quarta", &asset.id));
        assert!(registry.find(&asset.id).is_none());
        assert!(!registry.remove("quarta", &asset.id));
        assert_eq!(registry.allocator().live_count(), 0);
        assert!(registry.allocator().resolve(&asset.handle).is_none());
    }

    #[test]
    fn test_remove_at_out_of_range() {
        let mut registry = LocalAssetRegistry::new();
        registry.add("quarta", "a.txt", "text/plain", vec![]);
        assert!(registry.remove_at("quarta", 5).is_none());
        assert!(registry.remove_at("outra", 0).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_bulk_category_removal_releases_all() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let mut registry = LocalAssetRegistry::with_allocator(Recording {
            next: 0,
            released: released.clone(),
        });
        registry.add("natal", "1.jpg", "image/jpeg", vec![]);
        registry.add("natal", "2.jpg", "image/jpeg", vec![]);
        registry.add("quarta", "3.jpg", "image/jpeg", vec![]);

        assert_eq!(registry.remove_category("natal"), 2);
        assert_eq!(*released.borrow(), vec!["h1", "h2"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_drop_releases_everything() {
        let released = Rc::new(RefCell::new(Vec::new()));
        {
            let mut registry = LocalAssetRegistry::with_allocator(Recording {
                next: 0,
                released: released.clone(),
            });
            registry.add("natal", "1.jpg", "image/jpeg", vec![]);
            registry.add("quarta", "2.jpg", "image/jpeg", vec![]);
        }
        assert_eq!(released.borrow().len(), 2);
    }

    #[test]
    fn test_teardown_then_drop_releases_once() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let mut registry = LocalAssetRegistry::with_allocator(Recording {
            next: 0,
            released: released.clone(),
        });
        registry.add("natal", "1.jpg", "image/jpeg", vec![]);
        assert_eq!(registry.teardown(), 1);
        assert!(registry.is_empty());
        drop(registry);
        assert_eq!(released.borrow().len(), 1);
    }
}
