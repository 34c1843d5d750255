//! # Category Store
//!
//! In-memory model of the songbook's categories and their members.
//!
//! ## Kinds of Category
//! - **Fixed**: built in (from configuration), always present, never deleted,
//!   private unless overridden
//! - **Custom**: created by the user, newest first, deletable
//!
//! Custom categories and visibility overrides share one record list, the same
//! list that is cached locally and synced as `customCategories`. A record whose
//! id equals a fixed category's id is an override of that category's
//! `isPublic` flag, not a category of its own.
//!
//! Membership (`cifrasPorCategoria`) maps a category id to an ordered list of
//! [`FileRef`]s pointing into the remote file store.
//!
//! Mutations that name an unknown category do nothing and report it through
//! their return value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SongbookError};

pub const DEFAULT_MIME_TYPE: &str = "text/plain";

fn default_mime_type() -> String {
    DEFAULT_MIME_TYPE.to_string()
}

/// Pointer to a file owned by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub id: String,
    pub name: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

impl FileRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// A built-in category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedCategory {
    pub id: String,
    pub name: String,
}

impl FixedCategory {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Persisted record: a custom category or a fixed-category override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Fixed,
    Custom,
}

/// Resolved view of one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub is_public: bool,
    pub kind: CategoryKind,
    pub members: Vec<FileRef>,
}

/// Derive a category id from its display name: trimmed, lowercased,
/// whitespace runs replaced by `-`.
///
/// ```
/// use songbook::slugify;
///
/// assert_eq!(slugify("My Songs"), "my-songs");
/// assert_eq!(slugify("  Culto   de Jovens "), "culto-de-jovens");
/// ```
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Clone)]
pub struct CategoryStore {
    fixed: Vec<FixedCategory>,
    records: Vec<CategoryRecord>,
    members: BTreeMap<String, Vec<FileRef>>,
    selected: String,
}

impl CategoryStore {
    /// Empty store over the given fixed categories. The first one is the
    /// default selection.
    pub fn new(fixed: Vec<FixedCategory>) -> Self {
        Self::with_state(fixed, Vec::new(), BTreeMap::new())
    }

    /// Store seeded from persisted records and membership.
    pub fn with_state(
        fixed: Vec<FixedCategory>,
        records: Vec<CategoryRecord>,
        members: BTreeMap<String, Vec<FileRef>>,
    ) -> Self {
        let selected = fixed.first().map(|c| c.id.clone()).unwrap_or_default();
        Self {
            fixed,
            records,
            members,
            selected,
        }
    }

    fn default_category(&self) -> String {
        self.fixed.first().map(|c| c.id.clone()).unwrap_or_default()
    }

    fn is_fixed(&self, id: &str) -> bool {
        self.fixed.iter().any(|c| c.id == id)
    }

    pub fn fixed_categories(&self) -> &[FixedCategory] {
        &self.fixed
    }

    /// Custom categories, newest first (overrides excluded)
    pub fn custom_categories(&self) -> impl Iterator<Item = &CategoryRecord> {
        self.records.iter().filter(move |r| !self.is_fixed(&r.id))
    }

    /// Every persisted record, overrides included, in stored order
    pub fn records(&self) -> &[CategoryRecord] {
        &self.records
    }

    pub fn membership(&self) -> &BTreeMap<String, Vec<FileRef>> {
        &self.members
    }

    pub fn contains(&self, id: &str) -> bool {
        self.is_fixed(id) || self.custom_categories().any(|r| r.id == id)
    }

    /// Visibility of a category, consulting overrides before the fixed default.
    pub fn is_public(&self, id: &str) -> Option<bool> {
        if let Some(record) = self.records.iter().find(|r| r.id == id) {
            return Some(record.is_public);
        }
        self.is_fixed(id).then_some(false)
    }

    /// All categories: fixed first, then custom newest first.
    pub fn categories(&self) -> Vec<Category> {
        let fixed = self.fixed.iter().map(|c| (c.id.as_str(), c.name.as_str(), CategoryKind::Fixed));
        let custom = self
            .custom_categories()
            .map(|r| (r.id.as_str(), r.name.as_str(), CategoryKind::Custom));

        fixed
            .chain(custom)
            .map(|(id, name, kind)| Category {
                id: id.to_string(),
                name: name.to_string(),
                is_public: self.is_public(id).unwrap_or(false),
                kind,
                members: self.members(id).to_vec(),
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Category> {
        self.categories().into_iter().find(|c| c.id == id)
    }

    /// Display name for an id; unknown ids fall back to the id itself.
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        if let Some(fixed) = self.fixed.iter().find(|c| c.id == id) {
            return &fixed.name;
        }
        self.custom_categories()
            .find(|r| r.id == id)
            .map(|r| r.name.as_str())
            .unwrap_or(id)
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    /// Select a category. Unknown ids are ignored.
    pub fn select(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.selected = id.to_string();
        true
    }

    /// Create a custom category, put it first and select it. Returns the new id.
    ///
    /// Rejects names that are blank or whose id is already taken by a fixed or
    /// custom category.
    pub fn add_category(&mut self, name: &str) -> Result<String> {
        let name = name.trim();
        let id = slugify(name);
        if id.is_empty() {
            return Err(SongbookError::InvalidName(name.to_string()));
        }
        if self.contains(&id) {
            return Err(SongbookError::CategoryExists(id));
        }

        self.records.insert(
            0,
            CategoryRecord {
                id: id.clone(),
                name: name.to_string(),
                is_public: false,
            },
        );
        self.selected = id.clone();
        Ok(id)
    }

    /// Delete a custom category and its membership list. Fixed categories
    /// cannot be deleted. If it was selected, selection returns to the first
    /// fixed category.
    pub fn delete_category(&mut self, id: &str) -> bool {
        if self.is_fixed(id) {
            return false;
        }
        let Some(index) = self.records.iter().position(|r| r.id == id) else {
            return false;
        };

        self.records.remove(index);
        self.members.remove(id);
        if self.selected == id {
            self.selected = self.default_category();
        }
        true
    }

    /// Flip `isPublic`, returning the new value. For a fixed category this
    /// creates or updates its override record.
    pub fn toggle_visibility(&mut self, id: &str) -> Option<bool> {
        if let Some(record) = self.records.iter_mut().find(|r| r.id == id) {
            record.is_public = !record.is_public;
            return Some(record.is_public);
        }

        let fixed = self.fixed.iter().find(|c| c.id == id)?;
        self.records.push(CategoryRecord {
            id: fixed.id.clone(),
            name: fixed.name.clone(),
            is_public: true,
        });
        Some(true)
    }

    pub fn members(&self, category: &str) -> &[FileRef] {
        self.members.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append `file` unless a member with the same id is already there.
    pub fn add_file_to_category(&mut self, category: &str, file: FileRef) -> bool {
        if !self.contains(category) {
            return false;
        }
        let list = self.members.entry(category.to_string()).or_default();
        if list.iter().any(|f| f.id == file.id) {
            return false;
        }

        let mime_type = if file.mime_type.is_empty() {
            default_mime_type()
        } else {
            file.mime_type
        };
        list.push(FileRef { mime_type, ..file });
        true
    }

    /// Remove the member at `index`; out-of-range indexes do nothing.
    pub fn remove_file_from_category(&mut self, category: &str, index: usize) -> Option<FileRef> {
        let list = self.members.get_mut(category)?;
        if index >= list.len() {
            return None;
        }
        Some(list.remove(index))
    }

    /// Change a member's display name (the remote file keeps its own name).
    pub fn rename_file(&mut self, category: &str, index: usize, new_name: &str) -> bool {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return false;
        }
        match self.members.get_mut(category).and_then(|list| list.get_mut(index)) {
            Some(file) => {
                file.name = new_name.to_string();
                true
            }
            None => false,
        }
    }

    /// Replace every record, as when merging a remote snapshot.
    pub fn replace_records(&mut self, records: Vec<CategoryRecord>) {
        self.records = records;
        self.reset_selection_if_gone();
    }

    /// Replace all membership lists, as when merging a remote snapshot.
    pub fn replace_membership(&mut self, members: BTreeMap<String, Vec<FileRef>>) {
        self.members = members;
    }

    fn reset_selection_if_gone(&mut self) {
        if !self.contains(&self.selected) {
            self.selected = self.default_category();
        }
    }
}
