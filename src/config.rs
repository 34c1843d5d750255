//! Songbook configuration, read from YAML.
//!
//! ```yaml
//! drive-folder-id: 1AbCdEf
//! images-folder-id: 9XyZ      # optional, defaults to drive-folder-id
//! snapshot-name: app-data.json
//! search-limit: 10
//! log-filter: songbook=info
//! fixed-categories:
//!   - { id: domingo-manha, name: "Domingo - Manhã" }
//!   - { id: quarta, name: Quarta }
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::category::FixedCategory;
use crate::error::{Result, SongbookError};

pub const DEFAULT_SNAPSHOT_NAME: &str = "app-data.json";
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const DEFAULT_LOG_FILTER: &str = "songbook=info";

/// Raw configuration as written in YAML
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    drive_folder_id: Option<String>,
    images_folder_id: Option<String>,
    snapshot_name: Option<String>,
    fixed_categories: Option<Vec<FixedCategory>>,
    search_limit: Option<usize>,
    log_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongbookConfig {
    pub drive_folder_id: String,
    pub images_folder_id: Option<String>,
    pub snapshot_name: String,
    pub fixed_categories: Vec<FixedCategory>,
    pub search_limit: usize,
    pub log_filter: String,
}

pub fn default_fixed_categories() -> Vec<FixedCategory> {
    vec![
        FixedCategory::new("domingo-manha", "Domingo - Manhã"),
        FixedCategory::new("domingo-noite", "Domingo - Noite"),
        FixedCategory::new("segunda", "Segunda"),
        FixedCategory::new("quarta", "Quarta"),
    ]
}

impl Default for SongbookConfig {
    fn default() -> Self {
        Self {
            drive_folder_id: String::new(),
            images_folder_id: None,
            snapshot_name: DEFAULT_SNAPSHOT_NAME.to_string(),
            fixed_categories: default_fixed_categories(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl SongbookConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let raw: Option<RawConfig> = serde_yaml::from_str(content)?;
        let raw = raw.unwrap_or_default();
        let defaults = Self::default();

        let config = Self {
            drive_folder_id: raw.drive_folder_id.unwrap_or(defaults.drive_folder_id),
            images_folder_id: raw.images_folder_id.filter(|id| !id.trim().is_empty()),
            snapshot_name: raw.snapshot_name.unwrap_or(defaults.snapshot_name),
            fixed_categories: raw.fixed_categories.unwrap_or(defaults.fixed_categories),
            search_limit: raw.search_limit.unwrap_or(defaults.search_limit),
            log_filter: raw.log_filter.unwrap_or(defaults.log_filter),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`; a missing file gives the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::from_yaml(&fs::read_to_string(path)?)
    }

    /// Folder the image catalog is read from
    pub fn images_folder(&self) -> &str {
        self.images_folder_id.as_deref().unwrap_or(&self.drive_folder_id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fixed_categories.is_empty() {
            return Err(SongbookError::Config(
                "fixed-categories must name at least one category".to_string(),
            ));
        }
        if let Some(blank) = self.fixed_categories.iter().find(|c| c.id.trim().is_empty()) {
            return Err(SongbookError::Config(format!(
                "fixed category {:?} has an empty id",
                blank.name
            )));
        }
        for (i, category) in self.fixed_categories.iter().enumerate() {
            if self.fixed_categories[..i].iter().any(|c| c.id == category.id) {
                return Err(SongbookError::Config(format!(
                    "duplicate fixed category id: {}",
                    category.id
                )));
            }
        }
        if self.snapshot_name.trim().is_empty() {
            return Err(SongbookError::Config("snapshot-name is empty".to_string()));
        }
        Ok(())
    }
}
