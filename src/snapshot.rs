//! The single JSON document that carries categories and membership between
//! devices.
//!
//! ```json
//! {
//!   "customCategories": [{ "id": "natal", "name": "Natal", "isPublic": false }],
//!   "cifrasPorCategoria": { "natal": [{ "id": "1AbC", "name": "Noite Feliz.txt", "mimeType": "text/plain" }] },
//!   "updatedAt": "2026-10-19T12:00:00.000Z"
//! }
//! ```
//!
//! There is no schema version. Unknown keys are ignored on read, and a key that
//! is missing or `null` leaves the matching local state alone when merged.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::category::{CategoryRecord, CategoryStore, FileRef};
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_categories: Option<Vec<CategoryRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cifras_por_categoria: Option<BTreeMap<String, Vec<FileRef>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl RemoteSnapshot {
    /// Full copy of the store's persisted state, stamped with `now`.
    pub fn capture(store: &CategoryStore, now: DateTime<Utc>) -> Self {
        Self {
            custom_categories: Some(store.records().to_vec()),
            cifras_por_categoria: Some(store.membership().clone()),
            updated_at: Some(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// `updatedAt` parsed, if present and well formed
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.updated_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Field-level overwrite: each field present here replaces the store's
    /// corresponding state wholesale. Returns whether anything was applied.
    pub fn merge_into(&self, store: &mut CategoryStore) -> bool {
        let mut applied = false;
        if let Some(records) = &self.custom_categories {
            store.replace_records(records.clone());
            applied = true;
        }
        if let Some(members) = &self.cifras_por_categoria {
            store.replace_membership(members.clone());
            applied = true;
        }
        applied
    }
}
