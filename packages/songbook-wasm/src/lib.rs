//! Browser bindings.
//!
//! ```javascript
//! import init, { transposeHtml, Session } from './pkg/songbook_wasm.js';
//!
//! await init();
//! viewer.innerHTML = transposeHtml(text, 2);
//!
//! const session = new Session(null, localStorage.customCategories, localStorage.cifrasPorCategoria);
//! session.addCategory('Natal');
//! await drive.updateJsonDocument(docId, session.snapshotJson());
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use songbook::{CategoryRecord, CategoryStore, FileRef, RemoteSnapshot, SongbookConfig, SongbookError};
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct BindingError {
    kind: &'static str,
    message: String,
}

fn to_js_error(e: SongbookError) -> JsValue {
    let kind = match &e {
        SongbookError::NotAuthenticated => "notAuthenticated",
        SongbookError::RemoteStore(_) => "remoteStore",
        SongbookError::DocumentNotFound(_) => "documentNotFound",
        SongbookError::Serialization(_) => "serialization",
        SongbookError::Config(_) => "config",
        SongbookError::CategoryExists(_) => "categoryExists",
        SongbookError::InvalidName(_) => "invalidName",
        SongbookError::Io(_) => "io",
    };
    let error = BindingError {
        kind,
        message: e.to_string(),
    };
    let json = serde_json::to_string(&error).unwrap_or_else(|_| error.message.clone());
    JsValue::from_str(&json)
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Transpose one chord symbol
#[wasm_bindgen(js_name = transposeNote)]
pub fn transpose_note(token: &str, shift: i32) -> String {
    songbook::transpose_note(token, shift)
}

/// Transposed sheet as plain text
#[wasm_bindgen(js_name = transposeText)]
pub fn transpose_text(text: &str, shift: i32) -> String {
    songbook::transpose_text(text, shift)
}

/// Transposed sheet as span-annotated HTML for a `white-space: pre` container
#[wasm_bindgen(js_name = transposeHtml)]
pub fn transpose_html(text: &str, shift: i32) -> String {
    songbook::transpose_html(text, shift)
}

/// Markup-agnostic render: `{ shift, segments: [{ kind, text, original?, offset? }] }`
#[wasm_bindgen(js_name = renderSheet)]
pub fn render_sheet(text: &str, shift: i32) -> Result<JsValue, JsValue> {
    to_js(&songbook::render(text, shift))
}

#[wasm_bindgen(js_name = shiftLabel)]
pub fn shift_label(shift: i32) -> String {
    songbook::shift_label(shift)
}

/// Note reference bar for image sheets: `[{ from, to }]`, empty at shift 0
#[wasm_bindgen(js_name = noteMap)]
pub fn note_map(shift: i32) -> Result<JsValue, JsValue> {
    to_js(&songbook::note_map(shift))
}

#[wasm_bindgen]
pub fn slugify(name: &str) -> String {
    songbook::slugify(name)
}

/// Category state of one page load.
///
/// Persistence and remote I/O stay in JavaScript; the session hands back the
/// JSON to write after each mutation.
#[wasm_bindgen]
pub struct Session {
    store: CategoryStore,
}

#[wasm_bindgen]
impl Session {
    /// `config_yaml` may be null for the default fixed categories. The other
    /// two arguments are the cached `customCategories` and
    /// `cifrasPorCategoria` blobs; missing or corrupt blobs start empty.
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_yaml: Option<String>,
        custom_categories: Option<String>,
        membership: Option<String>,
    ) -> Result<Session, JsValue> {
        let config = match config_yaml {
            Some(yaml) => SongbookConfig::from_yaml(&yaml).map_err(to_js_error)?,
            None => SongbookConfig::default(),
        };
        let records: Vec<CategoryRecord> = custom_categories
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();
        let members: BTreeMap<String, Vec<FileRef>> = membership
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();

        Ok(Session {
            store: CategoryStore::with_state(config.fixed_categories, records, members),
        })
    }

    pub fn categories(&self) -> Result<JsValue, JsValue> {
        to_js(&self.store.categories())
    }

    pub fn selected(&self) -> String {
        self.store.selected().to_string()
    }

    #[wasm_bindgen(js_name = selectedName)]
    pub fn selected_name(&self) -> String {
        self.store.name_of(self.store.selected()).to_string()
    }

    pub fn select(&mut self, id: &str) -> bool {
        self.store.select(id)
    }

    #[wasm_bindgen(js_name = addCategory)]
    pub fn add_category(&mut self, name: &str) -> Result<String, JsValue> {
        self.store.add_category(name).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = deleteCategory)]
    pub fn delete_category(&mut self, id: &str) -> bool {
        self.store.delete_category(id)
    }

    #[wasm_bindgen(js_name = toggleVisibility)]
    pub fn toggle_visibility(&mut self, id: &str) -> Option<bool> {
        self.store.toggle_visibility(id)
    }

    pub fn members(&self, category: &str) -> Result<JsValue, JsValue> {
        to_js(&self.store.members(category))
    }

    #[wasm_bindgen(js_name = addFile)]
    pub fn add_file(&mut self, category: &str, id: &str, name: &str, mime_type: Option<String>) -> bool {
        let file = FileRef::new(id, name, mime_type.unwrap_or_default());
        self.store.add_file_to_category(category, file)
    }

    #[wasm_bindgen(js_name = removeFile)]
    pub fn remove_file(&mut self, category: &str, index: usize) -> bool {
        self.store.remove_file_from_category(category, index).is_some()
    }

    #[wasm_bindgen(js_name = renameFile)]
    pub fn rename_file(&mut self, category: &str, index: usize, new_name: &str) -> bool {
        self.store.rename_file(category, index, new_name)
    }

    /// Cache blob for `customCategories`
    #[wasm_bindgen(js_name = customCategoriesJson)]
    pub fn custom_categories_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.store.records()).map_err(|e| to_js_error(e.into()))
    }

    /// Cache blob for `cifrasPorCategoria`
    #[wasm_bindgen(js_name = membershipJson)]
    pub fn membership_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.store.membership()).map_err(|e| to_js_error(e.into()))
    }

    /// Full remote snapshot document, stamped now
    #[wasm_bindgen(js_name = snapshotJson)]
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        let snapshot = RemoteSnapshot::capture(&self.store, chrono::Utc::now());
        serde_json::to_string(&snapshot).map_err(|e| to_js_error(e.into()))
    }

    /// Merge a pulled snapshot document. Returns whether anything changed.
    #[wasm_bindgen(js_name = mergeSnapshot)]
    pub fn merge_snapshot(&mut self, json: &str) -> Result<bool, JsValue> {
        let snapshot = RemoteSnapshot::from_json(json).map_err(to_js_error)?;
        Ok(snapshot.merge_into(&mut self.store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_roundtrips_cache_blobs() {
        let mut session = Session::new(None, None, None).unwrap_or_else(|_| panic!("session"));
        let id = session.add_category("Natal").unwrap_or_else(|_| panic!("add"));
        assert!(session.add_file(&id, "f1", "Noite Feliz.txt", None));

        let records = session.custom_categories_json().unwrap_or_default();
        let members = session.membership_json().unwrap_or_default();
        let restored = Session::new(None, Some(records), Some(members)).unwrap_or_else(|_| panic!("restore"));
        assert_eq!(restored.store.members("natal")[0].mime_type, "text/plain");
    }

    #[test]
    fn test_corrupt_cache_starts_empty() {
        let session = Session::new(None, Some("{oops".into()), None).unwrap_or_else(|_| panic!("session"));
        assert_eq!(session.store.custom_categories().count(), 0);
        assert_eq!(session.selected(), "domingo-manha");
    }

    #[test]
    fn test_plain_functions() {
        assert_eq!(transpose_note("Am7", 3), "Cm7");
        assert_eq!(transpose_text("C G", 2), "D A");
        assert_eq!(slugify("My Songs"), "my-songs");
        assert_eq!(shift_label(-1), "-1");
    }
}
