//! # Error Types
//!
//! All fallible songbook operations return [`SongbookError`].
//!
//! Not every failure described by the songbook model is an error value:
//! - A chord token whose root can't be read is emitted verbatim (transposition never fails)
//! - A mutation that names an unknown category is a no-op and reports `false`/`None`
//!
//! Errors from the remote file store (`NotAuthenticated`, `RemoteStore`) are caught at
//! the sync boundary and logged; only store *reads* requested by the UI (library
//! listing, opening a chord sheet) bubble up so they can be shown inline.
//!
//! ## Usage
//! ```rust
//! use songbook::{CategoryStore, FixedCategory, SongbookError};
//!
//! let mut store = CategoryStore::new(vec![FixedCategory::new("quarta", "Quarta")]);
//! store.add_category("Ensaio").unwrap();
//!
//! match store.add_category("ensaio") {
//!     Err(SongbookError::CategoryExists(id)) => assert_eq!(id, "ensaio"),
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

use thiserror::Error;

/// Result type alias using [`SongbookError`].
pub type Result<T> = std::result::Result<T, SongbookError>;

#[derive(Error, Debug)]
pub enum SongbookError {
    /// An operation needing an access token was attempted without one.
    ///
    /// # Example
    /// ```
    /// # use songbook::SongbookError;
    /// assert_eq!(SongbookError::NotAuthenticated.to_string(), "Not authenticated");
    /// ```
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The remote file store answered with a failure or could not be reached.
    #[error("Remote store error: {0}")]
    RemoteStore(String),

    /// A remote file or document id is unknown to the store.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// A JSON blob (snapshot, cache entry) could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A new category would reuse the id of an existing one.
    ///
    /// # Example
    /// ```
    /// # use songbook::SongbookError;
    /// let err = SongbookError::CategoryExists("my-songs".to_string());
    /// assert_eq!(err.to_string(), "Category already exists: my-songs");
    /// ```
    #[error("Category already exists: {0}")]
    CategoryExists(String),

    /// A category or file name that is empty after trimming.
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// Local file I/O failed (file cache, folder-backed store).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SongbookError {
    fn from(e: serde_json::Error) -> Self {
        SongbookError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for SongbookError {
    fn from(e: serde_yaml::Error) -> Self {
        SongbookError::Config(e.to_string())
    }
}
