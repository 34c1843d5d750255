pub mod assets;
pub mod cache;
pub mod category;
pub mod chord;
pub mod config;
pub mod error;
pub mod events;
pub mod library;
#[cfg(not(target_arch = "wasm32"))]
pub mod logging;
pub mod pitch;
pub mod remote;
pub mod render;
pub mod snapshot;
pub mod songbook;
pub mod sync;
pub mod transpose;
pub mod viewer;

pub use assets::{DisplayHandle, HandleAllocator, LocalAsset, LocalAssetRegistry, ObjectUrls};
pub use cache::{CacheStore, FileCache, LocalCache, MemoryCache};
pub use category::{slugify, Category, CategoryKind, CategoryRecord, CategoryStore, FileRef, FixedCategory};
pub use chord::{tokenize, ChordToken, Segment};
pub use config::SongbookConfig;
pub use error::*;
pub use events::{EventBus, SongbookEvent};
pub use library::{display_name, ItemKind, Library};
pub use pitch::{PitchClass, NOTE_NAMES};
#[cfg(not(target_arch = "wasm32"))]
pub use remote::FolderStore;
pub use remote::{FileStore, ImageRef, MemoryFileStore};
pub use render::{render, RenderedSegment, RenderedSheet};
pub use snapshot::RemoteSnapshot;
pub use songbook::{OpenedItem, SongEntry, Songbook};
pub use sync::{PushQueue, SnapshotWriter, SyncService, SyncState};
pub use transpose::{semitones_between, transpose_note};
pub use viewer::{note_map, shift_label, NoteMapping, SheetViewer};

/// Transpose a whole chord sheet, returning plain text.
/// This is the main entry point for one-off use.
pub fn transpose_text(text: &str, shift: i32) -> String {
    render(text, shift).to_plain_text()
}

/// Transpose a whole chord sheet into the annotated HTML the viewer shows
pub fn transpose_html(text: &str, shift: i32) -> String {
    render(text, shift).to_html()
}
