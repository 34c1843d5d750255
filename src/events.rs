//! Change notifications for the UI layer.
//!
//! Every state change the songbook makes is announced on an [`EventBus`] so a
//! view can re-render without polling. Events serialize with a `type` tag,
//! e.g. `{"type":"CategoriesChanged"}`.

use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum SongbookEvent {
    /// Categories, visibility or selection changed.
    CategoriesChanged,
    /// A category's member list changed.
    MembersChanged { category: String },
    /// Local assets of a category were added or released.
    AssetsChanged { category: String },
    /// A remote snapshot was merged into the local state.
    SnapshotMerged,
    /// The remote document now holds the state stamped `version`.
    SnapshotPushed { version: u64 },
    /// Pushing `version` failed; local state stays unsynced.
    PushFailed { version: u64, error: String },
    /// Dark mode or user roles changed.
    PreferencesChanged,
}

impl SongbookEvent {
    /// Dot-namespaced name, handy for logs and for the JS bridge.
    pub fn event_type(&self) -> &'static str {
        match self {
            SongbookEvent::CategoriesChanged => "categories.changed",
            SongbookEvent::MembersChanged { .. } => "members.changed",
            SongbookEvent::AssetsChanged { .. } => "assets.changed",
            SongbookEvent::SnapshotMerged => "snapshot.merged",
            SongbookEvent::SnapshotPushed { .. } => "snapshot.pushed",
            SongbookEvent::PushFailed { .. } => "snapshot.push_failed",
            SongbookEvent::PreferencesChanged => "preferences.changed",
        }
    }
}

/// Broadcast bus for [`SongbookEvent`]s.
///
/// A subscriber that falls behind receives `Lagged` and misses events; views
/// only need the latest state, so they just re-render.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SongbookEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emit to all subscribers. With no subscribers the event is dropped.
    pub fn emit(&self, event: SongbookEvent) {
        tracing::debug!(
            event_type = event.event_type(),
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SongbookEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
