//! # Remote Snapshot Sync
//!
//! Keeps the one remote snapshot document in step with local state.
//!
//! ```text
//! Uninitialized --find_by_name hit--> Located --pull/push ok--> Synced
//!       |                                                         ^
//!       +-------------------- first push creates ----------------+
//! ```
//!
//! Pushes are full-document overwrites with no conflict detection: the last
//! push that lands wins. Within one session, landing order is made to match
//! mutation order by routing every push through a [`PushQueue`] drained by a
//! single [`SnapshotWriter`]. The queue holds only the newest pending
//! snapshot, each stamped with a monotonically increasing version, and the
//! writer never pushes a version older than one it already pushed.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::category::CategoryStore;
use crate::error::Result;
use crate::events::{EventBus, SongbookEvent};
use crate::remote::FileStore;
use crate::snapshot::RemoteSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    /// No remote document id known yet
    Uninitialized,
    /// Remote document found by name
    Located { document_id: String },
    /// Remote document matches local state as of the last pull or push
    Synced { document_id: String },
}

pub struct SyncService {
    store: Arc<dyn FileStore>,
    document_name: String,
    state: SyncState,
}

impl SyncService {
    pub fn new(store: Arc<dyn FileStore>, document_name: impl Into<String>) -> Self {
        Self {
            store,
            document_name: document_name.into(),
            state: SyncState::Uninitialized,
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn document_id(&self) -> Option<&str> {
        match &self.state {
            SyncState::Uninitialized => None,
            SyncState::Located { document_id } | SyncState::Synced { document_id } => Some(document_id),
        }
    }

    /// Look the document up by name. A hit moves to `Located`; a miss leaves
    /// the state alone.
    pub async fn locate(&mut self) -> Result<Option<String>> {
        if let Some(id) = self.document_id() {
            return Ok(Some(id.to_string()));
        }
        let found = self.store.find_by_name(&self.document_name).await?;
        if let Some(file) = &found {
            info!(document = %self.document_name, id = %file.id, "remote snapshot located");
            self.state = SyncState::Located {
                document_id: file.id.clone(),
            };
        } else {
            debug!(document = %self.document_name, "no remote snapshot yet");
        }
        Ok(found.map(|f| f.id))
    }

    /// Fetch and parse the remote document, if one exists.
    pub async fn pull(&mut self) -> Result<Option<RemoteSnapshot>> {
        let Some(id) = self.locate().await? else {
            return Ok(None);
        };
        let body = self.store.get_content(&id).await?;
        let snapshot = RemoteSnapshot::from_json(&body)?;
        self.state = SyncState::Synced { document_id: id };
        Ok(Some(snapshot))
    }

    /// Pull the remote document and merge it into `categories`.
    ///
    /// Returns `true` when a snapshot was merged. Any store or parse error is
    /// logged and leaves `categories` untouched.
    pub async fn pull_and_merge(&mut self, categories: &mut CategoryStore) -> bool {
        match self.pull().await {
            Ok(Some(snapshot)) => {
                snapshot.merge_into(categories);
                info!(updated_at = ?snapshot.updated_at, "remote snapshot merged");
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "snapshot pull failed, keeping cached state");
                false
            }
        }
    }

    /// Overwrite the remote document with `snapshot`, creating it on first use.
    pub async fn push(&mut self, snapshot: &RemoteSnapshot) -> Result<()> {
        let body = snapshot.to_json_value()?;
        let document_id = match self.locate().await? {
            Some(id) => {
                self.store.update_json_document(&id, &body).await?;
                id
            }
            None => {
                let id = self.store.create_json_document(&self.document_name, &body).await?;
                info!(document = %self.document_name, id = %id, "remote snapshot created");
                id
            }
        };
        self.state = SyncState::Synced { document_id };
        Ok(())
    }
}

/// A snapshot waiting to be pushed
#[derive(Debug, Clone)]
pub struct PendingPush {
    pub version: u64,
    pub snapshot: RemoteSnapshot,
}

/// Producer half of the single-slot push queue.
///
/// Dropping it lets the [`SnapshotWriter`] flush whatever is pending and stop.
#[derive(Debug)]
pub struct PushQueue {
    tx: watch::Sender<Option<PendingPush>>,
    next_version: u64,
}

impl PushQueue {
    /// Replace the pending snapshot. Returns the version it was stamped with.
    pub fn enqueue(&mut self, snapshot: RemoteSnapshot) -> u64 {
        self.next_version += 1;
        let version = self.next_version;
        let superseded = self.tx.send_replace(Some(PendingPush { version, snapshot }));
        if let Some(old) = superseded {
            debug!(version, superseded = old.version, "snapshot queued");
        }
        version
    }

    /// Version of the most recently queued snapshot (0 before any)
    pub fn latest_version(&self) -> u64 {
        self.next_version
    }
}

/// Consumer half: pushes queued snapshots one at a time.
pub struct SnapshotWriter {
    rx: watch::Receiver<Option<PendingPush>>,
    sync: Arc<Mutex<SyncService>>,
    events: Option<EventBus>,
    last_attempted: u64,
    last_pushed: u64,
}

/// Create a push queue feeding `sync`.
pub fn push_queue(sync: Arc<Mutex<SyncService>>) -> (PushQueue, SnapshotWriter) {
    let (tx, rx) = watch::channel(None);
    let queue = PushQueue { tx, next_version: 0 };
    let writer = SnapshotWriter {
        rx,
        sync,
        events: None,
        last_attempted: 0,
        last_pushed: 0,
    };
    (queue, writer)
}

impl SnapshotWriter {
    /// Report pushes and push failures on `events`.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Drain the queue until its [`PushQueue`] is dropped, then return the
    /// last version pushed.
    pub async fn run(mut self) -> u64 {
        while self.rx.changed().await.is_ok() {
            let pending = self.rx.borrow_and_update().clone();
            if let Some(pending) = pending {
                self.write(pending).await;
            }
        }

        // Sender gone; make sure the final value was not left behind.
        let last = self.rx.borrow().clone();
        if let Some(pending) = last {
            self.write(pending).await;
        }
        debug!(last_pushed = self.last_pushed, "snapshot writer stopped");
        self.last_pushed
    }

    async fn write(&mut self, pending: PendingPush) {
        if pending.version <= self.last_attempted {
            debug!(version = pending.version, last_attempted = self.last_attempted, "stale snapshot skipped");
            return;
        }
        self.last_attempted = pending.version;

        let result = self.sync.lock().await.push(&pending.snapshot).await;
        match result {
            Ok(()) => {
                self.last_pushed = pending.version;
                debug!(version = pending.version, "snapshot pushed");
                self.emit(SongbookEvent::SnapshotPushed {
                    version: pending.version,
                });
            }
            Err(e) => {
                warn!(version = pending.version, error = %e, "snapshot push failed, local cache stays authoritative");
                self.emit(SongbookEvent::PushFailed {
                    version: pending.version,
                    error: e.to_string(),
                });
            }
        }
    }

    fn emit(&self, event: SongbookEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}
