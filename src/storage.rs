//! Durable storage for the single saved conversation.
//!
//! The conversation lives under one key of a small preference-style file, the
//! way a mobile preference store would hold it. Readers observe the store as a
//! stream that re-emits whenever a save goes through this process.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use crate::events::ConversationSnapshot;

/// Key the conversation is stored under
pub const SNAPSHOT_KEY: &str = "snapshot";

/// Persistence contract for the conversation snapshot
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Current snapshot first, then a new item after every change
    fn observe(&self) -> BoxStream<'static, Option<ConversationSnapshot>>;

    /// Overwrite the stored snapshot, or delete it with `None`
    async fn save(&self, snapshot: Option<&ConversationSnapshot>) -> Result<()>;

    /// Read the current snapshot once
    async fn load(&self) -> Option<ConversationSnapshot> {
        self.observe().next().await.flatten()
    }
}

static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Flat string key/value file
pub struct PreferenceFile {
    path: PathBuf,
}

impl PreferenceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all().await?.remove(key))
    }

    pub async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.read_all().await?;
        entries.insert(key.to_string(), value);
        self.write_all(&entries).await
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.read_all().await?;
        if entries.remove(key).is_some() {
            self.write_all(&entries).await?;
        }
        Ok(())
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };

        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!("Ignoring unreadable preference file {}: {}", self.path.display(), e);
                Ok(BTreeMap::new())
            }
        }
    }

    /// Write to a sibling temp file, then rename over the original
    async fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create preference directory")?;
        }

        let content =
            serde_json::to_string_pretty(entries).context("Failed to serialize preferences")?;
        // a cancelled write can still be running in the blocking pool
        let temp_path = self.temp_path();
        let written = match fs::write(&temp_path, content).await {
            Ok(()) => fs::rename(&temp_path, &self.path)
                .await
                .context("Failed to replace preference file"),
            Err(e) => Err(e).context("Failed to write preference file"),
        };
        if written.is_err() {
            let _ = fs::remove_file(&temp_path).await;
        }
        written
    }

    fn temp_path(&self) -> PathBuf {
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path
            .with_file_name(format!(".{}.{}-{}.tmp", name, std::process::id(), seq))
    }
}

/// Snapshot store backed by a [`PreferenceFile`]
pub struct FileSnapshotStore {
    prefs: Arc<PreferenceFile>,
    changes: watch::Sender<u64>,
    write_lock: Mutex<()>,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            prefs: Arc::new(PreferenceFile::new(path)),
            changes,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        self.prefs.path()
    }

    /// When the backing file was last written, if it exists
    pub async fn last_modified(&self) -> Option<DateTime<Local>> {
        let metadata = fs::metadata(self.path()).await.ok()?;
        metadata.modified().ok().map(DateTime::<Local>::from)
    }
}

async fn read_snapshot(prefs: &PreferenceFile) -> Option<ConversationSnapshot> {
    let stored = match prefs.get(SNAPSHOT_KEY).await {
        Ok(stored) => stored?,
        Err(e) => {
            warn!("Failed to read saved conversation: {:#}", e);
            return None;
        }
    };

    match serde_json::from_str(&stored) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!("Discarding malformed saved conversation: {}", e);
            None
        }
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    fn observe(&self) -> BoxStream<'static, Option<ConversationSnapshot>> {
        let prefs = Arc::clone(&self.prefs);
        let rx = self.changes.subscribe();

        stream::unfold((prefs, rx, true), |(prefs, mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let snapshot = read_snapshot(&prefs).await;
            Some((snapshot, (prefs, rx, false)))
        })
        .boxed()
    }

    async fn save(&self, snapshot: Option<&ConversationSnapshot>) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        match snapshot {
            Some(snapshot) => {
                let encoded =
                    serde_json::to_string(snapshot).context("Failed to serialize conversation")?;
                self.prefs.set(SNAPSHOT_KEY, encoded).await?;
                debug!(
                    "Saved conversation ({} messages) to {}",
                    snapshot.messages.len(),
                    self.path().display()
                );
            }
            None => {
                self.prefs.remove(SNAPSHOT_KEY).await?;
                debug!("Removed saved conversation");
            }
        }

        self.changes.send_modify(|version| *version += 1);
        Ok(())
    }
}
