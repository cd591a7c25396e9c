use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::error::{Result, SeekSenseError};
use crate::models::Message;
use crate::redis::RedisManager;

#[cfg(test)]
use mockall::automock;

const TRANSCRIPT_VERSION: u32 = 1;

/// Durable home of a chat transcript, addressed by a fixed session key
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// `None` when nothing has been saved under `key` yet
    async fn load(&self, key: &str) -> Result<Option<Vec<Message>>>;
    async fn save(&self, key: &str, messages: &[Message]) -> Result<()>;
}

/// On-disk / in-Redis envelope around the transcript
#[derive(Debug, Serialize, Deserialize)]
struct StoredTranscript {
    version: u32,
    key: String,
    saved_at: DateTime<Utc>,
    messages: Vec<Message>,
}

impl StoredTranscript {
    fn new(key: &str, messages: &[Message]) -> Self {
        Self {
            version: TRANSCRIPT_VERSION,
            key: key.to_string(),
            saved_at: Utc::now(),
            messages: messages.to_vec(),
        }
    }

    fn decode(raw: &str, key: &str) -> Result<Vec<Message>> {
        let stored: StoredTranscript = serde_json::from_str(raw)?;
        if stored.version != TRANSCRIPT_VERSION {
            return Err(SeekSenseError::Internal(format!(
                "unsupported transcript version {} for key '{}'",
                stored.version, key
            )));
        }
        Ok(stored.messages)
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// File backend
// ───────────────────────────────────────────────────────────────────────────────

/// One JSON file per session key
pub struct FileTranscriptStore {
    dir: PathBuf,
}

impl FileTranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keys are hashed so any string maps to a safe file name
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let name = hex::encode(&digest[..8]);
        self.dir.join(format!("transcript-{name}.json"))
    }
}

#[async_trait]
impl TranscriptStore for FileTranscriptStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<Message>>> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        debug!("Loaded transcript '{}' from {}", key, path.display());
        StoredTranscript::decode(&raw, key).map(Some)
    }

    async fn save(&self, key: &str, messages: &[Message]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(&StoredTranscript::new(key, messages))?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// Redis backend
// ───────────────────────────────────────────────────────────────────────────────

pub struct RedisTranscriptStore {
    redis: Arc<RedisManager>,
}

impl RedisTranscriptStore {
    pub fn new(redis: Arc<RedisManager>) -> Self {
        Self { redis }
    }

    pub fn redis_key(key: &str) -> String {
        format!("seeksense:transcript:{key}")
    }
}

#[async_trait]
impl TranscriptStore for RedisTranscriptStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<Message>>> {
        match self.redis.get_string(&Self::redis_key(key)).await? {
            Some(raw) => StoredTranscript::decode(&raw, key).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, key: &str, messages: &[Message]) -> Result<()> {
        let body = serde_json::to_string(&StoredTranscript::new(key, messages))?;
        self.redis.set_string(&Self::redis_key(key), &body).await
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// In-process backend
// ───────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryTranscriptStore {
    entries: Mutex<HashMap<String, Vec<Message>>>,
}

impl MemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscriptStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<Message>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| SeekSenseError::Internal("transcript map poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn save(&self, key: &str, messages: &[Message]) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| SeekSenseError::Internal("transcript map poisoned".to_string()))?;
        entries.insert(key.to_string(), messages.to_vec());
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// ChatSession: the transcript the chat controller mutates
// ───────────────────────────────────────────────────────────────────────────────

/// Session-scoped transcript. Every mutation is written through to the store.
pub struct ChatSession {
    store: Arc<dyn TranscriptStore>,
    key: String,
    messages: Vec<Message>,
}

impl ChatSession {
    /// Restore the transcript saved under `key`, or start from the welcome message
    pub async fn open(store: Arc<dyn TranscriptStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let mut stale = 0;
        let messages = match store.load(&key).await {
            Ok(Some(mut messages)) => {
                // A saved placeholder belongs to a request that never finished
                let before = messages.len();
                messages.retain(|m| !m.loading);
                stale = before - messages.len();
                if messages.is_empty() {
                    vec![Message::welcome()]
                } else {
                    debug!("Restored {} messages for session '{}'", messages.len(), key);
                    messages
                }
            }
            Ok(None) => vec![Message::welcome()],
            Err(e) => {
                warn!(
                    "Failed to load transcript '{}': {} - starting a fresh session",
                    key, e
                );
                vec![Message::welcome()]
            }
        };
        let session = Self {
            store,
            key,
            messages,
        };
        if stale > 0 {
            warn!(
                "Dropped {} interrupted placeholder(s) from session '{}'",
                stale, session.key
            );
            session.persist().await;
        }
        session
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// True while a loading placeholder is in the transcript
    pub fn has_pending(&self) -> bool {
        self.messages.iter().any(|m| m.loading)
    }

    /// Messages after the most recent user message: the reply to the last send
    pub fn last_reply(&self) -> &[Message] {
        let start = self
            .messages
            .iter()
            .rposition(|m| m.from_user)
            .map_or(self.messages.len(), |i| i + 1);
        &self.messages[start..]
    }

    pub async fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.persist().await;
    }

    /// Drop every loading placeholder
    pub async fn remove_loading(&mut self) {
        let before = self.messages.len();
        self.messages.retain(|m| !m.loading);
        if self.messages.len() != before {
            self.persist().await;
        }
    }

    /// Reset to the single welcome message
    pub async fn clear(&mut self) {
        self.messages = vec![Message::welcome()];
        self.persist().await;
    }

    /// Save now, handing any failure back to the caller
    pub async fn flush(&self) -> Result<()> {
        self.store.save(&self.key, &self.messages).await
    }

    async fn persist(&self) {
        if let Err(e) = self.flush().await {
            warn!("Failed to persist transcript '{}': {}", self.key, e);
        }
    }
}
