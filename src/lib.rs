pub mod chat;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod product;
pub mod redis;
pub mod routes;
pub mod search;
pub mod session;
pub mod transport;

use std::sync::Arc;

use crate::chat::ChatController;
use crate::config::{Config, SessionBackend};
use crate::error::Result;
use crate::product::ProductView;
use crate::redis::RedisManager;
use crate::search::SearchView;
use crate::session::{
    ChatSession, FileTranscriptStore, MemoryTranscriptStore, RedisTranscriptStore,
    TranscriptStore,
};
use crate::transport::{HttpReviewApi, ReviewApi};

/// Wires one API client and one transcript store into the three views
pub struct SeekSense {
    api: Arc<dyn ReviewApi>,
    store: Arc<dyn TranscriptStore>,
    session_key: String,
}

impl SeekSense {
    pub async fn new(cfg: &Config) -> Result<Self> {
        let api = Arc::new(HttpReviewApi::from_config(cfg)?);
        tracing::info!("Review backend at {}", api.base_url());

        let store = open_store(cfg).await?;
        Ok(Self::with_parts(api, store, cfg.session.key.clone()))
    }

    pub fn with_parts(
        api: Arc<dyn ReviewApi>,
        store: Arc<dyn TranscriptStore>,
        session_key: String,
    ) -> Self {
        Self {
            api,
            store,
            session_key,
        }
    }

    pub async fn chat(&self) -> ChatController {
        let session = ChatSession::open(Arc::clone(&self.store), self.session_key.clone()).await;
        ChatController::new(Arc::clone(&self.api), session)
    }

    pub fn search_view(&self) -> SearchView {
        SearchView::new(Arc::clone(&self.api))
    }

    pub fn product_view(&self) -> ProductView {
        ProductView::new(Arc::clone(&self.api))
    }
}

/// Build the transcript store selected by `session.backend`
pub async fn open_store(cfg: &Config) -> Result<Arc<dyn TranscriptStore>> {
    let store: Arc<dyn TranscriptStore> = match cfg.session.backend {
        SessionBackend::File => {
            let dir = cfg.session_dir();
            tracing::debug!("Transcripts stored under {}", dir.display());
            Arc::new(FileTranscriptStore::new(dir))
        }
        SessionBackend::Redis => {
            let redis = Arc::new(RedisManager::new_with_config(cfg).await?);
            Arc::new(RedisTranscriptStore::new(redis))
        }
        SessionBackend::Memory => Arc::new(MemoryTranscriptStore::new()),
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;

    #[tokio::test]
    async fn test_file_backend_shares_transcript_across_controllers() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut cfg = Config::default();
        cfg.session.dir = Some(dir.path().to_path_buf());

        let app = SeekSense::new(&cfg).await.expect("app should build");
        let mut first = app.chat().await;
        first.clear().await;
        assert_eq!(first.session().messages(), &[Message::welcome()]);
        // Blank input never reaches the backend
        first.send("  ").await;

        let second = app.chat().await;
        assert_eq!(second.session().messages(), first.session().messages());
    }

    #[tokio::test]
    async fn test_memory_backend_starts_fresh() {
        let mut cfg = Config::default();
        cfg.session.backend = SessionBackend::Memory;
        let store = open_store(&cfg).await.expect("memory store");
        assert!(store.load("chatMessages").await.expect("load").is_none());
    }
}
