//! Application state and session persistence
//!
//! Each session is two files under the data directory: `<id>.pdf` holds
//! the uploaded bytes and `<id>.json` the [`StoredSession`]. Loaded
//! sessions are cached in memory; every mutation is written through.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use pdfmark_core::AnnotationSession;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::Config;
use crate::error::ApiError;
use crate::models::StoredSession;

pub struct AppState {
    pub config: Config,
    pub store: SessionStore,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = SessionStore::open(&config.data_dir).await?;
        Ok(Self { config, store })
    }
}

pub struct SessionStore {
    root: PathBuf,
    sessions: RwLock<HashMap<String, StoredSession>>,
}

impl SessionStore {
    pub async fn open(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        tracing::info!("Session store at {}", root.display());
        Ok(Self {
            root,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    fn pdf_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.pdf", id))
    }

    fn json_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }

    /// Persist a new session for `pdf_bytes`.
    pub async fn create(
        &self,
        document_name: String,
        pdf_bytes: &[u8],
        page_count: usize,
    ) -> Result<StoredSession, ApiError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let stored = StoredSession {
            id: id.clone(),
            document_hash: hex::encode(Sha256::digest(pdf_bytes)),
            page_count,
            created_at: now,
            updated_at: now,
            session: AnnotationSession::new(document_name),
        };

        let mut sessions = self.sessions.write().await;
        tokio::fs::write(self.pdf_path(&id), pdf_bytes).await?;
        self.write_json(&stored).await?;
        sessions.insert(id.clone(), stored.clone());

        tracing::info!("Created session: {}", id);
        Ok(stored)
    }

    pub async fn get(&self, id: &str) -> Result<StoredSession, ApiError> {
        let id = checked_id(id)?;
        if let Some(stored) = self.sessions.read().await.get(&id) {
            return Ok(stored.clone());
        }

        let mut sessions = self.sessions.write().await;
        let stored = self.load(&id).await?;
        sessions.insert(id, stored.clone());
        Ok(stored)
    }

    /// Apply `f` to a session and write the result back.
    pub async fn update<F, R>(&self, id: &str, f: F) -> Result<(StoredSession, R), ApiError>
    where
        F: FnOnce(&mut AnnotationSession) -> Result<R, ApiError>,
    {
        let id = checked_id(id)?;
        let mut sessions = self.sessions.write().await;

        let mut stored = match sessions.get(&id) {
            Some(stored) => stored.clone(),
            None => self.load(&id).await?,
        };
        let result = f(&mut stored.session)?;
        stored.updated_at = Utc::now();

        self.write_json(&stored).await?;
        sessions.insert(id, stored.clone());
        Ok((stored, result))
    }

    /// Source PDF bytes for a session.
    pub async fn pdf_bytes(&self, id: &str) -> Result<Vec<u8>, ApiError> {
        let id = checked_id(id)?;
        match tokio::fs::read(self.pdf_path(&id)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ApiError::SessionNotFound(id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn load(&self, id: &str) -> Result<StoredSession, ApiError> {
        let json = match tokio::fs::read_to_string(self.json_path(id)).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ApiError::SessionNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&json).map_err(|e| ApiError::Internal(e.into()))
    }

    async fn write_json(&self, stored: &StoredSession) -> Result<(), ApiError> {
        let json = serde_json::to_string_pretty(stored).map_err(|e| ApiError::Internal(e.into()))?;
        tokio::fs::write(self.json_path(&stored.id), json).await?;
        Ok(())
    }
}

/// Session ids are UUIDs; anything else cannot name a stored session.
fn checked_id(id: &str) -> Result<String, ApiError> {
    Uuid::parse_str(id)
        .map(|u| u.to_string())
        .map_err(|_| ApiError::SessionNotFound(id.to_string()))
}
