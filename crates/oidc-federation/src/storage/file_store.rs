//! Statement and trust chain persistence on the filesystem.
//!
//! ```text
//! {base_dir}/
//! ├── statements/       — fetched statements
//! │   └── {sha256(sub, iss)}.json
//! └── chains/           — resolved trust chains
//!     └── {sha256(sub, anchor, type)}.json
//! ```
//!
//! File format:
//! ```json
//! { "version": 1, "statement": { ... } }
//! { "version": 1, "chain": { ... } }
//! ```
//!
//! Writes go to a uniquely named temporary file in the target directory
//! that is persisted over the target, so a reader never observes a
//! half-written record. Writers to the same record are serialized by a
//! per-record lock, and file IO runs on the blocking thread pool.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::entity::{EntityId, EntityType};
use crate::error::{FederationError, Result};

use super::{ChainStatus, StatementStore, StoredStatement, TrustChainRecord};

// ── File format constants ─────────────────────────────────────────────────────

const STORE_FILE_VERSION: u32 = 1;

const STATEMENTS_DIR: &str = "statements";
const CHAINS_DIR: &str = "chains";

// ── On-disk structures ────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct StatementFile {
    version: u32,
    statement: StoredStatement,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChainFile {
    version: u32,
    chain: TrustChainRecord,
}

// ── FileStatementStore ────────────────────────────────────────────────────────

/// Filesystem-backed [`StatementStore`].
///
/// Records are named by the SHA-256 of their key so that arbitrary entity
/// identifiers map to safe file names.
pub struct FileStatementStore {
    base_dir: PathBuf,
    write_locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileStatementStore {
    /// Open a store rooted at `base_dir`, creating its sub-directories.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::Io` if any directory cannot be created.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(base_dir.join(STATEMENTS_DIR))?;
        std::fs::create_dir_all(base_dir.join(CHAINS_DIR))?;
        Ok(Self {
            base_dir,
            write_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn statement_path(&self, sub: &EntityId, iss: &EntityId) -> PathBuf {
        self.base_dir
            .join(STATEMENTS_DIR)
            .join(format!("{}.json", key_hash(&[sub.as_str(), iss.as_str()])))
    }

    fn chain_path(&self, sub: &EntityId, anchor: &EntityId, entity_type: EntityType) -> PathBuf {
        self.base_dir.join(CHAINS_DIR).join(format!(
            "{}.json",
            key_hash(&[sub.as_str(), anchor.as_str(), entity_type.as_str()])
        ))
    }

    /// The lock serializing writers of the record at `path`.
    fn write_lock(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .write_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }

    async fn save<T: Serialize>(&self, path: PathBuf, value: &T) -> Result<()> {
        let contents = encode(value)?;
        let lock = self.write_lock(&path);
        let _guard = lock.lock().await;
        blocking(move || write_file(&path, &contents)).await
    }
}

/// Hex SHA-256 over the key parts, NUL-separated.
fn key_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]);
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| FederationError::Serialization(e.to_string()))
}

/// Run blocking file IO off the async workers.
async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| FederationError::Storage(format!("file store task failed: {e}")))?
}

/// Atomically replace `path` with `contents`.
fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        FederationError::Storage(format!("{} has no parent directory", path.display()))
    })?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.persist(path).map_err(|e| FederationError::Io(e.error))?;
    Ok(())
}

/// Read a record file, `None` if it does not exist.
fn read_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let file = serde_json::from_slice(&bytes).map_err(|e| {
        FederationError::Storage(format!("failed to parse {}: {e}", path.display()))
    })?;
    Ok(Some(file))
}

async fn load<T: DeserializeOwned + Send + 'static>(path: PathBuf) -> Result<Option<T>> {
    blocking(move || read_file(&path)).await
}

#[async_trait]
impl StatementStore for FileStatementStore {
    async fn get(&self, sub: &EntityId, iss: &EntityId) -> Result<Option<StoredStatement>> {
        let path = self.statement_path(sub, iss);
        Ok(load::<StatementFile>(path).await?.map(|file| file.statement))
    }

    async fn put(&self, statement: StoredStatement) -> Result<()> {
        let path = self.statement_path(&statement.sub, &statement.iss);
        self.save(
            path,
            &StatementFile {
                version: STORE_FILE_VERSION,
                statement,
            },
        )
        .await
    }

    async fn get_trust_chain(
        &self,
        sub: &EntityId,
        trust_anchor: &EntityId,
        entity_type: EntityType,
    ) -> Result<Option<TrustChainRecord>> {
        let path = self.chain_path(sub, trust_anchor, entity_type);
        Ok(load::<ChainFile>(path).await?.map(|file| file.chain))
    }

    async fn put_trust_chain(&self, record: TrustChainRecord) -> Result<()> {
        let path = self.chain_path(&record.sub, &record.trust_anchor, record.entity_type);
        self.save(
            path,
            &ChainFile {
                version: STORE_FILE_VERSION,
                chain: record,
            },
        )
        .await
    }

    async fn deactivate_trust_chain(
        &self,
        sub: &EntityId,
        trust_anchor: &EntityId,
        entity_type: EntityType,
    ) -> Result<bool> {
        let path = self.chain_path(sub, trust_anchor, entity_type);
        let lock = self.write_lock(&path);
        let _guard = lock.lock().await;

        let Some(mut file) = load::<ChainFile>(path.clone()).await? else {
            return Ok(false);
        };
        file.chain.is_active = false;
        file.chain.status = ChainStatus::Revoked;
        file.chain.updated_at = crate::time::now_secs();
        let contents = encode(&file)?;
        blocking(move || write_file(&path, &contents)).await?;
        Ok(true)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
