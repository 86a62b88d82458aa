//! In-process versioned file store.
//!
//! Versions are content hashes, so identical content keeps its tag. Every call
//! made through the trait is journaled.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use super::{RemoteFile, RemoteFileStore};
use crate::errors::{AppError, AppResult};
use crate::models::VersionTag;

/// One call received through [`RemoteFileStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Get(String),
    Put {
        path: String,
        version: Option<VersionTag>,
    },
    Delete(String),
}

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<String, RemoteFile>,
    journal: Vec<RemoteCall>,
    failing_deletes: HashSet<String>,
    put_failure: Option<AppError>,
}

/// Versioned file store held in memory.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    state: Mutex<MemoryState>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a file outside the journal, as another writer would.
    pub fn insert(&self, path: &str, content: &[u8]) -> VersionTag {
        let version = content_version(content);
        self.state.lock().files.insert(
            path.to_string(),
            RemoteFile {
                content: content.to_vec(),
                version: version.clone(),
            },
        );
        version
    }

    pub fn remove(&self, path: &str) -> bool {
        self.state.lock().files.remove(path).is_some()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.state.lock().files.contains_key(path)
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(path).map(|f| f.content.clone())
    }

    pub fn version(&self, path: &str) -> Option<VersionTag> {
        self.state.lock().files.get(path).map(|f| f.version.clone())
    }

    pub fn journal(&self) -> Vec<RemoteCall> {
        self.state.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    /// Make deletes of `path` fail with a transport error.
    pub fn fail_deletes_of(&self, path: &str) {
        self.state.lock().failing_deletes.insert(path.to_string());
    }

    /// Make every put fail with `error` until cleared with `None`.
    pub fn set_put_failure(&self, error: Option<AppError>) {
        self.state.lock().put_failure = error;
    }
}

#[async_trait]
impl RemoteFileStore for MemoryFileStore {
    async fn get_file(&self, path: &str) -> AppResult<RemoteFile> {
        let mut state = self.state.lock();
        state.journal.push(RemoteCall::Get(path.to_string()));

        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("{}: Not Found", path)))
    }

    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        version: Option<&VersionTag>,
    ) -> AppResult<VersionTag> {
        let mut state = self.state.lock();
        state.journal.push(RemoteCall::Put {
            path: path.to_string(),
            version: version.cloned(),
        });

        if let Some(error) = state.put_failure.clone() {
            return Err(error);
        }

        let current = state.files.get(path).map(|f| &f.version);
        match (current, version) {
            (Some(current), Some(expected)) if current == expected => {}
            (None, None) => {}
            (Some(current), _) => {
                return Err(AppError::Conflict(format!(
                    "{}: version {} does not match current {}",
                    path,
                    version.map(VersionTag::as_str).unwrap_or("<none>"),
                    current
                )));
            }
            (None, Some(_)) => {
                return Err(AppError::Conflict(format!("{}: file no longer exists", path)));
            }
        }

        let version = content_version(content);
        state.files.insert(
            path.to_string(),
            RemoteFile {
                content: content.to_vec(),
                version: version.clone(),
            },
        );
        Ok(version)
    }

    async fn delete_file(&self, path: &str) -> AppResult<()> {
        let mut state = self.state.lock();
        state.journal.push(RemoteCall::Delete(path.to_string()));

        if state.failing_deletes.contains(path) {
            return Err(AppError::Transport(format!("{}: connection reset", path)));
        }

        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("{}: Not Found", path)))
    }
}

/// Hex sha256 of the content.
pub fn content_version(content: &[u8]) -> VersionTag {
    VersionTag::new(hex::encode(Sha256::digest(content)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_requires_matching_version() {
        let store = MemoryFileStore::new();
        let v1 = store.put_file("a.json", b"one", None).await.unwrap();

        let err = store.put_file("a.json", b"two", None).await.unwrap_err();
        assert_eq!(err.error_code(), "VERSION_MISMATCH");

        let stale = VersionTag::new("stale");
        let err = store.put_file("a.json", b"two", Some(&stale)).await.unwrap_err();
        assert_eq!(err.error_code(), "VERSION_MISMATCH");

        let v2 = store.put_file("a.json", b"two", Some(&v1)).await.unwrap();
        assert_ne!(v1, v2);
        assert_eq!(store.content("a.json").unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_get_and_delete_missing() {
        let store = MemoryFileStore::new();
        assert!(store.get_file("nope").await.unwrap_err().is_not_found());
        assert!(store.delete_file("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_journal_records_calls() {
        let store = MemoryFileStore::new();
        store.insert("x", b"1");
        store.get_file("x").await.unwrap();
        store.delete_file("x").await.unwrap();

        assert_eq!(
            store.journal(),
            vec![
                RemoteCall::Get("x".to_string()),
                RemoteCall::Delete("x".to_string())
            ]
        );
        assert!(!store.contains("x"));
    }

    #[test]
    fn test_content_version_is_stable() {
        assert_eq!(content_version(b"same"), content_version(b"same"));
        assert_ne!(content_version(b"same"), content_version(b"other"));
        assert_eq!(content_version(b"").as_str().len(), 64);
    }
}
