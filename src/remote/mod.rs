//! Remote file store boundary.
//!
//! The publish protocol is written against these three operations only.

mod http;
mod memory;

pub use http::*;
pub use memory::*;

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::models::VersionTag;

/// A file read from the remote store together with its revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub content: Vec<u8>,
    pub version: VersionTag,
}

/// Path-addressed, versioned file storage.
#[async_trait]
pub trait RemoteFileStore: Send + Sync {
    /// Fetch content and version. Fails with `NotFound` when the path is absent.
    async fn get_file(&self, path: &str) -> AppResult<RemoteFile>;

    /// Write content conditioned on `version`; `None` only creates a new path.
    ///
    /// Fails with `Conflict` when the remote revision no longer matches.
    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        version: Option<&VersionTag>,
    ) -> AppResult<VersionTag>;

    /// Delete a file, fetching its current version first. `NotFound` if absent.
    async fn delete_file(&self, path: &str) -> AppResult<()>;
}
