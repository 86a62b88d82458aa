//! Publish coordinator: commits staged changes to the remote store.
//!
//! Sequence per attempt: delete files of staged deletions (best effort),
//! re-read the manifest version, write the merged manifest conditioned on it.
//! The store is only changed after the write succeeds.

pub mod site;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::Instrument;

use crate::errors::AppError;
use crate::models::{serialize_photos, VersionTag};
use crate::remote::RemoteFileStore;
use crate::store::{PublishSnapshot, SharedStore};

/// Summary of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub version: VersionTag,
    pub records_written: usize,
    pub edits_applied: usize,
    pub deletions_applied: usize,
    /// Remote files removed (or already absent) during this attempt
    pub files_deleted: Vec<String>,
    /// Remote files whose deletion failed and was skipped
    pub files_failed: Vec<String>,
}

/// Result of a publish attempt. Failures never escape as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    NothingToPublish,
    Published(PublishReport),
    /// Nothing in the store changed; the attempt can be retried as is
    Failed(AppError),
}

impl PublishOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PublishOutcome::Published(_))
    }

    /// Every failure leaves staged changes intact.
    pub fn is_retry_safe(&self) -> bool {
        matches!(self, PublishOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&AppError> {
        match self {
            PublishOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Clears the in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives publishes of one store against one manifest path.
pub struct PublishCoordinator {
    remote: Arc<dyn RemoteFileStore>,
    store: SharedStore,
    manifest_path: String,
    in_flight: AtomicBool,
    /// Paths already handled by an earlier attempt, never deleted twice
    handled_paths: Mutex<HashSet<String>>,
}

impl PublishCoordinator {
    pub fn new(
        remote: Arc<dyn RemoteFileStore>,
        store: SharedStore,
        manifest_path: impl Into<String>,
    ) -> Self {
        Self {
            remote,
            store,
            manifest_path: manifest_path.into(),
            in_flight: AtomicBool::new(false),
            handled_paths: Mutex::new(HashSet::new()),
        }
    }

    pub fn manifest_path(&self) -> &str {
        &self.manifest_path
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Publish every staged change, or change nothing.
    pub async fn publish(&self) -> PublishOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Publish rejected: another publish is in progress");
            return PublishOutcome::Failed(AppError::PublishInProgress);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let snapshot = self.store.lock().snapshot();
        let Some(snapshot) = snapshot else {
            tracing::debug!("Nothing to publish");
            return PublishOutcome::NothingToPublish;
        };

        let attempt = uuid::Uuid::new_v4();
        let span = tracing::info_span!("publish", %attempt, path = %self.manifest_path);
        self.run(snapshot).instrument(span).await
    }

    async fn run(&self, snapshot: PublishSnapshot) -> PublishOutcome {
        tracing::info!(
            "Publishing {} edits and {} deletions",
            snapshot.overlay.len(),
            snapshot.deletions.len()
        );

        let (files_deleted, files_failed) = self.delete_staged_files(&snapshot).await;

        let version = match self.write_manifest(&snapshot).await {
            Ok(version) => version,
            Err(err) => {
                tracing::warn!("Publish failed, staged changes kept: {}", err);
                return PublishOutcome::Failed(err);
            }
        };

        self.store.lock().commit(&snapshot, version.clone());
        self.forget_handled(&snapshot);

        tracing::info!("Published manifest version {}", version);
        PublishOutcome::Published(PublishReport {
            version,
            records_written: snapshot.merged.len(),
            edits_applied: snapshot.overlay.len(),
            deletions_applied: snapshot.deletions.len(),
            files_deleted,
            files_failed,
        })
    }

    /// Best-effort removal of local backing files. Not-found counts as done.
    async fn delete_staged_files(&self, snapshot: &PublishSnapshot) -> (Vec<String>, Vec<String>) {
        let mut deleted = Vec::new();
        let mut failed = Vec::new();

        for record in &snapshot.deletions {
            for path in record.local_files() {
                // Shared targets and retries are no-ops
                let fresh = self.handled_paths.lock().insert(path.to_string());
                if !fresh {
                    continue;
                }

                match self.remote.delete_file(path).await {
                    Ok(()) => {
                        tracing::info!("Deleted {} ({})", path, record.id);
                        deleted.push(path.to_string());
                    }
                    Err(err) if err.is_not_found() => {
                        tracing::debug!("{} already absent", path);
                        deleted.push(path.to_string());
                    }
                    Err(err) => {
                        tracing::warn!("Could not delete {} for {}: {}", path, record.id, err);
                        failed.push(path.to_string());
                    }
                }
            }
        }

        (deleted, failed)
    }

    /// Re-read the remote version, then write the merged manifest conditioned on it.
    async fn write_manifest(&self, snapshot: &PublishSnapshot) -> Result<VersionTag, AppError> {
        let remote_version = match self.remote.get_file(&self.manifest_path).await {
            Ok(file) => Some(file.version),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };

        if remote_version != snapshot.version {
            return Err(AppError::Conflict(format!(
                "{} changed remotely (loaded {}, now {}); reload before publishing",
                self.manifest_path,
                describe(snapshot.version.as_ref()),
                describe(remote_version.as_ref())
            )));
        }

        let content = serialize_photos(&snapshot.merged)?;
        self.remote
            .put_file(&self.manifest_path, &content, remote_version.as_ref())
            .await
    }

    /// Forget every remembered delete target, so a fresh baseline starts clean.
    pub fn clear_handled_paths(&self) {
        self.handled_paths.lock().clear();
    }

    fn forget_handled(&self, snapshot: &PublishSnapshot) {
        let mut handled = self.handled_paths.lock();
        for record in &snapshot.deletions {
            for path in record.local_files() {
                handled.remove(path);
            }
        }
    }
}

fn describe(version: Option<&VersionTag>) -> String {
    version
        .map(|v| v.to_string())
        .unwrap_or_else(|| "absent".to_string())
}
