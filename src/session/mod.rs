//! Admin session: one logical editing session against one site.

use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppResult;
use crate::models::{Manifest, SiteConfig, SiteConfigChanges, VersionTag};
use crate::publish::site::{load_site_config, save_site_config};
use crate::publish::{PublishCoordinator, PublishOutcome};
use crate::remote::{HttpFileStore, RemoteFileStore};
use crate::store::{ReconciliationStore, SharedStore};

/// State shared by every admin operation of a session.
pub struct AdminSession {
    remote: Arc<dyn RemoteFileStore>,
    store: SharedStore,
    coordinator: PublishCoordinator,
    manifest_path: String,
    site_config_path: String,
}

impl AdminSession {
    pub fn new(config: &Config, remote: Arc<dyn RemoteFileStore>) -> Self {
        let store = ReconciliationStore::new().into_shared();
        let coordinator =
            PublishCoordinator::new(remote.clone(), store.clone(), config.manifest_path.clone());

        Self {
            remote,
            store,
            coordinator,
            manifest_path: config.manifest_path.clone(),
            site_config_path: config.site_config_path.clone(),
        }
    }

    /// Build a session talking to the configured contents API.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let remote = Arc::new(HttpFileStore::from_config(config)?);
        Ok(Self::new(config, remote))
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn coordinator(&self) -> &PublishCoordinator {
        &self.coordinator
    }

    /// Fetch the manifest and reset the store to it. A missing manifest is empty.
    pub async fn load(&self) -> AppResult<usize> {
        let manifest = match self.remote.get_file(&self.manifest_path).await {
            Ok(file) => Manifest::from_slice(&file.content, Some(file.version)),
            Err(err) if err.is_not_found() => {
                tracing::info!("No manifest at {}, starting empty", self.manifest_path);
                Manifest::default()
            }
            Err(err) => return Err(err),
        };

        let count = manifest.photos.len();
        self.store.lock().load(manifest);
        self.coordinator.clear_handled_paths();
        Ok(count)
    }

    /// Discard staged changes and reload from the remote store.
    pub async fn refresh(&self) -> AppResult<usize> {
        let discarded = self.store.lock().pending_change_count();
        if discarded > 0 {
            tracing::warn!("Refresh discards {} staged changes", discarded);
        }
        self.load().await
    }

    pub async fn publish(&self) -> PublishOutcome {
        self.coordinator.publish().await
    }

    pub async fn site_config(&self) -> AppResult<(SiteConfig, Option<VersionTag>)> {
        load_site_config(self.remote.as_ref(), &self.site_config_path).await
    }

    pub async fn update_site_config(
        &self,
        changes: &SiteConfigChanges,
    ) -> AppResult<(SiteConfig, VersionTag)> {
        save_site_config(self.remote.as_ref(), &self.site_config_path, changes).await
    }
}
