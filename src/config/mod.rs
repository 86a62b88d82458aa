//! Configuration module for the gallery admin core.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;

use crate::auth::Credential;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the contents API
    pub api_base: String,
    /// Repository owner holding the site
    pub repo_owner: String,
    /// Repository name holding the site
    pub repo_name: String,
    /// Branch that publishes go to
    pub branch: String,
    /// Access token for the contents API
    pub credential: Option<Credential>,
    /// Remote path of the photo manifest
    pub manifest_path: String,
    /// Remote path of the site config document
    pub site_config_path: String,
    /// Local directory holding uploaded originals
    pub uploads_dir: PathBuf,
    /// Local directory thumbnails are written to
    pub thumbs_dir: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_base = env::var("GALLERY_API_BASE")
            .unwrap_or_else(|_| "https://api.github.com".to_string())
            .trim_end_matches('/')
            .to_string();

        let repo_owner = env::var("GALLERY_REPO_OWNER").unwrap_or_default();
        let repo_name = env::var("GALLERY_REPO_NAME").unwrap_or_default();
        let branch = env::var("GALLERY_BRANCH").unwrap_or_else(|_| "main".to_string());

        let credential = env::var("GALLERY_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(Credential::new);

        let manifest_path =
            env::var("GALLERY_MANIFEST_PATH").unwrap_or_else(|_| "data/photos.json".to_string());
        let site_config_path =
            env::var("GALLERY_SITE_CONFIG_PATH").unwrap_or_else(|_| "data/site.json".to_string());

        let uploads_dir = env::var("GALLERY_UPLOADS_DIR")
            .unwrap_or_else(|_| "photos/uploads".to_string())
            .into();
        let thumbs_dir = env::var("GALLERY_THUMBS_DIR")
            .unwrap_or_else(|_| "photos/thumbs".to_string())
            .into();

        let log_level = env::var("GALLERY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            api_base,
            repo_owner,
            repo_name,
            branch,
            credential,
            manifest_path,
            site_config_path,
            uploads_dir,
            thumbs_dir,
            log_level,
        }
    }

    /// Path of the local manifest the batch processor maintains.
    pub fn local_manifest_path(&self) -> PathBuf {
        PathBuf::from(&self.manifest_path)
    }
}
