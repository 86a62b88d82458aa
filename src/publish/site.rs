//! Site config editing: read, merge, conditional write. No staging.

use crate::errors::AppResult;
use crate::models::{SiteConfig, SiteConfigChanges, VersionTag};
use crate::remote::RemoteFileStore;

/// Fetch the site config. A missing document reads as defaults with no version.
pub async fn load_site_config(
    remote: &dyn RemoteFileStore,
    path: &str,
) -> AppResult<(SiteConfig, Option<VersionTag>)> {
    match remote.get_file(path).await {
        Ok(file) => Ok((SiteConfig::from_slice(&file.content), Some(file.version))),
        Err(err) if err.is_not_found() => {
            tracing::info!("No site config at {}, using defaults", path);
            Ok((SiteConfig::default(), None))
        }
        Err(err) => Err(err),
    }
}

/// Apply `changes` on top of the current remote document and write it back.
pub async fn save_site_config(
    remote: &dyn RemoteFileStore,
    path: &str,
    changes: &SiteConfigChanges,
) -> AppResult<(SiteConfig, VersionTag)> {
    let (current, version) = load_site_config(remote, path).await?;
    let next = current.apply(changes);

    let version = remote
        .put_file(path, &next.to_json_bytes()?, version.as_ref())
        .await?;

    tracing::info!("Saved site config {} (version {})", path, version);
    Ok((next, version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryFileStore;

    #[tokio::test]
    async fn test_save_creates_missing_document() {
        let remote = MemoryFileStore::new();
        let changes = SiteConfigChanges {
            site_name: Some("Field Notes".to_string()),
            ..Default::default()
        };

        let (saved, version) = save_site_config(&remote, "data/site.json", &changes)
            .await
            .unwrap();

        assert_eq!(saved.site_name, "Field Notes");
        assert_eq!(remote.version("data/site.json"), Some(version));

        let (loaded, _) = load_site_config(&remote, "data/site.json").await.unwrap();
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn test_save_merges_into_current_document() {
        let remote = MemoryFileStore::new();
        remote.insert(
            "data/site.json",
            br#"{ "siteName": "Old", "heroTagline": ["light", "place"], "showHeroTagline": false }"#,
        );

        let changes = SiteConfigChanges {
            hero_eyebrow: Some("Photographs".to_string()),
            ..Default::default()
        };
        let (saved, _) = save_site_config(&remote, "data/site.json", &changes)
            .await
            .unwrap();

        assert_eq!(saved.site_name, "Old");
        assert_eq!(saved.hero_eyebrow, "Photographs");
        assert_eq!(saved.hero_tagline, vec!["light".to_string(), "place".to_string()]);
        assert!(!saved.show_hero_tagline);
    }

    #[tokio::test]
    async fn test_save_keeps_keys_around_a_wrong_typed_one() {
        let remote = MemoryFileStore::new();
        remote.insert(
            "data/site.json",
            br#"{ "siteName": "Field Notes", "heroTagline": ["light"], "showHeroTagline": "yes", "accentColor": "red" }"#,
        );

        let changes = SiteConfigChanges {
            hero_eyebrow: Some("Photographs".to_string()),
            ..Default::default()
        };
        save_site_config(&remote, "data/site.json", &changes)
            .await
            .unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&remote.content("data/site.json").unwrap()).unwrap();
        assert_eq!(written["siteName"], "Field Notes");
        assert_eq!(written["heroEyebrow"], "Photographs");
        assert_eq!(written["heroTagline"], serde_json::json!(["light"]));
        assert_eq!(written["showHeroTagline"], true);
        assert_eq!(written["accentColor"], "red");
    }

    #[tokio::test]
    async fn test_load_missing_document() {
        let remote = MemoryFileStore::new();
        let (config, version) = load_site_config(&remote, "data/site.json").await.unwrap();
        assert_eq!(config, SiteConfig::default());
        assert!(version.is_none());
    }
}
