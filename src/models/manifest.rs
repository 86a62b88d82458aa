//! Manifest model: the ordered photo list plus the remote version tag.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PhotoRecord;
use crate::errors::AppResult;

/// Opaque concurrency token handed out by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The committed photo collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub photos: Vec<PhotoRecord>,
    /// `None` only while the manifest has never been written remotely
    pub version: Option<VersionTag>,
}

#[derive(Serialize)]
struct ManifestDocument<'a> {
    photos: &'a [PhotoRecord],
}

impl Manifest {
    /// Build a manifest, dropping records whose id was already seen.
    pub fn new(photos: Vec<PhotoRecord>, version: Option<VersionTag>) -> Self {
        let mut seen = HashSet::new();
        let photos = photos
            .into_iter()
            .filter(|photo| {
                let fresh = seen.insert(photo.id.clone());
                if !fresh {
                    tracing::warn!("Dropping duplicate manifest entry {}", photo.id);
                }
                fresh
            })
            .collect();

        Self { photos, version }
    }

    /// Parse manifest bytes. Anything that is not a valid document reads as no photos.
    pub fn from_slice(bytes: &[u8], version: Option<VersionTag>) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => Self::from_value(&value, version),
            Err(e) => {
                tracing::warn!("Manifest is not valid JSON, treating as empty: {}", e);
                Self::new(Vec::new(), version)
            }
        }
    }

    /// Normalize a parsed document of the form `{ "photos": [...] }`.
    pub fn from_value(value: &Value, version: Option<VersionTag>) -> Self {
        let Some(entries) = value.get("photos").and_then(Value::as_array) else {
            tracing::warn!("Manifest has no photos array, treating as empty");
            return Self::new(Vec::new(), version);
        };

        let photos = entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let record = PhotoRecord::from_value(entry);
                if record.is_none() {
                    tracing::warn!("Dropping manifest entry {} without a usable id", index);
                }
                record
            })
            .collect();

        Self::new(photos, version)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.photos.iter().any(|photo| photo.id == id)
    }

    pub fn to_json_bytes(&self) -> AppResult<Vec<u8>> {
        serialize_photos(&self.photos)
    }
}

/// Deterministic pretty-printed manifest document with a trailing newline.
pub fn serialize_photos(photos: &[PhotoRecord]) -> AppResult<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(&ManifestDocument { photos })?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_slice_drops_invalid_and_duplicate_entries() {
        let bytes = serde_json::to_vec(&json!({
            "photos": [
                { "id": "a", "title": "First" },
                { "title": "No id" },
                { "id": "b" },
                { "id": "a", "title": "Duplicate" }
            ]
        }))
        .unwrap();

        let manifest = Manifest::from_slice(&bytes, Some(VersionTag::new("v1")));
        let ids: Vec<_> = manifest.photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(manifest.photos[0].title, "First");
        assert_eq!(manifest.version, Some(VersionTag::new("v1")));
    }

    #[test]
    fn test_malformed_document_reads_as_empty() {
        assert!(Manifest::from_slice(b"not json", None).photos.is_empty());
        assert!(Manifest::from_slice(b"[1, 2, 3]", None).photos.is_empty());
        assert!(Manifest::from_slice(b"{\"photos\": 5}", None).photos.is_empty());
        assert!(Manifest::from_slice(&[0xff, 0xfe], None).photos.is_empty());
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let manifest = Manifest::new(
            vec![PhotoRecord {
                id: "a".to_string(),
                title: "Dunes".to_string(),
                tags: vec!["desert".to_string()],
                ..Default::default()
            }],
            None,
        );

        let first = manifest.to_json_bytes().unwrap();
        let second = manifest.to_json_bytes().unwrap();
        assert_eq!(first, second);

        let text = String::from_utf8(first).unwrap();
        assert!(text.starts_with("{\n  \"photos\": [\n"));
        assert!(text.ends_with("}\n"));
        let id_at = text.find("\"id\"").unwrap();
        let featured_at = text.find("\"featured\"").unwrap();
        assert!(id_at < featured_at);
        assert!(text.contains("\"category\": \"Uncategorized\""));
    }

    #[test]
    fn test_written_manifest_reads_back() {
        let manifest = Manifest::new(
            vec![PhotoRecord {
                id: "harbor".to_string(),
                width: 4000,
                height: 3000,
                featured: true,
                ..Default::default()
            }],
            None,
        );
        let bytes = manifest.to_json_bytes().unwrap();
        assert_eq!(Manifest::from_slice(&bytes, None), manifest);
    }
}
