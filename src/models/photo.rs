//! Photo record model matching the gallery manifest entries.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::tag::normalize_tags;

/// Fixed set of gallery categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    Landscape,
    Portrait,
    Street,
    Architecture,
    Nature,
    Wildlife,
    Travel,
    Night,
    Abstract,
    #[default]
    Uncategorized,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Landscape,
        Category::Portrait,
        Category::Street,
        Category::Architecture,
        Category::Nature,
        Category::Wildlife,
        Category::Travel,
        Category::Night,
        Category::Abstract,
        Category::Uncategorized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Landscape => "Landscape",
            Category::Portrait => "Portrait",
            Category::Street => "Street",
            Category::Architecture => "Architecture",
            Category::Nature => "Nature",
            Category::Wildlife => "Wildlife",
            Category::Travel => "Travel",
            Category::Night => "Night",
            Category::Abstract => "Abstract",
            Category::Uncategorized => "Uncategorized",
        }
    }

    /// Case-insensitive lookup by display name.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Category::parse(&raw).unwrap_or_default())
    }
}

/// One photo's editable metadata.
///
/// Empty strings are the canonical unset value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PhotoRecord {
    pub id: String,
    pub src: String,
    pub thumb: String,
    pub title: String,
    pub location: String,
    pub date: String,
    pub description: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub camera: String,
    pub width: u32,
    pub height: u32,
    pub featured: bool,
}

impl PhotoRecord {
    /// Build a record from an arbitrary manifest entry, defaulting field by field.
    ///
    /// Returns `None` when the entry has no usable id.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let id = match obj.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) if n.is_u64() || n.is_i64() => n.to_string(),
            _ => return None,
        };

        let text = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let dimension = |key: &str| {
            obj.get(key)
                .and_then(Value::as_u64)
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
                .unwrap_or(0)
        };

        let category = obj
            .get("category")
            .and_then(Value::as_str)
            .and_then(Category::parse)
            .unwrap_or_default();

        let tags: Vec<String> = obj
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        let record = PhotoRecord {
            id,
            src: text("src"),
            thumb: text("thumb"),
            title: text("title"),
            location: text("location"),
            date: text("date"),
            description: text("description"),
            category,
            tags,
            camera: text("camera"),
            width: dimension("width"),
            height: dimension("height"),
            featured: obj.get("featured").and_then(Value::as_bool).unwrap_or(false),
        };

        Some(record.normalized())
    }

    /// Apply the record invariants: normalized unique tags, ISO date or empty.
    pub fn normalized(mut self) -> Self {
        self.tags = normalize_tags(self.tags.iter().map(String::as_str));
        self.date = normalize_date(&self.date);
        self
    }

    /// Merge a partial change into a copy of this record.
    pub fn apply(&self, changes: &PhotoChanges) -> Self {
        let mut next = self.clone();

        if let Some(src) = &changes.src {
            next.src = src.clone();
        }
        if let Some(thumb) = &changes.thumb {
            next.thumb = thumb.clone();
        }
        if let Some(title) = &changes.title {
            next.title = title.clone();
        }
        if let Some(location) = &changes.location {
            next.location = location.clone();
        }
        if let Some(date) = &changes.date {
            next.date = date.clone();
        }
        if let Some(description) = &changes.description {
            next.description = description.clone();
        }
        if let Some(category) = changes.category {
            next.category = category;
        }
        if let Some(tags) = &changes.tags {
            next.tags = tags.clone();
        }
        if let Some(camera) = &changes.camera {
            next.camera = camera.clone();
        }
        if let Some(width) = changes.width {
            next.width = width;
        }
        if let Some(height) = changes.height {
            next.height = height;
        }
        if let Some(featured) = changes.featured {
            next.featured = featured;
        }

        next.normalized()
    }

    /// Local backing files in `src`, `thumb` order, skipping empty and external paths.
    pub fn local_files(&self) -> Vec<&str> {
        [self.src.as_str(), self.thumb.as_str()]
            .into_iter()
            .filter(|path| !path.is_empty() && is_local_path(path))
            .collect()
    }
}

/// Partial change to a photo record. The id is not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
}

impl PhotoChanges {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn tags(tags: Vec<String>) -> Self {
        Self {
            tags: Some(tags),
            ..Default::default()
        }
    }
}

/// A path is external when it carries a URL scheme or is protocol-relative.
pub fn is_local_path(path: &str) -> bool {
    let lower = path.trim_start().to_ascii_lowercase();
    !(lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("//"))
}

/// Keep `YYYY-MM-DD` (cutting a longer ISO timestamp to its date), else empty.
fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .filter(|_| raw.len() == 10 || raw[10..].starts_with(['T', ' ']))
        .map(|day| day.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
