//! Site config document: a single flat record edited in place.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AppResult;

/// Site-wide settings shown by the gallery front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteConfig {
    pub site_name: String,
    pub hero_eyebrow: String,
    pub hero_tagline: Vec<String>,
    pub show_hero_tagline: bool,
    pub show_scroll_indicator: bool,
    /// Keys this crate does not know about, kept so a save never drops them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: String::new(),
            hero_eyebrow: String::new(),
            hero_tagline: Vec::new(),
            show_hero_tagline: true,
            show_scroll_indicator: true,
            extra: Map::new(),
        }
    }
}

impl SiteConfig {
    /// Parse the document, falling back to defaults when it is not JSON.
    pub fn from_slice(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                tracing::warn!("Site config is malformed, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Build the config key by key. A wrong-typed key takes its default alone.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            tracing::warn!("Site config is not an object, using defaults");
            return Self::default();
        };
        let defaults = Self::default();

        let text = |key: &str, fallback: String| {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(fallback)
        };
        let flag = |key: &str, fallback: bool| {
            obj.get(key).and_then(Value::as_bool).unwrap_or(fallback)
        };

        let hero_tagline = match obj.get("heroTagline") {
            Some(Value::Array(lines)) => lines
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(line)) => vec![line.clone()],
            _ => defaults.hero_tagline,
        };

        let mut extra = obj.clone();
        for key in KNOWN_KEYS {
            if let Some(original) = extra.remove(key) {
                if !matches_type(key, &original) {
                    tracing::warn!("Site config key {} has the wrong type, using its default", key);
                }
            }
        }

        Self {
            site_name: text("siteName", defaults.site_name),
            hero_eyebrow: text("heroEyebrow", defaults.hero_eyebrow),
            hero_tagline,
            show_hero_tagline: flag("showHeroTagline", defaults.show_hero_tagline),
            show_scroll_indicator: flag("showScrollIndicator", defaults.show_scroll_indicator),
            extra,
        }
    }

    pub fn apply(&self, changes: &SiteConfigChanges) -> Self {
        let mut next = self.clone();
        if let Some(site_name) = &changes.site_name {
            next.site_name = site_name.clone();
        }
        if let Some(hero_eyebrow) = &changes.hero_eyebrow {
            next.hero_eyebrow = hero_eyebrow.clone();
        }
        if let Some(hero_tagline) = &changes.hero_tagline {
            next.hero_tagline = hero_tagline.clone();
        }
        if let Some(show) = changes.show_hero_tagline {
            next.show_hero_tagline = show;
        }
        if let Some(show) = changes.show_scroll_indicator {
            next.show_scroll_indicator = show;
        }
        next
    }

    pub fn to_json_bytes(&self) -> AppResult<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Document keys owned by [`SiteConfig`]; everything else lands in `extra`.
const KNOWN_KEYS: [&str; 5] = [
    "siteName",
    "heroEyebrow",
    "heroTagline",
    "showHeroTagline",
    "showScrollIndicator",
];

fn matches_type(key: &str, value: &Value) -> bool {
    match key {
        "siteName" | "heroEyebrow" => value.is_string(),
        "heroTagline" => value.is_array() || value.is_string(),
        _ => value.is_boolean(),
    }
}

/// Partial change to the site config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfigChanges {
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub hero_eyebrow: Option<String>,
    #[serde(default)]
    pub hero_tagline: Option<Vec<String>>,
    #[serde(default)]
    pub show_hero_tagline: Option<bool>,
    #[serde(default)]
    pub show_scroll_indicator: Option<bool>,
}
