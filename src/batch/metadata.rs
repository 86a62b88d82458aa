//! Best-effort camera and capture date from embedded EXIF.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDate;
use exif::{Exif, In, Reader, Tag, Value};

/// The EXIF fields a stub manifest entry uses. Empty when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifSummary {
    pub camera: String,
    pub date: String,
}

/// Read EXIF from an image file. Missing or unreadable metadata yields defaults.
pub fn read_exif(path: &Path) -> ExifSummary {
    let exif = File::open(path)
        .map_err(exif::Error::from)
        .and_then(|file| Reader::new().read_from_container(&mut BufReader::new(file)));

    let exif = match exif {
        Ok(exif) => exif,
        Err(e) => {
            tracing::debug!("No EXIF in {}: {}", path.display(), e);
            return ExifSummary::default();
        }
    };

    let camera = camera_name(
        &ascii_field(&exif, Tag::Make).unwrap_or_default(),
        &ascii_field(&exif, Tag::Model).unwrap_or_default(),
    );
    let date = [Tag::DateTimeOriginal, Tag::DateTime]
        .into_iter()
        .filter_map(|tag| ascii_field(&exif, tag))
        .find_map(|raw| exif_date(&raw))
        .unwrap_or_default();

    ExifSummary { camera, date }
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| {
                String::from_utf8_lossy(bytes)
                    .trim_matches(char::from(0))
                    .trim()
                    .to_string()
            })
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// Join make and model, dropping the make when the model already names it.
pub fn camera_name(make: &str, model: &str) -> String {
    let make = make.trim();
    let model = model.trim();

    let brand = make.split_whitespace().next().unwrap_or_default();
    if model.is_empty() {
        return make.to_string();
    }
    if brand.is_empty() || model.to_lowercase().starts_with(&brand.to_lowercase()) {
        return model.to_string();
    }
    format!("{} {}", make, model)
}

/// `YYYY:MM:DD HH:MM:SS` to `YYYY-MM-DD`.
pub fn exif_date(raw: &str) -> Option<String> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y:%m:%d")
        .or_else(|_| NaiveDate::parse_from_str(day, "%Y-%m-%d"))
        .ok()
        .map(|date| date.format("%Y-%m-%d").to_string())
}
