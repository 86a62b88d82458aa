//! Batch image processor.
//!
//! Scans the uploads directory for originals that have no manifest entry yet,
//! writes a thumbnail for each and appends a stub record. Runs sequentially and
//! is safe to rerun: files whose id already exists are skipped.

mod metadata;
mod slug;
mod thumbnail;

pub use metadata::{camera_name, exif_date, read_exif, ExifSummary};
pub use slug::slugify;
pub use thumbnail::{write_thumbnail, JPEG_QUALITY, THUMBNAIL_SIZE};

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use image::GenericImageView;
use walkdir::WalkDir;

use crate::config::Config;
use crate::errors::AppResult;
use crate::models::{Category, Manifest, PhotoRecord};

/// File extensions treated as originals
const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "tif", "tiff"];

/// Where the processor reads and writes.
#[derive(Debug, Clone)]
pub struct BatchPaths {
    pub uploads_dir: PathBuf,
    pub thumbs_dir: PathBuf,
    pub manifest_path: PathBuf,
}

impl BatchPaths {
    pub fn from_config(config: &Config) -> Self {
        Self {
            uploads_dir: config.uploads_dir.clone(),
            thumbs_dir: config.thumbs_dir.clone(),
            manifest_path: config.local_manifest_path(),
        }
    }

    /// Same layout rooted somewhere else, the relative manifest paths unchanged.
    pub fn under(root: &Path) -> Self {
        Self {
            uploads_dir: root.join("photos/uploads"),
            thumbs_dir: root.join("photos/thumbs"),
            manifest_path: root.join("data/photos.json"),
        }
    }
}

/// Outcome of one processor run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Ids of the records appended
    pub added: Vec<String>,
    /// File names skipped because their id is taken or empty
    pub skipped: Vec<String>,
    /// File names that could not be processed
    pub failed: Vec<String>,
}

pub struct BatchProcessor {
    paths: BatchPaths,
    /// Manifest-relative prefix for `src`
    src_prefix: String,
    /// Manifest-relative prefix for `thumb`
    thumb_prefix: String,
}

impl BatchProcessor {
    pub fn new(paths: BatchPaths) -> Self {
        Self {
            paths,
            src_prefix: "photos/uploads".to_string(),
            thumb_prefix: "photos/thumbs".to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut processor = Self::new(BatchPaths::from_config(config));
        processor.src_prefix = url_path(&config.uploads_dir);
        processor.thumb_prefix = url_path(&config.thumbs_dir);
        processor
    }

    pub fn run(&self) -> AppResult<BatchReport> {
        let mut manifest = read_local_manifest(&self.paths.manifest_path)?;
        let mut known: HashSet<String> = manifest.photos.iter().map(|p| p.id.clone()).collect();
        let mut report = BatchReport::default();

        let originals = self.scan()?;
        if originals.is_empty() {
            tracing::info!("No originals in {}", self.paths.uploads_dir.display());
            return Ok(report);
        }
        fs::create_dir_all(&self.paths.thumbs_dir)?;

        for path in originals {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
            else {
                tracing::warn!("Skipping non UTF-8 file name {}", path.display());
                report.failed.push(path.display().to_string());
                continue;
            };
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let id = slugify(stem);

            if id.is_empty() || known.contains(&id) {
                tracing::debug!("Skipping {} (id {:?} empty or taken)", file_name, id);
                report.skipped.push(file_name);
                continue;
            }

            match self.process(&path, &file_name, &id) {
                Ok(record) => {
                    tracing::info!("Added {} ({}x{})", record.id, record.width, record.height);
                    known.insert(id.clone());
                    manifest.photos.push(record);
                    report.added.push(id);
                }
                Err(e) => {
                    tracing::warn!("Could not process {}: {}", file_name, e);
                    report.failed.push(file_name);
                }
            }
        }

        if !report.added.is_empty() {
            if let Some(parent) = self.paths.manifest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.paths.manifest_path, manifest.to_json_bytes()?)?;
            tracing::info!(
                "Wrote {} with {} new photos",
                self.paths.manifest_path.display(),
                report.added.len()
            );
        }

        Ok(report)
    }

    /// Originals directly inside the uploads directory, sorted by file name.
    fn scan(&self) -> AppResult<Vec<PathBuf>> {
        if !self.paths.uploads_dir.is_dir() {
            tracing::warn!(
                "Uploads directory {} does not exist",
                self.paths.uploads_dir.display()
            );
            return Ok(Vec::new());
        }

        let mut originals = Vec::new();
        for entry in WalkDir::new(&self.paths.uploads_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() && is_image(entry.path()) {
                originals.push(entry.into_path());
            }
        }
        Ok(originals)
    }

    fn process(&self, path: &Path, file_name: &str, id: &str) -> AppResult<PhotoRecord> {
        let image = image::open(path)?;
        let (width, height) = image.dimensions();

        let thumb_name = format!("{}.jpg", id);
        write_thumbnail(&image, &self.paths.thumbs_dir.join(&thumb_name))?;

        let exif = read_exif(path);

        Ok(PhotoRecord {
            id: id.to_string(),
            src: format!("{}/{}", self.src_prefix, file_name),
            thumb: format!("{}/{}", self.thumb_prefix, thumb_name),
            category: Category::Uncategorized,
            tags: Vec::new(),
            camera: exif.camera,
            date: exif.date,
            width,
            height,
            featured: false,
            ..Default::default()
        })
    }
}

/// Read the local manifest; a missing file is an empty manifest.
pub fn read_local_manifest(path: &Path) -> AppResult<Manifest> {
    match fs::read(path) {
        Ok(bytes) => Ok(Manifest::from_slice(&bytes, None)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Manifest::default()),
        Err(e) => Err(e.into()),
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Relative directory as a `/`-separated path for manifest entries.
fn url_path(dir: &Path) -> String {
    dir.components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
