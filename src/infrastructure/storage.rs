use chrono::{Datelike, NaiveDate};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

use crate::domain::error::{AppError, Result};

const ORIGINALS_DIR: &str = "oryginalne";

fn io_err(msg: impl Into<String>) -> AppError {
    AppError::IoError(msg.into())
}

/// Media-root relative paths of one stored photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPhoto {
    pub file: String,
    pub original_file: Option<String>,
}

/// On-disk photo store rooted at the configured media directory.
///
/// Layout:
/// - `<photo_subdir>/YYYY/MM/DD/<name>.jpg` compressed renditions
/// - `<photo_subdir>/oryginalne/YYYY/MM/DD/<name>.<ext>` preserved originals
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    photo_subdir: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, photo_subdir: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            photo_subdir: photo_subdir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Default photo storage subdirectory.
    pub fn photo_dir(&self) -> PathBuf {
        self.root.join(&self.photo_subdir)
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Copy an original upload and its compressed rendition into the store.
    pub fn store_photo(
        &self,
        original: &Path,
        rendition: &Path,
        stored_on: NaiveDate,
    ) -> Result<StoredPhoto> {
        let stem = original
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("zdjecie");
        let ext = original
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("jpg")
            .to_lowercase();
        let rendition_ext = rendition
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("jpg")
            .to_lowercase();
        let simple = Uuid::new_v4().simple().to_string();
        let unique = format!("{}_{}", stem, &simple[..8]);

        let date_dir = format!(
            "{:04}/{:02}/{:02}",
            stored_on.year(),
            stored_on.month(),
            stored_on.day()
        );
        let file = format!("{}/{}/{}.{}", self.photo_subdir, date_dir, unique, rendition_ext);
        let original_file = format!(
            "{}/{}/{}/{}.{}",
            self.photo_subdir, ORIGINALS_DIR, date_dir, unique, ext
        );

        let original_bytes = fs::read(original)
            .map_err(|e| io_err(format!("Nie można odczytać {}: {e}", original.display())))?;
        let rendition_bytes = if rendition == original {
            original_bytes.clone()
        } else {
            fs::read(rendition)
                .map_err(|e| io_err(format!("Nie można odczytać {}: {e}", rendition.display())))?
        };

        write_atomically(&self.resolve(&original_file), &original_bytes)?;
        if let Err(e) = write_atomically(&self.resolve(&file), &rendition_bytes) {
            let _ = fs::remove_file(self.resolve(&original_file));
            return Err(e);
        }

        Ok(StoredPhoto {
            file,
            original_file: Some(original_file),
        })
    }

    /// Best-effort removal of both renditions.
    pub fn remove(&self, stored: &StoredPhoto) {
        let mut paths = vec![self.resolve(&stored.file)];
        if let Some(original) = &stored.original_file {
            paths.push(self.resolve(original));
        }
        for path in paths {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to remove stored photo");
                }
            }
        }
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| io_err(format!("Failed to create dir {}: {e}", path.display())))
}

/// Write through a temp file in the same directory, then rename into place.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let tmp_path = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
    {
        let mut file = fs::File::create(&tmp_path).map_err(|e| {
            io_err(format!("Failed to create temp file {}: {e}", tmp_path.display()))
        })?;
        file.write_all(bytes).map_err(|e| {
            io_err(format!("Failed to write temp file {}: {e}", tmp_path.display()))
        })?;
        file.sync_all().ok();
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_err(format!(
            "Failed to rename temp file {} to {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })
}
