use chrono::NaiveDate;
use std::path::Path;
use tracing::debug;

use crate::domain::catalog_entry::Photo;
use crate::domain::error::Result;
use crate::infrastructure::db::catalog::CatalogRepository;
use crate::infrastructure::photos::ImageOptimizer;
use crate::infrastructure::storage::{MediaStorage, StoredPhoto};

/// Compress `source` and store both renditions without touching the database.
///
/// The scratch rendition is removed whatever happens.
pub(crate) fn store_rendition(
    storage: &MediaStorage,
    optimizer: &ImageOptimizer,
    source: &Path,
    stored_on: NaiveDate,
) -> Result<StoredPhoto> {
    let optimized = optimizer.optimize(source);
    let stored = storage.store_photo(source, &optimized.path, stored_on);
    if optimized.is_compressed() {
        let _ = std::fs::remove_file(&optimized.path);
    }
    stored
}

/// Compress `source`, store both renditions and attach them to `entry_id`.
///
/// Stored files are removed again when the database refuses the photo.
pub(crate) async fn ingest_photo(
    repo: &CatalogRepository,
    storage: &MediaStorage,
    optimizer: &ImageOptimizer,
    entry_id: i64,
    source: &Path,
    stored_on: NaiveDate,
) -> Result<Photo> {
    let stored = store_rendition(storage, optimizer, source, stored_on)?;

    match repo.insert_photo(entry_id, &stored).await {
        Ok(photo) => {
            debug!(entry_id, photo_id = photo.id, file = %photo.file, "Photo attached");
            Ok(photo)
        }
        Err(err) => {
            storage.remove(&stored);
            Err(err)
        }
    }
}
