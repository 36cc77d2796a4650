use crate::domain::catalog_entry::{photo_limit_message, Photo, MAX_PHOTOS};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::storage::StoredPhoto;

use super::entities::PhotoEntity;
use super::entries::now_millis;
use super::CatalogRepository;

impl CatalogRepository {
    /// Attach a stored photo, refusing once the entry already holds the maximum.
    ///
    /// Count and insert share one transaction so concurrent attachments
    /// cannot exceed the cap.
    pub async fn insert_photo(&self, entry_id: i64, stored: &StoredPhoto) -> Result<Photo> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM photos WHERE entry_id = ?")
            .bind(entry_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count photos: {}", e)))?;

        if existing as usize >= MAX_PHOTOS {
            return Err(AppError::ValidationError(photo_limit_message(
                existing as usize + 1,
            )));
        }

        let photo = sqlx::query_as::<_, PhotoEntity>(
            "INSERT INTO photos (entry_id, file, original_file, created_at) VALUES (?, ?, ?, ?) RETURNING *",
        )
        .bind(entry_id)
        .bind(&stored.file)
        .bind(stored.original_file.as_deref())
        .bind(now_millis())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to insert photo: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit photo: {}", e)))?;

        Ok(photo.into())
    }

    pub async fn list_photos(&self, entry_id: i64) -> Result<Vec<Photo>> {
        let photos = sqlx::query_as::<_, PhotoEntity>(
            "SELECT id, entry_id, file, original_file, created_at FROM photos WHERE entry_id = ? ORDER BY id",
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list photos: {}", e)))?;

        Ok(photos.into_iter().map(Into::into).collect())
    }

    pub async fn count_photos(&self, entry_id: i64) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM photos WHERE entry_id = ?")
            .bind(entry_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count photos: {}", e)))?;

        Ok(count as usize)
    }

    pub async fn get_photo(&self, id: i64) -> Result<Photo> {
        let photo = sqlx::query_as::<_, PhotoEntity>(
            "SELECT id, entry_id, file, original_file, created_at FROM photos WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch photo: {}", e)))?;

        match photo {
            Some(photo) => Ok(photo.into()),
            None => Err(AppError::NotFound(format!("Photo not found: {}", id))),
        }
    }

    pub async fn delete_photo(&self, id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM photos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete photo: {}", e)))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog_entry::{EntryFields, EntryStatus};

    fn stored(name: &str) -> StoredPhoto {
        StoredPhoto {
            file: format!("zdjecia/2024/01/01/{name}.jpg"),
            original_file: Some(format!("zdjecia/oryginalne/2024/01/01/{name}.png")),
        }
    }

    async fn repo_with_entry() -> (CatalogRepository, i64) {
        let repo = CatalogRepository::in_memory().await.unwrap();
        let entry = repo
            .insert_entry(&EntryFields::new("Kraków", "Nagrobek"), EntryStatus::Published, None)
            .await
            .unwrap();
        (repo, entry.id)
    }

    #[tokio::test]
    async fn test_photo_cap_is_enforced() {
        let (repo, entry_id) = repo_with_entry().await;
        for i in 0..MAX_PHOTOS {
            repo.insert_photo(entry_id, &stored(&format!("f{i}"))).await.unwrap();
        }

        let err = repo.insert_photo(entry_id, &stored("extra")).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(err.message().contains("maksymalnie 10"));
        assert_eq!(repo.count_photos(entry_id).await.unwrap(), MAX_PHOTOS);
    }

    #[tokio::test]
    async fn test_photos_follow_entry_deletion() {
        let (repo, entry_id) = repo_with_entry().await;
        let photo = repo.insert_photo(entry_id, &stored("a")).await.unwrap();
        assert_eq!(repo.get_photo(photo.id).await.unwrap().entry_id, entry_id);

        assert_eq!(repo.delete_entry(entry_id).await.unwrap(), 1);
        assert!(matches!(repo.get_photo(photo.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_and_delete_photos() {
        let (repo, entry_id) = repo_with_entry().await;
        let first = repo.insert_photo(entry_id, &stored("a")).await.unwrap();
        repo.insert_photo(entry_id, &stored("b")).await.unwrap();

        let photos = repo.list_photos(entry_id).await.unwrap();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].id, first.id);
        assert_eq!(photos[0].file, "zdjecia/2024/01/01/a.jpg");

        assert_eq!(repo.delete_photo(first.id).await.unwrap(), 1);
        assert_eq!(repo.count_photos(entry_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_photo_for_unknown_entry_is_rejected() {
        let repo = CatalogRepository::in_memory().await.unwrap();
        assert!(repo.insert_photo(404, &stored("a")).await.is_err());
    }
}
