use once_cell::sync::Lazy;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::QueryBuilder;

use crate::domain::catalog_entry::{
    photo_limit_message, CatalogEntry, EntryFields, EntryStatus, MAX_PHOTOS,
};
use crate::domain::error::{AppError, Result};
use crate::domain::search::{FilterOptions, SearchQuery};
use crate::domain::workflow::ListingScope;
use crate::infrastructure::storage::StoredPhoto;
use crate::shared::pagination::{Page, PageWindow};

use super::entities::CatalogEntryEntity;
use super::CatalogRepository;

/// Editable columns, in the order [`bind_fields`] binds them.
const FIELD_COLUMNS: [&str; 28] = [
    "latitude",
    "longitude",
    "object_name",
    "locality_pl",
    "locality_foreign",
    "region",
    "county",
    "location_description",
    "object_type",
    "material",
    "height",
    "width",
    "description",
    "inscription",
    "script_type",
    "translation",
    "heraldry",
    "genealogy",
    "bibliography",
    "source_references",
    "commemorated_person",
    "scan_3d_url",
    "entry_authors",
    "entry_date",
    "correction_1_author",
    "correction_1_date",
    "correction_2_author",
    "correction_2_date",
];

/// Columns matched by the free-text search.
const TEXT_SEARCH_COLUMNS: [&str; 6] = [
    "locality_pl",
    "object_name",
    "object_type",
    "description",
    "inscription",
    "commemorated_person",
];

static INSERT_ENTRY_SQL: Lazy<String> = Lazy::new(|| {
    let placeholders = vec!["?"; FIELD_COLUMNS.len() + 4].join(", ");
    format!(
        "INSERT INTO catalog_entries ({}, status, owner_id, created_at, updated_at) VALUES ({})",
        FIELD_COLUMNS.join(", "),
        placeholders
    )
});

static UPDATE_ENTRY_SQL: Lazy<String> = Lazy::new(|| {
    let assignments: Vec<String> = FIELD_COLUMNS.iter().map(|c| format!("{} = ?", c)).collect();
    format!(
        "UPDATE catalog_entries SET {}, status = ?, updated_at = ? WHERE id = ?",
        assignments.join(", ")
    )
});

fn bind_fields<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    f: &'q EntryFields,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(f.latitude)
        .bind(f.longitude)
        .bind(f.object_name.as_deref())
        .bind(f.locality_pl.as_str())
        .bind(f.locality_foreign.as_deref())
        .bind(f.region.as_deref())
        .bind(f.county.as_deref())
        .bind(f.location_description.as_deref())
        .bind(f.object_type.as_str())
        .bind(f.material.as_deref())
        .bind(f.height)
        .bind(f.width)
        .bind(f.description.as_deref())
        .bind(f.inscription.as_deref())
        .bind(f.script_type.as_deref())
        .bind(f.translation.as_deref())
        .bind(f.heraldry.as_deref())
        .bind(f.genealogy.as_deref())
        .bind(f.bibliography.as_deref())
        .bind(f.source_references.as_deref())
        .bind(f.commemorated_person.as_deref())
        .bind(f.scan_3d_url.as_deref())
        .bind(f.entry_authors.as_deref())
        .bind(f.entry_date)
        .bind(f.correction_1_author.as_deref())
        .bind(f.correction_1_date)
        .bind(f.correction_2_author.as_deref())
        .bind(f.correction_2_date)
}

pub(super) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Escape LIKE wildcards so user text matches literally.
fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn push_scope(qb: &mut QueryBuilder<'_, Sqlite>, scope: &ListingScope) {
    if let Some(owner_id) = scope.owner_id {
        qb.push(" AND owner_id = ").push_bind(owner_id);
    }
    if let Some(status) = scope.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
}

fn push_search(qb: &mut QueryBuilder<'_, Sqlite>, query: &SearchQuery) {
    qb.push(" AND status = ")
        .push_bind(EntryStatus::Published.as_str());

    if let Some(text) = &query.text {
        let pattern = like_pattern(text);
        qb.push(" AND (");
        for (idx, column) in TEXT_SEARCH_COLUMNS.iter().enumerate() {
            if idx > 0 {
                qb.push(" OR ");
            }
            qb.push(*column)
                .push(" LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
        }
        qb.push(")");
    }

    let exact = [
        ("region", &query.region),
        ("county", &query.county),
        ("object_type", &query.object_type),
        ("material", &query.material),
    ];
    for (column, value) in exact {
        if let Some(value) = value {
            qb.push(" AND ")
                .push(column)
                .push(" = ")
                .push_bind(value.clone());
        }
    }
}

impl CatalogRepository {
    pub async fn insert_entry(
        &self,
        fields: &EntryFields,
        status: EntryStatus,
        owner_id: Option<i64>,
    ) -> Result<CatalogEntry> {
        let now = now_millis();
        let result = bind_fields(sqlx::query(INSERT_ENTRY_SQL.as_str()), fields)
            .bind(status.as_str())
            .bind(owner_id)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to insert catalog entry: {}", e)))?;

        self.get_entry(result.last_insert_rowid()).await
    }

    /// Overwrite the editable fields and status; the owner never changes.
    pub async fn update_entry(
        &self,
        id: i64,
        fields: &EntryFields,
        status: EntryStatus,
    ) -> Result<CatalogEntry> {
        let result = bind_fields(sqlx::query(UPDATE_ENTRY_SQL.as_str()), fields)
            .bind(status.as_str())
            .bind(now_millis())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to update catalog entry: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Catalog entry not found: {}", id)));
        }
        self.get_entry(id).await
    }

    /// Update fields and status, detach `remove_photo_ids` and attach
    /// `add_photos` in one transaction. Nothing is written when any step
    /// fails, including the photo cap check on the final count.
    pub async fn apply_entry_edit(
        &self,
        id: i64,
        fields: &EntryFields,
        status: EntryStatus,
        remove_photo_ids: &[i64],
        add_photos: &[StoredPhoto],
    ) -> Result<CatalogEntry> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let now = now_millis();
        let result = bind_fields(sqlx::query(UPDATE_ENTRY_SQL.as_str()), fields)
            .bind(status.as_str())
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to update catalog entry: {}", e)))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Catalog entry not found: {}", id)));
        }

        for photo_id in remove_photo_ids {
            let result = sqlx::query("DELETE FROM photos WHERE id = ? AND entry_id = ?")
                .bind(photo_id)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to delete photo: {}", e)))?;
            if result.rows_affected() == 0 {
                return Err(AppError::NotFound(format!("Photo not found: {}", photo_id)));
            }
        }

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM photos WHERE entry_id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count photos: {}", e)))?;
        let total = remaining as usize + add_photos.len();
        if total > MAX_PHOTOS {
            return Err(AppError::ValidationError(photo_limit_message(total)));
        }

        for stored in add_photos {
            sqlx::query(
                "INSERT INTO photos (entry_id, file, original_file, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(id)
            .bind(&stored.file)
            .bind(stored.original_file.as_deref())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to insert photo: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit entry edit: {}", e)))?;

        self.get_entry(id).await
    }

    pub async fn set_status(&self, id: i64, status: EntryStatus) -> Result<()> {
        let result = sqlx::query("UPDATE catalog_entries SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now_millis())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to update entry status: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Catalog entry not found: {}", id)));
        }
        Ok(())
    }

    pub async fn get_entry(&self, id: i64) -> Result<CatalogEntry> {
        let entry = sqlx::query_as::<_, CatalogEntryEntity>("SELECT * FROM catalog_entries WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch catalog entry: {}", e)))?;

        match entry {
            Some(entry) => Ok(entry.into()),
            None => Err(AppError::NotFound(format!("Catalog entry not found: {}", id))),
        }
    }

    /// Delete an entry; its photo rows go with it.
    pub async fn delete_entry(&self, id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM catalog_entries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete catalog entry: {}", e)))?;

        Ok(result.rows_affected())
    }

    pub async fn count_entries(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_entries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count catalog entries: {}", e)))?;

        Ok(count as u64)
    }

    /// Newest-first page of the entries a listing scope admits.
    pub async fn list_entries(
        &self,
        scope: &ListingScope,
        page: u32,
        per_page: u32,
    ) -> Result<Page<CatalogEntry>> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM catalog_entries WHERE 1 = 1");
        push_scope(&mut count_qb, scope);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count listing: {}", e)))?;

        let window = PageWindow::resolve(page, per_page, total as u64);
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM catalog_entries WHERE 1 = 1");
        push_scope(&mut qb, scope);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(window.per_page as i64)
            .push(" OFFSET ")
            .push_bind(window.offset as i64);

        let rows = qb
            .build_query_as::<CatalogEntryEntity>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list catalog entries: {}", e)))?;

        Ok(window.into_page(rows.into_iter().map(Into::into).collect(), total as u64))
    }

    /// Published entries matching the free text and exact-match filters.
    pub async fn search_published(
        &self,
        query: &SearchQuery,
        page: u32,
        per_page: u32,
    ) -> Result<Page<CatalogEntry>> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM catalog_entries WHERE 1 = 1");
        push_search(&mut count_qb, query);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count search results: {}", e)))?;

        let window = PageWindow::resolve(page, per_page, total as u64);
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM catalog_entries WHERE 1 = 1");
        push_search(&mut qb, query);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(window.per_page as i64)
            .push(" OFFSET ")
            .push_bind(window.offset as i64);

        let rows = qb
            .build_query_as::<CatalogEntryEntity>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to search catalog: {}", e)))?;

        Ok(window.into_page(rows.into_iter().map(Into::into).collect(), total as u64))
    }

    /// Distinct non-empty filter values among published entries.
    pub async fn filter_options(&self) -> Result<FilterOptions> {
        Ok(FilterOptions {
            regions: self.distinct_published("region").await?,
            counties: self.distinct_published("county").await?,
            object_types: self.distinct_published("object_type").await?,
            materials: self.distinct_published("material").await?,
        })
    }

    async fn distinct_published(&self, column: &'static str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT {col} FROM catalog_entries WHERE status = ? AND {col} IS NOT NULL AND {col} != '' ORDER BY {col}",
            col = column
        );
        sqlx::query_scalar::<_, String>(&sql)
            .bind(EntryStatus::Published.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to load {} values: {}", column, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fields(locality: &str, object_type: &str) -> EntryFields {
        EntryFields::new(locality, object_type)
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let repo = CatalogRepository::in_memory().await.unwrap();
        let mut input = fields("Kraków", "Nagrobek");
        input.latitude = Some(50.0547);
        input.entry_date = NaiveDate::from_ymd_opt(2024, 3, 9);
        input.region = Some("małopolskie".to_string());

        let created = repo
            .insert_entry(&input, EntryStatus::Draft, Some(7))
            .await
            .unwrap();
        assert_eq!(created.status, EntryStatus::Draft);
        assert_eq!(created.owner_id, Some(7));

        let loaded = repo.get_entry(created.id).await.unwrap();
        assert_eq!(loaded.fields, input);
    }

    #[tokio::test]
    async fn test_update_keeps_owner() {
        let repo = CatalogRepository::in_memory().await.unwrap();
        let created = repo
            .insert_entry(&fields("Kraków", "Nagrobek"), EntryStatus::Draft, Some(7))
            .await
            .unwrap();

        let mut changed = created.fields.clone();
        changed.material = Some("piaskowiec".to_string());
        let updated = repo
            .update_entry(created.id, &changed, EntryStatus::InReview)
            .await
            .unwrap();

        assert_eq!(updated.owner_id, Some(7));
        assert_eq!(updated.status, EntryStatus::InReview);
        assert_eq!(updated.fields.material.as_deref(), Some("piaskowiec"));
    }

    fn stored(name: &str) -> StoredPhoto {
        StoredPhoto {
            file: format!("zdjecia/2024/01/01/{name}.jpg"),
            original_file: None,
        }
    }

    #[tokio::test]
    async fn test_entry_edit_swaps_photos() {
        let repo = CatalogRepository::in_memory().await.unwrap();
        let created = repo
            .insert_entry(&fields("Kraków", "Nagrobek"), EntryStatus::Draft, Some(7))
            .await
            .unwrap();
        let old = repo.insert_photo(created.id, &stored("old")).await.unwrap();

        let updated = repo
            .apply_entry_edit(
                created.id,
                &created.fields,
                EntryStatus::InReview,
                &[old.id],
                &[stored("new")],
            )
            .await
            .unwrap();

        assert_eq!(updated.status, EntryStatus::InReview);
        let photos = repo.list_photos(created.id).await.unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].file, "zdjecia/2024/01/01/new.jpg");
    }

    #[tokio::test]
    async fn test_entry_edit_over_cap_writes_nothing() {
        let repo = CatalogRepository::in_memory().await.unwrap();
        let created = repo
            .insert_entry(&fields("Kraków", "Nagrobek"), EntryStatus::Draft, Some(7))
            .await
            .unwrap();
        let first = repo.insert_photo(created.id, &stored("a")).await.unwrap();
        for i in 1..MAX_PHOTOS {
            repo.insert_photo(created.id, &stored(&format!("f{i}"))).await.unwrap();
        }

        let mut changed = created.fields.clone();
        changed.material = Some("granit".to_string());
        let extra: Vec<StoredPhoto> = (0..2).map(|i| stored(&format!("x{i}"))).collect();
        let err = repo
            .apply_entry_edit(created.id, &changed, EntryStatus::InReview, &[first.id], &extra)
            .await
            .unwrap_err();
        assert!(err.message().contains("maksymalnie 10"));

        let after = repo.get_entry(created.id).await.unwrap();
        assert_eq!(after.status, EntryStatus::Draft);
        assert_eq!(after.fields.material, None);
        assert_eq!(repo.count_photos(created.id).await.unwrap(), MAX_PHOTOS);
        assert!(repo.get_photo(first.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_entry_edit_rejects_foreign_photo() {
        let repo = CatalogRepository::in_memory().await.unwrap();
        let a = repo
            .insert_entry(&fields("Kraków", "Nagrobek"), EntryStatus::Draft, Some(7))
            .await
            .unwrap();
        let b = repo
            .insert_entry(&fields("Lwów", "Tablica"), EntryStatus::Draft, Some(7))
            .await
            .unwrap();
        let foreign = repo.insert_photo(b.id, &stored("b")).await.unwrap();

        let err = repo
            .apply_entry_edit(a.id, &a.fields, EntryStatus::Draft, &[foreign.id], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(repo.count_photos(b.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_entry_is_not_found() {
        let repo = CatalogRepository::in_memory().await.unwrap();
        assert!(matches!(repo.get_entry(99).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            repo.update_entry(99, &fields("a", "b"), EntryStatus::Draft).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.set_status(99, EntryStatus::Published).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_entries_by_scope() {
        let repo = CatalogRepository::in_memory().await.unwrap();
        repo.insert_entry(&fields("A", "Krzyż"), EntryStatus::Draft, Some(1)).await.unwrap();
        repo.insert_entry(&fields("B", "Krzyż"), EntryStatus::InReview, Some(1)).await.unwrap();
        repo.insert_entry(&fields("C", "Krzyż"), EntryStatus::InReview, Some(2)).await.unwrap();

        let review = ListingScope {
            owner_id: None,
            status: Some(EntryStatus::InReview),
        };
        assert_eq!(repo.list_entries(&review, 1, 12).await.unwrap().total_items, 2);

        let own = ListingScope {
            owner_id: Some(1),
            status: None,
        };
        let page = repo.list_entries(&own, 1, 12).await.unwrap();
        assert_eq!(page.total_items, 2);
        assert!(page.items.iter().all(|e| e.owner_id == Some(1)));
    }

    #[tokio::test]
    async fn test_listing_pages_are_clamped() {
        let repo = CatalogRepository::in_memory().await.unwrap();
        for i in 0..13 {
            repo.insert_entry(&fields(&format!("Miejscowość {i}"), "Krzyż"), EntryStatus::Published, None)
                .await
                .unwrap();
        }

        let last = repo.list_entries(&ListingScope::public(), 50, 12).await.unwrap();
        assert_eq!(last.page, 2);
        assert_eq!(last.total_pages, 2);
        assert_eq!(last.items.len(), 1);
    }

    #[tokio::test]
    async fn test_search_returns_only_published() {
        let repo = CatalogRepository::in_memory().await.unwrap();
        let mut published = fields("Kraków", "Nagrobek");
        published.inscription = Some("Tu spoczywa 100% prawdy".to_string());
        published.region = Some("małopolskie".to_string());
        repo.insert_entry(&published, EntryStatus::Published, None).await.unwrap();
        repo.insert_entry(&fields("Kraków", "Nagrobek"), EntryStatus::Draft, Some(1)).await.unwrap();
        repo.insert_entry(&fields("Kraków", "Nagrobek"), EntryStatus::Withdrawn, None).await.unwrap();

        let all = repo.search_published(&SearchQuery::default(), 1, 12).await.unwrap();
        assert_eq!(all.total_items, 1);

        let query = SearchQuery {
            text: Some("100%".to_string()),
            region: Some("małopolskie".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.search_published(&query, 1, 12).await.unwrap().total_items, 1);

        let wildcard = SearchQuery {
            text: Some("_%".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.search_published(&wildcard, 1, 12).await.unwrap().total_items, 0);

        let other_region = SearchQuery {
            region: Some("pomorskie".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.search_published(&other_region, 1, 12).await.unwrap().total_items, 0);
    }

    #[tokio::test]
    async fn test_filter_options_are_distinct_and_public() {
        let repo = CatalogRepository::in_memory().await.unwrap();
        let mut a = fields("A", "Krzyż");
        a.material = Some("żeliwo".to_string());
        let mut b = fields("B", "Krzyż");
        b.material = Some("kamień".to_string());
        let mut hidden = fields("C", "Kapliczka");
        hidden.material = Some("drewno".to_string());

        repo.insert_entry(&a, EntryStatus::Published, None).await.unwrap();
        repo.insert_entry(&b, EntryStatus::Published, None).await.unwrap();
        repo.insert_entry(&hidden, EntryStatus::Draft, Some(1)).await.unwrap();

        let options = repo.filter_options().await.unwrap();
        assert_eq!(options.object_types, vec!["Krzyż".to_string()]);
        assert_eq!(options.materials.len(), 2);
        assert!(options.regions.is_empty());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_a\\"), "%50\\%\\_a\\\\%");
    }
}
