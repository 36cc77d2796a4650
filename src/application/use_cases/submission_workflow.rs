// ============================================================
// SUBMISSION WORKFLOW USE CASE
// ============================================================
// Create, edit, view and list catalog entries on behalf of an actor

use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::domain::actor::Actor;
use crate::domain::catalog_entry::{
    ensure_photo_capacity, CatalogEntry, CreationDefaults, EntryFields, Photo,
};
use crate::domain::error::{AppError, Result};
use crate::domain::search::{FilterOptions, SearchQuery};
use crate::domain::workflow::{
    can_create, can_edit, can_view, resolve_transition, submission_scope, StatusRequest,
};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::catalog::CatalogRepository;
use crate::infrastructure::photos::{ImageOptimizer, OptimizerSettings};
use crate::infrastructure::storage::{MediaStorage, StoredPhoto};
use crate::shared::pagination::Page;

use super::photo_ingest::{ingest_photo, store_rendition};

pub const DEFAULT_PAGE_SIZE: u32 = 12;

const MIN_PHOTOS_MESSAGE: &str = "Obiekt musi mieć co najmniej jedno zdjęcie.";

/// Entry together with its photos, as shown on the detail view.
#[derive(Debug, Clone, Serialize)]
pub struct EntryDetails {
    pub entry: CatalogEntry,
    pub photos: Vec<Photo>,
}

/// Submitted edit form.
#[derive(Debug, Clone)]
pub struct EntryEdit {
    pub fields: EntryFields,
    pub request: StatusRequest,
    pub add_photos: Vec<PathBuf>,
    pub remove_photo_ids: Vec<i64>,
}

pub struct SubmissionWorkflow {
    repo: CatalogRepository,
    storage: MediaStorage,
    optimizer_settings: OptimizerSettings,
    page_size: u32,
    today: Option<NaiveDate>,
}

impl SubmissionWorkflow {
    pub fn new(repo: CatalogRepository, storage: MediaStorage) -> Self {
        Self {
            repo,
            storage,
            optimizer_settings: OptimizerSettings::default(),
            page_size: DEFAULT_PAGE_SIZE,
            today: None,
        }
    }

    pub fn from_config(repo: CatalogRepository, config: &AppConfig) -> Self {
        Self {
            repo,
            storage: config.storage(),
            optimizer_settings: config.optimizer_settings(),
            page_size: config.page_size,
            today: None,
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Create an entry owned by `actor` with 1..=10 uploaded photos.
    ///
    /// Blank author and entry date are filled from the actor and today's
    /// date. Nothing is kept when any photo cannot be stored.
    pub async fn create_entry(
        &self,
        actor: &Actor,
        fields: EntryFields,
        request: StatusRequest,
        photos: &[PathBuf],
    ) -> Result<CatalogEntry> {
        can_create(actor).into_result()?;
        let transition = resolve_transition(actor, None, request)?;
        check_photo_count(photos.len())?;

        let fields = CreationDefaults::new(actor.display_name.clone(), self.today()).apply(fields);
        fields.check()?;

        let entry = self
            .repo
            .insert_entry(&fields, transition.to, actor.user_id)
            .await?;

        if let Err(err) = self.attach_files(entry.id, photos).await {
            for photo in self.repo.list_photos(entry.id).await? {
                self.remove_files(&photo);
            }
            self.repo.delete_entry(entry.id).await?;
            return Err(err);
        }

        info!(
            entry_id = entry.id,
            user_id = ?actor.user_id,
            status = %entry.status,
            photos = photos.len(),
            "Catalog entry created"
        );
        Ok(entry)
    }

    /// Apply an edit form to an existing entry.
    ///
    /// New photos are stored first; fields, status and photo rows then
    /// change together. On failure the entry is left as it was and the
    /// newly stored files are removed.
    pub async fn edit_entry(&self, actor: &Actor, id: i64, edit: EntryEdit) -> Result<CatalogEntry> {
        let entry = self.repo.get_entry(id).await?;
        can_edit(actor, &entry).into_result()?;
        let transition = resolve_transition(actor, Some(entry.status), edit.request)?;
        edit.fields.check()?;

        let existing = self.repo.list_photos(id).await?;
        let mut removed: Vec<&Photo> = Vec::new();
        for photo_id in &edit.remove_photo_ids {
            let photo = existing
                .iter()
                .find(|p| p.id == *photo_id)
                .ok_or_else(|| AppError::NotFound(format!("Photo not found: {}", photo_id)))?;
            if !removed.iter().any(|p| p.id == photo.id) {
                removed.push(photo);
            }
        }
        check_photo_count(existing.len() - removed.len() + edit.add_photos.len())?;
        ensure_sources_exist(&edit.add_photos)?;

        let staged = self.stage_files(&edit.add_photos)?;
        let removed_ids: Vec<i64> = removed.iter().map(|p| p.id).collect();
        let updated = match self
            .repo
            .apply_entry_edit(id, &edit.fields, transition.to, &removed_ids, &staged)
            .await
        {
            Ok(updated) => updated,
            Err(err) => {
                for stored in &staged {
                    self.storage.remove(stored);
                }
                return Err(err);
            }
        };
        for photo in removed {
            self.remove_files(photo);
        }

        if transition.is_override {
            info!(
                entry_id = id,
                user_id = ?actor.user_id,
                from = ?transition.from,
                to = %transition.to,
                "Status set outside the regular lifecycle"
            );
        } else {
            info!(entry_id = id, status = %updated.status, "Catalog entry updated");
        }
        Ok(updated)
    }

    /// Move an entry to a new status without touching its fields.
    pub async fn change_status(
        &self,
        actor: &Actor,
        id: i64,
        request: StatusRequest,
    ) -> Result<CatalogEntry> {
        let entry = self.repo.get_entry(id).await?;
        can_edit(actor, &entry).into_result()?;
        let transition = resolve_transition(actor, Some(entry.status), request)?;

        self.repo.set_status(id, transition.to).await?;
        info!(
            entry_id = id,
            from = ?transition.from,
            to = %transition.to,
            is_override = transition.is_override,
            "Catalog entry status changed"
        );
        self.repo.get_entry(id).await
    }

    pub async fn view_entry(&self, actor: &Actor, id: i64) -> Result<EntryDetails> {
        let entry = self.repo.get_entry(id).await?;
        can_view(actor, &entry).into_result()?;
        let photos = self.repo.list_photos(id).await?;
        Ok(EntryDetails { entry, photos })
    }

    /// Attach one more photo to an editable entry.
    pub async fn attach_photo(&self, actor: &Actor, id: i64, source: PathBuf) -> Result<Photo> {
        let entry = self.repo.get_entry(id).await?;
        can_edit(actor, &entry).into_result()?;
        let mut photos = self.attach_files(id, std::slice::from_ref(&source)).await?;
        photos
            .pop()
            .ok_or_else(|| AppError::Internal("Photo was not stored".to_string()))
    }

    /// "My submissions": `status_param` is the raw `status` query value.
    pub async fn list_submissions(
        &self,
        actor: &Actor,
        status_param: Option<&str>,
        page: u32,
    ) -> Result<Page<CatalogEntry>> {
        let scope = submission_scope(actor, status_param)?;
        self.repo.list_entries(&scope, page, self.page_size).await
    }

    /// Public browse: published entries only.
    pub async fn search_published(&self, query: &SearchQuery, page: u32) -> Result<Page<CatalogEntry>> {
        self.repo.search_published(query, page, self.page_size).await
    }

    pub async fn filter_options(&self) -> Result<FilterOptions> {
        self.repo.filter_options().await
    }

    fn remove_files(&self, photo: &Photo) {
        self.storage.remove(&StoredPhoto {
            file: photo.file.clone(),
            original_file: photo.original_file.clone(),
        });
    }

    async fn attach_files(&self, entry_id: i64, sources: &[PathBuf]) -> Result<Vec<Photo>> {
        if sources.is_empty() {
            return Ok(Vec::new());
        }
        let scratch = scratch_dir()?;
        let optimizer = ImageOptimizer::new(self.optimizer_settings, scratch.path());

        let mut photos = Vec::with_capacity(sources.len());
        for source in sources {
            ensure_sources_exist(std::slice::from_ref(source))?;
            let photo = ingest_photo(
                &self.repo,
                &self.storage,
                &optimizer,
                entry_id,
                source,
                self.today(),
            )
            .await?;
            photos.push(photo);
        }
        Ok(photos)
    }

    /// Store renditions for `sources` without attaching them. Files stored
    /// before a failure are removed again.
    fn stage_files(&self, sources: &[PathBuf]) -> Result<Vec<StoredPhoto>> {
        if sources.is_empty() {
            return Ok(Vec::new());
        }
        let scratch = scratch_dir()?;
        let optimizer = ImageOptimizer::new(self.optimizer_settings, scratch.path());

        let mut staged = Vec::with_capacity(sources.len());
        for source in sources {
            match store_rendition(&self.storage, &optimizer, source, self.today()) {
                Ok(stored) => staged.push(stored),
                Err(err) => {
                    for stored in &staged {
                        self.storage.remove(stored);
                    }
                    return Err(err);
                }
            }
        }
        Ok(staged)
    }
}

fn scratch_dir() -> Result<tempfile::TempDir> {
    tempfile::Builder::new()
        .prefix("zabytki-renditions-")
        .tempdir()
        .map_err(|e| AppError::IoError(format!("Failed to create scratch dir: {}", e)))
}

fn ensure_sources_exist(sources: &[PathBuf]) -> Result<()> {
    match sources.iter().find(|source| !source.is_file()) {
        Some(missing) => Err(AppError::NotFound(format!(
            "Nie znaleziono pliku: {}",
            missing.display()
        ))),
        None => Ok(()),
    }
}

/// Form rule: between one and ten photos per entry.
fn check_photo_count(count: usize) -> Result<()> {
    if count == 0 {
        return Err(AppError::ValidationError(MIN_PHOTOS_MESSAGE.to_string()));
    }
    ensure_photo_capacity(count)
}
