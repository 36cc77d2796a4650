use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::str::FromStr;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::error::{AppError, Result};

/// Upper bound on photos attached to a single entry.
pub const MAX_PHOTOS: usize = 10;

/// Publishing state of a catalog entry.
///
/// Serialized with the wire values used by forms, CSV files and the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryStatus {
    #[serde(rename = "roboczy")]
    Draft,
    #[serde(rename = "weryfikacja")]
    InReview,
    #[serde(rename = "opublikowany")]
    Published,
    #[serde(rename = "wycofany")]
    Withdrawn,
}

impl EntryStatus {
    pub const ALL: [EntryStatus; 4] = [
        EntryStatus::Draft,
        EntryStatus::InReview,
        EntryStatus::Published,
        EntryStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Draft => "roboczy",
            EntryStatus::InReview => "weryfikacja",
            EntryStatus::Published => "opublikowany",
            EntryStatus::Withdrawn => "wycofany",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryStatus::Draft => "Roboczy",
            EntryStatus::InReview => "Do weryfikacji",
            EntryStatus::Published => "Opublikowany",
            EntryStatus::Withdrawn => "Wycofany",
        }
    }

    /// Visible to unauthenticated visitors and in public search.
    pub fn is_public(&self) -> bool {
        matches!(self, EntryStatus::Published)
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "roboczy" | "draft" => Ok(EntryStatus::Draft),
            "weryfikacja" | "in_review" => Ok(EntryStatus::InReview),
            "opublikowany" | "published" => Ok(EntryStatus::Published),
            "wycofany" | "withdrawn" => Ok(EntryStatus::Withdrawn),
            other => Err(AppError::ValidationError(format!(
                "Nieznany status: '{}'",
                other
            ))),
        }
    }
}

/// Editable attributes of a catalog entry, shared by forms and the importer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct EntryFields {
    // Location
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[validate(length(max = 100))]
    pub object_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "pole wymagane (maks. 100 znaków)"))]
    pub locality_pl: String,
    #[validate(length(max = 100))]
    pub locality_foreign: Option<String>,
    #[validate(length(max = 50))]
    pub region: Option<String>,
    #[validate(length(max = 50))]
    pub county: Option<String>,
    #[validate(length(max = 255))]
    pub location_description: Option<String>,

    // Description
    #[validate(length(min = 1, max = 100, message = "pole wymagane (maks. 100 znaków)"))]
    pub object_type: String,
    #[validate(length(max = 100))]
    pub material: Option<String>,
    #[validate(range(min = 0.0, message = "wartość nie może być ujemna"))]
    pub height: Option<f64>,
    #[validate(range(min = 0.0, message = "wartość nie może być ujemna"))]
    pub width: Option<f64>,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    #[validate(length(max = 10000))]
    pub inscription: Option<String>,
    #[validate(length(max = 100))]
    pub script_type: Option<String>,
    #[validate(length(max = 10000))]
    pub translation: Option<String>,
    #[validate(length(max = 10000))]
    pub heraldry: Option<String>,
    #[validate(length(max = 10000))]
    pub genealogy: Option<String>,
    #[validate(length(max = 10000))]
    pub bibliography: Option<String>,
    #[validate(length(max = 10000))]
    pub source_references: Option<String>,
    #[validate(length(max = 255))]
    pub commemorated_person: Option<String>,
    #[validate(url(message = "nieprawidłowy adres URL"), length(max = 500))]
    pub scan_3d_url: Option<String>,

    // Provenance
    #[validate(length(max = 255))]
    pub entry_authors: Option<String>,
    pub entry_date: Option<NaiveDate>,
    #[validate(length(max = 255))]
    pub correction_1_author: Option<String>,
    pub correction_1_date: Option<NaiveDate>,
    #[validate(length(max = 255))]
    pub correction_2_author: Option<String>,
    pub correction_2_date: Option<NaiveDate>,
}

impl EntryFields {
    pub fn new(locality_pl: impl Into<String>, object_type: impl Into<String>) -> Self {
        Self {
            locality_pl: locality_pl.into(),
            object_type: object_type.into(),
            ..Default::default()
        }
    }

    /// Run every field rule and flatten failures into one validation error.
    pub fn check(&self) -> Result<()> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                errors.add("latitude", range_error("szerokość poza zakresem -90..90"));
            }
        }
        if let Some(lon) = self.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                errors.add("longitude", range_error("długość poza zakresem -180..180"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::from(errors))
        }
    }
}

fn range_error(message: &'static str) -> ValidationError {
    let mut error = ValidationError::new("range");
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Values filled in once when an entry is first created.
#[derive(Debug, Clone)]
pub struct CreationDefaults {
    pub author: Option<String>,
    pub today: NaiveDate,
}

impl CreationDefaults {
    pub fn new(author: Option<String>, today: NaiveDate) -> Self {
        Self { author, today }
    }

    /// Fill the entry author and entry date where the submitter left them blank.
    pub fn apply(&self, mut fields: EntryFields) -> EntryFields {
        if fields.entry_authors.is_none() {
            fields.entry_authors = self.author.clone();
        }
        if fields.entry_date.is_none() {
            fields.entry_date = Some(self.today);
        }
        fields
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    #[serde(flatten)]
    pub fields: EntryFields,
    pub status: EntryStatus,
    /// Absent for entries created by the importer.
    pub owner_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CatalogEntry {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == Some(user_id)
    }
}

impl std::fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fields.locality_pl)
    }
}

/// A stored photo. `file` is the compressed display rendition, `original_file`
/// the preserved upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub entry_id: i64,
    pub file: String,
    pub original_file: Option<String>,
    pub created_at: i64,
}

pub fn photo_limit_message(found: usize) -> String {
    format!(
        "Obiekt może mieć maksymalnie {} zdjęć. Znaleziono {}.",
        MAX_PHOTOS, found
    )
}

/// Enforce the per-entry photo cap.
pub fn ensure_photo_capacity(count: usize) -> Result<()> {
    if count > MAX_PHOTOS {
        return Err(AppError::ValidationError(photo_limit_message(count)));
    }
    Ok(())
}
