use chrono::NaiveDate;

use crate::domain::catalog_entry::{CatalogEntry, EntryFields, EntryStatus, Photo};

#[derive(sqlx::FromRow)]
pub(super) struct CatalogEntryEntity {
    id: i64,
    latitude: Option<f64>,
    longitude: Option<f64>,
    object_name: Option<String>,
    locality_pl: String,
    locality_foreign: Option<String>,
    region: Option<String>,
    county: Option<String>,
    location_description: Option<String>,
    object_type: String,
    material: Option<String>,
    height: Option<f64>,
    width: Option<f64>,
    description: Option<String>,
    inscription: Option<String>,
    script_type: Option<String>,
    translation: Option<String>,
    heraldry: Option<String>,
    genealogy: Option<String>,
    bibliography: Option<String>,
    source_references: Option<String>,
    commemorated_person: Option<String>,
    scan_3d_url: Option<String>,
    entry_authors: Option<String>,
    entry_date: Option<NaiveDate>,
    correction_1_author: Option<String>,
    correction_1_date: Option<NaiveDate>,
    correction_2_author: Option<String>,
    correction_2_date: Option<NaiveDate>,
    status: String,
    owner_id: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl From<CatalogEntryEntity> for CatalogEntry {
    fn from(entity: CatalogEntryEntity) -> Self {
        Self {
            id: entity.id,
            fields: EntryFields {
                latitude: entity.latitude,
                longitude: entity.longitude,
                object_name: entity.object_name,
                locality_pl: entity.locality_pl,
                locality_foreign: entity.locality_foreign,
                region: entity.region,
                county: entity.county,
                location_description: entity.location_description,
                object_type: entity.object_type,
                material: entity.material,
                height: entity.height,
                width: entity.width,
                description: entity.description,
                inscription: entity.inscription,
                script_type: entity.script_type,
                translation: entity.translation,
                heraldry: entity.heraldry,
                genealogy: entity.genealogy,
                bibliography: entity.bibliography,
                source_references: entity.source_references,
                commemorated_person: entity.commemorated_person,
                scan_3d_url: entity.scan_3d_url,
                entry_authors: entity.entry_authors,
                entry_date: entity.entry_date,
                correction_1_author: entity.correction_1_author,
                correction_1_date: entity.correction_1_date,
                correction_2_author: entity.correction_2_author,
                correction_2_date: entity.correction_2_date,
            },
            // the column CHECK constraint only admits known values
            status: entity.status.parse().unwrap_or(EntryStatus::Draft),
            owner_id: entity.owner_id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct PhotoEntity {
    id: i64,
    entry_id: i64,
    file: String,
    original_file: Option<String>,
    created_at: i64,
}

impl From<PhotoEntity> for Photo {
    fn from(entity: PhotoEntity) -> Self {
        Self {
            id: entity.id,
            entry_id: entity.entry_id,
            file: entity.file,
            original_file: entity.original_file,
            created_at: entity.created_at,
        }
    }
}
