// ============================================================
// CATALOG IMPORT USE CASE
// ============================================================
// Bulk-create catalog entries and their photos from a CSV file

use chrono::NaiveDate;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::domain::actor::Actor;
use crate::domain::catalog_entry::{
    photo_limit_message, CatalogEntry, EntryFields, EntryStatus, Photo, MAX_PHOTOS,
};
use crate::domain::csv::{columns, CsvRow};
use crate::domain::error::{AppError, Result};
use crate::domain::import_report::ImportReport;
use crate::domain::workflow::can_import;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::csv::{parse_date, parse_decimal, CsvParser};
use crate::infrastructure::db::catalog::CatalogRepository;
use crate::infrastructure::photos::{
    relative_reference_path, ImageOptimizer, OptimizerSettings, PhotoLocator,
};
use crate::infrastructure::storage::MediaStorage;

use super::photo_ingest::ingest_photo;

const JOB_CSV_NAME: &str = "import.csv";
const JOB_PHOTOS_DIR: &str = "zdjecia";

/// One file of an uploaded photo tree, keyed by its path inside the tree.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub relative_path: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn new(relative_path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            relative_path: relative_path.into(),
            bytes,
        }
    }
}

/// An entry ready to persist plus the diagnostics produced while reading it.
struct PreparedRow {
    fields: EntryFields,
    status: EntryStatus,
    warnings: Vec<String>,
}

/// Bulk importer: every CSV row becomes an independent catalog entry.
pub struct BulkImporter {
    repo: CatalogRepository,
    storage: MediaStorage,
    locator: PhotoLocator,
    parser: CsvParser,
    optimizer_settings: OptimizerSettings,
    photo_prefix: String,
    today: Option<NaiveDate>,
}

impl BulkImporter {
    pub fn new(repo: CatalogRepository, storage: MediaStorage) -> Self {
        let locator = PhotoLocator::new(storage.photo_dir());
        Self {
            repo,
            storage,
            locator,
            parser: CsvParser::new(),
            optimizer_settings: OptimizerSettings::default(),
            photo_prefix: "zdjecie".to_string(),
            today: None,
        }
    }

    pub fn from_config(repo: CatalogRepository, config: &AppConfig) -> Result<Self> {
        Ok(Self::new(repo, config.storage())
            .with_parser(config.csv_parser()?)
            .with_optimizer_settings(config.optimizer_settings())
            .with_photo_prefix(config.photo_column_prefix.clone()))
    }

    pub fn with_parser(mut self, parser: CsvParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_optimizer_settings(mut self, settings: OptimizerSettings) -> Self {
        self.optimizer_settings = settings;
        self
    }

    pub fn with_photo_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.photo_prefix = prefix.into();
        self
    }

    /// Pin the date substituted for missing entry dates and used for
    /// storage folders. Defaults to the local calendar date of each run.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Import a CSV file. Batch-level failures come back as a report with a
    /// single error rather than an `Err`.
    pub async fn run(&self, csv_path: &Path, photos_dir: Option<&Path>) -> ImportReport {
        match self.try_run(csv_path, photos_dir).await {
            Ok(report) => report,
            Err(err) => {
                warn!(csv = %csv_path.display(), error = %err, "Import aborted");
                match err {
                    AppError::NotFound(message) => ImportReport::fatal(message),
                    other => ImportReport::fatal(format!("Nieoczekiwany błąd: {}", other.message())),
                }
            }
        }
    }

    pub async fn try_run(&self, csv_path: &Path, photos_dir: Option<&Path>) -> Result<ImportReport> {
        let start = Instant::now();
        let parsed = self.parser.parse_file(csv_path)?;
        info!(
            csv = %csv_path.display(),
            encoding = parsed.encoding.name(),
            rows = parsed.rows.len(),
            "Starting catalog import"
        );

        // compressed renditions live here until copied into storage
        let scratch = tempfile::Builder::new()
            .prefix("zabytki-renditions-")
            .tempdir()
            .map_err(|e| AppError::IoError(format!("Failed to create scratch dir: {}", e)))?;
        let optimizer = ImageOptimizer::new(self.optimizer_settings, scratch.path());

        let mut report = ImportReport::new();
        for row in &parsed.rows {
            match row {
                Ok(row) => self.import_row(row, photos_dir, &optimizer, &mut report).await,
                Err((line, reason)) => report.record_error(row_message(*line, reason)),
            }
        }

        info!(
            success = report.success_count,
            errors = report.error_count,
            warnings = report.warning_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Catalog import finished"
        );
        Ok(report)
    }

    async fn import_row(
        &self,
        row: &CsvRow,
        photos_dir: Option<&Path>,
        optimizer: &ImageOptimizer,
        report: &mut ImportReport,
    ) {
        let prepared = match self.prepare_row(row).and_then(|prepared| {
            prepared.fields.check()?;
            Ok(prepared)
        }) {
            Ok(prepared) => prepared,
            Err(err) => {
                warn!(line = row.line, error = %err, "Rejected CSV row");
                report.record_error(row_message(row.line, err.message()));
                return;
            }
        };

        let entry = match self
            .repo
            .insert_entry(&prepared.fields, prepared.status, None)
            .await
        {
            Ok(entry) => entry,
            Err(err) => {
                report.record_error(row_message(row.line, err.message()));
                return;
            }
        };
        for warning in prepared.warnings {
            report.record_warning(warning);
        }

        // the entry is already stored when the cap rejects the row
        let references = row.photo_references(&self.photo_prefix);
        if references.len() > MAX_PHOTOS {
            warn!(line = row.line, entry_id = entry.id, photos = references.len(), "Too many photos");
            report.record_error(row_message(row.line, &photo_limit_message(references.len())));
            return;
        }

        for reference in references {
            if let Err(err) = self
                .import_photo(&entry, reference, photos_dir, optimizer)
                .await
            {
                warn!(entry_id = entry.id, reference, error = %err, "Photo not imported");
                report.record_error(format!(
                    "Błąd dodawania zdjęcia {} dla {}: {}",
                    reference,
                    entry,
                    err.message()
                ));
            }
        }

        report.record_success();
    }

    fn prepare_row(&self, row: &CsvRow) -> Result<PreparedRow> {
        for column in columns::REQUIRED {
            if row.get(column).is_none() {
                return Err(AppError::ValidationError(format!(
                    "brak wymaganego pola '{}'",
                    column
                )));
            }
        }

        let today = self.today();
        let mut warnings = Vec::new();
        let entry_date = match row.get(columns::ENTRY_DATE) {
            Some(raw) => match parse_date(raw) {
                Some(date) => date,
                None => {
                    warnings.push(format!(
                        "Wiersz {}: nieprawidłowa wartość {} '{}', przyjęto {}",
                        row.line,
                        columns::ENTRY_DATE,
                        raw,
                        today
                    ));
                    today
                }
            },
            None => {
                warnings.push(format!(
                    "Wiersz {}: brak {}, przyjęto {}",
                    row.line,
                    columns::ENTRY_DATE,
                    today
                ));
                today
            }
        };

        let status = row
            .get(columns::STATUS)
            .map(str::parse::<EntryStatus>)
            .transpose()?
            .unwrap_or(EntryStatus::Published);

        let fields = EntryFields {
            latitude: decimal(row, columns::LATITUDE)?,
            longitude: decimal(row, columns::LONGITUDE)?,
            object_name: row.get_owned(columns::OBJECT_NAME),
            locality_pl: row.get_owned(columns::LOCALITY_PL).unwrap_or_default(),
            locality_foreign: row.get_owned(columns::LOCALITY_FOREIGN),
            region: row.get_owned(columns::REGION),
            county: row.get_owned(columns::COUNTY),
            location_description: row.get_owned(columns::LOCATION),
            object_type: row.get_owned(columns::OBJECT_TYPE).unwrap_or_default(),
            material: row.get_owned(columns::MATERIAL),
            height: decimal(row, columns::HEIGHT)?,
            width: decimal(row, columns::WIDTH)?,
            description: row.get_owned(columns::DESCRIPTION),
            inscription: row.get_owned(columns::INSCRIPTION),
            script_type: row.get_owned(columns::SCRIPT_TYPE),
            translation: row.get_owned(columns::TRANSLATION),
            heraldry: row.get_owned(columns::HERALDRY),
            genealogy: row.get_owned(columns::GENEALOGY),
            bibliography: row.get_owned(columns::BIBLIOGRAPHY),
            source_references: row.get_owned(columns::SOURCE_REFERENCES),
            commemorated_person: row.get_owned(columns::COMMEMORATED_PERSON),
            scan_3d_url: row.get_owned(columns::SCAN_3D),
            entry_authors: row.get_owned(columns::ENTRY_AUTHORS),
            entry_date: Some(entry_date),
            correction_1_author: row.get_owned(columns::CORRECTION_1_AUTHOR),
            correction_1_date: row.get(columns::CORRECTION_1_DATE).and_then(parse_date),
            correction_2_author: row.get_owned(columns::CORRECTION_2_AUTHOR),
            correction_2_date: row.get(columns::CORRECTION_2_DATE).and_then(parse_date),
        };

        Ok(PreparedRow {
            fields,
            status,
            warnings,
        })
    }

    async fn import_photo(
        &self,
        entry: &CatalogEntry,
        reference: &str,
        photos_dir: Option<&Path>,
        optimizer: &ImageOptimizer,
    ) -> Result<Photo> {
        let source = self
            .locator
            .locate(reference, photos_dir)
            .ok_or_else(|| AppError::NotFound(format!("nie znaleziono pliku '{}'", reference)))?;

        ingest_photo(
            &self.repo,
            &self.storage,
            optimizer,
            entry.id,
            &source,
            self.today(),
        )
        .await
    }

    /// Import a CSV file on behalf of `actor`, who must be a moderator.
    pub async fn run_as(
        &self,
        actor: &Actor,
        csv_path: &Path,
        photos_dir: Option<&Path>,
    ) -> Result<ImportReport> {
        can_import(actor).into_result()?;
        info!(user_id = ?actor.user_id, csv = %csv_path.display(), "Import job started");
        self.try_run(csv_path, photos_dir).await
    }

    /// Run an uploaded import job as `actor`.
    ///
    /// The CSV bytes and photo tree are written to a private temporary
    /// directory that is removed when the job returns.
    pub async fn submit_import(
        &self,
        actor: &Actor,
        csv_bytes: &[u8],
        uploads: &[PhotoUpload],
    ) -> Result<ImportReport> {
        can_import(actor).into_result()?;

        let job_dir = match tempfile::Builder::new().prefix("zabytki-import-").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                return Ok(ImportReport::fatal(format!(
                    "Nie można przygotować katalogu importu: {}",
                    e
                )))
            }
        };

        let csv_path = job_dir.path().join(JOB_CSV_NAME);
        if let Err(e) = std::fs::write(&csv_path, csv_bytes) {
            return Ok(ImportReport::fatal(format!("Nie można zapisać pliku CSV: {}", e)));
        }

        let photos_root = job_dir.path().join(JOB_PHOTOS_DIR);
        for upload in uploads {
            let Some(relative) = relative_reference_path(&upload.relative_path) else {
                warn!(name = %upload.relative_path, "Skipping upload with unusable name");
                continue;
            };
            if let Err(e) = write_upload(&photos_root.join(relative), &upload.bytes) {
                return Ok(ImportReport::fatal(format!(
                    "Nie można zapisać zdjęcia {}: {}",
                    upload.relative_path,
                    e.message()
                )));
            }
        }

        info!(
            user_id = ?actor.user_id,
            csv_bytes = csv_bytes.len(),
            uploads = uploads.len(),
            "Import job submitted"
        );
        let photos_dir = (!uploads.is_empty()).then_some(photos_root.as_path());
        Ok(self.run(&csv_path, photos_dir).await)
    }
}

fn row_message(line: u64, reason: &str) -> String {
    format!("Błąd w wierszu {}: {}", line, reason)
}

fn decimal(row: &CsvRow, column: &str) -> Result<Option<f64>> {
    row.get(column)
        .map(|raw| {
            parse_decimal(raw)
                .map_err(|e| AppError::ParseError(format!("{}: {}", column, e.message())))
        })
        .transpose()
}

fn write_upload(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::ListingScope;
    use image::{ImageBuffer, Rgb};
    use std::path::PathBuf;
    use tempfile::TempDir;

    const HEADER: &str = "nazwa_geograficzna_polska,typ_obiektu,polozenie_szerokosc,data_wpisu,data_korekty_1";

    struct Fixture {
        repo: CatalogRepository,
        importer: BulkImporter,
        media: TempDir,
        work: TempDir,
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    async fn fixture() -> Fixture {
        let repo = CatalogRepository::in_memory().await.unwrap();
        let media = tempfile::tempdir().unwrap();
        let importer = BulkImporter::new(repo.clone(), MediaStorage::new(media.path(), "zdjecia"))
            .with_today(today());
        Fixture {
            repo,
            importer,
            media,
            work: tempfile::tempdir().unwrap(),
        }
    }

    impl Fixture {
        fn write_csv(&self, content: &str) -> PathBuf {
            let path = self.work.path().join("obiekty.csv");
            std::fs::write(&path, content).unwrap();
            path
        }

        async fn entries(&self) -> Vec<CatalogEntry> {
            let scope = ListingScope {
                owner_id: None,
                status: None,
            };
            self.repo.list_entries(&scope, 1, 100).await.unwrap().items
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foto.png");
        ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90u8]))
            .save(&path)
            .unwrap();
        std::fs::read(&path).unwrap()
    }

    #[tokio::test]
    async fn test_missing_entry_date_defaults_to_today_with_warning() {
        let fx = fixture().await;
        let csv = fx.write_csv(&format!("{HEADER}\nKraków,Nagrobek,\"50,0547\",,\n"));

        let report = fx.importer.run(&csv, None).await;
        assert_eq!(report.success_count, 1);
        assert_eq!(report.error_count, 0);
        assert_eq!(report.warning_count, 1);
        assert_eq!(report.messages.len(), 1);
        assert!(report.messages[0].contains("data_wpisu"));

        let entries = fx.entries().await;
        assert_eq!(entries[0].fields.entry_date, Some(today()));
        assert_eq!(entries[0].fields.latitude, Some(50.0547));
        assert_eq!(entries[0].status, EntryStatus::Published);
        assert_eq!(entries[0].owner_id, None);
    }

    #[tokio::test]
    async fn test_date_formats_and_bad_correction_date() {
        let fx = fixture().await;
        let csv = fx.write_csv(&format!(
            "{HEADER}\nGdańsk,Krzyż,50.0547,15.01.2024,wczoraj\n"
        ));

        let report = fx.importer.run(&csv, None).await;
        assert_eq!((report.success_count, report.error_count, report.warning_count), (1, 0, 0));

        let entry = &fx.entries().await[0];
        assert_eq!(entry.fields.entry_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(entry.fields.correction_1_date, None);
        assert_eq!(entry.fields.latitude, Some(50.0547));
    }

    #[tokio::test]
    async fn test_row_errors_do_not_abort_batch() {
        let fx = fixture().await;
        let csv = fx.write_csv(&format!(
            "{HEADER}\n,Nagrobek,,2024-01-01,\nKraków,Nagrobek,abc,2024-01-01,\nKraków,Krzyż,95,2024-01-01,\nLwów,Kapliczka,,2024-01-01,\n"
        ));

        let report = fx.importer.run(&csv, None).await;
        assert_eq!(report.success_count, 1);
        assert_eq!(report.error_count, 3);
        assert!(report.messages[0].starts_with("Błąd w wierszu 2:"));
        assert!(report.messages[0].contains("nazwa_geograficzna_polska"));
        assert!(report.messages[1].starts_with("Błąd w wierszu 3:"));
        assert!(report.messages[1].contains("polozenie_szerokosc"));
        assert!(report.messages[2].starts_with("Błąd w wierszu 4:"));
        assert_eq!(fx.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_status_column_is_honoured() {
        let fx = fixture().await;
        let csv = fx.write_csv(
            "nazwa_geograficzna_polska,typ_obiektu,data_wpisu,status\nA,Krzyż,2024-01-01,weryfikacja\nB,Krzyż,2024-01-01,archiwum\n",
        );

        let report = fx.importer.run(&csv, None).await;
        assert_eq!((report.success_count, report.error_count), (1, 1));
        assert!(report.messages[0].contains("Nieznany status"));
        assert_eq!(fx.entries().await[0].status, EntryStatus::InReview);
    }

    #[tokio::test]
    async fn test_more_than_ten_photos_rejects_row() {
        let fx = fixture().await;
        let photo_headers: Vec<String> = (1..=11).map(|i| format!("zdjecie_{i}")).collect();
        let photo_cells: Vec<String> = (1..=11).map(|i| format!("f{i}.jpg")).collect();
        let csv = fx.write_csv(&format!(
            "nazwa_geograficzna_polska,typ_obiektu,data_wpisu,{}\nKraków,Nagrobek,2024-01-01,{}\n",
            photo_headers.join(","),
            photo_cells.join(",")
        ));

        let report = fx.importer.run(&csv, None).await;
        assert_eq!(report.success_count, 0);
        assert_eq!(report.error_count, 1);
        assert!(report.messages[0].contains("maksymalnie 10"));
        assert!(report.messages[0].contains("Znaleziono 11"));

        // persisted before the cap check, left without photos
        let entries = fx.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(fx.repo.count_photos(entries[0].id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_photo_keeps_entry() {
        let fx = fixture().await;
        let csv = fx.write_csv(
            "nazwa_geograficzna_polska,typ_obiektu,data_wpisu,zdjecie_1\nKraków,Nagrobek,2024-01-01,brak.jpg\n",
        );

        let report = fx.importer.run(&csv, Some(fx.work.path())).await;
        assert_eq!(report.success_count, 1);
        assert_eq!(report.error_count, 1);
        assert!(report.messages[0].starts_with("Błąd dodawania zdjęcia brak.jpg dla Kraków"));
        assert_eq!(fx.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_photo_found_in_tree_is_compressed_and_stored() {
        let fx = fixture().await;
        let nested = fx.work.path().join("zdjecia").join("krakow");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("nagrobek.png"), png_bytes(64, 48)).unwrap();
        let csv = fx.write_csv(
            "nazwa_geograficzna_polska,typ_obiektu,data_wpisu,zdjecie_1,zdjecie_2\nKraków,Nagrobek,2024-01-01,../inne/nagrobek.png,\n",
        );

        let report = fx.importer.run(&csv, Some(fx.work.path())).await;
        assert_eq!((report.success_count, report.error_count), (1, 0));

        let entry = &fx.entries().await[0];
        let photos = fx.repo.list_photos(entry.id).await.unwrap();
        assert_eq!(photos.len(), 1);
        assert!(photos[0].file.starts_with("zdjecia/2024/06/01/nagrobek_"));
        assert!(photos[0].file.ends_with(".jpg"));
        assert!(fx.media.path().join(&photos[0].file).is_file());
        let original = photos[0].original_file.as_ref().unwrap();
        assert!(original.ends_with(".png"));
        assert!(fx.media.path().join(original).is_file());
    }

    #[tokio::test]
    async fn test_unreadable_image_is_stored_uncompressed() {
        let fx = fixture().await;
        let bytes = b"not really a jpeg".to_vec();
        std::fs::write(fx.work.path().join("uszkodzone.jpg"), &bytes).unwrap();
        let csv = fx.write_csv(
            "nazwa_geograficzna_polska,typ_obiektu,data_wpisu,zdjecie_1\nKraków,Nagrobek,2024-01-01,uszkodzone.jpg\n",
        );

        let report = fx.importer.run(&csv, Some(fx.work.path())).await;
        assert_eq!((report.success_count, report.error_count), (1, 0));

        let entry = &fx.entries().await[0];
        let photos = fx.repo.list_photos(entry.id).await.unwrap();
        assert_eq!(photos.len(), 1);
        assert!(photos[0].file.ends_with(".jpg"));
        assert_eq!(std::fs::read(fx.media.path().join(&photos[0].file)).unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_reimport_creates_duplicates() {
        let fx = fixture().await;
        let csv = fx.write_csv(&format!("{HEADER}\nKraków,Nagrobek,,2024-01-01,\n"));

        fx.importer.run(&csv, None).await;
        fx.importer.run(&csv, None).await;
        assert_eq!(fx.entries().await.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_csv_is_fatal() {
        let fx = fixture().await;
        let report = fx
            .importer
            .run(&fx.work.path().join("brak.csv"), None)
            .await;
        assert_eq!((report.success_count, report.error_count), (0, 1));
        assert!(report.messages[0].starts_with("Nie znaleziono pliku"));
    }

    #[tokio::test]
    async fn test_submit_import_requires_moderator() {
        let fx = fixture().await;
        let csv = format!("{HEADER}\nKraków,Nagrobek,,2024-01-01,\n");

        let err = fx
            .importer
            .submit_import(&Actor::contributor(1, "jan"), csv.as_bytes(), &[])
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
        assert!(fx.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_run_as_checks_import_permission() {
        let fx = fixture().await;
        let csv = fx.write_csv("nazwa_geograficzna_polska,typ_obiektu,data_wpisu\nKraków,Nagrobek,2024-01-01\n");

        let err = fx
            .importer
            .run_as(&Actor::contributor(1, "jan"), &csv, None)
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
        assert!(fx.entries().await.is_empty());

        let job = crate::infrastructure::config::AppConfig::default().job_actor();
        let report = fx.importer.run_as(&job, &csv, None).await.unwrap();
        assert_eq!(report.success_count, 1);
    }

    #[tokio::test]
    async fn test_submit_import_with_uploaded_tree() {
        let fx = fixture().await;
        let csv = "nazwa_geograficzna_polska;typ_obiektu;data_wpisu;zdjecie_1\nKraków;Nagrobek;2024-01-01;nagrobek.png\n";
        let importer = BulkImporter::new(fx.repo.clone(), MediaStorage::new(fx.media.path(), "zdjecia"))
            .with_today(today())
            .with_parser(CsvParser::new().with_auto_delimiter());
        let uploads = vec![
            PhotoUpload::new("paczka/../podkatalog/nagrobek.png", png_bytes(32, 32)),
            PhotoUpload::new("..", vec![1, 2, 3]),
        ];

        let report = importer
            .submit_import(&Actor::moderator(9, "redaktor"), csv.as_bytes(), &uploads)
            .await
            .unwrap();
        assert_eq!((report.success_count, report.error_count), (1, 0));

        let entry = &fx.entries().await[0];
        assert_eq!(fx.repo.count_photos(entry.id).await.unwrap(), 1);
    }
}
