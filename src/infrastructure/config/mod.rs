//! Runtime settings: compiled defaults, then `zabytki.toml`, then `ZABYTKI_*`
//! environment variables.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::actor::Actor;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::csv::CsvParser;
use crate::infrastructure::photos::OptimizerSettings;
use crate::infrastructure::storage::MediaStorage;

pub const DEFAULT_CONFIG_FILE: &str = "zabytki.toml";
pub const ENV_PREFIX: &str = "ZABYTKI_";

/// User id carried by command-line jobs, which act for no stored account.
pub const JOB_USER_ID: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub media_root: PathBuf,
    pub photo_subdir: String,
    pub photo_column_prefix: String,
    pub photo_max_width: u32,
    pub photo_max_height: u32,
    pub photo_quality: u8,
    pub page_size: u32,
    pub error_display_limit: usize,
    pub moderator_group: String,
    /// Name recorded for command-line jobs
    pub job_user: String,
    /// Groups held by command-line jobs; role resolution uses `moderator_group`
    pub job_groups: Vec<String>,
    /// Single delimiter character, or `auto`
    pub csv_delimiter: String,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("zabytki.db"),
            media_root: PathBuf::from("media"),
            photo_subdir: "zdjecia".to_string(),
            photo_column_prefix: "zdjecie".to_string(),
            photo_max_width: 1920,
            photo_max_height: 1080,
            photo_quality: 85,
            page_size: 12,
            error_display_limit: 10,
            moderator_group: "Redaktor".to_string(),
            job_user: "zabytki".to_string(),
            job_groups: vec!["Redaktor".to_string()],
            csv_delimiter: ",".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load settings. An explicit `config_file` must exist; the default
    /// `zabytki.toml` is optional.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        // a missing .env is fine
        let _ = dotenvy::dotenv();

        let toml_path = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::ConfigError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };
        debug!(path = %toml_path.display(), "Loading configuration");

        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(&toml_path))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Invalid configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.photo_max_width == 0 || self.photo_max_height == 0 {
            return Err(AppError::ConfigError(
                "photo_max_width and photo_max_height must be positive".to_string(),
            ));
        }
        if !(1..=100).contains(&self.photo_quality) {
            return Err(AppError::ConfigError(format!(
                "photo_quality must be within 1..=100, got {}",
                self.photo_quality
            )));
        }
        if self.page_size == 0 {
            return Err(AppError::ConfigError("page_size must be positive".to_string()));
        }
        if self.moderator_group.trim().is_empty() {
            return Err(AppError::ConfigError("moderator_group must not be empty".to_string()));
        }
        if self.photo_column_prefix.trim().is_empty() {
            return Err(AppError::ConfigError(
                "photo_column_prefix must not be empty".to_string(),
            ));
        }
        self.delimiter()?;
        Ok(())
    }

    /// `None` means sniff the delimiter per file.
    pub fn delimiter(&self) -> Result<Option<u8>> {
        let value = self.csv_delimiter.as_str();
        if value.eq_ignore_ascii_case("auto") {
            return Ok(None);
        }
        if value == "\\t" || value == "tab" {
            return Ok(Some(b'\t'));
        }
        match value.as_bytes() {
            [byte] if byte.is_ascii() => Ok(Some(*byte)),
            _ => Err(AppError::ConfigError(format!(
                "csv_delimiter must be a single ASCII character or 'auto', got '{}'",
                value
            ))),
        }
    }

    pub fn optimizer_settings(&self) -> OptimizerSettings {
        OptimizerSettings {
            max_width: self.photo_max_width,
            max_height: self.photo_max_height,
            quality: self.photo_quality,
        }
    }

    pub fn storage(&self) -> MediaStorage {
        MediaStorage::new(&self.media_root, &self.photo_subdir)
    }

    /// Actor for command-line jobs, resolved from `job_groups` the same way
    /// a signed-in user's groups are.
    pub fn job_actor(&self) -> Actor {
        Actor::from_groups(
            JOB_USER_ID,
            self.job_user.clone(),
            &self.job_groups,
            &self.moderator_group,
        )
    }

    pub fn csv_parser(&self) -> Result<CsvParser> {
        Ok(match self.delimiter()? {
            Some(delimiter) => CsvParser::new().with_delimiter(delimiter),
            None => CsvParser::new().with_auto_delimiter(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_size, 12);
        assert_eq!(config.delimiter().unwrap(), Some(b','));
        assert_eq!(config.storage().photo_dir(), PathBuf::from("media").join("zdjecia"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "photo_quality = 70\ncsv_delimiter = \"auto\"\nmoderator_group = \"Moderatorzy\"\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.photo_quality, 70);
        assert_eq!(config.delimiter().unwrap(), None);
        assert_eq!(config.moderator_group, "Moderatorzy");
        assert_eq!(config.photo_max_width, 1920);
    }

    #[test]
    fn test_job_actor_follows_moderator_group() {
        let config = AppConfig::default();
        let actor = config.job_actor();
        assert!(actor.is_moderator());
        assert_eq!(actor.display_name.as_deref(), Some("zabytki"));

        let renamed = AppConfig {
            moderator_group: "Moderatorzy".to_string(),
            ..Default::default()
        };
        assert!(!renamed.job_actor().is_moderator());

        let regrouped = AppConfig {
            moderator_group: "Moderatorzy".to_string(),
            job_groups: vec!["Moderatorzy".to_string()],
            ..Default::default()
        };
        assert!(regrouped.job_actor().is_moderator());
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/zabytki.toml"))).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AppConfig {
            photo_quality: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            page_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            csv_delimiter: ";;".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            photo_column_prefix: " ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tab_delimiter() {
        let config = AppConfig {
            csv_delimiter: "tab".to_string(),
            ..Default::default()
        };
        assert_eq!(config.delimiter().unwrap(), Some(b'\t'));
    }
}
