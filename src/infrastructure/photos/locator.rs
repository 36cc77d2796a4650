use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

static PATH_SEPARATOR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\\/]+").unwrap());

/// Final component of a photo reference, with both `/` and `\` treated as
/// separators. `None` for empty names and `.`/`..`.
pub fn bare_file_name(reference: &str) -> Option<&str> {
    let name = PATH_SEPARATOR_PATTERN
        .split(reference.trim())
        .filter(|part| !part.is_empty())
        .last()?;
    match name {
        "." | ".." => None,
        _ => Some(name),
    }
}

/// Relative path made of the normal components of `reference`, with `/` and
/// `\` as separators. Empty, `.` and `..` components are dropped.
pub fn relative_reference_path(reference: &str) -> Option<PathBuf> {
    let parts: Vec<&str> = PATH_SEPARATOR_PATTERN
        .split(reference.trim())
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.iter().collect())
}

/// Resolves filename references from CSV cells to files on disk.
#[derive(Debug, Clone)]
pub struct PhotoLocator {
    /// Storage subdirectory checked when nothing else matches
    default_dir: PathBuf,
}

impl PhotoLocator {
    pub fn new(default_dir: impl Into<PathBuf>) -> Self {
        Self {
            default_dir: default_dir.into(),
        }
    }

    /// Resolve a reference: recursive search under `base_dir` by bare file
    /// name, then the reference as an absolute path, then the reference
    /// relative to the default storage directory, then its bare name there.
    pub fn locate(&self, reference: &str, base_dir: Option<&Path>) -> Option<PathBuf> {
        let name = bare_file_name(reference)?;

        if let Some(base_dir) = base_dir {
            if let Some(found) = find_in_tree(name, base_dir) {
                debug!(reference, path = %found.display(), "Photo found in upload tree");
                return Some(found);
            }
        }

        let as_given = Path::new(reference.trim());
        if as_given.is_absolute() && as_given.is_file() {
            return Some(as_given.to_path_buf());
        }

        if !as_given.is_absolute() {
            if let Some(relative) = relative_reference_path(reference) {
                let in_storage = self.default_dir.join(relative);
                if in_storage.is_file() {
                    return Some(in_storage);
                }
            }
        }

        let in_storage = self.default_dir.join(name);
        if in_storage.is_file() {
            return Some(in_storage);
        }

        None
    }
}

/// First file named exactly `file_name` anywhere under `base_dir`.
///
/// With duplicate names in different subdirectories the winner depends on
/// the directory walk order.
pub fn find_in_tree(file_name: &str, base_dir: &Path) -> Option<PathBuf> {
    WalkDir::new(base_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| entry.file_name().to_str() == Some(file_name))
        .map(|entry| entry.into_path())
}
