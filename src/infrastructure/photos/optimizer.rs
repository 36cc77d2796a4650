use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::error::{AppError, Result};

/// Bounding box and JPEG quality for compressed renditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u8,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            quality: 85,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionStats {
    pub original_bytes: u64,
    pub optimized_bytes: u64,
    pub original_dimensions: (u32, u32),
    pub optimized_dimensions: (u32, u32),
}

impl CompressionStats {
    pub fn reduction_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.optimized_bytes as f64 / self.original_bytes as f64) * 100.0
    }
}

/// Result of [`ImageOptimizer::optimize`]. `stats` is `None` when the
/// image could not be processed and `path` is the untouched original.
#[derive(Debug, Clone)]
pub struct OptimizedImage {
    pub path: PathBuf,
    pub stats: Option<CompressionStats>,
}

impl OptimizedImage {
    pub fn is_compressed(&self) -> bool {
        self.stats.is_some()
    }
}

/// Downsamples and re-encodes photos as JPEG into a scratch directory.
#[derive(Debug, Clone)]
pub struct ImageOptimizer {
    settings: OptimizerSettings,
    scratch_dir: PathBuf,
}

impl ImageOptimizer {
    pub fn new(settings: OptimizerSettings, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn settings(&self) -> OptimizerSettings {
        self.settings
    }

    /// Compress `path`; on any failure hand back the original path.
    pub fn optimize(&self, path: &Path) -> OptimizedImage {
        match self.try_optimize(path) {
            Ok((optimized, stats)) => {
                info!(
                    source = %path.display(),
                    original_bytes = stats.original_bytes,
                    optimized_bytes = stats.optimized_bytes,
                    reduction_percent = %format!("{:.1}", stats.reduction_percent()),
                    "Photo compressed"
                );
                OptimizedImage {
                    path: optimized,
                    stats: Some(stats),
                }
            }
            Err(err) => {
                warn!(source = %path.display(), error = %err, "Photo left uncompressed");
                OptimizedImage {
                    path: path.to_path_buf(),
                    stats: None,
                }
            }
        }
    }

    fn try_optimize(&self, path: &Path) -> Result<(PathBuf, CompressionStats)> {
        let original_bytes = std::fs::metadata(path)?.len();
        let img = image::open(path)
            .map_err(|e| AppError::ImageError(format!("Failed to open {}: {e}", path.display())))?;
        let original_dimensions = (img.width(), img.height());

        let resized = fit_within(img, self.settings.max_width, self.settings.max_height);
        let optimized_dimensions = (resized.width(), resized.height());
        // JPEG has no alpha or palette
        let rgb = resized.to_rgb8();

        std::fs::create_dir_all(&self.scratch_dir)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("zdjecie");
        let simple = Uuid::new_v4().simple().to_string();
        let target = self
            .scratch_dir
            .join(format!("{}_{}.jpg", stem, &simple[..8]));

        {
            let file = File::create(&target)?;
            let mut writer = BufWriter::new(file);
            let quality = self.settings.quality.clamp(1, 100);
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
            if let Err(e) = encoder.encode_image(&rgb) {
                let _ = std::fs::remove_file(&target);
                return Err(AppError::ImageError(format!(
                    "Failed to encode {}: {e}",
                    path.display()
                )));
            }
            writer.flush()?;
        }

        let optimized_bytes = std::fs::metadata(&target)?.len();
        Ok((
            target,
            CompressionStats {
                original_bytes,
                optimized_bytes,
                original_dimensions,
                optimized_dimensions,
            },
        ))
    }
}

/// Shrink to fit the bounding box keeping aspect ratio; never upscales.
fn fit_within(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    if img.width() <= max_width && img.height() <= max_height {
        return img;
    }
    img.resize(max_width, max_height, FilterType::Lanczos3)
}

/// One-shot form of [`ImageOptimizer::optimize`] returning only the path.
pub fn optimize_image(
    path: &Path,
    max_width: u32,
    max_height: u32,
    quality: u8,
    scratch_dir: &Path,
) -> PathBuf {
    let settings = OptimizerSettings {
        max_width,
        max_height,
        quality,
    };
    ImageOptimizer::new(settings, scratch_dir).optimize(path).path
}
