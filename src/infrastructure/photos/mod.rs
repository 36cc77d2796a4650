// ============================================================
// PHOTO INFRASTRUCTURE
// ============================================================
// Resolving photo references and producing compressed renditions

mod locator;
mod optimizer;

pub use locator::{bare_file_name, relative_reference_path, PhotoLocator};
pub use optimizer::{optimize_image, CompressionStats, ImageOptimizer, OptimizedImage, OptimizerSettings};
