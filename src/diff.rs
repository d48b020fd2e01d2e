//! Pixel difference between a baseline and a current screenshot.
//!
//! The differ reports how much of the image changed as a percentage (0-100)
//! and writes two derived images:
//! - a diff overlay: the current image dimmed, with changed pixels in red
//! - a threshold mask: white where pixels changed, black elsewhere
//!
//! Images of different sizes are compared over the larger canvas; pixels that
//! exist in only one of them always count as changed.

use image::{GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};
use log::debug;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::capture::ensure_parent_dir;
use crate::config;

/// Result type for diff operations
pub type DiffResult<T> = Result<T, DiffError>;

/// Errors that can occur while diffing images
#[derive(Debug, Error)]
pub enum DiffError {
    /// An input image could not be opened or decoded
    #[error("Failed to read image {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A derived image could not be encoded or saved
    #[error("Failed to write image {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Computes the difference between two image files
pub trait ImageDiffer {
    /// Compare `baseline` with `current`, writing the overlay to `diff_out` and
    /// the mask to `thresh_out`. Returns the percentage of changed pixels.
    fn diff(&self, baseline: &Path, current: &Path, diff_out: &Path, thresh_out: &Path) -> DiffResult<f64>;
}

/// Outcome of comparing two in-memory images
#[derive(Debug, Clone)]
pub struct DiffImages {
    /// Percentage of changed pixels (0-100)
    pub percentage: f64,
    /// Number of changed pixels
    pub changed: u64,
    /// Number of pixels on the compared canvas
    pub total: u64,
    /// Current image dimmed, changed pixels in red
    pub overlay: RgbaImage,
    /// 255 for changed pixels, 0 otherwise
    pub mask: GrayImage,
}

const CHANGED: Rgba<u8> = Rgba([255, 0, 0, 255]);

fn pixel_at(img: &RgbaImage, x: u32, y: u32) -> Option<Rgba<u8>> {
    if x < img.width() && y < img.height() {
        Some(*img.get_pixel(x, y))
    } else {
        None
    }
}

fn channels_differ(a: &Rgba<u8>, b: &Rgba<u8>, tolerance: u8) -> bool {
    a.0.iter().zip(b.0.iter()).any(|(a, b)| a.abs_diff(*b) > tolerance)
}

/// Compare two images pixel by pixel.
///
/// A pixel changed when any channel differs by more than `tolerance`.
pub fn compare(baseline: &RgbaImage, current: &RgbaImage, tolerance: u8) -> DiffImages {
    let width = baseline.width().max(current.width());
    let height = baseline.height().max(current.height());

    let mut overlay: RgbaImage = ImageBuffer::new(width, height);
    let mut mask: GrayImage = ImageBuffer::new(width, height);
    let mut changed = 0u64;

    for y in 0..height {
        for x in 0..width {
            let (out, hit) = match (pixel_at(baseline, x, y), pixel_at(current, x, y)) {
                (Some(a), Some(b)) if !channels_differ(&a, &b, tolerance) => {
                    (Rgba([b[0] / 4, b[1] / 4, b[2] / 4, 255]), false)
                }
                _ => (CHANGED, true),
            };
            overlay.put_pixel(x, y, out);
            if hit {
                mask.put_pixel(x, y, Luma([255]));
                changed += 1;
            }
        }
    }

    let total = u64::from(width) * u64::from(height);
    let percentage = if total == 0 {
        0.0
    } else {
        changed as f64 / total as f64 * 100.0
    };

    DiffImages {
        percentage,
        changed,
        total,
        overlay,
        mask,
    }
}

/// Pixel-exact differ with a per-channel tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelDiffer {
    tolerance: u8,
}

impl PixelDiffer {
    pub fn new(tolerance: u8) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> u8 {
        self.tolerance
    }
}

impl Default for PixelDiffer {
    fn default() -> Self {
        Self::new(config::pixel_tolerance())
    }
}

fn open_rgba(path: &Path) -> DiffResult<RgbaImage> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| DiffError::Read {
            path: path.to_path_buf(),
            source,
        })
}

impl ImageDiffer for PixelDiffer {
    fn diff(&self, baseline: &Path, current: &Path, diff_out: &Path, thresh_out: &Path) -> DiffResult<f64> {
        let result = compare(&open_rgba(baseline)?, &open_rgba(current)?, self.tolerance);

        ensure_parent_dir(diff_out)?;
        result.overlay.save(diff_out).map_err(|source| DiffError::Write {
            path: diff_out.to_path_buf(),
            source,
        })?;
        ensure_parent_dir(thresh_out)?;
        result.mask.save(thresh_out).map_err(|source| DiffError::Write {
            path: thresh_out.to_path_buf(),
            source,
        })?;

        debug!(
            "{} of {} pixels changed ({:.4}%) between {} and {}",
            result.changed,
            result.total,
            result.percentage,
            baseline.display(),
            current.display()
        );
        Ok(result.percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        ImageBuffer::from_pixel(width, height, Rgba(color))
    }

    #[test]
    fn test_identical_images_have_no_difference() {
        let img = solid(20, 20, [255, 255, 255, 255]);
        let result = compare(&img, &img, 0);
        assert_eq!(result.percentage, 0.0);
        assert_eq!(result.changed, 0);
        assert!(result.mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_changed_block_percentage() {
        let baseline = solid(100, 100, [255, 255, 255, 255]);
        let mut current = baseline.clone();
        for y in 0..10 {
            for x in 0..10 {
                current.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }

        let result = compare(&baseline, &current, 16);
        assert_eq!(result.changed, 100);
        assert!((result.percentage - 1.0).abs() < 1e-9);
        assert_eq!(result.mask.get_pixel(5, 5)[0], 255);
        assert_eq!(result.mask.get_pixel(50, 50)[0], 0);
        assert_eq!(*result.overlay.get_pixel(5, 5), CHANGED);
        assert_eq!(*result.overlay.get_pixel(50, 50), Rgba([63, 63, 63, 255]));
    }

    #[test]
    fn test_tolerance_absorbs_small_shifts() {
        let baseline = solid(10, 10, [100, 100, 100, 255]);
        let current = solid(10, 10, [110, 95, 100, 255]);
        assert_eq!(compare(&baseline, &current, 16).changed, 0);
        assert_eq!(compare(&baseline, &current, 5).changed, 100);
    }

    #[test]
    fn test_size_mismatch_counts_missing_pixels() {
        let baseline = solid(10, 10, [0, 0, 0, 255]);
        let current = solid(10, 20, [0, 0, 0, 255]);
        let result = compare(&baseline, &current, 0);
        assert_eq!(result.total, 200);
        assert_eq!(result.changed, 100);
        assert!((result.percentage - 50.0).abs() < 1e-9);
        assert_eq!((result.mask.width(), result.mask.height()), (10, 20));
    }

    #[test]
    fn test_empty_images() {
        let empty = solid(0, 0, [0, 0, 0, 0]);
        assert_eq!(compare(&empty, &empty, 0).percentage, 0.0);
    }

    #[test]
    fn test_pixel_differ_writes_outputs() {
        let dir = TempDir::new().unwrap();
        let baseline = dir.path().join("baseline.png");
        let current = dir.path().join("current.png");
        solid(8, 8, [10, 20, 30, 255]).save(&baseline).unwrap();
        solid(8, 8, [200, 20, 30, 255]).save(&current).unwrap();

        let diff_out = dir.path().join("out").join("diff.png");
        let thresh_out = dir.path().join("out").join("thresh.png");
        let d = PixelDiffer::new(16).diff(&baseline, &current, &diff_out, &thresh_out).unwrap();

        assert!((d - 100.0).abs() < 1e-9);
        assert!(diff_out.exists());
        assert!(thresh_out.exists());
    }

    #[test]
    fn test_pixel_differ_missing_input() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.png");
        let err = PixelDiffer::new(0)
            .diff(&missing, &missing, &dir.path().join("d.png"), &dir.path().join("t.png"))
            .unwrap_err();
        assert!(matches!(err, DiffError::Read { ref path, .. } if path == &missing));
    }
}
