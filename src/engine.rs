//! Baseline comparison and threshold classification.
//!
//! Every comparison folder holds four images:
//! - `baseline.png`: reference, captured on the first run and never overwritten
//! - `current.png`: captured on every run
//! - `diff.png` / `thresh.png`: produced by the differ on every run
//!
//! All four are left on disk after a run, including failed ones.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::capture::{CaptureError, CaptureProvider, CaptureRequest};
use crate::config::{DEFAULT_ERROR_THRESHOLD, DEFAULT_WARNING_THRESHOLD};
use crate::diff::{DiffError, ImageDiffer};

pub const BASELINE_FILE: &str = "baseline.png";
pub const CURRENT_FILE: &str = "current.png";
pub const DIFF_FILE: &str = "diff.png";
pub const THRESH_FILE: &str = "thresh.png";

/// Paths of the images kept in a comparison folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSet {
    pub baseline: PathBuf,
    pub current: PathBuf,
    pub diff: PathBuf,
    pub thresh: PathBuf,
}

impl ArtifactSet {
    pub fn in_folder(folder: &Path) -> Self {
        Self {
            baseline: folder.join(BASELINE_FILE),
            current: folder.join(CURRENT_FILE),
            diff: folder.join(DIFF_FILE),
            thresh: folder.join(THRESH_FILE),
        }
    }

    /// All four paths, baseline first
    pub fn paths(&self) -> [&Path; 4] {
        [&self.baseline, &self.current, &self.diff, &self.thresh]
    }
}

/// Warning and error bounds on the difference percentage
///
/// `warning <= error` is expected; it is not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warning: f64,
    pub error: f64,
}

impl Thresholds {
    pub fn new(warning: f64, error: f64) -> Self {
        Self { warning, error }
    }

    /// Whether the warning bound sits at or below the error bound
    pub fn is_ordered(&self) -> bool {
        self.warning <= self.error
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new(DEFAULT_WARNING_THRESHOLD, DEFAULT_ERROR_THRESHOLD)
    }
}

/// Where a difference falls relative to the thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// At or below the warning threshold
    Pass,
    /// Above the warning threshold, at or below the error threshold
    Warning,
    /// Above the error threshold
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Pass => "pass",
            Verdict::Warning => "warning",
            Verdict::Fail => "fail",
        };
        f.write_str(label)
    }
}

/// Classify a difference percentage against the thresholds
pub fn classify(difference: f64, thresholds: &Thresholds) -> Verdict {
    if difference > thresholds.error {
        Verdict::Fail
    } else if difference > thresholds.warning {
        Verdict::Warning
    } else {
        Verdict::Pass
    }
}

/// A comparison that stayed within the error threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Percentage difference between baseline and current capture
    pub difference: f64,
    /// `Pass` or `Warning`
    pub verdict: Verdict,
    pub thresholds: Thresholds,
    pub artifacts: ArtifactSet,
    /// Whether this run captured the baseline
    pub baseline_created: bool,
}

/// Result type for regression operations
pub type RegressionResult<T> = Result<T, RegressionError>;

/// Errors raised by the regression engine
#[derive(Debug, Error)]
pub enum RegressionError {
    /// The capture provider failed
    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    /// The image differ failed
    #[error("Diff failed: {0}")]
    Diff(#[from] DiffError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The difference is above the error threshold
    #[error("Difference {difference} is over error threshold {threshold}")]
    ThresholdExceeded {
        difference: f64,
        threshold: f64,
        artifacts: ArtifactSet,
        /// Whether this run captured the baseline before failing
        baseline_created: bool,
    },
}

/// Make sure `folder` exists and holds a baseline image.
///
/// The baseline is captured only when missing; an existing one is never
/// touched. Returns whether a baseline was captured.
pub fn ensure_baseline(
    folder: &Path,
    request: &CaptureRequest,
    provider: &mut dyn CaptureProvider,
) -> RegressionResult<bool> {
    if !folder.is_dir() {
        info!("No directory was found called {}, creating...", folder.display());
        fs::create_dir_all(folder)?;
    }

    let baseline = folder.join(BASELINE_FILE);
    if baseline.exists() {
        return Ok(false);
    }

    info!("No baseline image was found called {}, creating...", baseline.display());
    provider.capture(request, &baseline)?;
    Ok(true)
}

/// Capture the target, diff it against the folder's baseline and classify the
/// result.
///
/// Fails with [`RegressionError::ThresholdExceeded`] when the difference is
/// above `thresholds.error`; a difference above `thresholds.warning` is logged
/// as a warning and reported through [`Comparison::verdict`].
pub fn check_similarity(
    request: &CaptureRequest,
    folder: &Path,
    provider: &mut dyn CaptureProvider,
    differ: &dyn ImageDiffer,
    thresholds: Thresholds,
) -> RegressionResult<Comparison> {
    let baseline_created = ensure_baseline(folder, request, provider)?;
    let artifacts = ArtifactSet::in_folder(folder);

    provider.capture(request, &artifacts.current)?;

    let difference = differ.diff(
        &artifacts.baseline,
        &artifacts.current,
        &artifacts.diff,
        &artifacts.thresh,
    )?;

    let verdict = classify(difference, &thresholds);
    match verdict {
        Verdict::Fail => {
            error!(
                "Difference {} is over error threshold {} ({})",
                difference,
                thresholds.error,
                folder.display()
            );
            return Err(RegressionError::ThresholdExceeded {
                difference,
                threshold: thresholds.error,
                artifacts,
                baseline_created,
            });
        }
        Verdict::Warning => warn!(
            "Difference {} is over warning threshold {} ({})",
            difference,
            thresholds.warning,
            folder.display()
        ),
        Verdict::Pass => debug!(
            "Difference {} is within warning threshold {} ({})",
            difference,
            thresholds.warning,
            folder.display()
        ),
    }

    Ok(Comparison {
        difference,
        verdict,
        thresholds,
        artifacts,
        baseline_created,
    })
}

/// Like [`check_similarity`], returning only the difference percentage
pub fn assert_similarity(
    request: &CaptureRequest,
    folder: &Path,
    provider: &mut dyn CaptureProvider,
    differ: &dyn ImageDiffer,
    thresholds: Thresholds,
) -> RegressionResult<f64> {
    check_similarity(request, folder, provider, differ, thresholds).map(|c| c.difference)
}
