//! Types for batch run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::engine::{Comparison, RegressionError, Verdict};

/// Result of a single screenshot job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotOutcome {
    /// Position in the `screenshots` list
    pub index: usize,

    pub name: Option<String>,

    /// Configured URL or path
    pub target: String,

    /// Where the screenshot was written
    pub path: PathBuf,

    /// Error message if the capture failed
    pub error: Option<String>,
}

/// Result of a single comparison job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonOutcome {
    /// Position in the `tests` list
    pub index: usize,

    pub name: Option<String>,

    /// Configured URL or path
    pub target: String,

    /// Folder holding the artifact set
    pub folder: PathBuf,

    /// Percentage difference, when a diff was computed
    pub difference: Option<f64>,

    /// Classification of `difference`
    pub verdict: Option<Verdict>,

    /// Whether this run created the baseline
    pub baseline_created: bool,

    /// Error message if the job failed
    pub error: Option<String>,
}

impl ComparisonOutcome {
    pub(crate) fn from_comparison(
        index: usize,
        name: Option<String>,
        target: String,
        folder: PathBuf,
        comparison: &Comparison,
    ) -> Self {
        Self {
            index,
            name,
            target,
            folder,
            difference: Some(comparison.difference),
            verdict: Some(comparison.verdict),
            baseline_created: comparison.baseline_created,
            error: None,
        }
    }

    pub(crate) fn from_error(
        index: usize,
        name: Option<String>,
        target: String,
        folder: PathBuf,
        err: &RegressionError,
    ) -> Self {
        // A threshold failure still produced a difference worth reporting
        let (difference, verdict, baseline_created) = match err {
            RegressionError::ThresholdExceeded {
                difference,
                baseline_created,
                ..
            } => (Some(*difference), Some(Verdict::Fail), *baseline_created),
            _ => (None, None, false),
        };
        Self {
            index,
            name,
            target,
            folder,
            difference,
            verdict,
            baseline_created,
            error: Some(err.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of a complete batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// When the batch started
    pub started_at: DateTime<Utc>,

    /// Whether every job completed without error
    pub success: bool,

    /// Screenshot jobs, in execution order
    pub screenshots: Vec<ScreenshotOutcome>,

    /// Comparison jobs, in execution order
    pub comparisons: Vec<ComparisonOutcome>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            success: true,
            screenshots: Vec::new(),
            comparisons: Vec::new(),
        }
    }

    pub(crate) fn push_screenshot(&mut self, outcome: ScreenshotOutcome) {
        self.success &= outcome.error.is_none();
        self.screenshots.push(outcome);
    }

    pub(crate) fn push_comparison(&mut self, outcome: ComparisonOutcome) {
        self.success &= outcome.error.is_none();
        self.comparisons.push(outcome);
    }

    /// Number of jobs that ended in an error
    pub fn failures(&self) -> usize {
        self.screenshots.iter().filter(|o| o.error.is_some()).count()
            + self.comparisons.iter().filter(|o| o.is_failure()).count()
    }

    /// Number of comparisons that landed in the warning band
    pub fn warnings(&self) -> usize {
        self.comparisons
            .iter()
            .filter(|o| o.verdict == Some(Verdict::Warning))
            .count()
    }

    /// One-line summary for the console
    pub fn summary(&self) -> String {
        format!(
            "{} screenshot(s), {} comparison(s): {} warning(s), {} failure(s)",
            self.screenshots.len(),
            self.comparisons.len(),
            self.warnings(),
            self.failures()
        )
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}
