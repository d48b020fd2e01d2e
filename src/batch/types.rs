use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::capture::{CaptureRequest, Locator};
use crate::config::{DEFAULT_ERROR_THRESHOLD, DEFAULT_WARNING_THRESHOLD};
use crate::engine::{RegressionError, Thresholds};
use crate::report::BatchReport;

fn default_warning_threshold() -> f64 {
    DEFAULT_WARNING_THRESHOLD
}

fn default_error_threshold() -> f64 {
    DEFAULT_ERROR_THRESHOLD
}

/// A page (or element) to compare against its baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonJob {
    /// Label used in logs and reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// URL or local `.html` path
    pub url: String,

    /// Folder holding the baseline and the per-run images
    pub folder: PathBuf,

    /// Element to capture instead of the full page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<Locator>,

    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,

    #[serde(default = "default_error_threshold")]
    pub error_threshold: f64,

    /// CSS selectors hidden before capture
    #[serde(default)]
    pub ignored_elements: Vec<String>,

    /// Capture every element the locator matches
    #[serde(default)]
    pub multielement: bool,
}

impl ComparisonJob {
    pub fn new(url: impl Into<String>, folder: impl Into<PathBuf>) -> Self {
        Self {
            name: None,
            url: url.into(),
            folder: folder.into(),
            locator: None,
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            ignored_elements: Vec::new(),
            multielement: false,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn locator(mut self, locator: Locator) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn thresholds(mut self, warning: f64, error: f64) -> Self {
        self.warning_threshold = warning;
        self.error_threshold = error;
        self
    }

    pub fn ignore<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_elements.extend(selectors.into_iter().map(Into::into));
        self
    }

    pub fn multielement(mut self, enabled: bool) -> Self {
        self.multielement = enabled;
        self
    }

    pub fn request(&self) -> CaptureRequest {
        CaptureRequest {
            target: self.url.clone(),
            locator: self.locator.clone(),
            ignored_elements: self.ignored_elements.clone(),
            multi_element: self.multielement,
        }
    }

    pub fn to_thresholds(&self) -> Thresholds {
        Thresholds::new(self.warning_threshold, self.error_threshold)
    }

    /// Name if set, otherwise the folder
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.folder.display().to_string())
    }
}

/// A one-off capture with no baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// URL or local `.html` path
    pub url: String,

    /// Output PNG path
    pub filename: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<Locator>,

    #[serde(default)]
    pub ignored_elements: Vec<String>,

    #[serde(default)]
    pub multielement: bool,
}

impl ScreenshotJob {
    pub fn new(url: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
        Self {
            name: None,
            url: url.into(),
            filename: filename.into(),
            locator: None,
            ignored_elements: Vec::new(),
            multielement: false,
        }
    }

    pub fn locator(mut self, locator: Locator) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn ignore<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_elements.extend(selectors.into_iter().map(Into::into));
        self
    }

    pub fn multielement(mut self, enabled: bool) -> Self {
        self.multielement = enabled;
        self
    }

    pub fn request(&self) -> CaptureRequest {
        CaptureRequest {
            target: self.url.clone(),
            locator: self.locator.clone(),
            ignored_elements: self.ignored_elements.clone(),
            multi_element: self.multielement,
        }
    }

    /// Name if set, otherwise the output filename
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.filename.display().to_string())
    }
}

/// Jobs declared in a configuration document, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSet {
    #[serde(rename = "tests", default)]
    pub comparisons: Vec<ComparisonJob>,

    #[serde(default)]
    pub screenshots: Vec<ScreenshotJob>,
}

impl JobSet {
    pub fn is_empty(&self) -> bool {
        self.comparisons.is_empty() && self.screenshots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.comparisons.len() + self.screenshots.len()
    }
}

/// Which list a job came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Screenshot,
    Comparison,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Screenshot => f.write_str("screenshot"),
            JobKind::Comparison => f.write_str("comparison"),
        }
    }
}

/// Options for a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Record job failures and carry on instead of stopping at the first one
    pub keep_going: bool,
}

impl BatchOptions {
    pub fn keep_going(mut self, enabled: bool) -> Self {
        self.keep_going = enabled;
        self
    }
}

/// Result type for batch operations
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors raised while loading or running a batch
#[derive(Debug, Error)]
pub enum BatchError {
    /// The configuration document could not be parsed
    #[error("Invalid configuration: {0}")]
    Parse(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A job failed and the batch stopped
    ///
    /// `report` holds every outcome up to and including the failing job.
    #[error("{kind} job #{index} ({target}) failed: {source}")]
    Job {
        kind: JobKind,
        index: usize,
        target: String,
        #[source]
        source: RegressionError,
        report: Box<BatchReport>,
    },
}

impl BatchError {
    /// Partial report of a batch stopped by a failing job
    pub fn report(&self) -> Option<&BatchReport> {
        match self {
            BatchError::Job { report, .. } => Some(report),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BatchError {
    fn from(err: serde_json::Error) -> Self {
        BatchError::Parse(err.to_string())
    }
}

impl From<serde_yaml_ng::Error> for BatchError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        BatchError::Parse(err.to_string())
    }
}
