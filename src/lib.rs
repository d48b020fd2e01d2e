//! Visual regression testing for web pages.
//!
//! This crate provides:
//! - Screenshot capture of pages or elements through headless Chrome
//! - A synthetic framebuffer provider for deterministic tests
//! - Pixel diffing with overlay and threshold-mask output
//! - Baseline management with warning and error thresholds
//! - Batch execution of comparison and screenshot jobs from JSON/YAML
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use visual_regression::capture::{BrowserSession, CaptureRequest, Locator};
//! use visual_regression::config::BrowserSettings;
//! use visual_regression::diff::PixelDiffer;
//! use visual_regression::engine::{Thresholds, assert_similarity};
//!
//! let mut session = BrowserSession::launch(BrowserSettings::default()).unwrap();
//! let request = CaptureRequest::page("index.html").locator(Locator::id("myChart"));
//! let difference = assert_similarity(
//!     &request,
//!     Path::new("regression/chart"),
//!     &mut session,
//!     &PixelDiffer::default(),
//!     Thresholds::default(),
//! )
//! .unwrap();
//! println!("{difference:.2}% changed");
//! session.close();
//! ```

pub mod batch;
pub mod capture;
pub mod config;
pub mod diff;
pub mod engine;
pub mod report;

// Re-export capture types and providers
pub use capture::{
    BrowserSession, CaptureError, CaptureProvider, CaptureRequest, CaptureResult, FramebufferProvider, Locator,
    LocatorStrategy, MockFramebuffer,
};

// Re-export differ
pub use diff::{DiffError, DiffResult, ImageDiffer, PixelDiffer};

// Re-export regression engine
pub use engine::{
    ArtifactSet, Comparison, RegressionError, RegressionResult, Thresholds, Verdict, assert_similarity,
    check_similarity, ensure_baseline,
};

// Re-export batch runner and report types
pub use batch::{BatchError, BatchOptions, BatchResult, ComparisonJob, JobSet, ScreenshotJob, execute_all, load_jobs};
pub use report::{BatchReport, ComparisonOutcome, ScreenshotOutcome};
