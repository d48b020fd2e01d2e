pub mod runner;
pub mod types;

pub use runner::{ConfigFormat, execute_all, load_jobs, load_jobs_from_path};
pub use types::{BatchError, BatchOptions, BatchResult, ComparisonJob, JobKind, JobSet, ScreenshotJob};
