use log::{debug, error, info, warn};
use std::fs;
use std::path::Path;

use crate::batch::types::{BatchError, BatchOptions, BatchResult, ComparisonJob, JobKind, JobSet, ScreenshotJob};
use crate::capture::CaptureProvider;
use crate::diff::ImageDiffer;
use crate::engine::{self, RegressionError};
use crate::report::{BatchReport, ComparisonOutcome, ScreenshotOutcome};

/// Serialization format of a job configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from a file extension; unknown extensions parse as YAML,
    /// which also accepts JSON documents
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Parse a job configuration document
pub fn load_jobs(source: &str, format: ConfigFormat) -> BatchResult<JobSet> {
    let jobs: JobSet = match format {
        ConfigFormat::Json => serde_json::from_str(source)?,
        ConfigFormat::Yaml => serde_yaml_ng::from_str(source)?,
    };

    for (index, job) in jobs.comparisons.iter().enumerate() {
        if !job.to_thresholds().is_ordered() {
            warn!(
                "Comparison job #{} ({}) has warning threshold {} above error threshold {}",
                index,
                job.label(),
                job.warning_threshold,
                job.error_threshold
            );
        }
    }

    debug!(
        "Loaded {} comparison job(s) and {} screenshot job(s)",
        jobs.comparisons.len(),
        jobs.screenshots.len()
    );
    Ok(jobs)
}

/// Read and parse a job configuration file
pub fn load_jobs_from_path(path: &Path) -> BatchResult<JobSet> {
    let source = fs::read_to_string(path)?;
    load_jobs(&source, ConfigFormat::from_path(path))
}

fn run_screenshot(job: &ScreenshotJob, provider: &mut dyn CaptureProvider) -> Result<(), RegressionError> {
    debug!("Taking screenshot of {} to {}", job.url, job.filename.display());
    provider.capture(&job.request(), &job.filename)?;
    Ok(())
}

fn run_comparison(
    job: &ComparisonJob,
    provider: &mut dyn CaptureProvider,
    differ: &dyn ImageDiffer,
) -> Result<engine::Comparison, RegressionError> {
    debug!("Comparing {} against baseline in {}", job.url, job.folder.display());
    engine::check_similarity(&job.request(), &job.folder, provider, differ, job.to_thresholds())
}

/// Run every job: screenshots first, then comparisons, each in declared order.
///
/// By default the first failing job stops the batch and is returned as
/// [`BatchError::Job`], carrying the report built so far. With [`BatchOptions::keep_going`] failures are recorded
/// in the report and the remaining jobs still run.
pub fn execute_all(
    jobs: &JobSet,
    provider: &mut dyn CaptureProvider,
    differ: &dyn ImageDiffer,
    options: BatchOptions,
) -> BatchResult<BatchReport> {
    let mut report = BatchReport::new();
    info!(
        "Running {} screenshot(s) and {} comparison(s) with {} capture",
        jobs.screenshots.len(),
        jobs.comparisons.len(),
        provider.source_type()
    );

    for (index, job) in jobs.screenshots.iter().enumerate() {
        let result = run_screenshot(job, provider);
        if let Err(err) = &result {
            error!("Screenshot job #{} ({}) failed: {}", index, job.label(), err);
        }
        let outcome = ScreenshotOutcome {
            index,
            name: job.name.clone(),
            target: job.url.clone(),
            path: job.filename.clone(),
            error: result.as_ref().err().map(ToString::to_string),
        };
        report.push_screenshot(outcome);

        if let Err(source) = result {
            if !options.keep_going {
                return Err(BatchError::Job {
                    kind: JobKind::Screenshot,
                    index,
                    target: job.url.clone(),
                    source,
                    report: Box::new(report),
                });
            }
        }
    }

    for (index, job) in jobs.comparisons.iter().enumerate() {
        match run_comparison(job, provider, differ) {
            Ok(comparison) => {
                report.push_comparison(ComparisonOutcome::from_comparison(
                    index,
                    job.name.clone(),
                    job.url.clone(),
                    job.folder.clone(),
                    &comparison,
                ));
            }
            Err(source) => {
                report.push_comparison(ComparisonOutcome::from_error(
                    index,
                    job.name.clone(),
                    job.url.clone(),
                    job.folder.clone(),
                    &source,
                ));
                if !options.keep_going {
                    return Err(BatchError::Job {
                        kind: JobKind::Comparison,
                        index,
                        target: job.url.clone(),
                        source,
                        report: Box::new(report),
                    });
                }
                warn!("Comparison job #{} ({}) failed, continuing: {}", index, job.label(), source);
            }
        }
    }

    info!("{}", report.summary());
    Ok(report)
}
