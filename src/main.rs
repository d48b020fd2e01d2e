use clap::{Args, Parser, Subcommand};
use log::error;
use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use visual_regression::batch::{BatchError, BatchOptions, execute_all, load_jobs_from_path};
use visual_regression::capture::{BrowserSession, CaptureProvider, CaptureRequest, Locator, LocatorStrategy};
use visual_regression::config::{self, BrowserSettings, parse_window_size};
use visual_regression::diff::{ImageDiffer, PixelDiffer};
use visual_regression::engine::{ArtifactSet, RegressionError, Thresholds, Verdict, check_similarity};
use visual_regression::report::BatchReport;

/// Visual regression testing for web pages
#[derive(Parser, Debug)]
#[command(
    name = "visual-regression",
    version,
    about = "Capture web pages with headless Chrome and compare them against stored baselines",
    after_help = "ENVIRONMENT VARIABLES:\n\
        VISUAL_REGRESSION_CHROME_PATH       Chrome/Chromium executable\n\
        VISUAL_REGRESSION_WINDOW_SIZE       Browser window size (WxH)\n\
        VISUAL_REGRESSION_HEADLESS          Run the browser headless (true/false)\n\
        VISUAL_REGRESSION_SETTLE_DELAY_MS   Wait before each capture (ms)\n\
        VISUAL_REGRESSION_PIXEL_TOLERANCE   Per-channel delta ignored by the differ\n\
        RUST_LOG                            Log filter (default: info)"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Browser launch overrides shared by every capturing command
#[derive(Args, Debug)]
struct BrowserArgs {
    /// Chrome/Chromium executable (default: auto-detected)
    #[arg(long, env = "VISUAL_REGRESSION_CHROME_PATH")]
    chrome_path: Option<PathBuf>,

    /// Browser window size as WxH (e.g., 1280x800)
    #[arg(long, env = "VISUAL_REGRESSION_WINDOW_SIZE")]
    window_size: Option<String>,

    /// Wait in milliseconds between page load and capture
    #[arg(long, env = "VISUAL_REGRESSION_SETTLE_DELAY_MS")]
    settle_delay: Option<u64>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,
}

impl BrowserArgs {
    fn settings(&self) -> Result<BrowserSettings, Box<dyn Error>> {
        let mut settings = config::get().browser.clone();
        if let Some(path) = &self.chrome_path {
            settings = settings.chrome_path(path);
        }
        if let Some(size) = &self.window_size {
            let (width, height) =
                parse_window_size(size).ok_or_else(|| format!("Invalid window size '{}'. Use WxH (e.g., 1280x800)", size))?;
            settings = settings.window_size(width, height);
        }
        if let Some(ms) = self.settle_delay {
            settings = settings.settle_delay(Duration::from_millis(ms));
        }
        if self.headed {
            settings = settings.headless(false);
        }
        Ok(settings)
    }
}

/// Element selection shared by `check` and `screenshot`
#[derive(Args, Debug)]
struct TargetArgs {
    /// Page URL, host, or local .html file
    #[arg(short, long)]
    url: String,

    /// Capture only the element(s) matching this selector
    #[arg(short, long)]
    locator: Option<String>,

    /// How to interpret --locator: id, css, class_name, tag_name, name, xpath
    #[arg(long, default_value = "id")]
    by: LocatorStrategy,

    /// Comma-separated CSS selectors to hide before capture
    #[arg(long, value_delimiter = ',')]
    ignore: Vec<String>,

    /// Capture every matching element instead of the first
    #[arg(long)]
    multielement: bool,
}

impl TargetArgs {
    fn request(&self) -> CaptureRequest {
        let mut request = CaptureRequest::page(&self.url)
            .ignore(self.ignore.iter().filter(|s| !s.trim().is_empty()).cloned())
            .multi_element(self.multielement);
        if let Some(selector) = &self.locator {
            request = request.locator(Locator::new(selector, self.by));
        }
        request
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every job in a JSON or YAML configuration file
    Run {
        /// Configuration file with `tests` and `screenshots` lists
        #[arg(short, long)]
        config: PathBuf,

        /// Record failing jobs and continue instead of stopping at the first
        #[arg(long, short = 'k')]
        keep_going: bool,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Compare a page against the baseline stored in a folder
    Check {
        #[command(flatten)]
        target: TargetArgs,

        /// Folder holding baseline.png and the per-run images
        #[arg(short, long)]
        folder: PathBuf,

        /// Difference (percent) above which a warning is logged
        #[arg(long, default_value_t = config::DEFAULT_WARNING_THRESHOLD)]
        warning_threshold: f64,

        /// Difference (percent) above which the check fails
        #[arg(long, default_value_t = config::DEFAULT_ERROR_THRESHOLD)]
        error_threshold: f64,

        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Take a single screenshot
    Screenshot {
        #[command(flatten)]
        target: TargetArgs,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Diff two existing images without a browser
    Diff {
        /// Reference image
        baseline: PathBuf,

        /// Image to compare
        current: PathBuf,

        /// Where to write the diff overlay
        #[arg(long, default_value = "diff.png")]
        diff_out: PathBuf,

        /// Where to write the threshold mask
        #[arg(long, default_value = "thresh.png")]
        thresh_out: PathBuf,

        /// Per-channel difference ignored when comparing pixels
        #[arg(long, env = "VISUAL_REGRESSION_PIXEL_TOLERANCE")]
        tolerance: Option<u8>,
    },
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info"))
        .format_timestamp(None)
        .init();
}

fn print_report(report: &BatchReport) {
    for shot in &report.screenshots {
        match &shot.error {
            None => println!("  [shot] {}", shot.path.display()),
            Some(err) => println!("  [shot] {} FAILED: {}", shot.path.display(), err),
        }
    }
    for cmp in &report.comparisons {
        let label = cmp.name.clone().unwrap_or_else(|| cmp.folder.display().to_string());
        let difference = cmp
            .difference
            .map(|d| format!("{:.4}%", d))
            .unwrap_or_else(|| "-".to_string());
        let verdict = cmp.verdict.map(|v| v.to_string()).unwrap_or_else(|| "error".to_string());
        println!("  [{}] {} {}", verdict, label, difference);
        if let Some(err) = &cmp.error {
            println!("    {}", err);
        }
    }
    println!("{}", report.summary());
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config: config_path,
            keep_going,
            json,
            browser,
        } => {
            let jobs = load_jobs_from_path(&config_path)?;
            if jobs.is_empty() {
                println!("No jobs in {}", config_path.display());
                return Ok(());
            }

            let differ = PixelDiffer::default();
            let options = BatchOptions::default().keep_going(keep_going);
            let result = BrowserSession::with_session(browser.settings()?, |session| {
                execute_all(&jobs, session, &differ, options)
            })?;

            // A stopped batch still reports the jobs that ran
            let report = match result {
                Ok(report) => report,
                Err(BatchError::Job {
                    kind,
                    index,
                    target,
                    source,
                    report,
                }) => {
                    error!("{} job #{} ({}) failed: {}", kind, index, target, source);
                    *report
                }
                Err(e) => return Err(e.into()),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Run completed at {}", report.started_at.to_rfc3339());
                print_report(&report);
            }

            if !report.success {
                process::exit(1);
            }
        }

        Commands::Check {
            target,
            folder,
            warning_threshold,
            error_threshold,
            browser,
        } => {
            let request = target.request();
            let thresholds = Thresholds::new(warning_threshold, error_threshold);
            let differ = PixelDiffer::default();
            let result = BrowserSession::with_session(browser.settings()?, |session| {
                check_similarity(&request, &folder, session, &differ, thresholds)
            })?;

            match result {
                Ok(comparison) => {
                    let artifacts = &comparison.artifacts;
                    let status = match comparison.verdict {
                        Verdict::Warning => "over warning threshold",
                        _ => "within thresholds",
                    };
                    println!("Difference: {:.4}% ({})", comparison.difference, status);
                    if comparison.baseline_created {
                        println!("  Baseline created: {}", artifacts.baseline.display());
                    }
                    println!("  Diff: {}", artifacts.diff.display());
                    println!("  Threshold mask: {}", artifacts.thresh.display());
                }
                Err(RegressionError::ThresholdExceeded {
                    difference,
                    threshold,
                    artifacts,
                    ..
                }) => {
                    print_failed_artifacts(difference, threshold, &artifacts);
                    process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Screenshot {
            target,
            output,
            browser,
        } => {
            let request = target.request();
            BrowserSession::with_session(browser.settings()?, |session| session.capture(&request, &output))??;
            println!("Captured screenshot: {}", output.display());
        }

        Commands::Diff {
            baseline,
            current,
            diff_out,
            thresh_out,
            tolerance,
        } => {
            let differ = tolerance.map(PixelDiffer::new).unwrap_or_default();
            let difference = differ.diff(&baseline, &current, &diff_out, &thresh_out)?;
            println!("Difference: {:.4}%", difference);
            println!("  Diff: {}", diff_out.display());
            println!("  Threshold mask: {}", thresh_out.display());
        }
    }

    Ok(())
}

fn print_failed_artifacts(difference: f64, threshold: f64, artifacts: &ArtifactSet) {
    println!("Difference {:.4}% is over error threshold {}%", difference, threshold);
    for path in artifacts.paths() {
        println!("  {}", path.display());
    }
}
