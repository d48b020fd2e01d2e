//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for visual-regression, supporting:
//! - Environment variables for the browser and differ settings
//! - Defaults for the comparison thresholds
//! - Builder pattern for programmatic configuration
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `VISUAL_REGRESSION_CHROME_PATH` | Chrome/Chromium executable | auto-detected |
//! | `VISUAL_REGRESSION_WINDOW_SIZE` | Browser window size (`WxH`) | `1280x800` |
//! | `VISUAL_REGRESSION_HEADLESS` | Run the browser headless | `true` |
//! | `VISUAL_REGRESSION_SETTLE_DELAY_MS` | Wait before each capture (ms) | `3000` |
//! | `VISUAL_REGRESSION_PIXEL_TOLERANCE` | Per-channel delta ignored by the differ | `16` |
//!
//! # Example
//!
//! ```bash
//! # Capture with a specific browser and a shorter settle delay
//! export VISUAL_REGRESSION_CHROME_PATH="/usr/bin/chromium"
//! export VISUAL_REGRESSION_SETTLE_DELAY_MS=500
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Default warning threshold (percent difference)
pub const DEFAULT_WARNING_THRESHOLD: f64 = 10.0;

/// Default error threshold (percent difference)
pub const DEFAULT_ERROR_THRESHOLD: f64 = 30.0;

/// Default browser window width (pixels)
pub const DEFAULT_WINDOW_WIDTH: u32 = 1280;

/// Default browser window height (pixels)
pub const DEFAULT_WINDOW_HEIGHT: u32 = 800;

/// Default wait before each capture so animations can finish (milliseconds)
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 3000;

/// Default per-channel difference below which two pixels are considered equal
pub const DEFAULT_PIXEL_TOLERANCE: u8 = 16;

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the browser executable
pub const ENV_CHROME_PATH: &str = "VISUAL_REGRESSION_CHROME_PATH";

/// Environment variable for the browser window size
pub const ENV_WINDOW_SIZE: &str = "VISUAL_REGRESSION_WINDOW_SIZE";

/// Environment variable for headless mode
pub const ENV_HEADLESS: &str = "VISUAL_REGRESSION_HEADLESS";

/// Environment variable for the settle delay
pub const ENV_SETTLE_DELAY: &str = "VISUAL_REGRESSION_SETTLE_DELAY_MS";

/// Environment variable for the differ pixel tolerance
pub const ENV_PIXEL_TOLERANCE: &str = "VISUAL_REGRESSION_PIXEL_TOLERANCE";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Settings {
    SETTINGS.get_or_init(Settings::from_env)
}

/// Centralized configuration for visual-regression
#[derive(Debug, Clone)]
pub struct Settings {
    /// Browser launch settings
    pub browser: BrowserSettings,
    /// Image differ settings
    pub diff: DiffSettings,
}

/// Browser-related settings
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserSettings {
    /// Explicit browser executable (None = let headless_chrome find one)
    pub chrome_path: Option<PathBuf>,
    /// Window width in pixels
    pub window_width: u32,
    /// Window height in pixels
    pub window_height: u32,
    /// Whether to run without a visible window
    pub headless: bool,
    /// Wait after navigation before capturing
    pub settle_delay: Duration,
}

/// Differ-related settings
#[derive(Debug, Clone, PartialEq)]
pub struct DiffSettings {
    /// Per-channel tolerance for considering two pixels equal
    pub pixel_tolerance: u8,
}

impl Settings {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            browser: BrowserSettings::from_env(),
            diff: DiffSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            browser: BrowserSettings::defaults(),
            diff: DiffSettings::defaults(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_env()
    }
}

impl BrowserSettings {
    /// Create browser settings from environment variables
    pub fn from_env() -> Self {
        let (window_width, window_height) = env::var(ENV_WINDOW_SIZE)
            .ok()
            .and_then(|s| parse_window_size(&s))
            .unwrap_or((DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT));

        Self {
            chrome_path: env::var(ENV_CHROME_PATH)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            window_width,
            window_height,
            headless: env::var(ENV_HEADLESS)
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(true),
            settle_delay: Duration::from_millis(
                env::var(ENV_SETTLE_DELAY)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SETTLE_DELAY_MS),
            ),
        }
    }

    /// Create browser settings with defaults
    pub fn defaults() -> Self {
        Self {
            chrome_path: None,
            window_width: DEFAULT_WINDOW_WIDTH,
            window_height: DEFAULT_WINDOW_HEIGHT,
            headless: true,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
        }
    }

    /// Use a specific browser executable
    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    /// Set the window dimensions
    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the wait before each capture
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self::from_env()
    }
}

impl DiffSettings {
    /// Create differ settings from environment variables
    pub fn from_env() -> Self {
        Self {
            pixel_tolerance: env::var(ENV_PIXEL_TOLERANCE)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PIXEL_TOLERANCE),
        }
    }

    /// Create differ settings with defaults
    pub fn defaults() -> Self {
        Self {
            pixel_tolerance: DEFAULT_PIXEL_TOLERANCE,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a window size string like "1280x800" into (width, height)
pub fn parse_window_size(size: &str) -> Option<(u32, u32)> {
    let lowered = size.trim().to_lowercase();
    let (w, h) = lowered.split_once('x')?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get the pixel tolerance from the global configuration (convenience function)
pub fn pixel_tolerance() -> u8 {
    get().diff.pixel_tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window_size() {
        assert_eq!(parse_window_size("1280x800"), Some((1280, 800)));
        assert_eq!(parse_window_size(" 800X600 "), Some((800, 600)));
    }

    #[test]
    fn test_parse_window_size_invalid() {
        assert_eq!(parse_window_size("invalid"), None);
        assert_eq!(parse_window_size("1280"), None);
        assert_eq!(parse_window_size("0x600"), None);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("OFF"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::defaults();
        assert_eq!(settings.browser.window_width, DEFAULT_WINDOW_WIDTH);
        assert_eq!(settings.browser.window_height, DEFAULT_WINDOW_HEIGHT);
        assert!(settings.browser.headless);
        assert_eq!(settings.browser.settle_delay, Duration::from_millis(DEFAULT_SETTLE_DELAY_MS));
        assert_eq!(settings.diff.pixel_tolerance, DEFAULT_PIXEL_TOLERANCE);
    }

    #[test]
    fn test_browser_settings_builder() {
        let settings = BrowserSettings::defaults()
            .chrome_path("/usr/bin/chromium")
            .window_size(800, 600)
            .headless(false)
            .settle_delay(Duration::from_millis(250));

        assert_eq!(settings.chrome_path, Some(PathBuf::from("/usr/bin/chromium")));
        assert_eq!((settings.window_width, settings.window_height), (800, 600));
        assert!(!settings.headless);
        assert_eq!(settings.settle_delay, Duration::from_millis(250));
    }
}
