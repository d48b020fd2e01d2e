//! Headless Chrome capture provider.
//!
//! A [`BrowserSession`] owns one browser process and one tab. It is created by
//! the caller, handed by `&mut` reference to every capture, and shuts the
//! browser down when closed or dropped.

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};
use log::{debug, info};
use std::ffi::OsStr;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::backend::CaptureProvider;
use super::types::{CaptureError, CaptureRequest, CaptureResult, Locator};
use super::utils::{bounds_script, describe_locator, ensure_parent_dir, masking_script, parse_bounds, resolve_target};
use crate::config::BrowserSettings;

/// How long an idle browser is kept alive between commands
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(300);

fn browser_error<E: Display>(context: &'static str) -> impl FnOnce(E) -> CaptureError {
    move |e| CaptureError::Browser(format!("{}: {}", context, e))
}

/// A running browser with a single tab used for every capture
pub struct BrowserSession {
    /// Dropping it ends the browser process
    #[allow(dead_code)]
    browser: Browser,
    tab: Arc<Tab>,
    settings: BrowserSettings,
}

impl BrowserSession {
    /// Launch a browser according to `settings`
    pub fn launch(settings: BrowserSettings) -> CaptureResult<Self> {
        let mut builder = LaunchOptionsBuilder::default();
        builder
            .headless(settings.headless)
            .window_size(Some((settings.window_width, settings.window_height)))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .args(vec![
                OsStr::new("--force-device-scale-factor=1"),
                OsStr::new("--hide-scrollbars"),
                OsStr::new("--allow-file-access-from-files"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-extensions"),
            ]);
        if let Some(path) = &settings.chrome_path {
            builder.path(Some(path.clone()));
        }
        let options = builder.build().map_err(browser_error("Invalid launch options"))?;

        let browser = Browser::new(options).map_err(browser_error("Failed to launch browser"))?;
        let tab = browser.new_tab().map_err(browser_error("Failed to open tab"))?;

        let version = browser
            .get_version()
            .map(|v| v.product)
            .unwrap_or_else(|_| "unknown browser".to_string());
        info!(
            "Launched {} ({}x{}, headless: {}, settle delay: {:?})",
            version, settings.window_width, settings.window_height, settings.headless, settings.settle_delay
        );

        Ok(Self {
            browser,
            tab,
            settings,
        })
    }

    /// Launch a session, run `f` with it, and close it whatever `f` returns
    pub fn with_session<T>(
        settings: BrowserSettings,
        f: impl FnOnce(&mut BrowserSession) -> T,
    ) -> CaptureResult<T> {
        let mut session = Self::launch(settings)?;
        let result = f(&mut session);
        session.close();
        Ok(result)
    }

    /// Close the tab and shut the browser down
    pub fn close(self) {
        drop(self);
    }

    fn navigate(&self, url: &str) -> CaptureResult<()> {
        self.tab
            .navigate_to(url)
            .map_err(browser_error("Failed to navigate"))?
            .wait_until_navigated()
            .map_err(browser_error("Page did not finish loading"))?;
        Ok(())
    }

    fn hide_elements(&self, selectors: &[String]) -> CaptureResult<()> {
        let script = masking_script(selectors)?;
        let result = self
            .tab
            .evaluate(&script, false)
            .map_err(browser_error("Failed to hide ignored elements"))?;
        debug!(
            "Hid {} element(s) matching {:?}",
            result.value.map(|v| v.to_string()).unwrap_or_default(),
            selectors
        );
        Ok(())
    }

    fn capture_page(&self) -> CaptureResult<Vec<u8>> {
        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(browser_error("Failed to capture page"))
    }

    /// Capture the border box of the first match, or the union of every match
    fn capture_elements(&self, locator: &Locator, all: bool) -> CaptureResult<Vec<u8>> {
        let script = bounds_script(locator, all)?;
        let result = self
            .tab
            .evaluate(&script, false)
            .map_err(browser_error("Failed to locate elements"))?;
        let json = match result.value {
            Some(serde_json::Value::String(json)) => json,
            _ => return Err(CaptureError::element_not_found(locator)),
        };
        let bounds = parse_bounds(&json, locator)?;
        debug!("Clipping {} to {:?}", locator, bounds);

        // Page coordinates, so matches outside the viewport are rendered too
        let data = self
            .tab
            .call_method(Page::CaptureScreenshot {
                format: Some(Page::CaptureScreenshotFormatOption::Png),
                clip: Some(Page::Viewport {
                    x: bounds.x,
                    y: bounds.y,
                    width: bounds.width,
                    height: bounds.height,
                    scale: 1.0,
                }),
                quality: None,
                from_surface: Some(true),
                capture_beyond_viewport: Some(true),
                optimize_for_speed: None,
            })
            .map_err(browser_error("Failed to capture elements"))?
            .data;
        BASE64_STANDARD
            .decode(data)
            .map_err(browser_error("Invalid screenshot data"))
    }
}

impl CaptureProvider for BrowserSession {
    fn capture(&mut self, request: &CaptureRequest, destination: &Path) -> CaptureResult<()> {
        let url = resolve_target(&request.target)?;
        debug!(
            "Capturing {} of {} to {}",
            describe_locator(request.locator.as_ref()),
            url,
            destination.display()
        );

        self.navigate(&url)?;

        // Let animations and async layout finish
        thread::sleep(self.settings.settle_delay);

        if !request.ignored_elements.is_empty() {
            self.hide_elements(&request.ignored_elements)?;
        }

        let png = match &request.locator {
            None => self.capture_page()?,
            Some(locator) => self.capture_elements(locator, request.multi_element)?,
        };

        ensure_parent_dir(destination)?;
        fs::write(destination, png)?;
        Ok(())
    }

    fn source_type(&self) -> &str {
        "chrome"
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("Shutting down browser session");
        if let Err(e) = self.tab.close(false) {
            debug!("Tab did not close cleanly: {}", e);
        }
        // Dropping `browser` afterwards terminates the process
    }
}

impl std::fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

