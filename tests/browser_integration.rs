//! Captures through a real Chrome. Opt in with VISUAL_REGRESSION_RUN_BROWSER_TESTS=1.

use std::env;
use std::fs;
use std::time::Duration;

use image::GenericImageView;
use tempfile::TempDir;
use visual_regression::config::BrowserSettings;
use visual_regression::{BrowserSession, CaptureProvider, CaptureRequest, Locator};

fn browser_tests_enabled() -> bool {
    env::var("VISUAL_REGRESSION_RUN_BROWSER_TESTS").ok().as_deref() == Some("1")
}

fn settings() -> BrowserSettings {
    BrowserSettings::from_env()
        .window_size(400, 300)
        .settle_delay(Duration::from_millis(200))
}

/// One bordered, padded card far below a 300px viewport
const TALL_PAGE: &str = r#"<!doctype html>
<html>
<body style="margin: 0; background: white">
  <div style="height: 1500px"></div>
  <div class="card" style="width: 120px; height: 50px; padding: 10px; border: 5px solid red; background: blue"></div>
</body>
</html>
"#;

#[test]
#[ignore] // Opt-in smoke test
fn test_element_below_viewport_same_in_both_modes() {
    if !browser_tests_enabled() {
        return;
    }

    let dir = TempDir::new().expect("Failed to create temp dir");
    let page = dir.path().join("tall.html");
    fs::write(&page, TALL_PAGE).expect("Failed to write page");

    let request = CaptureRequest::page(page.display().to_string()).locator(Locator::css(".card"));
    let first = dir.path().join("first.png");
    let all = dir.path().join("all.png");

    BrowserSession::with_session(settings(), |session| -> Result<(), Box<dyn std::error::Error>> {
        session.capture(&request, &first)?;
        session.capture(&request.clone().multi_element(true), &all)?;
        Ok(())
    })
    .expect("Failed to launch browser")
    .expect("Capture failed");

    // Border box: 120 + 2 * 10 padding + 2 * 5 border
    let image = image::open(&first).expect("Failed to open capture");
    assert_eq!(image.dimensions(), (150, 80));
    assert_eq!(image.get_pixel(75, 40).0, [0, 0, 255, 255]);
    assert_eq!(image.get_pixel(1, 1).0, [255, 0, 0, 255]);

    assert_eq!(fs::read(&first).unwrap(), fs::read(&all).unwrap());
}

#[test]
#[ignore] // Opt-in smoke test
fn test_session_closes_after_scoped_use() {
    if !browser_tests_enabled() {
        return;
    }

    let dir = TempDir::new().expect("Failed to create temp dir");
    let page = dir.path().join("tall.html");
    fs::write(&page, TALL_PAGE).expect("Failed to write page");
    let request = CaptureRequest::page(page.display().to_string());

    // Sessions are released one after another without leaking the previous tab
    for round in 0..2 {
        let shot = dir.path().join(format!("page-{}.png", round));
        BrowserSession::with_session(settings(), |session| session.capture(&request, &shot))
            .expect("Failed to launch browser")
            .expect("Capture failed");
        assert_eq!(image::open(&shot).unwrap().dimensions(), (400, 300));
    }

    let session = BrowserSession::launch(settings()).expect("Failed to launch browser");
    session.close();
}
