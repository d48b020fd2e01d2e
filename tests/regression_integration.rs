//! Integration tests for baseline comparison and batch runs

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use visual_regression::batch::{BatchOptions, ConfigFormat, execute_all, load_jobs};
use visual_regression::capture::{FramebufferProvider, Rect, Scene, SceneElement};
use visual_regression::diff::PixelDiffer;
use visual_regression::engine::{RegressionError, Thresholds, Verdict, assert_similarity};
use visual_regression::{BatchError, CaptureRequest, Locator};

const PAGE: &str = "dashboard.html";

/// Dashboard with a header, a chart and a rotating ad banner
fn dashboard(chart_width: u32, ad_color: [u8; 3]) -> Scene {
    Scene::new(200, 150, [245, 245, 245])
        .element(SceneElement::new("header", Rect::new(0, 0, 200, 20), [30, 30, 60]).id("header"))
        .element(SceneElement::new("canvas", Rect::new(20, 40, chart_width, 60), [200, 60, 60]).id("myChart"))
        .element(SceneElement::new("div", Rect::new(120, 110, 70, 30), ad_color).class("ad"))
}

fn write_config(dir: &Path) -> String {
    format!(
        r#"
tests:
  - name: chart
    url: {page}
    folder: {root}/chart
    locator: myChart
  - name: page-without-ads
    url: {page}
    folder: {root}/page
    ignored_elements: [".ad"]
screenshots:
  - url: {page}
    filename: {root}/shots/full.png
  - url: {page}
    filename: {root}/shots/header.png
    locator:
      selector: header
      by: tag_name
"#,
        page = PAGE,
        root = dir.display()
    )
}

#[test]
fn test_batch_first_run_then_regression() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let jobs = load_jobs(&write_config(dir.path()), ConfigFormat::Yaml).expect("Failed to parse config");
    let differ = PixelDiffer::new(16);

    // First run records baselines
    let mut provider = FramebufferProvider::new().with_scene(PAGE, dashboard(100, [0, 200, 0]));
    let report = execute_all(&jobs, &mut provider, &differ, BatchOptions::default()).expect("First run failed");
    assert!(report.success);
    assert_eq!(report.screenshots.len(), 2);
    assert!(dir.path().join("shots/full.png").exists());
    assert!(dir.path().join("shots/header.png").exists());
    assert!(report.comparisons.iter().all(|c| c.baseline_created));
    assert!(report.comparisons.iter().all(|c| c.difference == Some(0.0)));

    let chart_baseline = fs::read(dir.path().join("chart/baseline.png")).unwrap();

    // The ad rotates: hidden in the full-page job, outside the chart crop
    provider.set_scene(PAGE, dashboard(100, [0, 0, 200]));
    let report = execute_all(&jobs, &mut provider, &differ, BatchOptions::default()).expect("Second run failed");
    assert!(report.success);
    assert!(report.comparisons.iter().all(|c| c.verdict == Some(Verdict::Pass)));
    assert!(report.comparisons.iter().all(|c| !c.baseline_created));
    assert_eq!(fs::read(dir.path().join("chart/baseline.png")).unwrap(), chart_baseline);

    // The chart grows 60px wider: the cropped element changes a lot
    provider.set_scene(PAGE, dashboard(160, [0, 0, 200]));
    let err = execute_all(&jobs, &mut provider, &differ, BatchOptions::default()).unwrap_err();
    match err {
        BatchError::Job { index, source, .. } => {
            assert_eq!(index, 0);
            assert!(matches!(source, RegressionError::ThresholdExceeded { .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
    for file in ["baseline.png", "current.png", "diff.png", "thresh.png"] {
        assert!(dir.path().join("chart").join(file).exists(), "{} missing", file);
    }
    assert_eq!(fs::read(dir.path().join("chart/baseline.png")).unwrap(), chart_baseline);

    // Keep going reports both comparisons
    let report = execute_all(&jobs, &mut provider, &differ, BatchOptions::default().keep_going(true))
        .expect("Keep-going run failed");
    assert!(!report.success);
    assert_eq!(report.comparisons.len(), 2);
    assert_eq!(report.comparisons[0].verdict, Some(Verdict::Fail));
    assert!(report.comparisons[0].difference.unwrap() > 30.0);
    assert!(report.comparisons[1].error.is_none());
}

#[test]
fn test_assert_similarity_warning_band() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let folder = dir.path().join("page");
    let request = CaptureRequest::page(PAGE);
    let differ = PixelDiffer::new(16);

    let mut provider = FramebufferProvider::new().with_scene(PAGE, dashboard(100, [0, 200, 0]));
    let first = assert_similarity(&request, &folder, &mut provider, &differ, Thresholds::default()).unwrap();
    assert!(first < 0.01);

    // Widening the chart by 80px changes 80 * 60 of 30000 pixels (16%)
    provider.set_scene(PAGE, dashboard(180, [0, 200, 0]));
    let d = assert_similarity(&request, &folder, &mut provider, &differ, Thresholds::default()).unwrap();
    assert!(d > 10.0 && d < 30.0, "difference {}", d);

    // The same change fails under a tighter error threshold
    let err = assert_similarity(&request, &folder, &mut provider, &differ, Thresholds::new(5.0, 15.0)).unwrap_err();
    assert_eq!(err.to_string(), format!("Difference {} is over error threshold 15", d));
}

#[test]
fn test_multielement_captures_union() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let scene = Scene::new(100, 100, [255, 255, 255])
        .element(SceneElement::new("div", Rect::new(10, 10, 10, 10), [0, 0, 0]).class("card"))
        .element(SceneElement::new("div", Rect::new(60, 70, 20, 20), [0, 0, 0]).class("card"));
    let mut provider = FramebufferProvider::new().with_scene(PAGE, scene);
    let request = CaptureRequest::page(PAGE)
        .locator(Locator::new("card", visual_regression::LocatorStrategy::ClassName))
        .multi_element(true);

    assert_similarity(&request, &dir.path().join("cards"), &mut provider, &PixelDiffer::new(16), Thresholds::default())
        .unwrap();

    let baseline = image::open(dir.path().join("cards/baseline.png")).unwrap().to_rgb8();
    assert_eq!(baseline.dimensions(), (70, 80));
}
