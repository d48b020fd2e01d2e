use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use url::Url;

use crate::capture::types::{CaptureError, CaptureResult, Locator, LocatorStrategy};

/// Turn a configured target into a URL the browser can navigate to.
///
/// - `http...` and `file://...` targets are used as-is
/// - a bare path ending in `.html` is a local file; it must exist
/// - anything else is assumed to be a host and gets `http://` prepended
pub fn resolve_target(target: &str) -> CaptureResult<String> {
    if target.starts_with("http") || target.starts_with("file://") {
        return Ok(target.to_string());
    }

    if target.ends_with(".html") {
        debug!("Target '{}' has no protocol, treating it as a file path", target);
        let path = Path::new(target);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        if !absolute.exists() {
            return Err(CaptureError::TargetNotFound(absolute));
        }
        let canonical = absolute.canonicalize()?;
        return Url::from_file_path(&canonical)
            .map(|url| url.to_string())
            .map_err(|()| CaptureError::TargetNotFound(canonical));
    }

    Ok(format!("http://{}", target))
}

/// Create the parent directory of an output file if it is missing
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Build the script that makes every element matching `selectors` transparent.
///
/// Elements keep their layout box; only their paint is suppressed. Selectors are
/// embedded as a JSON array so their text reaches the page unaltered.
pub fn masking_script(selectors: &[String]) -> CaptureResult<String> {
    let encoded = serde_json::to_string(selectors)
        .map_err(|e| CaptureError::Browser(format!("Failed to encode ignored selectors: {}", e)))?;
    Ok(format!(
        r#"(function(selectors) {{
    var hidden = 0;
    selectors.forEach(function(selector) {{
        document.querySelectorAll(selector).forEach(function(element) {{
            element.style.setProperty("opacity", "0", "important");
            hidden += 1;
        }});
    }});
    return hidden;
}})({})"#,
        encoded
    ))
}

/// Page-space rectangle covering a set of elements
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ElementBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Build the script returning the border box of the first element matching
/// `locator`, or the union of every match when `all` is set. The box is in
/// page coordinates, as a JSON string, or `null` when nothing matches.
pub fn bounds_script(locator: &Locator, all: bool) -> CaptureResult<String> {
    let encode = |value: &str| {
        serde_json::to_string(value)
            .map_err(|e| CaptureError::Browser(format!("Failed to encode locator: {}", e)))
    };

    let query = match locator.strategy.to_css(&locator.selector) {
        Some(css) => format!(
            "Array.prototype.slice.call(document.querySelectorAll({}))",
            encode(&css)?
        ),
        None => format!(
            r#"(function(expr) {{
        var snapshot = document.evaluate(expr, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
        var found = [];
        for (var i = 0; i < snapshot.snapshotLength; i++) {{ found.push(snapshot.snapshotItem(i)); }}
        return found;
    }})({})"#,
            encode(&locator.selector)?
        ),
    };

    let nodes = if all { query } else { format!("{}.slice(0, 1)", query) };

    Ok(format!(
        r#"(function() {{
    var nodes = {};
    if (nodes.length === 0) {{ return null; }}
    var left = Infinity, top = Infinity, right = -Infinity, bottom = -Infinity;
    nodes.forEach(function(node) {{
        var rect = node.getBoundingClientRect();
        left = Math.min(left, rect.left);
        top = Math.min(top, rect.top);
        right = Math.max(right, rect.right);
        bottom = Math.max(bottom, rect.bottom);
    }});
    return JSON.stringify({{
        x: left + window.scrollX,
        y: top + window.scrollY,
        width: right - left,
        height: bottom - top
    }});
}})()"#,
        nodes
    ))
}

/// Parse the JSON produced by [`bounds_script`]
pub fn parse_bounds(json: &str, locator: &Locator) -> CaptureResult<ElementBounds> {
    let bounds: ElementBounds = serde_json::from_str(json)
        .map_err(|e| CaptureError::Browser(format!("Unexpected element bounds '{}': {}", json, e)))?;
    if bounds.width <= 0.0 || bounds.height <= 0.0 {
        return Err(CaptureError::element_not_found(locator));
    }
    Ok(bounds)
}

/// Human readable description of where a locator points, for log lines
pub fn describe_locator(locator: Option<&Locator>) -> String {
    match locator {
        Some(locator) if locator.strategy == LocatorStrategy::Id => format!("#{}", locator.selector),
        Some(locator) => locator.to_string(),
        None => "full page".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_target_http_passthrough() {
        assert_eq!(resolve_target("https://example.com").unwrap(), "https://example.com");
        assert_eq!(resolve_target("http://localhost:8000/a.html").unwrap(), "http://localhost:8000/a.html");
    }

    #[test]
    fn test_resolve_target_file_url_passthrough() {
        assert_eq!(resolve_target("file:///tmp/page.html").unwrap(), "file:///tmp/page.html");
    }

    #[test]
    fn test_resolve_target_bare_host_gets_http() {
        assert_eq!(resolve_target("example.com").unwrap(), "http://example.com");
    }

    #[test]
    fn test_resolve_target_missing_html_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.html");
        let err = resolve_target(missing.to_str().unwrap()).unwrap_err();
        match err {
            CaptureError::TargetNotFound(path) => assert_eq!(path, missing),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_resolve_target_existing_html_file() {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("index.html");
        fs::write(&page, "<html></html>").unwrap();

        let url = resolve_target(page.to_str().unwrap()).unwrap();
        assert!(url.starts_with("file://"), "got {}", url);
        assert!(url.ends_with("/index.html"), "got {}", url);
    }

    #[test]
    fn test_ensure_parent_dir_creates_nested() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a").join("b").join("shot.png");
        ensure_parent_dir(&file).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
        // Bare filenames have no parent to create
        ensure_parent_dir(Path::new("shot.png")).unwrap();
    }

    #[test]
    fn test_masking_script_embeds_selectors_verbatim() {
        let selectors = vec![".hero".to_string(), "div[data-x=\"1\"]".to_string()];
        let script = masking_script(&selectors).unwrap();
        assert!(script.contains(r#"[".hero","div[data-x=\"1\"]"]"#), "{}", script);
        assert!(script.contains("\"opacity\", \"0\", \"important\""));
    }

    #[test]
    fn test_bounds_script_css_and_xpath() {
        let css = bounds_script(&Locator::css(".card"), true).unwrap();
        assert!(css.contains("querySelectorAll(\".card\")"));
        assert!(!css.contains(".slice(0, 1)"));

        let xpath = bounds_script(&Locator::xpath("//canvas"), true).unwrap();
        assert!(xpath.contains("document.evaluate"));
        assert!(xpath.contains("\"//canvas\""));
    }

    #[test]
    fn test_bounds_script_first_match_uses_same_geometry() {
        let locator = Locator::css(".card");
        let first = bounds_script(&locator, false).unwrap();
        let all = bounds_script(&locator, true).unwrap();

        // Only the node list differs between the two modes
        assert!(first.contains("querySelectorAll(\".card\")).slice(0, 1)"));
        assert_eq!(first.replace(".slice(0, 1)", ""), all);
        assert!(first.contains("getBoundingClientRect"));
        assert!(first.contains("window.scrollY"));
    }

    #[test]
    fn test_parse_bounds() {
        let locator = Locator::css(".card");
        let bounds = parse_bounds(r#"{"x": 10, "y": 20.5, "width": 100, "height": 50}"#, &locator).unwrap();
        assert_eq!(bounds, ElementBounds { x: 10.0, y: 20.5, width: 100.0, height: 50.0 });

        let empty = parse_bounds(r#"{"x": 0, "y": 0, "width": 0, "height": 0}"#, &locator);
        assert!(matches!(empty, Err(CaptureError::ElementNotFound { .. })));
    }

    #[test]
    fn test_describe_locator() {
        assert_eq!(describe_locator(None), "full page");
        assert_eq!(describe_locator(Some(&Locator::id("myChart"))), "#myChart");
        assert_eq!(describe_locator(Some(&Locator::css(".a"))), "css=.a");
    }
}
