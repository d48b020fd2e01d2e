// Core types for screenshot capture

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// How a locator's selector is interpreted when resolving elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorStrategy {
    /// Element id attribute
    #[default]
    Id,
    /// CSS selector
    #[serde(alias = "css_selector")]
    Css,
    /// A single class name
    #[serde(alias = "class")]
    ClassName,
    /// Element tag name
    #[serde(alias = "tag")]
    TagName,
    /// Element name attribute
    Name,
    /// XPath expression
    #[serde(rename = "xpath")]
    XPath,
}

impl LocatorStrategy {
    /// Identifier used in configuration files and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorStrategy::Id => "id",
            LocatorStrategy::Css => "css",
            LocatorStrategy::ClassName => "class_name",
            LocatorStrategy::TagName => "tag_name",
            LocatorStrategy::Name => "name",
            LocatorStrategy::XPath => "xpath",
        }
    }

    /// Translate a selector into an equivalent CSS selector.
    ///
    /// Returns `None` for XPath, which has no CSS form.
    pub fn to_css(&self, selector: &str) -> Option<String> {
        match self {
            LocatorStrategy::Id => Some(format!("[id=\"{}\"]", escape_attribute(selector))),
            LocatorStrategy::Css => Some(selector.to_string()),
            LocatorStrategy::ClassName => Some(format!(".{}", selector.trim_start_matches('.'))),
            LocatorStrategy::TagName => Some(selector.to_string()),
            LocatorStrategy::Name => Some(format!("[name=\"{}\"]", escape_attribute(selector))),
            LocatorStrategy::XPath => None,
        }
    }
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocatorStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "id" => Ok(LocatorStrategy::Id),
            "css" | "css_selector" => Ok(LocatorStrategy::Css),
            "class" | "class_name" => Ok(LocatorStrategy::ClassName),
            "tag" | "tag_name" => Ok(LocatorStrategy::TagName),
            "name" => Ok(LocatorStrategy::Name),
            "xpath" => Ok(LocatorStrategy::XPath),
            other => Err(format!(
                "unknown locator strategy '{}' (expected id, css, class_name, tag_name, name or xpath)",
                other
            )),
        }
    }
}

fn escape_attribute(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Identifies the element(s) to capture on a page
///
/// In configuration files a bare string is shorthand for an element id:
/// `locator: myChart` is the same as `locator: { selector: myChart, by: id }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LocatorRepr")]
pub struct Locator {
    /// Selector text, interpreted according to `strategy`
    pub selector: String,

    /// How to interpret the selector
    #[serde(rename = "by")]
    pub strategy: LocatorStrategy,
}

impl Locator {
    pub fn new(selector: impl Into<String>, strategy: LocatorStrategy) -> Self {
        Self {
            selector: selector.into(),
            strategy,
        }
    }

    pub fn id(selector: impl Into<String>) -> Self {
        Self::new(selector, LocatorStrategy::Id)
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(selector, LocatorStrategy::Css)
    }

    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::new(selector, LocatorStrategy::XPath)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy, self.selector)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LocatorRepr {
    Bare(String),
    Full {
        selector: String,
        #[serde(default)]
        by: LocatorStrategy,
    },
}

impl From<LocatorRepr> for Locator {
    fn from(repr: LocatorRepr) -> Self {
        match repr {
            LocatorRepr::Bare(selector) => Locator::id(selector),
            LocatorRepr::Full { selector, by } => Locator::new(selector, by),
        }
    }
}

/// Everything a capture provider needs to produce one image
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CaptureRequest {
    /// URL or local file path of the page
    pub target: String,

    /// Element(s) to capture; the whole page when `None`
    pub locator: Option<Locator>,

    /// CSS selectors of elements made transparent before capture
    pub ignored_elements: Vec<String>,

    /// Capture every element matching the locator instead of the first one
    pub multi_element: bool,
}

impl CaptureRequest {
    /// Request a full page capture of the target
    pub fn page(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    /// Capture a specific element instead of the page
    pub fn locator(mut self, locator: Locator) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Set the selectors to hide before capture
    pub fn ignore(mut self, selectors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.ignored_elements = selectors.into_iter().map(Into::into).collect();
        self
    }

    /// Select all matching elements rather than the first
    pub fn multi_element(mut self, multi: bool) -> Self {
        self.multi_element = multi;
        self
    }
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Error types for capture operations
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The target is a local file that does not exist
    #[error("File path {} does not exist", .0.display())]
    TargetNotFound(PathBuf),

    /// The locator matched nothing on the page
    #[error("Element does not exist when looking for {strategy} '{selector}', confirm spelling and capitalization")]
    ElementNotFound {
        selector: String,
        strategy: LocatorStrategy,
    },

    /// Browser automation failure
    #[error("Browser error: {0}")]
    Browser(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding or decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl CaptureError {
    /// Build an `ElementNotFound` error for a locator
    pub fn element_not_found(locator: &Locator) -> Self {
        CaptureError::ElementNotFound {
            selector: locator.selector.clone(),
            strategy: locator.strategy,
        }
    }
}
