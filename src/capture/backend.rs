//! Capture provider abstraction.
//!
//! This module provides a unified interface for producing screenshots:
//! - `BrowserSession` drives a real Chrome/Chromium (see `browser.rs`)
//! - `FramebufferProvider` renders synthetic pages drawn on a `MockFramebuffer`

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageBuffer, RgbImage};
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use super::types::{CaptureError, CaptureRequest, CaptureResult, Locator, LocatorStrategy};
use super::utils::ensure_parent_dir;

/// Trait for capture providers
///
/// A provider turns a [`CaptureRequest`] into a PNG file at `destination`,
/// creating parent directories as needed. Element resolution, hiding ignored
/// elements and waiting for the page to settle are the provider's job.
pub trait CaptureProvider {
    /// Capture the requested page or element(s) into `destination`
    fn capture(&mut self, request: &CaptureRequest, destination: &Path) -> CaptureResult<()>;

    /// Get the source type identifier (e.g., "chrome", "framebuffer")
    fn source_type(&self) -> &str;
}

/// A virtual framebuffer for testing and programmatic drawing
///
/// Provides a full drawing API for creating synthetic pages:
/// - `fill()` - Fill entire buffer with a color
/// - `draw_rect()` - Draw a filled rectangle
/// - `draw_text()` - Draw text using font8x8 glyphs
/// - `get_pixel()` / `set_pixel()` - Direct pixel access
#[derive(Debug, Clone, PartialEq)]
pub struct MockFramebuffer {
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    /// RGB pixel buffer (row-major, 3 bytes per pixel)
    buffer: Vec<u8>,
}

impl MockFramebuffer {
    /// Create a new framebuffer with the given dimensions, initialized to black
    pub fn new(width: u32, height: u32) -> Self {
        let buffer = vec![0u8; (width * height * 3) as usize];
        Self {
            width,
            height,
            buffer,
        }
    }

    /// Create a framebuffer initialized to a specific color
    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut fb = Self::new(width, height);
        fb.fill(color);
        fb
    }

    /// Load a framebuffer from PNG image bytes
    pub fn from_png_bytes(data: &[u8]) -> CaptureResult<Self> {
        let rgb = image::load_from_memory(data)?.to_rgb8();
        Ok(Self {
            width: rgb.width(),
            height: rgb.height(),
            buffer: rgb.into_raw(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fill the entire framebuffer with a color
    pub fn fill(&mut self, color: [u8; 3]) {
        for chunk in self.buffer.chunks_exact_mut(3) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Draw a filled rectangle
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        for py in y..(y + h).min(self.height) {
            for px in x..(x + w).min(self.width) {
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Draw text using font8x8 glyphs
    ///
    /// Each character is 8x8 pixels. Text does not wrap.
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, fg: [u8; 3], bg: [u8; 3]) {
        let mut cursor_x = x;
        for ch in text.chars() {
            self.draw_char(cursor_x, y, ch, fg, bg);
            cursor_x += 8;
            if cursor_x >= self.width {
                break;
            }
        }
    }

    fn draw_char(&mut self, x: u32, y: u32, ch: char, fg: [u8; 3], bg: [u8; 3]) {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (row_idx, row) in glyph.iter().enumerate() {
            let py = y + row_idx as u32;
            if py >= self.height {
                break;
            }
            for bit in 0..8 {
                let px = x + bit;
                if px >= self.width {
                    break;
                }
                // font8x8 stores LSB as leftmost pixel
                let is_fg = (row >> bit) & 1 == 1;
                self.set_pixel(px, py, if is_fg { fg } else { bg });
            }
        }
    }

    /// Get the color of a pixel
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let idx = ((y * self.width + x) * 3) as usize;
        [self.buffer[idx], self.buffer[idx + 1], self.buffer[idx + 2]]
    }

    /// Set the color of a pixel
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.buffer[idx..idx + 3].copy_from_slice(&color);
    }

    /// Copy a region into a new framebuffer, clamped to the buffer bounds
    pub fn crop(&self, rect: Rect) -> MockFramebuffer {
        let x0 = rect.x.min(self.width);
        let y0 = rect.y.min(self.height);
        let x1 = (rect.x + rect.width).min(self.width);
        let y1 = (rect.y + rect.height).min(self.height);

        let mut out = MockFramebuffer::new(x1 - x0, y1 - y0);
        for y in y0..y1 {
            for x in x0..x1 {
                out.set_pixel(x - x0, y - y0, self.get_pixel(x, y));
            }
        }
        out
    }

    /// Convert to an image buffer
    pub fn to_image(&self) -> RgbImage {
        ImageBuffer::from_fn(self.width, self.height, |x, y| image::Rgb(self.get_pixel(x, y)))
    }

    /// Encode the framebuffer as PNG bytes
    pub fn to_png(&self) -> CaptureResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.to_image()
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }
}

/// Axis-aligned rectangle in framebuffer pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Rect::new(x, y, right - x, bottom - y)
    }
}

/// A box drawn on a synthetic page that locators can resolve to
#[derive(Debug, Clone, PartialEq)]
pub struct SceneElement {
    pub tag: String,
    pub id: Option<String>,
    pub class: Option<String>,
    pub rect: Rect,
    pub color: [u8; 3],
    /// Text drawn in the top-left corner of the box
    pub text: Option<String>,
}

impl SceneElement {
    pub fn new(tag: impl Into<String>, rect: Rect, color: [u8; 3]) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            class: None,
            rect,
            color,
            text: None,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Whether a CSS-style selector (`#id`, `.class` or `tag`) matches this element
    fn matches_css(&self, selector: &str) -> bool {
        if let Some(id) = selector.strip_prefix('#') {
            self.id.as_deref() == Some(id)
        } else if let Some(class) = selector.strip_prefix('.') {
            self.class.as_deref() == Some(class)
        } else {
            self.tag == selector
        }
    }

    fn matches(&self, locator: &Locator) -> bool {
        match locator.strategy {
            LocatorStrategy::Id => self.id.as_deref() == Some(locator.selector.as_str()),
            LocatorStrategy::ClassName => {
                self.class.as_deref() == Some(locator.selector.trim_start_matches('.'))
            }
            LocatorStrategy::TagName => self.tag == locator.selector,
            LocatorStrategy::Css => self.matches_css(&locator.selector),
            LocatorStrategy::Name | LocatorStrategy::XPath => false,
        }
    }
}

/// A synthetic page: a background color plus positioned elements
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub background: [u8; 3],
    pub elements: Vec<SceneElement>,
}

impl Scene {
    pub fn new(width: u32, height: u32, background: [u8; 3]) -> Self {
        Self {
            width,
            height,
            background,
            elements: Vec::new(),
        }
    }

    /// Add an element on top of the existing ones
    pub fn element(mut self, element: SceneElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Paint the scene, leaving elements matched by `ignored` unpainted.
    ///
    /// Ignored elements keep their position so nothing else moves.
    pub fn render(&self, ignored: &[String]) -> MockFramebuffer {
        let mut fb = MockFramebuffer::with_color(self.width, self.height, self.background);
        for element in &self.elements {
            if ignored.iter().any(|selector| element.matches_css(selector)) {
                continue;
            }
            let r = element.rect;
            fb.draw_rect(r.x, r.y, r.width, r.height, element.color);
            if let Some(text) = &element.text {
                let ink = element.color.map(|c| 255 - c);
                fb.draw_text(r.x, r.y, text, ink, element.color);
            }
        }
        fb
    }

    /// Resolve a locator to the region to capture
    fn locate(&self, locator: &Locator, multi_element: bool) -> Option<Rect> {
        let mut matches = self.elements.iter().filter(|e| e.matches(locator)).map(|e| e.rect);
        let first = matches.next()?;
        if multi_element {
            Some(matches.fold(first, |acc, rect| acc.union(&rect)))
        } else {
            Some(first)
        }
    }
}

/// Capture provider serving synthetic pages from memory
///
/// Targets are looked up by their exact string. Every request is recorded so
/// callers can inspect what reached the provider and in which order.
#[derive(Debug, Default)]
pub struct FramebufferProvider {
    scenes: HashMap<String, Scene>,
    history: Vec<(CaptureRequest, PathBuf)>,
}

impl FramebufferProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the page served for `target`
    pub fn set_scene(&mut self, target: impl Into<String>, scene: Scene) {
        self.scenes.insert(target.into(), scene);
    }

    /// Builder form of [`set_scene`](Self::set_scene)
    pub fn with_scene(mut self, target: impl Into<String>, scene: Scene) -> Self {
        self.set_scene(target, scene);
        self
    }

    /// All requests received so far, with their destinations
    pub fn history(&self) -> &[(CaptureRequest, PathBuf)] {
        &self.history
    }
}

impl CaptureProvider for FramebufferProvider {
    fn capture(&mut self, request: &CaptureRequest, destination: &Path) -> CaptureResult<()> {
        self.history.push((request.clone(), destination.to_path_buf()));

        let scene = self
            .scenes
            .get(&request.target)
            .ok_or_else(|| CaptureError::TargetNotFound(PathBuf::from(&request.target)))?;

        let page = scene.render(&request.ignored_elements);
        let shot = match &request.locator {
            None => page,
            Some(locator) => {
                let rect = scene
                    .locate(locator, request.multi_element)
                    .ok_or_else(|| CaptureError::element_not_found(locator))?;
                page.crop(rect)
            }
        };

        ensure_parent_dir(destination)?;
        fs::write(destination, shot.to_png()?)?;
        debug!(
            "Rendered {}x{} framebuffer capture to {}",
            shot.width(),
            shot.height(),
            destination.display()
        );
        Ok(())
    }

    fn source_type(&self) -> &str {
        "framebuffer"
    }
}
