pub mod backend;
pub mod browser;
pub mod types;
pub mod utils;

pub use backend::{CaptureProvider, FramebufferProvider, MockFramebuffer, Rect, Scene, SceneElement};
pub use browser::BrowserSession;
pub use types::{CaptureError, CaptureRequest, CaptureResult, Locator, LocatorStrategy};
pub use utils::{ensure_parent_dir, resolve_target};
