//! headless-render
//!
//! Render HTML into a PDF document or a raster screenshot by driving a
//! headless browser. The input is inline HTML, a URL, a local file or
//! standard input; the output goes to a file or to standard output.
//!
//! # Features
//!
//! - **CDP Backend** (default): Uses Chrome DevTools Protocol via headless Chrome
//! - **Swappable engine**: the render pipeline is generic over [`Engine`]
//!
//! # Example
//!
//! ```no_run
//! use headless_render::{input, output, render, Options};
//! use std::io::IsTerminal;
//!
//! # async fn example() -> headless_render::Result<()> {
//! let options = Options::parse_from(["headless-render", "pdf", "--content", "<h1>Hi</h1>"])?;
//! let location = input::resolve_location(&options.input, options.stdin_timeout).await?;
//! let pdf = render::run::<headless_render::cdp::CdpEngine>(&options, &location)?;
//! let stdout = std::io::stdout();
//! output::deliver(&pdf, options.path.as_deref(), stdout.is_terminal(), &mut stdout.lock())?;
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

pub mod cli;
pub mod config;
pub mod input;
pub mod options;
pub mod output;
pub mod render;

#[cfg(feature = "cdp")]
pub mod cdp;

pub use config::{
    Clip, Encoding, ImageType, Margin, MediaType, PaperFormat, PdfConfig, RenderConfig, ScreenshotConfig, WaitUntil,
};
pub use options::{InputSource, Options, PdfOptions, RenderCommand, ScreenshotOptions};

/// Viewport emulation requested with `--viewport`
///
/// Every field is optional; unset fields fall back to the defaults in
/// [`Viewport::DEFAULT_WIDTH`] and friends when the viewport is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_scale_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mobile: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_touch: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_landscape: Option<bool>,
}

impl Viewport {
    pub const DEFAULT_WIDTH: u32 = 800;
    pub const DEFAULT_HEIGHT: u32 = 600;

    pub fn width_or_default(&self) -> u32 {
        self.width.unwrap_or(Self::DEFAULT_WIDTH)
    }

    pub fn height_or_default(&self) -> u32 {
        self.height.unwrap_or(Self::DEFAULT_HEIGHT)
    }

    pub fn device_scale_factor_or_default(&self) -> f64 {
        self.device_scale_factor.unwrap_or(1.0)
    }
}

/// Settings used to start the browser
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchConfig {
    /// Run without a visible window
    pub headless: bool,
    /// Keep the browser's internal sandbox enabled
    pub sandbox: bool,
    /// Timeout for navigation and protocol calls
    pub timeout: Duration,
    /// Browser executable; auto-detected when `None`
    pub executable_path: Option<PathBuf>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: true,
            timeout: Duration::from_millis(options::DEFAULT_TIMEOUT_MS),
            executable_path: None,
        }
    }
}

impl LaunchConfig {
    pub fn from_options(options: &Options) -> Self {
        Self {
            headless: !options.debug,
            sandbox: options.sandbox,
            timeout: options.timeout,
            executable_path: options.executable_path.clone(),
        }
    }
}

/// The browser collaborator driven by the render pipeline
///
/// An engine owns one browser instance with a single page. Calls arrive in
/// a fixed order: `launch`, optionally `set_viewport`, `goto`,
/// `emulate_media`, one of `pdf`/`screenshot`, then `close` or `detach`.
pub trait Engine {
    /// Start a browser and open a page
    fn launch(config: &LaunchConfig) -> Result<Self>
    where
        Self: Sized;

    /// Emulate the given viewport on the page
    fn set_viewport(&mut self, viewport: &Viewport) -> Result<()>;

    /// Navigate to `location` and wait for the readiness condition
    fn goto(&mut self, location: &str, wait_until: WaitUntil) -> Result<()>;

    /// Force the CSS media type used for rendering
    fn emulate_media(&mut self, media: MediaType) -> Result<()>;

    /// Print the page. `None` means the renderer produced nothing.
    fn pdf(&mut self, config: &PdfConfig) -> Result<Option<Vec<u8>>>;

    /// Capture the page as an image. `None` means the renderer produced nothing.
    fn screenshot(&mut self, config: &ScreenshotConfig) -> Result<Option<Vec<u8>>>;

    /// Close the browser. Calling it again is a no-op.
    fn close(&mut self) -> Result<()>;

    /// Release the handle but leave the browser running
    fn detach(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_launch_config() {
        let config = LaunchConfig::default();
        assert!(config.headless);
        assert!(config.sandbox);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_viewport_defaults() {
        let viewport = Viewport {
            width: Some(1920),
            ..Default::default()
        };
        assert_eq!(viewport.width_or_default(), 1920);
        assert_eq!(viewport.height_or_default(), 600);
        assert_eq!(viewport.device_scale_factor_or_default(), 1.0);
    }

    #[test]
    fn test_viewport_serializes_only_given_fields() {
        let viewport = Viewport {
            width: Some(1024),
            is_mobile: Some(true),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&viewport).unwrap(),
            r#"{"width":1024,"isMobile":true}"#
        );
    }
}
