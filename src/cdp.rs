//! Chrome DevTools Protocol engine implementation

use crate::config::{Clip, ImageType, MediaType, PdfConfig, ScreenshotConfig, WaitUntil};
use crate::{Engine, Error, LaunchConfig, Result, Viewport};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::{Emulation, Page};
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Quiet period that counts as network idle
const IDLE_WINDOW: Duration = Duration::from_millis(500);
const IDLE_POLL: Duration = Duration::from_millis(100);
/// Extra time the browser connection may sit idle beyond the navigation timeout
const IDLE_BROWSER_GRACE: Duration = Duration::from_secs(30);

/// CDP-based engine (uses the `headless_chrome` crate)
///
/// Launches one Chrome instance and renders through a single tab.
pub struct CdpEngine {
    browser: Option<Browser>,
    tab: Arc<Tab>,
    timeout: Duration,
    viewport: Viewport,
}

#[derive(Debug, Deserialize)]
struct ContentSize {
    width: f64,
    height: f64,
}

impl CdpEngine {
    fn override_metrics(&self, width: u32, height: u32) -> Result<()> {
        let (orientation, angle) = if self.viewport.is_landscape == Some(true) {
            ("landscapePrimary", 90)
        } else {
            ("portraitPrimary", 0)
        };

        let params: Emulation::SetDeviceMetricsOverride = protocol_params(json!({
            "width": width,
            "height": height,
            "deviceScaleFactor": self.viewport.device_scale_factor_or_default(),
            "mobile": self.viewport.is_mobile.unwrap_or(false),
            "screenOrientation": { "type": orientation, "angle": angle },
        }))?;

        self.tab
            .call_method(params)
            .map_err(|e| Error::RenderError(format!("Failed to set device metrics: {}", e)))?;
        Ok(())
    }

    fn resource_count(&self) -> Result<u64> {
        let object = self
            .tab
            .evaluate("performance.getEntriesByType('resource').length", false)
            .map_err(|e| Error::LoadError(format!("Failed to inspect network activity: {}", e)))?;
        Ok(object.value.and_then(|v| v.as_u64()).unwrap_or(0))
    }

    /// Wait until at most `budget` resources finish within one idle window.
    fn wait_for_network_idle(&self, budget: u64) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        let mut baseline = self.resource_count()?;
        let mut window_start = Instant::now();

        loop {
            std::thread::sleep(IDLE_POLL);
            let count = self.resource_count()?;
            if count > baseline + budget {
                baseline = count;
                window_start = Instant::now();
            } else if window_start.elapsed() >= IDLE_WINDOW {
                debug!("Network idle after {} resources", count);
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout(self.timeout.as_millis() as u64));
            }
        }
    }

    fn content_size(&self) -> Result<ContentSize> {
        let object = self
            .tab
            .evaluate(
                r#"JSON.stringify({
                    width: Math.ceil(document.documentElement.scrollWidth),
                    height: Math.ceil(document.documentElement.scrollHeight)
                })"#,
                false,
            )
            .map_err(|e| Error::RenderError(format!("Failed to measure page: {}", e)))?;

        let json = object
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| Error::RenderError("No value returned from page measurement".into()))?;
        serde_json::from_str(&json).map_err(|e| Error::RenderError(format!("Unexpected page measurement: {}", e)))
    }

    fn set_transparent_background(&self) -> Result<()> {
        let params: Emulation::SetDefaultBackgroundColorOverride =
            protocol_params(json!({ "color": { "r": 0, "g": 0, "b": 0, "a": 0 } }))?;
        self.tab
            .call_method(params)
            .map_err(|e| Error::RenderError(format!("Failed to clear background: {}", e)))?;
        Ok(())
    }
}

impl Engine for CdpEngine {
    fn launch(config: &LaunchConfig) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(config.sandbox)
            .path(config.executable_path.clone())
            .idle_browser_timeout(config.timeout + IDLE_BROWSER_GRACE)
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(config.timeout);

        Ok(Self {
            browser: Some(browser),
            tab,
            timeout: config.timeout,
            viewport: Viewport::default(),
        })
    }

    fn set_viewport(&mut self, viewport: &Viewport) -> Result<()> {
        self.viewport = *viewport;
        self.override_metrics(viewport.width_or_default(), viewport.height_or_default())?;

        let touch: Emulation::SetTouchEmulationEnabled =
            protocol_params(json!({ "enabled": viewport.has_touch.unwrap_or(false) }))?;
        self.tab
            .call_method(touch)
            .map_err(|e| Error::RenderError(format!("Failed to set touch emulation: {}", e)))?;
        Ok(())
    }

    fn goto(&mut self, location: &str, wait_until: WaitUntil) -> Result<()> {
        self.tab
            .navigate_to(location)
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;

        if let Some(budget) = wait_until.idle_budget() {
            self.wait_for_network_idle(budget as u64)?;
        }
        Ok(())
    }

    fn emulate_media(&mut self, media: MediaType) -> Result<()> {
        self.tab
            .call_method(Emulation::SetEmulatedMedia {
                media: Some(media.as_str().to_string()),
                features: None,
            })
            .map_err(|e| Error::RenderError(format!("Failed to emulate media: {}", e)))?;
        Ok(())
    }

    fn pdf(&mut self, config: &PdfConfig) -> Result<Option<Vec<u8>>> {
        let (paper_width, paper_height) = config.paper_size()?;
        let (top, right, bottom, left) = config.margins()?;

        let options = PrintToPdfOptions {
            landscape: Some(config.landscape),
            display_header_footer: Some(config.display_header_footer),
            print_background: Some(config.print_background),
            scale: Some(config.scale),
            paper_width: Some(paper_width),
            paper_height: Some(paper_height),
            margin_top: Some(top),
            margin_bottom: Some(bottom),
            margin_left: Some(left),
            margin_right: Some(right),
            page_ranges: (!config.page_ranges.is_empty()).then(|| config.page_ranges.clone()),
            header_template: config.header_template.clone(),
            footer_template: config.footer_template.clone(),
            prefer_css_page_size: Some(config.prefer_css_page_size),
            ..Default::default()
        };

        let pdf = self
            .tab
            .print_to_pdf(Some(options))
            .map_err(|e| Error::RenderError(format!("PDF generation failed: {}", e)))?;
        Ok((!pdf.is_empty()).then_some(pdf))
    }

    fn screenshot(&mut self, config: &ScreenshotConfig) -> Result<Option<Vec<u8>>> {
        let format = match config.image_type {
            ImageType::Png => Page::CaptureScreenshotFormatOption::Png,
            ImageType::Jpeg => Page::CaptureScreenshotFormatOption::Jpeg,
        };

        let quality = match (config.image_type, config.quality) {
            (ImageType::Jpeg, quality) => quality.map(u32::from),
            (ImageType::Png, Some(_)) => {
                warn!("Quality is not applicable to png screenshots; ignoring it");
                None
            }
            (ImageType::Png, None) => None,
        };

        let clip = match &config.clip {
            Some(clip) => Some(clip_region(clip)?),
            None if config.full_page => {
                let size = self.content_size()?;
                debug!("Full page size {}x{}", size.width, size.height);
                self.override_metrics(size.width.ceil() as u32, size.height.ceil() as u32)?;
                Some(Page::Viewport {
                    x: 0.0,
                    y: 0.0,
                    width: size.width,
                    height: size.height,
                    scale: 1.0,
                })
            }
            None => None,
        };

        if config.omit_background {
            self.set_transparent_background()?;
        }

        let image = self
            .tab
            .capture_screenshot(format, quality, clip, true)
            .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))?;
        Ok((!image.is_empty()).then_some(image))
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the browser terminates the child process.
        drop(self.browser.take());
        Ok(())
    }

    fn detach(&mut self) {
        if let Some(browser) = self.browser.take() {
            std::mem::forget(browser);
        }
    }
}

/// Build protocol parameters from JSON so optional fields default to `None`.
fn protocol_params<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::CdpError(format!("Invalid protocol parameters: {}", e)))
}

fn clip_region(clip: &Clip) -> Result<Page::Viewport> {
    let number = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidClipValue(value.to_string()))
    };
    Ok(Page::Viewport {
        x: number(clip.x.as_str())?,
        y: number(clip.y.as_str())?,
        width: number(clip.width.as_str())?,
        height: number(clip.height.as_str())?,
        scale: 1.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_region_parses_numbers() {
        let clip = Clip {
            x: "0".into(),
            y: " 10.5".into(),
            width: "100".into(),
            height: "50".into(),
        };
        let region = clip_region(&clip).unwrap();
        assert_eq!((region.x, region.y, region.width, region.height), (0.0, 10.5, 100.0, 50.0));
    }

    #[test]
    fn metrics_params_build_from_json() {
        let params: Emulation::SetDeviceMetricsOverride = protocol_params(json!({
            "width": 800,
            "height": 600,
            "deviceScaleFactor": 2.0,
            "mobile": true,
        }))
        .unwrap();
        assert_eq!(params.width, 800);
        assert!(params.mobile);
    }

    #[test]
    fn test_cdp_engine_launch() {
        // This test requires Chrome to be installed, so we skip it in CI
        if std::env::var("CI").is_ok() {
            return;
        }
        let result = CdpEngine::launch(&LaunchConfig::default());
        let mut engine = match result {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("Skipping CDP engine launch test because Chrome is not available or failed to launch: {}", e);
                return;
            }
        };
        assert!(engine.close().is_ok());
    }
}
