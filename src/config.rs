//! Output configuration records and the translation from validated options.
//!
//! The records mirror the two output shapes the renderer understands: a
//! [`PdfConfig`] for printed documents and a [`ScreenshotConfig`] for raster
//! images. They are built once per invocation by [`translate`] and never
//! mutated afterwards.

use crate::options::{Options, PdfOptions, RenderCommand, ScreenshotOptions};
use crate::{Error, Result};
use clap::ValueEnum;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_SCALE: f64 = 1.0;
pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 2.0;
pub const MAX_QUALITY: i64 = 100;

/// Paper sizes accepted by `--format`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PaperFormat {
    #[default]
    Letter,
    Legal,
    Tabloid,
    Ledger,
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
}

impl PaperFormat {
    pub const ALL: [PaperFormat; 11] = [
        PaperFormat::Letter,
        PaperFormat::Legal,
        PaperFormat::Tabloid,
        PaperFormat::Ledger,
        PaperFormat::A0,
        PaperFormat::A1,
        PaperFormat::A2,
        PaperFormat::A3,
        PaperFormat::A4,
        PaperFormat::A5,
        PaperFormat::A6,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaperFormat::Letter => "Letter",
            PaperFormat::Legal => "Legal",
            PaperFormat::Tabloid => "Tabloid",
            PaperFormat::Ledger => "Ledger",
            PaperFormat::A0 => "A0",
            PaperFormat::A1 => "A1",
            PaperFormat::A2 => "A2",
            PaperFormat::A3 => "A3",
            PaperFormat::A4 => "A4",
            PaperFormat::A5 => "A5",
            PaperFormat::A6 => "A6",
        }
    }

    /// Paper (width, height) in inches
    pub fn size_in_inches(self) -> (f64, f64) {
        match self {
            PaperFormat::Letter => (8.5, 11.0),
            PaperFormat::Legal => (8.5, 14.0),
            PaperFormat::Tabloid => (11.0, 17.0),
            PaperFormat::Ledger => (17.0, 11.0),
            PaperFormat::A0 => (33.1, 46.8),
            PaperFormat::A1 => (23.4, 33.1),
            PaperFormat::A2 => (16.54, 23.4),
            PaperFormat::A3 => (11.7, 16.54),
            PaperFormat::A4 => (8.27, 11.7),
            PaperFormat::A5 => (5.83, 8.27),
            PaperFormat::A6 => (4.13, 5.83),
        }
    }
}

impl FromStr for PaperFormat {
    type Err = Error;

    // Case-sensitive: "a4" is rejected just like any other unknown name.
    fn from_str(s: &str) -> Result<Self> {
        PaperFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| Error::InvalidFormat(s.to_string()))
    }
}

/// Image encoding produced by `screenshot`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Jpeg,
    #[default]
    Png,
}

/// How screenshot bytes are returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Base64,
    #[default]
    Binary,
}

/// Readiness condition awaited after navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitUntil {
    Load,
    DomContentLoaded,
    NetworkIdle0,
    #[default]
    NetworkIdle2,
}

impl WaitUntil {
    /// Number of resources allowed to finish inside the quiet window, if this
    /// condition waits for network idleness at all.
    pub fn idle_budget(self) -> Option<usize> {
        match self {
            WaitUntil::Load | WaitUntil::DomContentLoaded => None,
            WaitUntil::NetworkIdle0 => Some(0),
            WaitUntil::NetworkIdle2 => Some(2),
        }
    }
}

impl FromStr for WaitUntil {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "load" => Ok(WaitUntil::Load),
            "domcontentloaded" => Ok(WaitUntil::DomContentLoaded),
            "networkidle0" => Ok(WaitUntil::NetworkIdle0),
            "networkidle2" => Ok(WaitUntil::NetworkIdle2),
            other => Err(Error::InvalidWaitUntil(other.to_string())),
        }
    }
}

/// CSS media type forced on the page before rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaType {
    #[default]
    Print,
    Screen,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Print => "print",
            MediaType::Screen => "screen",
        }
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "print" => Ok(MediaType::Print),
            "screen" => Ok(MediaType::Screen),
            other => Err(Error::InvalidMediaType(other.to_string())),
        }
    }
}

/// Page margins, each a CSS length such as `20px` or `1cm`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Margin {
    pub top: String,
    pub right: String,
    pub bottom: String,
    pub left: String,
}

/// Screenshot clipping region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clip {
    pub x: String,
    pub y: String,
    pub width: String,
    pub height: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfConfig {
    pub scale: f64,
    pub display_header_footer: bool,
    pub print_background: bool,
    pub landscape: bool,
    pub page_ranges: String,
    pub format: PaperFormat,
    /// `format` came from the command line rather than the Letter default
    #[serde(skip)]
    pub format_given: bool,
    #[serde(rename = "preferCSSPageSize")]
    pub prefer_css_page_size: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Margin>,
}

impl PdfConfig {
    pub fn from_options(opts: &PdfOptions, path: Option<PathBuf>) -> Self {
        Self {
            scale: opts.scale.unwrap_or(DEFAULT_SCALE),
            display_header_footer: opts.display_header_footer,
            print_background: opts.print_background,
            landscape: opts.landscape,
            page_ranges: opts.page_ranges.clone().unwrap_or_default(),
            format: opts.format.unwrap_or_default(),
            format_given: opts.format.is_some(),
            prefer_css_page_size: opts.prefer_css_page_size,
            path,
            header_template: opts.header_template.clone(),
            footer_template: opts.footer_template.clone(),
            width: opts.width.clone(),
            height: opts.height.clone(),
            margin: opts.margin.clone(),
        }
    }

    /// Paper (width, height) in inches. An explicit `--format` wins outright;
    /// otherwise `width`/`height` override the matching Letter dimension.
    pub fn paper_size(&self) -> Result<(f64, f64)> {
        let (format_width, format_height) = self.format.size_in_inches();
        if self.format_given {
            return Ok((format_width, format_height));
        }
        let width = match &self.width {
            Some(w) => length_to_inches(w)?,
            None => format_width,
        };
        let height = match &self.height {
            Some(h) => length_to_inches(h)?,
            None => format_height,
        };
        Ok((width, height))
    }

    /// Margins (top, right, bottom, left) in inches; zero when unset.
    pub fn margins(&self) -> Result<(f64, f64, f64, f64)> {
        match &self.margin {
            Some(m) => Ok((
                length_to_inches(&m.top)?,
                length_to_inches(&m.right)?,
                length_to_inches(&m.bottom)?,
                length_to_inches(&m.left)?,
            )),
            None => Ok((0.0, 0.0, 0.0, 0.0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotConfig {
    #[serde(rename = "type")]
    pub image_type: ImageType,
    pub full_page: bool,
    pub omit_background: bool,
    pub encoding: Encoding,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<Clip>,
}

impl ScreenshotConfig {
    pub fn from_options(opts: &ScreenshotOptions, path: Option<PathBuf>) -> Self {
        Self {
            image_type: opts.image_type.unwrap_or_default(),
            full_page: opts.full_page,
            omit_background: opts.omit_background,
            encoding: opts.encoding.unwrap_or_default(),
            path,
            quality: opts.quality,
            clip: opts.clip.clone(),
        }
    }
}

/// The configuration record handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RenderConfig {
    Pdf(PdfConfig),
    Screenshot(ScreenshotConfig),
}

impl RenderConfig {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            RenderConfig::Pdf(c) => c.path.as_ref(),
            RenderConfig::Screenshot(c) => c.path.as_ref(),
        }
    }
}

/// Build the configuration record for the selected command, filling in
/// defaults for everything the command line left unset.
pub fn translate(options: &Options) -> RenderConfig {
    match &options.command {
        RenderCommand::Pdf(pdf) => RenderConfig::Pdf(PdfConfig::from_options(pdf, options.path.clone())),
        RenderCommand::Screenshot(shot) => {
            RenderConfig::Screenshot(ScreenshotConfig::from_options(shot, options.path.clone()))
        }
    }
}

const PIXELS_PER_INCH: f64 = 96.0;

/// Convert a CSS length (`12px`, `1in`, `2.5cm`, `10mm` or a bare pixel
/// count) to inches.
pub fn length_to_inches(value: &str) -> Result<f64> {
    let text = value.trim();
    let lower = text.to_ascii_lowercase();
    let (number, px_per_unit) = match lower.get(lower.len().saturating_sub(2)..) {
        Some("px") => (&text[..text.len() - 2], 1.0),
        Some("in") => (&text[..text.len() - 2], PIXELS_PER_INCH),
        Some("cm") => (&text[..text.len() - 2], 37.8),
        Some("mm") => (&text[..text.len() - 2], 3.78),
        _ => (text, 1.0),
    };
    let number: f64 = number
        .trim()
        .parse()
        .map_err(|_| Error::InvalidLength(value.to_string()))?;
    if !number.is_finite() {
        return Err(Error::InvalidLength(value.to_string()));
    }
    Ok(number * px_per_unit / PIXELS_PER_INCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paper_format_is_case_sensitive() {
        assert_eq!("A4".parse::<PaperFormat>().unwrap(), PaperFormat::A4);
        assert_eq!("Ledger".parse::<PaperFormat>().unwrap(), PaperFormat::Ledger);
        assert!(matches!("a4".parse::<PaperFormat>(), Err(Error::InvalidFormat(_))));
        assert!(matches!("B5".parse::<PaperFormat>(), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn lengths_convert_to_inches() {
        assert_eq!(length_to_inches("96px").unwrap(), 1.0);
        assert_eq!(length_to_inches("96").unwrap(), 1.0);
        assert_eq!(length_to_inches("2in").unwrap(), 2.0);
        assert!((length_to_inches("2.54cm").unwrap() - 1.0).abs() < 0.01);
        assert!((length_to_inches("25.4MM").unwrap() - 1.0).abs() < 0.01);
        assert!(matches!(length_to_inches("wide"), Err(Error::InvalidLength(_))));
        assert!(matches!(length_to_inches("px"), Err(Error::InvalidLength(_))));
    }

    #[test]
    fn default_pdf_config_is_letter_at_scale_one() {
        let cfg = PdfConfig::from_options(&PdfOptions::default(), None);
        assert_eq!(cfg.format, PaperFormat::Letter);
        assert_eq!(cfg.scale, 1.0);
        assert!(!cfg.display_header_footer);
        assert!(!cfg.print_background);
        assert!(!cfg.landscape);
        assert_eq!(cfg.page_ranges, "");
        assert_eq!(cfg.paper_size().unwrap(), (8.5, 11.0));
        assert_eq!(cfg.margins().unwrap(), (0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn width_overrides_default_letter_dimension() {
        let opts = PdfOptions {
            width: Some("192px".into()),
            ..Default::default()
        };
        let cfg = PdfConfig::from_options(&opts, None);
        assert_eq!(cfg.paper_size().unwrap(), (2.0, 11.0));
    }

    #[test]
    fn explicit_format_takes_priority_over_width_and_height() {
        let opts = PdfOptions {
            format: Some(PaperFormat::A4),
            width: Some("100px".into()),
            height: Some("2in".into()),
            ..Default::default()
        };
        let cfg = PdfConfig::from_options(&opts, None);
        assert!(cfg.format_given);
        assert_eq!(cfg.paper_size().unwrap(), (8.27, 11.7));
    }

    #[test]
    fn default_screenshot_config_is_binary_png() {
        let cfg = ScreenshotConfig::from_options(&ScreenshotOptions::default(), Some("out.png".into()));
        assert_eq!(cfg.image_type, ImageType::Png);
        assert_eq!(cfg.encoding, Encoding::Binary);
        assert!(!cfg.full_page);
        assert!(cfg.quality.is_none());
        assert_eq!(cfg.path, Some(PathBuf::from("out.png")));
    }

    #[test]
    fn pdf_config_serializes_with_camel_case_names() {
        let cfg = PdfConfig::from_options(&PdfOptions::default(), None);
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["format"], "Letter");
        assert_eq!(json["preferCSSPageSize"], false);
        assert_eq!(json["displayHeaderFooter"], false);
        assert!(json.get("margin").is_none());
    }

    #[test]
    fn network_idle_budgets() {
        assert_eq!(WaitUntil::NetworkIdle0.idle_budget(), Some(0));
        assert_eq!(WaitUntil::NetworkIdle2.idle_budget(), Some(2));
        assert_eq!(WaitUntil::Load.idle_budget(), None);
        assert!(matches!("idle".parse::<WaitUntil>(), Err(Error::InvalidWaitUntil(_))));
    }
}
