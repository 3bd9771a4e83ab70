//! Validated options, built once from the command line.
//!
//! [`Options::parse_from`] performs every check that can be made without a
//! browser: the command name, mutually exclusive input sources, numeric
//! ranges, paper formats and the multi-part `viewport`, `margin` and `clip`
//! syntaxes. Anything that fails here fails before a browser is launched.

use crate::cli::{Cli, Command, PdfArgs, ScreenshotArgs, SharedArgs};
use crate::config::{
    length_to_inches, Clip, Encoding, ImageType, Margin, MediaType, PaperFormat, WaitUntil, MAX_QUALITY, MAX_SCALE,
    MIN_SCALE,
};
use crate::input::read_template;
use crate::{Error, Result, Viewport};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::Parser;
use log::warn;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Where the HTML to render comes from
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// A URL navigated to as-is
    Page(String),
    /// Literal HTML
    Content(String),
    /// A local HTML file
    File(PathBuf),
    /// HTML read from standard input until end-of-stream
    Stdin,
}

impl InputSource {
    pub fn kind(&self) -> &'static str {
        match self {
            InputSource::Page(_) => "page",
            InputSource::Content(_) => "content",
            InputSource::File(_) => "file",
            InputSource::Stdin => "stdin",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfOptions {
    pub landscape: bool,
    pub scale: Option<f64>,
    pub display_header_footer: bool,
    pub header_template: Option<String>,
    pub footer_template: Option<String>,
    pub print_background: bool,
    pub page_ranges: Option<String>,
    pub format: Option<PaperFormat>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub margin: Option<Margin>,
    pub prefer_css_page_size: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenshotOptions {
    pub image_type: Option<ImageType>,
    pub quality: Option<u8>,
    pub full_page: bool,
    pub clip: Option<Clip>,
    pub omit_background: bool,
    pub encoding: Option<Encoding>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Pdf(PdfOptions),
    Screenshot(ScreenshotOptions),
}

impl RenderCommand {
    pub fn name(&self) -> &'static str {
        match self {
            RenderCommand::Pdf(_) => "pdf",
            RenderCommand::Screenshot(_) => "screenshot",
        }
    }
}

/// Everything one invocation needs, validated
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub command: RenderCommand,
    pub input: InputSource,
    pub wait_until: WaitUntil,
    pub emulate_media: MediaType,
    pub sandbox: bool,
    pub path: Option<PathBuf>,
    pub viewport: Option<Viewport>,
    /// Headful browser left open after rendering. Only ever true for screenshots.
    pub debug: bool,
    pub timeout: Duration,
    pub stdin_timeout: Option<Duration>,
    pub executable_path: Option<PathBuf>,
}

impl Options {
    /// Parse and validate command-line tokens (the first token is the program name).
    pub fn parse_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args).map_err(from_clap_error)?;
        Self::from_cli(cli)
    }

    pub fn from_cli(cli: Cli) -> Result<Self> {
        let Cli { command, shared } = cli;

        let debug = match (&command, shared.debug) {
            (Command::Pdf(_), true) => {
                warn!("Debug mode incompatible with PDF rendering; rendering headless");
                false
            }
            (_, debug) => debug,
        };

        let command = match command {
            Command::Pdf(args) => RenderCommand::Pdf(pdf_options(args)?),
            Command::Screenshot(args) => RenderCommand::Screenshot(screenshot_options(args)?),
        };

        let input = input_source(&shared)?;

        let SharedArgs {
            wait_until,
            emulate_media,
            sandbox,
            no_sandbox,
            path,
            viewport,
            timeout,
            stdin_timeout,
            executable_path,
            ..
        } = shared;

        Ok(Self {
            command,
            input,
            wait_until: wait_until.as_deref().map(str::parse::<WaitUntil>).transpose()?.unwrap_or_default(),
            emulate_media: emulate_media.as_deref().map(str::parse::<MediaType>).transpose()?.unwrap_or_default(),
            sandbox: sandbox.unwrap_or(true) && !no_sandbox,
            path,
            viewport: viewport.as_deref().map(parse_viewport).transpose()?,
            debug,
            timeout: Duration::from_millis(timeout.unwrap_or(DEFAULT_TIMEOUT_MS)),
            stdin_timeout: stdin_timeout.map(Duration::from_millis),
            executable_path,
        })
    }
}

fn from_clap_error(err: clap::Error) -> Error {
    if err.kind() == ErrorKind::InvalidSubcommand {
        if let Some(ContextValue::String(name)) = err.get(ContextKind::InvalidSubcommand) {
            return Error::UnknownCommand(name.clone());
        }
    }
    Error::Cli(err)
}

fn input_source(shared: &SharedArgs) -> Result<InputSource> {
    let given: Vec<&'static str> = [
        ("content", shared.content.is_some()),
        ("page", shared.page.is_some()),
        ("file", shared.file.is_some()),
    ]
    .into_iter()
    .filter_map(|(name, set)| set.then_some(name))
    .collect();

    if let [first, second, ..] = given[..] {
        return Err(Error::ConflictingInputs { first, second });
    }

    if let Some(page) = &shared.page {
        return Ok(InputSource::Page(page.clone()));
    }
    if let Some(content) = &shared.content {
        return Ok(InputSource::Content(content.clone()));
    }
    if let Some(file) = &shared.file {
        if !file.exists() {
            return Err(Error::InputNotFound(file.clone()));
        }
        return Ok(InputSource::File(file.clone()));
    }
    Ok(InputSource::Stdin)
}

fn pdf_options(args: PdfArgs) -> Result<PdfOptions> {
    if let Some(scale) = args.scale {
        if !(MIN_SCALE..=MAX_SCALE).contains(&scale) {
            return Err(Error::ScaleOutOfRange(scale));
        }
    }

    let format = args.format.as_deref().map(str::parse::<PaperFormat>).transpose()?;

    for length in [&args.width, &args.height].into_iter().flatten() {
        length_to_inches(length)?;
    }

    Ok(PdfOptions {
        landscape: args.landscape,
        scale: args.scale,
        display_header_footer: args.display_header_footer,
        header_template: args.header_template.as_deref().map(read_template),
        footer_template: args.footer_template.as_deref().map(read_template),
        print_background: args.print_background,
        page_ranges: args.page_ranges,
        format,
        width: args.width,
        height: args.height,
        margin: args.margin.as_deref().map(parse_margin).transpose()?,
        prefer_css_page_size: args.prefer_css_page_size,
    })
}

fn screenshot_options(args: ScreenshotArgs) -> Result<ScreenshotOptions> {
    let quality = match args.quality {
        Some(q) if !(0..=MAX_QUALITY).contains(&q) => return Err(Error::QualityOutOfRange(q)),
        Some(q) => u8::try_from(q).ok(),
        None => None,
    };

    Ok(ScreenshotOptions {
        image_type: args.image_type,
        quality,
        full_page: args.full_page,
        clip: args.clip.as_deref().map(parse_clip).transpose()?,
        omit_background: args.omit_background,
        encoding: args.encoding,
    })
}

/// Parse `key=value[,key=value...]` into a [`Viewport`].
///
/// Numeric keys read their leading number and ignore any trailing unit. Boolean
/// keys are true only for the literal `true`. Unknown keys are ignored.
pub fn parse_viewport(spec: &str) -> Result<Viewport> {
    let mut viewport = Viewport::default();

    for entry in spec.split(',') {
        let parts: Vec<&str> = entry.split('=').collect();
        let [key, value] = parts[..] else {
            return Err(Error::InvalidViewportSyntax(entry.to_string()));
        };

        let invalid = || Error::InvalidViewportValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "width" => viewport.width = Some(leading_number(value).parse().map_err(|_| invalid())?),
            "height" => viewport.height = Some(leading_number(value).parse().map_err(|_| invalid())?),
            "deviceScaleFactor" => {
                viewport.device_scale_factor = Some(leading_decimal(value).parse().map_err(|_| invalid())?)
            }
            "isMobile" => viewport.is_mobile = Some(value == "true"),
            "hasTouch" => viewport.has_touch = Some(value == "true"),
            "isLandscape" => viewport.is_landscape = Some(value == "true"),
            _ => {}
        }
    }

    Ok(viewport)
}

/// Leading run of digits, so `800px` reads as `800` and `600.5` as `600`.
fn leading_number(value: &str) -> &str {
    let value = value.trim_start();
    let end = value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len());
    &value[..end]
}

/// Leading decimal number, so `1.5x` reads as `1.5`.
fn leading_decimal(value: &str) -> &str {
    let value = value.trim_start();
    let mut seen_dot = false;
    let end = value
        .find(|c: char| {
            if c == '.' && !seen_dot {
                seen_dot = true;
                return false;
            }
            !c.is_ascii_digit()
        })
        .unwrap_or(value.len());
    &value[..end]
}

/// Split `top,right,bottom,left` into a [`Margin`].
pub fn parse_margin(spec: &str) -> Result<Margin> {
    let parts: Vec<&str> = spec.split(',').collect();
    let [top, right, bottom, left] = parts[..] else {
        return Err(Error::InvalidMarginCount(parts.len()));
    };
    for length in [top, right, bottom, left] {
        length_to_inches(length)?;
    }
    Ok(Margin {
        top: top.to_string(),
        right: right.to_string(),
        bottom: bottom.to_string(),
        left: left.to_string(),
    })
}

/// Split `x,y,width,height` into a [`Clip`].
pub fn parse_clip(spec: &str) -> Result<Clip> {
    let parts: Vec<&str> = spec.split(',').collect();
    let [x, y, width, height] = parts[..] else {
        return Err(Error::InvalidClipCount(parts.len()));
    };
    for value in [x, y, width, height] {
        value
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidClipValue(value.to_string()))?;
    }
    Ok(Clip {
        x: x.to_string(),
        y: y.to_string(),
        width: width.to_string(),
        height: height.to_string(),
    })
}
