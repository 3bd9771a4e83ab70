//! Raw command-line surface. Values are validated into [`crate::Options`].

use crate::config::{Encoding, ImageType};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "headless-render",
    version,
    about = "Render HTML to a PDF document or an image with headless Chrome",
    override_usage = "headless-render <pdf|screenshot> [OPTIONS]"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub shared: SharedArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Output content rendered as PDF
    Pdf(PdfArgs),
    /// Output content rendered as an image
    Screenshot(ScreenshotArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Pdf(_) => "pdf",
            Command::Screenshot(_) => "screenshot",
        }
    }
}

/// Options accepted by every command, before or after the command name
#[derive(Args, Debug, Default)]
pub struct SharedArgs {
    /// The event to wait for before rendering [load, domcontentloaded, networkidle0, networkidle2; default: networkidle2]
    #[arg(long = "waitUntil", global = true, value_name = "EVENT")]
    pub wait_until: Option<String>,

    /// The media type to emulate [print, screen; default: print]
    #[arg(long = "emulateMedia", global = true, value_name = "MEDIA")]
    pub emulate_media: Option<String>,

    /// Enable the browser sandbox [default: true]
    #[arg(
        long,
        global = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub sandbox: Option<bool>,

    /// Disable the browser sandbox (same as --sandbox=false)
    #[arg(long = "no-sandbox", global = true)]
    pub no_sandbox: bool,

    /// HTML content to render
    #[arg(long, global = true)]
    pub content: Option<String>,

    /// The page to render
    #[arg(long, global = true, value_name = "URL")]
    pub page: Option<String>,

    /// The file to render
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    /// Location to store the rendered output - sends to STDOUT if not specified
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,

    /// Specify viewport options, e.g., width=1920,height=1080,isMobile=true
    #[arg(long, global = true)]
    pub viewport: Option<String>,

    /// Run Chrome with a head and keep the browser open after render (screenshot only)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Navigation timeout in milliseconds [default: 30000]
    #[arg(long, global = true, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Give up reading HTML from standard input after this many milliseconds
    #[arg(long = "stdinTimeout", global = true, value_name = "MS")]
    pub stdin_timeout: Option<u64>,

    /// Browser executable to launch instead of the auto-detected one
    #[arg(long = "executablePath", global = true, env = "HEADLESS_RENDER_CHROME")]
    pub executable_path: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct PdfArgs {
    /// Landscape page orientation
    #[arg(long)]
    pub landscape: bool,

    /// Scale of the webpage rendering, between 0.1 - 2 [default: 1]
    #[arg(long, allow_negative_numbers = true)]
    pub scale: Option<f64>,

    /// Display header and footer
    #[arg(long = "displayHeaderFooter")]
    pub display_header_footer: bool,

    /// HTML template for the print header, inline or a file path
    #[arg(long = "headerTemplate", value_name = "HTML|FILE")]
    pub header_template: Option<String>,

    /// HTML template for the print footer, inline or a file path
    #[arg(long = "footerTemplate", value_name = "HTML|FILE")]
    pub footer_template: Option<String>,

    /// Print background graphics
    #[arg(long = "printBackground")]
    pub print_background: bool,

    /// Paper ranges to print, e.g., '1-5, 8, 11-13' [default: all pages]
    #[arg(long = "pageRanges")]
    pub page_ranges: Option<String>,

    /// Paper format: Letter, Legal, Tabloid, Ledger, A0-A6 [default: Letter]
    #[arg(long)]
    pub format: Option<String>,

    /// Paper width, accepts values labeled with units; overrides the format width
    #[arg(long)]
    pub width: Option<String>,

    /// Paper height, accepts values labeled with units; overrides the format height
    #[arg(long)]
    pub height: Option<String>,

    /// Paper margins, top,right,bottom,left e.g., 20px,20px,20px,20px [default: none]
    #[arg(long)]
    pub margin: Option<String>,

    /// Give any CSS @page size declared in the page priority over width, height and format
    #[arg(long = "preferCSSPageSize")]
    pub prefer_css_page_size: bool,
}

#[derive(Args, Debug, Default)]
pub struct ScreenshotArgs {
    /// Specify screenshot type [default: png]
    #[arg(long = "type", value_enum)]
    pub image_type: Option<ImageType>,

    /// The quality of the image, between 0-100. Not applicable to png images
    #[arg(long, allow_negative_numbers = true)]
    pub quality: Option<i64>,

    /// Take a screenshot of the full scrollable page
    #[arg(long = "fullPage")]
    pub full_page: bool,

    /// Specify clipping region of the page, e.g., x,y,width,height
    #[arg(long)]
    pub clip: Option<String>,

    /// Hide the default white background to capture with transparency
    #[arg(long = "omitBackground")]
    pub omit_background: bool,

    /// The encoding of the image [default: binary]
    #[arg(long, value_enum)]
    pub encoding: Option<Encoding>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn shared_flags_are_accepted_after_the_command() {
        let cli = Cli::try_parse_from(["headless-render", "pdf", "--content", "<p>x</p>", "--landscape"]).unwrap();
        assert_eq!(cli.command.name(), "pdf");
        assert_eq!(cli.shared.content.as_deref(), Some("<p>x</p>"));
        match cli.command {
            Command::Pdf(args) => assert!(args.landscape),
            Command::Screenshot(_) => panic!("expected pdf"),
        }
    }

    #[test]
    fn sandbox_flag_forms() {
        let cli = Cli::try_parse_from(["headless-render", "--sandbox=false", "screenshot"]).unwrap();
        assert_eq!(cli.shared.sandbox, Some(false));

        let cli = Cli::try_parse_from(["headless-render", "screenshot", "--sandbox"]).unwrap();
        assert_eq!(cli.shared.sandbox, Some(true));

        let cli = Cli::try_parse_from(["headless-render", "screenshot", "--no-sandbox"]).unwrap();
        assert!(cli.shared.no_sandbox);
    }

    #[test]
    fn screenshot_type_is_a_closed_choice() {
        assert!(Cli::try_parse_from(["headless-render", "screenshot", "--type", "gif"]).is_err());
        let cli = Cli::try_parse_from(["headless-render", "screenshot", "--type", "jpeg"]).unwrap();
        match cli.command {
            Command::Screenshot(args) => assert_eq!(args.image_type, Some(ImageType::Jpeg)),
            Command::Pdf(_) => panic!("expected screenshot"),
        }
    }
}
