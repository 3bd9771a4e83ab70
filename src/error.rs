//! Error types for argument validation and rendering

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rendering operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing arguments or rendering a page
#[derive(Error, Debug)]
pub enum Error {
    /// Command line could not be parsed (also carries help/version output)
    #[error(transparent)]
    Cli(#[from] clap::Error),

    /// The command is neither `pdf` nor `screenshot`
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// More than one input source was given
    #[error("Arguments --{first} and --{second} are mutually exclusive")]
    ConflictingInputs {
        first: &'static str,
        second: &'static str,
    },

    #[error("Scale is out of range: {0} (must be between 0.1 - 2)")]
    ScaleOutOfRange(f64),

    #[error("Format value \"{0}\" is not allowed")]
    InvalidFormat(String),

    #[error("Quality is out of range: {0} (must be between 0 - 100)")]
    QualityOutOfRange(i64),

    /// A viewport entry is not a single `key=value` pair
    #[error("Incorrect parameter format for `viewport`: {0:?}")]
    InvalidViewportSyntax(String),

    #[error("Invalid value for viewport `{key}`: {value:?}")]
    InvalidViewportValue { key: String, value: String },

    #[error("Wrong number of margins specified: expected 4, got {0}")]
    InvalidMarginCount(usize),

    #[error("Wrong number of clipping region args specified: expected 4, got {0}")]
    InvalidClipCount(usize),

    #[error("Invalid clipping region value: {0:?}")]
    InvalidClipValue(String),

    /// A CSS length could not be parsed
    #[error("Invalid length {0:?}: expected a number with an optional px, in, cm or mm suffix")]
    InvalidLength(String),

    #[error("Unknown waitUntil value: {0}")]
    InvalidWaitUntil(String),

    #[error("Unknown media type: {0}")]
    InvalidMediaType(String),

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The renderer finished without producing a payload
    #[error("Unable to generate output")]
    RenderProducedNoOutput,

    /// Failed to launch the browser
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// Failed to load the input location
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// Failed to render content
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Reading the input was cancelled before end-of-stream
    #[error("Reading input was cancelled")]
    InputCancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error was detected before any browser interaction.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::Cli(_)
                | Error::UnknownCommand(_)
                | Error::ConflictingInputs { .. }
                | Error::ScaleOutOfRange(_)
                | Error::InvalidFormat(_)
                | Error::QualityOutOfRange(_)
                | Error::InvalidViewportSyntax(_)
                | Error::InvalidViewportValue { .. }
                | Error::InvalidMarginCount(_)
                | Error::InvalidClipCount(_)
                | Error::InvalidClipValue(_)
                | Error::InvalidLength(_)
                | Error::InvalidWaitUntil(_)
                | Error::InvalidMediaType(_)
                | Error::InputNotFound(_)
        )
    }
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_are_classified() {
        assert!(Error::InvalidMarginCount(3).is_usage());
        assert!(Error::UnknownCommand("html".into()).is_usage());
        assert!(!Error::RenderProducedNoOutput.is_usage());
        assert!(!Error::Timeout(100).is_usage());
    }

    #[test]
    fn messages_name_the_offending_value() {
        let err = Error::InvalidFormat("B5".into());
        assert_eq!(err.to_string(), "Format value \"B5\" is not allowed");

        let err = Error::ConflictingInputs { first: "content", second: "page" };
        assert!(err.to_string().contains("--content"));
        assert!(err.to_string().contains("--page"));
    }
}
