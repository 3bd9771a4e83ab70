//! Turning an [`InputSource`] into a location the browser can navigate to.

use crate::options::InputSource;
use crate::{Error, Result};
use base64::Engine as Base64Engine;
use log::debug;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use url::Url;

const READ_CHUNK: usize = 8 * 1024;

/// Resolve the input source to a URL, data URL or file URL.
///
/// Standard input is read to end-of-stream; `stdin_timeout` bounds that
/// wait, otherwise it is unbounded.
pub async fn resolve_location(source: &InputSource, stdin_timeout: Option<Duration>) -> Result<String> {
    debug!("Resolving {} input", source.kind());
    match source {
        InputSource::Page(url) => Ok(url.clone()),
        InputSource::Content(html) => Ok(data_url(html.as_bytes())),
        InputSource::File(path) => file_url(path),
        InputSource::Stdin => {
            let html = read_stdin(stdin_timeout).await?;
            debug!("Read {} bytes from stdin", html.len());
            Ok(data_url(&html))
        }
    }
}

async fn read_stdin(timeout: Option<Duration>) -> Result<Vec<u8>> {
    let stdin = tokio::io::stdin();
    match timeout {
        Some(limit) => read_to_end(stdin, tokio::time::sleep(limit)).await.map_err(|err| match err {
            Error::InputCancelled => Error::Timeout(limit.as_millis() as u64),
            other => other,
        }),
        None => read_to_end(stdin, std::future::pending::<()>()).await,
    }
}

/// Read `reader` to end-of-stream unless `cancel` completes first.
pub async fn read_to_end<R, C>(mut reader: R, cancel: C) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
    C: Future<Output = ()>,
{
    let mut cancel: Pin<Box<C>> = Box::pin(cancel);
    let mut input = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        tokio::select! {
            read = reader.read(&mut chunk) => match read? {
                0 => return Ok(input),
                n => input.extend_from_slice(&chunk[..n]),
            },
            _ = &mut cancel => return Err(Error::InputCancelled),
        }
    }
}

/// `data:text/html;base64,...` URL carrying `html`
pub fn data_url(html: &[u8]) -> String {
    format!(
        "data:text/html;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(html)
    )
}

/// `file://` URL for `path`, resolved against the working directory
pub fn file_url(path: &Path) -> Result<String> {
    let absolute = std::path::absolute(path)?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|_| Error::LoadError(format!("Cannot build a file URL for {}", absolute.display())))
}

/// Read `value` as a file path, falling back to treating it as literal HTML.
pub fn read_template(value: &str) -> String {
    match std::fs::read(value) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => value.to_string(),
    }
}
