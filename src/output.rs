//! Delivering the rendered payload.

use crate::Result;
use std::io::Write;
use std::path::Path;

const PREVIEW_BYTES: usize = 50;

/// Deliver `payload` to `out`.
///
/// With a `path` the payload is already on disk and only a confirmation is
/// printed, and only for an interactive terminal. Without one, piped output
/// receives the raw bytes while a terminal gets a printable rendition.
pub fn deliver<W: Write>(payload: &[u8], path: Option<&Path>, interactive: bool, out: &mut W) -> Result<()> {
    match (path, interactive) {
        (Some(path), true) => writeln!(out, "Output saved to {}", path.display())?,
        (Some(_), false) => {}
        (None, true) => writeln!(out, "{}", printable(payload))?,
        (None, false) => out.write_all(payload)?,
    }
    out.flush()?;
    Ok(())
}

/// Text payloads print as-is; binary payloads print as a short hex preview.
pub fn printable(payload: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(payload) {
        return text.to_string();
    }

    let mut preview: Vec<String> = payload
        .iter()
        .take(PREVIEW_BYTES)
        .map(|b| format!("{b:02x}"))
        .collect();
    if payload.len() > PREVIEW_BYTES {
        preview.push(format!("... {} more bytes", payload.len() - PREVIEW_BYTES));
    }
    format!("<Buffer {}>", preview.join(" "))
}
