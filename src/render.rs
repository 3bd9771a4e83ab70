//! Render pipeline: launch, navigate, emulate, render, release.
//!
//! The browser is owned by a [`Session`] for the whole run. Dropping the
//! session closes the browser, so every early return (a failed navigation,
//! a renderer that produced nothing) releases it. Only a successful
//! interactive debug screenshot detaches and leaves the browser running.

use crate::config::{translate, Encoding, RenderConfig};
use crate::options::Options;
use crate::{Engine, Error, LaunchConfig, Result};
use base64::Engine as Base64Engine;
use log::{debug, info, warn};

/// Scoped ownership of a launched engine
pub struct Session<E: Engine> {
    engine: E,
    released: bool,
}

impl<E: Engine> Session<E> {
    pub fn new(engine: E) -> Self {
        Self { engine, released: false }
    }

    pub fn engine(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Close the browser now and surface any error.
    pub fn close(mut self) -> Result<()> {
        self.released = true;
        self.engine.close()
    }

    /// Keep the browser running after the session ends.
    pub fn detach(mut self) {
        self.released = true;
        self.engine.detach();
    }
}

impl<E: Engine> Drop for Session<E> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.engine.close() {
                warn!("Failed to close browser: {}", e);
            }
        }
    }
}

/// Render `location` with a freshly launched `E`.
pub fn run<E: Engine>(options: &Options, location: &str) -> Result<Vec<u8>> {
    run_with(options, location, E::launch)
}

/// Render `location` with an engine produced by `launch`.
pub fn run_with<E, F>(options: &Options, location: &str, launch: F) -> Result<Vec<u8>>
where
    E: Engine,
    F: FnOnce(&LaunchConfig) -> Result<E>,
{
    let launch_config = LaunchConfig::from_options(options);
    debug!("Launching browser: {:?}", launch_config);
    let mut session = Session::new(launch(&launch_config)?);

    if let Some(viewport) = &options.viewport {
        match serde_json::to_string(viewport) {
            Ok(json) => debug!("Setting viewport {}", json),
            Err(e) => debug!("Setting viewport (not serializable: {})", e),
        }
        session.engine().set_viewport(viewport)?;
    }

    debug!("Navigating ({:?})", options.wait_until);
    session.engine().goto(location, options.wait_until)?;
    session.engine().emulate_media(options.emulate_media)?;

    let config = translate(options);
    match serde_json::to_string(&config) {
        Ok(json) => debug!("Rendering {} with {}", options.command.name(), json),
        Err(e) => debug!("Rendering {} (config not serializable: {})", options.command.name(), e),
    }

    let payload = match &config {
        RenderConfig::Pdf(pdf) => session.engine().pdf(pdf)?,
        RenderConfig::Screenshot(shot) => session.engine().screenshot(shot)?.map(|bytes| match shot.encoding {
            Encoding::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes).into_bytes(),
            Encoding::Binary => bytes,
        }),
    }
    .ok_or(Error::RenderProducedNoOutput)?;

    if let Some(path) = config.path() {
        std::fs::write(path, &payload)?;
        debug!("Wrote {} bytes to {}", payload.len(), path.display());
    }

    if options.debug {
        info!("Debug mode: leaving the browser open");
        session.detach();
    } else {
        session.close()?;
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MediaType, PdfConfig, ScreenshotConfig, WaitUntil};
    use crate::Viewport;
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<String>>>;

    struct ScriptedEngine {
        calls: Calls,
        output: Option<Vec<u8>>,
    }

    impl Engine for ScriptedEngine {
        fn launch(_config: &LaunchConfig) -> Result<Self> {
            Err(Error::Other("use run_with".into()))
        }

        fn set_viewport(&mut self, viewport: &Viewport) -> Result<()> {
            self.calls.lock().unwrap().push(format!("viewport {}", viewport.width_or_default()));
            Ok(())
        }

        fn goto(&mut self, location: &str, _wait_until: WaitUntil) -> Result<()> {
            self.calls.lock().unwrap().push(format!("goto {location}"));
            Ok(())
        }

        fn emulate_media(&mut self, media: MediaType) -> Result<()> {
            self.calls.lock().unwrap().push(format!("media {}", media.as_str()));
            Ok(())
        }

        fn pdf(&mut self, _config: &PdfConfig) -> Result<Option<Vec<u8>>> {
            self.calls.lock().unwrap().push("pdf".into());
            Ok(self.output.clone())
        }

        fn screenshot(&mut self, _config: &ScreenshotConfig) -> Result<Option<Vec<u8>>> {
            self.calls.lock().unwrap().push("screenshot".into());
            Ok(self.output.clone())
        }

        fn close(&mut self) -> Result<()> {
            self.calls.lock().unwrap().push("close".into());
            Ok(())
        }

        fn detach(&mut self) {
            self.calls.lock().unwrap().push("detach".into());
        }
    }

    fn launcher(calls: &Calls, output: Option<&[u8]>) -> impl FnOnce(&LaunchConfig) -> Result<ScriptedEngine> {
        let calls = calls.clone();
        let output = output.map(<[u8]>::to_vec);
        move |config| {
            calls.lock().unwrap().push(format!("launch headless={}", config.headless));
            Ok(ScriptedEngine { calls, output })
        }
    }

    fn options(args: &[&str]) -> Options {
        Options::parse_from(std::iter::once("headless-render").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn steps_run_in_order_and_close() {
        let calls = Calls::default();
        let opts = options(&["pdf", "--content", "x", "--viewport", "width=1024"]);
        let payload = run_with(&opts, "data:x", launcher(&calls, Some(b"%PDF"))).unwrap();

        assert_eq!(payload, b"%PDF");
        assert_eq!(
            *calls.lock().unwrap(),
            ["launch headless=true", "viewport 1024", "goto data:x", "media print", "pdf", "close"]
        );
    }

    #[test]
    fn no_output_is_an_error_and_still_closes() {
        let calls = Calls::default();
        let opts = options(&["screenshot", "--content", "x"]);
        let err = run_with(&opts, "data:x", launcher(&calls, None)).unwrap_err();

        assert!(matches!(err, Error::RenderProducedNoOutput));
        assert_eq!(calls.lock().unwrap().last().map(String::as_str), Some("close"));
    }

    #[test]
    fn debug_screenshot_detaches_headful_browser() {
        let calls = Calls::default();
        let opts = options(&["screenshot", "--debug", "--content", "x"]);
        run_with(&opts, "data:x", launcher(&calls, Some(b"png"))).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.first().map(String::as_str), Some("launch headless=false"));
        assert_eq!(calls.last().map(String::as_str), Some("detach"));
        assert!(!calls.iter().any(|c| c == "close"));
    }

    #[test]
    fn debug_pdf_renders_headless_and_closes() {
        let calls = Calls::default();
        let opts = options(&["pdf", "--debug", "--content", "x"]);
        run_with(&opts, "data:x", launcher(&calls, Some(b"%PDF"))).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.first().map(String::as_str), Some("launch headless=true"));
        assert_eq!(calls.last().map(String::as_str), Some("close"));
    }

    #[test]
    fn base64_encoding_applies_to_screenshots() {
        let calls = Calls::default();
        let opts = options(&["screenshot", "--encoding", "base64", "--content", "x"]);
        let payload = run_with(&opts, "data:x", launcher(&calls, Some(b"png"))).unwrap();
        assert_eq!(payload, b"cG5n");
    }

    #[test]
    fn payload_is_written_to_path() {
        let path = std::env::temp_dir().join(format!("headless-render-{}-render.pdf", std::process::id()));
        let calls = Calls::default();
        let opts = options(&["pdf", "--content", "x", "--path", path.to_str().unwrap()]);
        run_with(&opts, "data:x", launcher(&calls, Some(b"%PDF-1.4"))).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
        std::fs::remove_file(&path).unwrap();
    }
}
