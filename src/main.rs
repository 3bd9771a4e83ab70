use headless_render::cdp::CdpEngine;
use headless_render::{input, output, render, Error, Options, Result};
use log::debug;
use std::io::{self, IsTerminal};
use std::process;

async fn run() -> Result<()> {
    let options = Options::parse_from(std::env::args_os())?;
    debug!("Rendering {} from {} input", options.command.name(), options.input.kind());

    let location = input::resolve_location(&options.input, options.stdin_timeout).await?;

    // The CDP client is blocking; keep it off the async workers.
    let (options, payload) = tokio::task::spawn_blocking(move || {
        let payload = render::run::<CdpEngine>(&options, &location);
        (options, payload)
    })
    .await
    .map_err(|e| Error::Other(format!("Render task failed: {}", e)))?;
    let payload = payload?;

    let stdout = io::stdout();
    let interactive = stdout.is_terminal();
    output::deliver(&payload, options.path.as_deref(), interactive, &mut stdout.lock())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run().await {
        Ok(()) => {}
        Err(Error::Cli(e)) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
        Err(e) => {
            eprintln!("{}", diagnostic(&e));
            process::exit(1);
        }
    }
}

/// Message for stderr; usage errors point at `--help` since no browser ran.
fn diagnostic(err: &Error) -> String {
    if err.is_usage() {
        format!("{}\nRun with --help for usage.", err)
    } else {
        format!("Error: {}", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_point_at_help() {
        let err = Options::parse_from(["headless-render", "pdf", "--scale", "5"]).unwrap_err();
        assert_eq!(
            diagnostic(&err),
            format!("{}\nRun with --help for usage.", err)
        );
    }

    #[test]
    fn runtime_errors_are_reported_plainly() {
        let err = Error::LoadError("net::ERR_CONNECTION_REFUSED".into());
        assert_eq!(diagnostic(&err), format!("Error: {}", err));
    }
}
