//! Run a command and forward its stdout/stderr lines onto the bus.
//!
//! ```text
//! TENANT_ID=acme SERVICE_ID=web \
//!     logbus-forward --log-opt endpointAddress=tcp://collector:5555 -- ./server --port 8080
//! ```
//!
//! Each output stream is read on its own task; both share one publisher.
//! The publisher is closed once both streams reach end-of-file, and the
//! forwarder exits with the command's exit code.

use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt as tracing_format, EnvFilter};

use logbus::{LogMessage, LogSource, Publisher, PublisherBuilder};

#[derive(Parser, Debug)]
#[command(name = "logbus-forward", version, about)]
struct Cli {
    /// Log option as KEY=VALUE, e.g. endpointAddress=tcp://collector:5555
    #[arg(long = "log-opt", value_name = "KEY=VALUE", value_parser = parse_log_opt)]
    log_opts: Vec<(String, String)>,

    /// Source id prefixed to every line (default: generated)
    #[arg(long)]
    source_id: Option<String>,

    /// Command to run, followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn parse_log_opt(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Publish every line of `stream`; returns the number of lines dropped.
async fn forward<R>(publisher: Arc<Publisher>, stream: R, source: LogSource) -> u64
where
    R: AsyncRead + Unpin,
{
    // ---
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut dropped = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = Bytes::copy_from_slice(trim_line_ending(&buf));
                let message = LogMessage::new(line, source);
                if let Err(err) = publisher.log(&message).await {
                    warn!(?source, "dropping line: {err}");
                    dropped += 1;
                }
            }
            Err(err) => {
                warn!(?source, "read failed: {err}");
                break;
            }
        }
    }

    dropped
}

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    tracing_format()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let environment: Vec<String> = std::env::vars()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();

    let mut builder = PublisherBuilder::new()
        .log_opts(cli.log_opts.into_iter().collect())
        .environment(environment);
    if let Some(id) = cli.source_id {
        builder = builder.source_id(id);
    }

    let publisher = Arc::new(builder.build().await.context("failed to create publisher")?);
    let identity = publisher.identity();
    info!(
        driver = publisher.name(),
        tenant = identity.tenant_id(),
        service = identity.service_id(),
        source = %identity.source_id(),
        "forwarding output"
    );

    let (program, args) = cli.command.split_first().context("missing command")?;

    let spawned = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(err) => {
            if let Err(close_err) = publisher.close().await {
                error!("close failed: {close_err}");
            }
            return Err(err).with_context(|| format!("failed to spawn {program}"));
        }
    };

    let stdout = child.stdout.take().context("child stdout not captured")?;
    let stderr = child.stderr.take().context("child stderr not captured")?;

    let out_task = tokio::spawn(forward(publisher.clone(), stdout, LogSource::Stdout));
    let err_task = tokio::spawn(forward(publisher.clone(), stderr, LogSource::Stderr));

    let status = child.wait().await.context("failed to wait for child")?;
    let (out_dropped, err_dropped) = tokio::join!(out_task, err_task);
    let dropped = out_dropped? + err_dropped?;

    if dropped > 0 {
        warn!(dropped, "some lines were not published");
    }

    if let Err(err) = publisher.close().await {
        error!("close failed: {err}");
    }

    info!(%status, "command exited");
    std::process::exit(status.code().unwrap_or(1));
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_parse_log_opt() {
        // ---
        assert_eq!(
            parse_log_opt("endpointAddress=tcp://h:1=2").unwrap(),
            ("endpointAddress".to_string(), "tcp://h:1=2".to_string())
        );
        assert!(parse_log_opt("novalue").is_err());
    }

    #[test]
    fn test_trim_line_ending() {
        // ---
        assert_eq!(trim_line_ending(b"abc\n"), b"abc");
        assert_eq!(trim_line_ending(b"abc\r\n"), b"abc");
        assert_eq!(trim_line_ending(b"abc"), b"abc");
        assert_eq!(trim_line_ending(b"\n"), b"");
    }
}
