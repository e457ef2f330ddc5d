//! CLI entry point for the outcall tool.

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use outcall_core::archive::DEFAULT_EOL;
use outcall_core::request::DEFAULT_MAX_REDIRECTS;
use outcall_core::transport::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use outcall_core::{
    ArchiveSink, Archiver, CertTable, Coordinator, CoordinatorConfig, CrossProcessThrottle,
    FileSink, GzipSink, HttpTransport, Request, ResponseValidator, parsers,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::FileConfig;
use cli::{Args, parse_cert_override, parse_credentials, service_identity};

/// Throttle records untouched for this long are removed after each run.
const THROTTLE_PRUNE_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let file_config = app_config::load_file_config(args.config.as_deref())?;
    debug!(?file_config, "file configuration loaded");

    install_cert_overrides(&args.certs)?;

    let throttle = file_config
        .throttle_dir
        .clone()
        .map_or_else(CrossProcessThrottle::in_temp_dir, CrossProcessThrottle::new);
    let transport = HttpTransport::with_timeouts(
        file_config.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
        file_config.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
    );

    let request = build_request(&args);
    let mut coordinator = Coordinator::new(coordinator_config(&args, &file_config), Arc::new(transport))?
        .with_throttle(throttle.clone());

    if args.json {
        coordinator = coordinator.with_validator(ResponseValidator::new().with_parser(parsers::json));
    }

    let archiver = match &args.archive {
        Some(path) => {
            let archiver = open_archiver(path, args.gzip, &file_config)?;
            Some(Arc::new(Mutex::new(archiver)))
        }
        None => None,
    };
    if let Some(archiver) = &archiver {
        coordinator = coordinator
            .with_archiver(Arc::clone(archiver))
            .with_archive_prefix(format!("{} {}", request.method(), request.url()));
    }

    let result = if args.json {
        coordinator.execute(&request).await
    } else {
        coordinator.execute_raw(&request).await
    };

    if let Some(archiver) = &archiver {
        flush_archive(archiver).await;
    }

    match throttle.prune_idle(THROTTLE_PRUNE_AGE).await {
        Ok(removed) if removed > 0 => debug!(removed, "pruned idle throttle records"),
        Ok(_) => {}
        Err(error) => warn!(error = %error, "could not prune throttle records"),
    }

    let outcome = result.with_context(|| format!("{} {} failed", request.method(), request.url()))?;

    info!(
        status = outcome.status,
        ok = outcome.ok,
        attempts = outcome.attempts,
        "Call complete"
    );

    let mut stdout = io::stdout().lock();
    match &outcome.parsed {
        Some(value) => {
            serde_json::to_writer_pretty(&mut stdout, value)?;
            writeln!(stdout)?;
        }
        None => stdout.write_all(&outcome.raw)?,
    }
    stdout.flush()?;

    Ok(if outcome.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_request(args: &Args) -> Request {
    let mut request = Request::new(args.url.clone());
    if let Some(method) = args.method {
        request = request.with_method(method);
    }
    for header in &args.headers {
        request = request.with_header(header.clone());
    }
    if let Some(data) = &args.data {
        request = request.with_body(data.clone());
    }
    if let Some(user) = &args.user {
        let (username, password) = parse_credentials(user);
        request = request.with_basic_auth(username, password.map(str::to_string));
    }
    if args.location {
        request = request.follow_redirects(DEFAULT_MAX_REDIRECTS);
    }
    request
}

fn coordinator_config(args: &Args, file_config: &FileConfig) -> CoordinatorConfig {
    let mut config = match service_identity(args) {
        Some(identity) => CoordinatorConfig::for_service(identity),
        None => CoordinatorConfig::default(),
    };
    if let Some(max_attempts) = args.max_attempts.or(file_config.max_attempts) {
        config = config.with_max_attempts(max_attempts);
    }
    if let Some(pause_ms) = file_config.repeat_pause_ms {
        config = config.with_repeat_pause(Duration::from_millis(pause_ms));
    }
    if let Some(throttle_ms) = args.throttle_ms.or(file_config.throttle_ms) {
        config = config.with_throttle_interval(Duration::from_millis(throttle_ms));
    }
    for &(status, action) in &args.actions {
        config = config.with_action(status, action);
    }
    config.expect_response_length(!args.allow_empty)
}

fn install_cert_overrides(raw: &[String]) -> Result<()> {
    if raw.is_empty() {
        return Ok(());
    }
    let mut table = CertTable::new();
    for entry in raw {
        let Some((host, path)) = parse_cert_override(entry) else {
            bail!("Invalid --cert value '{entry}': expected host=path");
        };
        table.insert(host, path);
    }
    if CertTable::install_global(table).is_err() {
        bail!("Certificate overrides were already installed");
    }
    Ok(())
}

/// Flushes the archive. A failure is logged rather than returned, so the
/// run still reports the call's own result.
async fn flush_archive(archiver: &Mutex<Archiver>) -> bool {
    match archiver.lock().await.flush() {
        Ok(()) => true,
        Err(error) => {
            warn!(error = %error, "could not flush archive");
            false
        }
    }
}

fn open_archiver(path: &Path, gzip: bool, file_config: &FileConfig) -> Result<Archiver> {
    let sink: Box<dyn ArchiveSink> = if gzip {
        Box::new(
            GzipSink::open(path)
                .with_context(|| format!("Failed to open archive '{}'", path.display()))?,
        )
    } else {
        Box::new(
            FileSink::open(path)
                .with_context(|| format!("Failed to open archive '{}'", path.display()))?,
        )
    };
    let eol = file_config.archive_eol.as_deref().unwrap_or(DEFAULT_EOL);
    Ok(Archiver::new(sink).with_eol(eol))
}
