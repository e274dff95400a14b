//! Tracing configuration.
//!
//! Human-readable output goes to stderr so stdout stays free for command
//! output. When a log directory is available a non-blocking file layer is
//! added as well. `RUST_LOG` overrides the default directives.

use std::path::Path;
use std::{fs, io, sync::OnceLock};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, prelude::*, registry};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

fn build_filter_directives(verbose: bool) -> Vec<String> {
    let level = if verbose { "debug" } else { "warn" };
    vec![
        level.to_string(),
        format!("tourguide_lib={level}"),
        format!("tg_app={level}"),
        format!("tg_infra={level}"),
    ]
}

/// Initialize the global subscriber. Must be called once, before any
/// logging occurs.
///
/// # Errors
///
/// Returns `Err` if a subscriber is already registered.
pub fn init_tracing_subscriber(verbose: bool, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(build_filter_directives(verbose).join(","))
    });

    let stderr_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::new(TIME_FORMAT.to_string()))
        .with_level(true)
        .with_target(true)
        .with_writer(BoxMakeWriter::new(io::stderr));

    let file_layer = log_dir
        .and_then(|dir| match build_file_writer(dir) {
            Ok(writer) => Some(writer),
            Err(err) => {
                eprintln!("Failed to initialize file logging, using stderr only: {err}");
                None
            }
        })
        .map(|writer| {
            fmt::layer()
                .with_timer(fmt::time::ChronoUtc::new(TIME_FORMAT.to_string()))
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer)
        });

    registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

fn build_file_writer(log_dir: &Path) -> anyhow::Result<NonBlocking> {
    fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "tourguide.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    LOG_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Tracing log guard already initialized"))?;

    Ok(non_blocking)
}
