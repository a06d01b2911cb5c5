//! Tracing configuration for ClipLiaison
//!
//! ## Behavior / 行为
//!
//! - **Development**: debug level for the liaison crates
//! - **Production**: info level
//! - **Environment filter**: `RUST_LOG` replaces the default directives
//! - **File output**: optional, via a non-blocking `tracing-appender` writer

use std::path::{Path, PathBuf};
use std::{fs, io, sync::OnceLock};

use anyhow::Context;
use cl_core::config::LoggingConfig;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, prelude::*, registry};

const LOG_FILE_NAME: &str = "clipliaison.log";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Check if running in development environment
fn is_development() -> bool {
    cfg!(debug_assertions)
}

/// Build the default filter directives for tracing
fn build_filter_directives(is_dev: bool) -> Vec<String> {
    let app_level = if is_dev { "debug" } else { "info" };
    vec![
        "info".to_string(),
        format!("clipliaison={app_level}"),
        format!("clipliaison_lib={app_level}"),
        format!("cl_app={app_level}"),
        format!("cl_network={app_level}"),
        format!("cl_platform={app_level}"),
        format!("cl_tauri={app_level}"),
        "tauri=warn".to_string(), // Filter noisy setup spans (app::setup)
        "wry=off".to_string(),
        "ipc::request=off".to_string(),
    ]
}

/// Default log directory: `<data_local_dir>/clipliaison/logs`.
pub fn default_log_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("clipliaison").join("logs"))
}

/// Initialize the tracing subscriber with appropriate configuration
///
/// Logs always go to stdout; with `logging.file` they are also written to
/// `clipliaison.log` in the configured (or default) directory. A file that
/// cannot be opened falls back to stdout only.
///
/// ## Errors / 错误
///
/// Returns `Err` if a global subscriber is already registered.
pub fn init_tracing_subscriber(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter_directives = build_filter_directives(is_development());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter_directives.join(",")));

    let stdout_writer: BoxMakeWriter = BoxMakeWriter::new(io::stdout);
    let file_writer = if logging.file {
        let directory = logging.directory.clone().or_else(default_log_dir);
        match directory.as_deref().map(build_file_writer) {
            Some(Ok(writer)) => Some(writer),
            Some(Err(err)) => {
                eprintln!("Failed to initialize file logging, falling back to stdout: {err:#}");
                None
            }
            None => {
                eprintln!("No log directory available, falling back to stdout");
                None
            }
        }
    } else {
        None
    };

    // "2026-01-15 10:30:45.123 INFO cl_app::liaison: message"
    let stdout_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
        .with_level(true)
        .with_target(true)
        .with_ansi(cfg!(not(test)))
        .with_writer(stdout_writer);

    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_timer(fmt::time::ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer)
    });

    registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

fn build_file_writer(directory: &Path) -> anyhow::Result<NonBlocking> {
    fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory: {}", directory.display()))?;

    let file_appender = tracing_appender::rolling::never(directory, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    LOG_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Tracing log guard already initialized"))?;

    Ok(non_blocking)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_directives() {
        let dev_directives = build_filter_directives(true);
        assert!(dev_directives.contains(&"cl_app=debug".to_string()));
        assert!(dev_directives.contains(&"cl_network=debug".to_string()));
        assert!(dev_directives.contains(&"wry=off".to_string()));

        let prod_directives = build_filter_directives(false);
        assert!(prod_directives.contains(&"info".to_string()));
        assert!(prod_directives.contains(&"cl_app=info".to_string()));
    }

    #[test]
    fn test_directives_parse_as_env_filter() {
        let directives = build_filter_directives(false).join(",");
        assert!(tracing_subscriber::EnvFilter::try_new(directives).is_ok());
    }

    #[test]
    fn test_default_log_dir_ends_with_app_folder() {
        if let Some(dir) = default_log_dir() {
            assert!(dir.ends_with("clipliaison/logs"));
        }
    }
}
