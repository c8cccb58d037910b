//! Tracing setup for the Pong client
//!
//! Console and file outputs are independent and both optional. Writers are
//! non-blocking; their guards live until the process exits so buffered
//! lines are flushed.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Crate logs are verbose by default, dependencies stay at INFO
const CRATE_DIRECTIVE: &str = "pong_client=debug";

static LOG_GUARDS: OnceLock<Vec<WorkerGuard>> = OnceLock::new();

/// `RUST_LOG` if set, else INFO, plus the crate directive
fn env_filter() -> EnvFilter {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    match CRATE_DIRECTIVE.parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Split a log path into the directory and file name the appender wants
fn split_log_path(path: &Path) -> Option<(&Path, &str)> {
    let dir = path.parent()?;
    let name = path.file_name()?.to_str()?;
    Some((dir, name))
}

fn file_writer(path: &Path, guards: &mut Vec<WorkerGuard>) -> Option<NonBlocking> {
    let (dir, name) = split_log_path(path)?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    guards.push(guard);
    Some(writer)
}

/// Install the global subscriber. Later calls leave the first one in place.
pub fn init_logging(console: bool, log_file: Option<PathBuf>) {
    let mut guards = Vec::new();

    let file_layer = log_file
        .as_deref()
        .and_then(|path| file_writer(path, &mut guards))
        .map(|writer| {
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
        });

    let console_layer = console.then(|| {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        guards.push(guard);
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_target(false)
    });

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .is_ok();

    if installed {
        let _ = LOG_GUARDS.set(guards);
    }
}
