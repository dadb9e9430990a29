//! Logging setup: console plus an append-only log file.
//!
//! File lines are `<local timestamp>: <message> <fields>`. `RUST_LOG`
//! overrides the default `info` filter for both outputs.

use std::fmt;
use std::path::PathBuf;

use chrono::Local;
use fs_err as fs;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

const LOG_DIR_NAME: &str = "unity-presence";
const LOG_FILE_NAME: &str = "UnityDiscordPresence.log";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Installs the global subscriber. Keep the returned guard alive for the
/// life of the process or buffered file lines are lost.
pub fn init() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = tracing_subscriber::fmt::layer().with_target(false);

    let log_dir = log_dir();
    if let Err(err) = fs::create_dir_all(&log_dir) {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .init();
        tracing::warn!(error = %err, "Failed to create log directory; logging to console only");
        return None;
    }

    let appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    let file = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .event_format(LogLine);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    Some(guard)
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(LOG_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `<local timestamp>: <message>` followed by any structured fields.
struct LogLine;

impl<S, N> FormatEvent<S, N> for LogLine
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{}: ", Local::now().format(TIMESTAMP_FORMAT))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
