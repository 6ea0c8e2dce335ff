//! Log file layout and line format.
//!
//! Lines look like
//! `[2025-01-15 12:00:00,123] INFO inventory_api::security src/session_guards.rs:41 - message`
//! and are parsed back by `inventory-admin view-logs`.

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::Utc;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{EnvFilter, LevelFilter, Targets};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

pub const SECURITY_TARGET: &str = "inventory_api::security";
pub const REPOSITORY_TARGET: &str = "inventory_api::repository";
pub const EVENTS_TARGET: &str = "inventory_api::events";
pub const API_TARGET: &str = "inventory_api::api";
pub const REQUEST_TARGET: &str = "inventory_api::request_log";

/// Log files written under the log directory.
pub const LOG_FILES: [&str; 5] =
    ["general.log", "errors.log", "security.log", "database.log", "api.log"];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// `[timestamp] LEVEL target file:line - message fields`
#[derive(Debug, Default, Clone, Copy)]
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
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
        let meta = event.metadata();
        write!(
            writer,
            "[{}] {} {} {}:{} - ",
            Utc::now().format(TIMESTAMP_FORMAT),
            meta.level(),
            meta.target(),
            meta.file().unwrap_or("unknown"),
            meta.line().unwrap_or(0)
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Keeps the background writers alive; dropping it flushes and stops them.
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

fn file_writer(
    dir: &Path,
    name: &str,
    guards: &mut Vec<WorkerGuard>,
) -> tracing_appender::non_blocking::NonBlocking {
    let file = tracing_appender::rolling::never(dir, name);
    let (writer, guard) = tracing_appender::non_blocking(file);
    guards.push(guard);
    writer
}

/// Installs the global subscriber: stdout (filtered by `RUST_LOG`, default
/// `info`) plus one file per concern under `log_dir`.
pub fn init_logging(log_dir: &Path) -> Result<LogGuards, Box<dyn std::error::Error + Send + Sync>> {
    fs::create_dir_all(log_dir)?;
    let mut guards = Vec::new();

    let stdout = tracing_subscriber::fmt::layer()
        .event_format(LineFormat)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let general = tracing_subscriber::fmt::layer()
        .event_format(LineFormat)
        .with_ansi(false)
        .with_writer(file_writer(log_dir, "general.log", &mut guards))
        .with_filter(LevelFilter::INFO);

    let errors = tracing_subscriber::fmt::layer()
        .event_format(LineFormat)
        .with_ansi(false)
        .with_writer(file_writer(log_dir, "errors.log", &mut guards))
        .with_filter(LevelFilter::ERROR);

    let security = tracing_subscriber::fmt::layer()
        .event_format(LineFormat)
        .with_ansi(false)
        .with_writer(file_writer(log_dir, "security.log", &mut guards))
        .with_filter(Targets::new().with_target(SECURITY_TARGET, Level::INFO));

    let database = tracing_subscriber::fmt::layer()
        .event_format(LineFormat)
        .with_ansi(false)
        .with_writer(file_writer(log_dir, "database.log", &mut guards))
        .with_filter(
            Targets::new()
                .with_target(REPOSITORY_TARGET, Level::DEBUG)
                .with_target(EVENTS_TARGET, Level::INFO),
        );

    let api = tracing_subscriber::fmt::layer()
        .event_format(LineFormat)
        .with_ansi(false)
        .with_writer(file_writer(log_dir, "api.log", &mut guards))
        .with_filter(
            Targets::new()
                .with_target(API_TARGET, Level::DEBUG)
                .with_target(REQUEST_TARGET, Level::INFO),
        );

    Registry::default()
        .with(stdout)
        .with(general)
        .with(errors)
        .with(security)
        .with(database)
        .with(api)
        .try_init()?;

    Ok(LogGuards { _guards: guards })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_has_millisecond_comma() {
        let at = chrono::NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_milli_opt(9, 5, 7, 42)
            .unwrap();
        assert_eq!(at.format(TIMESTAMP_FORMAT).to_string(), "2025-01-15 09:05:07,042");
    }
}
