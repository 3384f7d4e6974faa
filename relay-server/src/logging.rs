//! Logging setup: console plus an append-only file.
//!
//! Text lines read `timestamp [LEVEL] message field=value`. Write errors on
//! either sink are dropped by the subscriber and never reach request handling.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::sync::Mutex;

use tracing::{warn, Event, Subscriber};
use tracing_subscriber::{
    fmt::{
        format::{DefaultFields, Writer},
        time::{FormatTime, SystemTime},
        FmtContext, FormatEvent, FormatFields, Layer, MakeWriter,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{Config, LogFormat};

/// `timestamp [LEVEL] message` event format.
#[derive(Debug, Clone, Copy, Default)]
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
        SystemTime.format_time(&mut writer)?;
        write!(writer, " [{}] ", event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Plain `LineFormat` layer for any writer. ANSI is off for both sinks so
/// captured stdout and the file carry identical lines.
pub fn line_layer<S, W>(writer: W) -> Layer<S, DefaultFields, LineFormat, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    tracing_subscriber::fmt::layer()
        .event_format(LineFormat)
        .with_ansi(false)
        .with_writer(writer)
}

/// Subscriber for the configured sinks.
///
/// An unopenable log file is returned alongside a console-only subscriber
/// instead of failing.
pub fn build(config: &Config) -> (Box<dyn Subscriber + Send + Sync>, Option<io::Error>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file, file_error) = match open_log_file(&config.log_file) {
        Ok(f) => (Some(Mutex::new(f)), None),
        Err(e) => (None, Some(e)),
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format {
        LogFormat::Text => Box::new(
            tracing_subscriber::registry()
                .with(filter)
                .with(line_layer(io::stdout))
                .with(file.map(line_layer)),
        ),
        LogFormat::Json => {
            let file_layer = file.map(|f| {
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_ansi(false)
                    .with_writer(f)
            });
            Box::new(
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
                    .with(file_layer),
            )
        }
    };

    (subscriber, file_error)
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init(config: &Config) {
    let (subscriber, file_error) = build(config);
    subscriber.init();

    if let Some(e) = file_error {
        warn!(path = %config.log_file, error = %e, "log_file_unavailable_console_only");
    }
}

fn open_log_file(path: &str) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
