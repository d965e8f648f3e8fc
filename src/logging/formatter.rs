use std::io;

use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation as AppenderRotation},
};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    registry::LookupSpan,
    Layer,
};

use super::config::{ConsoleConfig, FileConfig, LogFormat, Rotation};

/// Слой, у которого стёрт конкретный тип формата (json/pretty/compact).
pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

fn build_layer<S, W>(
    format: LogFormat,
    writer: W,
    with_ansi: bool,
    with_target: bool,
    with_thread_ids: bool,
    with_line_numbers: bool,
) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = fmt::layer()
        .with_writer(writer)
        .with_ansi(with_ansi)
        .with_target(with_target)
        .with_thread_ids(with_thread_ids)
        .with_line_number(with_line_numbers);

    match format {
        LogFormat::Json => base.json().with_current_span(true).boxed(),
        LogFormat::Pretty => base.pretty().with_span_events(FmtSpan::CLOSE).boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

/// Консольный слой (stdout) по настройкам.
pub fn console_layer<S>(config: &ConsoleConfig) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    build_layer(
        config.format,
        io::stdout,
        config.with_ansi,
        config.with_target,
        config.with_thread_ids,
        config.with_line_numbers,
    )
}

/// Файловый слой через non-blocking appender. `WorkerGuard` должен жить,
/// пока нужен вывод в файл.
pub fn file_layer<S>(config: &FileConfig) -> (BoxedLayer<S>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let rotation = match config.rotation {
        Rotation::Minutely => AppenderRotation::MINUTELY,
        Rotation::Hourly => AppenderRotation::HOURLY,
        Rotation::Daily => AppenderRotation::DAILY,
        Rotation::Never => AppenderRotation::NEVER,
    };
    let appender = RollingFileAppender::new(rotation, &config.dir, &config.filename);
    let (writer, guard): (NonBlocking, WorkerGuard) = tracing_appender::non_blocking(appender);

    let layer = build_layer(config.format, writer, false, true, false, false);
    (layer, guard)
}
