//! provides logging helpers

use std::fmt::{self};
use std::path::Path;

use anyhow::Context;
use tracing::field::Field;
use tracing::field::Visit;
use tracing::Event;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::FilterExt;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::format;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

/// Writes metric events verbatim; the encoders already produce full lines
struct MetricsLineFormatter;

struct FieldVisitor {
    msg: String,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, _: &Field, value: &str) {
        self.msg.push_str(value);
    }

    fn record_debug(&mut self, _: &Field, value: &dyn fmt::Debug) {
        self.msg.push_str(&format!("{value:?}"));
    }
}

impl<S, N> FormatEvent<S, N> for MetricsLineFormatter
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = FieldVisitor { msg: String::new() };
        event.record(&mut visitor);
        write!(writer, "{}", visitor.msg)
    }
}

fn is_metrics(metadata: &tracing::Metadata<'_>) -> bool {
    metadata.target().contains("metrics")
}

/// Initiate the global tracing subscriber.
///
/// Human logs go to stderr. When `metrics_file` is set, `metrics` events are
/// written to a daily-rolling file instead; the returned guard flushes it.
pub fn init(metrics_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let fmt_layer = utils::logging::get_fmt_layer().with_filter(
        utils::logging::env_filter().and(filter::filter_fn(|metadata| !is_metrics(metadata))),
    );

    let Some(metrics_file) = metrics_file else {
        registry().with(fmt_layer).init();
        return Ok(None);
    };

    let dir = metrics_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file = metrics_file
        .file_name()
        .and_then(|f| f.to_str())
        .with_context(|| format!("invalid metrics file path {}", metrics_file.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file)
        .max_log_files(3)
        .build(dir)
        .context("failed to create rolling file appender")?;

    let (file_writer, file_guard) = tracing_appender::non_blocking(appender);

    let metrics_layer = layer()
        .event_format(MetricsLineFormatter)
        .fmt_fields(format::DefaultFields::new())
        .with_writer(file_writer)
        .with_ansi(false)
        .with_filter(filter::filter_fn(is_metrics));

    registry().with(fmt_layer).with(metrics_layer).init();
    Ok(Some(file_guard))
}
