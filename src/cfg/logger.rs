// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Logger initialization.
//!
//! Diagnostics go to stderr as JSON lines so the report on stdout stays
//! machine-cuttable. The level comes from the `-v` count unless `RUST_LOG`
//! overrides it.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{
        self, FmtContext, FormatEvent, FormatFields,
        format::{JsonFields, Writer},
    },
    layer::SubscriberExt,
};

struct JsonFormatter;

#[derive(Serialize)]
struct LogEntry {
    timestamp: String,
    level: String,
    target: String,
    fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Default)]
struct JsonVisitor {
    fields: serde_json::Map<String, serde_json::Value>,
}

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(
        &mut self,
        field: &tracing::field::Field,
        value: &dyn std::fmt::Debug,
    ) {
        self.fields
            .insert(field.name().to_string(), json!(format!("{:?}", value)));
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        let entry = LogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            fields: visitor.fields,
        };
        writeln!(
            writer,
            "{}",
            serde_json::to_string(&entry).map_err(|_| std::fmt::Error)?
        )
    }
}

/// Maps the `-v` count to a default filter directive.
fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Installs the global subscriber. The returned guard must stay alive until
/// exit or buffered lines are lost.
pub fn init_logger(verbose: u8) -> Result<WorkerGuard> {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let layer = fmt::layer()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .json()
        .event_format(JsonFormatter)
        .fmt_fields(JsonFields::default());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level_for(verbose)))
        .context("failed to build log filter")?;

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set global default subscriber")?;

    Ok(guard)
}
