// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Logging sink for the snippet.
//!
//! Every diagnostic is emitted with `tracing`. This module installs the process subscriber and
//! owns the severity threshold, which can be swapped at runtime through [`LogLevelHandle`].
//!
//! # Format
//!
//! ```text
//! [Optimizely] | +ELAPSED_MS | LEVEL | [span_name{span_fields}:] message {event_fields}
//! ```
//!
//! # Examples
//!
//! ```text
//! [Optimizely] | +3ms | INFO | Initializing OptimizelyFX snippet
//! [Optimizely] | +241ms | ERROR | command{kind="event"}: Event name not found in datafile: checkout
//! ```

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

use crate::log_level::LogLevel;

/// Directives that keep transport crates quiet whatever the snippet level is.
const QUIET_DEPENDENCIES: &str = "h2=off,hyper=off,hyper_util=off,rustls=off,reqwest=off";

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),
    #[error("failed to install log subscriber: {0}")]
    Install(String),
    #[error("failed to reload log level: {0}")]
    Reload(String),
}

/// Event formatter prefixing every line with `[Optimizely]` and the time since startup.
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    started: Instant,
}

impl Formatter {
    #[must_use]
    pub fn starting_at(started: Instant) -> Self {
        Self { started }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::starting_at(Instant::now())
    }
}

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(
            &mut writer,
            "[Optimizely] | +{}ms | {} | ",
            self.started.elapsed().as_millis(),
            metadata.level()
        )?;

        // Spans from root to current, with the fields recorded by the fmt layer.
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;
                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

type ReloadHandle = reload::Handle<EnvFilter, Registry>;

/// Shared handle over the current severity threshold.
///
/// Clones observe and change the same threshold. A handle created with
/// [`LogLevelHandle::detached`] only records the level, which is what embedders that install
/// their own subscriber (and tests) want.
#[derive(Clone)]
pub struct LogLevelHandle {
    current: Arc<AtomicU8>,
    reload: Option<ReloadHandle>,
}

impl fmt::Debug for LogLevelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogLevelHandle")
            .field("level", &self.level())
            .field("installed", &self.reload.is_some())
            .finish()
    }
}

impl LogLevelHandle {
    #[must_use]
    pub fn detached(level: LogLevel) -> Self {
        Self {
            current: Arc::new(AtomicU8::new(level.to_u8())),
            reload: None,
        }
    }

    #[must_use]
    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.current.load(Ordering::Acquire))
    }

    /// Applies a new threshold to the installed subscriber (if any) and records it.
    pub fn set_level(&self, level: LogLevel) -> Result<(), LoggerError> {
        if let Some(reload) = &self.reload {
            reload
                .reload(build_filter(level)?)
                .map_err(|e| LoggerError::Reload(e.to_string()))?;
        }
        self.current.store(level.to_u8(), Ordering::Release);
        Ok(())
    }
}

fn build_filter(level: LogLevel) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(format!("{QUIET_DEPENDENCIES},{}", level.as_directive()))
        .map_err(|e| LoggerError::InvalidFilter(e.to_string()))
}

/// Installs the global subscriber writing to stderr and returns the threshold handle.
pub fn init(level: LogLevel) -> Result<LogLevelHandle, LoggerError> {
    let (filter, reload) = reload::Layer::new(build_filter(level)?);
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .event_format(Formatter::default());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| LoggerError::Install(e.to_string()))?;

    Ok(LogLevelHandle {
        current: Arc::new(AtomicU8::new(level.to_u8())),
        reload: Some(reload),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct BufferWriter(Arc<Mutex<Vec<u8>>>);

    impl io::Write for BufferWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = BufferWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    impl BufferWriter {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_formatter_prefix_and_fields() {
        let writer = BufferWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .event_format(Formatter::default())
            .with_writer(writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(key = "ghost", "Attribute key not found in datafile");
        });

        let output = writer.contents();
        assert!(output.starts_with("[Optimizely] | +"), "got {output}");
        assert!(output.contains("ms | WARN | "));
        assert!(output.contains("Attribute key not found in datafile"));
        assert!(output.contains("key=\"ghost\""));
        assert!(output.ends_with('\n'));
    }

    #[test]
    fn test_formatter_includes_span_context() {
        let writer = BufferWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .event_format(Formatter::default())
            .with_writer(writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("command", kind = "event");
            let _entered = span.enter();
            tracing::error!("Event name not found in datafile: checkout");
        });

        let output = writer.contents();
        assert!(
            output.contains("| ERROR | command{kind=\"event\"}: Event name not found"),
            "got {output}"
        );
    }

    #[test]
    fn test_detached_handle_tracks_level() {
        let handle = LogLevelHandle::detached(LogLevel::None);
        let clone = handle.clone();
        assert_eq!(handle.level(), LogLevel::None);

        clone.set_level(LogLevel::Debug).unwrap();
        assert_eq!(handle.level(), LogLevel::Debug);
    }

    #[test]
    fn test_filter_for_every_level_parses() {
        for level in LogLevel::ALL {
            assert!(build_filter(level).is_ok(), "filter for {level} failed");
        }
    }
}
