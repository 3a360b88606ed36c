//! Bridge from `tracing` events to the host application's log pane.
//!
//! The GUI exposes a fire-and-forget `log(message)` callback. [`SinkLayer`]
//! is a `tracing_subscriber` layer that renders each event as one line and
//! hands it to a [`LogSink`], so adapter diagnostics reach the user without
//! the adapters knowing the GUI exists.

use std::fmt::Write as _;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Receives rendered log lines. Must return promptly and must not panic.
pub trait LogSink: Send + Sync + 'static {
    /// Records one line.
    fn log(&self, message: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn log(&self, message: &str) {
        self(message)
    }
}

/// A [`Layer`] forwarding every event to a [`LogSink`] as
/// `"[LEVEL] message key=value ..."`.
pub struct SinkLayer<S> {
    sink: S,
}

impl<S: LogSink> SinkLayer<S> {
    /// Wraps `sink`.
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

impl<S, Sub> Layer<Sub> for SinkLayer<S>
where
    S: LogSink,
    Sub: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, Sub>) {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let line = format!("[{}] {}", event.metadata().level(), visitor.finish());
        self.sink.log(&line);
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl LineVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::layer::SubscriberExt;

    use super::*;

    fn capture(emit: impl FnOnce()) -> Vec<String> {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = Arc::clone(&lines);
        let subscriber = tracing_subscriber::registry().with(SinkLayer::new(move |line: &str| {
            sink_lines.lock().unwrap().push(line.to_string());
        }));
        tracing::subscriber::with_default(subscriber, emit);
        let captured = lines.lock().unwrap().clone();
        captured
    }

    #[test]
    fn renders_level_message_and_fields() {
        let lines = capture(|| {
            tracing::warn!(backend = "gemini", attempt = 2, "proxy not detected");
        });
        assert_eq!(lines, vec!["[WARN] proxy not detected backend=gemini attempt=2"]);
    }

    #[test]
    fn message_only_events() {
        let lines = capture(|| {
            tracing::info!("cleared proxy settings");
        });
        assert_eq!(lines, vec!["[INFO] cleared proxy settings"]);
    }
}
