//! Diagnostic logging
//!
//! Every event goes to stderr as a single severity-tagged line. Stdout is left
//! alone: it carries the shell code the hook evaluates.

use modenv_core::{Severity, MODENV_LOG_VAR};
use std::fmt::Write as _;
use std::io::Write as _;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{layer::Context, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the tracing system.
///
/// The filter comes from `MODENV_LOG` (same syntax as `RUST_LOG`), falling
/// back to `default_directive`.
pub fn init(default_directive: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_env(MODENV_LOG_VAR)
        .or_else(|_| EnvFilter::try_new(default_directive))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(DiagnosticLayer::new())
        .try_init()?;

    Ok(())
}

/// Map a tracing level onto the user-facing severity tags
pub fn severity_for(level: &Level) -> Severity {
    match *level {
        Level::ERROR => Severity::Error,
        Level::WARN => Severity::Warning,
        Level::INFO => Severity::Info,
        Level::DEBUG | Level::TRACE => Severity::Debug,
    }
}

/// Render one diagnostic line
pub fn format_line(
    severity: Severity,
    message: &str,
    fields: &[(String, String)],
    use_colors: bool,
) -> String {
    let mut line = String::with_capacity(message.len() + 32);
    line.push_str("modenv: ");
    if use_colors {
        let _ = write!(line, "{}{}\x1b[0m", severity.ansi_color(), severity.as_str());
    } else {
        line.push_str(severity.as_str());
    }
    line.push(' ');
    line.push_str(message);
    for (key, value) in fields {
        if use_colors {
            let _ = write!(line, " \x1b[90m{key}=\x1b[0m{value}");
        } else {
            let _ = write!(line, " {key}={value}");
        }
    }
    line
}

/// A tracing layer that writes severity-tagged diagnostics to stderr
pub struct DiagnosticLayer {
    use_colors: bool,
}

impl DiagnosticLayer {
    pub fn new() -> Self {
        Self {
            use_colors: supports_colors(),
        }
    }
}

impl Default for DiagnosticLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Subscriber> Layer<S> for DiagnosticLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventFieldVisitor::default();
        event.record(&mut visitor);

        let severity = severity_for(event.metadata().level());
        let line = format_line(severity, &visitor.message, &visitor.fields, self.use_colors);
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }
}

#[derive(Default)]
struct EventFieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for EventFieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .push((field.name().to_string(), format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }
}

fn supports_colors() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
        && std::env::var("NO_COLOR").is_err()
        && std::env::var("TERM")
            .map(|term| term != "dumb")
            .unwrap_or(true)
}
