use anyhow::{Context, Result};
use chrono::Utc;
use nu_ansi_term::{Color, Style};
use std::fmt;
use std::path::Path;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::Targets,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    Layer,
};

/// Dependency crates that are only logged from WARN up.
const QUIET_TARGETS: [&str; 8] = [
    "hyper",
    "hyper_util",
    "reqwest",
    "rustls",
    "h2",
    "ethers_providers",
    "ethers_signers",
    "ethers_core",
];

/// `default` for our own crates, WARN for noisy dependencies.
pub fn log_filter(default: Level) -> Targets {
    QUIET_TARGETS
        .iter()
        .fold(Targets::new().with_default(default), |targets, target| {
            targets.with_target(*target, Level::WARN)
        })
}

/// Console at INFO, plus a DEBUG file `<log_dir>/debug.YYYY-MM-DD.log`
/// rotated daily. Both the file name and timestamps are UTC. The returned
/// guard flushes the file writer and must be held for the lifetime of the
/// program.
pub fn setup_logger(log_dir: impl AsRef<Path>) -> Result<WorkerGuard> {
    let log_dir = log_dir.as_ref();
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("debug")
        .filename_suffix("log")
        .build(log_dir)
        .context("Failed to create debug log appender")?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(log_filter(Level::DEBUG));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(log_filter(Level::INFO));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

// --- Formatters ---

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn event_message(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor {
        message: String::new(),
    };
    event.record(&mut visitor);
    visitor.message
}

fn highlight_outcome(msg: String) -> String {
    if msg.contains("SUCCESS") {
        let green = Style::new().fg(Color::LightGreen).bold();
        msg.replace("SUCCESS", &green.paint("SUCCESS").to_string())
    } else if msg.contains("FAILED") {
        let red = Style::new().fg(Color::LightRed).bold();
        msg.replace("FAILED", &red.paint("FAILED").to_string())
    } else {
        msg
    }
}

/// `HH:MM:SS | message`, coloured by level.
pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let msg = event_message(event);
        let timestamp = Utc::now().format("%H:%M:%S");

        let line = match *event.metadata().level() {
            Level::ERROR => Color::Red.paint(msg).to_string(),
            Level::WARN => Color::Yellow.paint(msg).to_string(),
            _ => highlight_outcome(msg),
        };

        writeln!(
            writer,
            "{} | {}",
            Style::new().dimmed().paint(timestamp.to_string()),
            line
        )
    }
}

/// `YYYY-MM-DD HH:MM:SS [LEVEL] message`, plain text.
pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
        let level = event.metadata().level();

        writeln!(writer, "{} [{}] {}", timestamp, level, event_message(event))
    }
}
