//! Logging setup for programs that host the bridge
//!
//! The library itself only emits `tracing` events. Hosts that have no subscriber of their own
//! can install the standard one here.

use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{FmtContext, FormatEvent, FormatFields, format::Writer},
    registry::LookupSpan,
};

/// Install the standard subscriber at INFO (overridable via `RUST_LOG`).
///
/// Format: `[LEVEL YYYY-MM-DD HH:MM:SS target] message`, with `file:line` in place of the
/// target for DEBUG and TRACE events.
///
/// # Example
/// ```no_run
/// use lsq_bridge::init_logger;
///
/// init_logger();
/// tracing::info!("engine session started");
/// ```
///
/// ```bash
/// RUST_LOG=lsq_bridge=trace ./host
/// ```
pub fn init_logger() {
    init_logger_with_level(Level::INFO)
}

/// Install the standard subscriber with a custom default level.
///
/// Does nothing beyond a warning if a global subscriber is already set, which is common when
/// the bridge is loaded into a host that configured its own logging.
pub fn init_logger_with_level(default_level: Level) {
    if let Err(e) = try_init_logger_with_level(default_level) {
        tracing::warn!("logger already initialized: {}", e);
    }
}

/// Fallible variant of [`init_logger_with_level`].
pub fn try_init_logger_with_level(
    default_level: Level,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .event_format(BracketFormatter)
        .try_init()
}

/// Bracketed, colored event prefix.
struct BracketFormatter;

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[31mERROR\x1b[0m",
        Level::WARN => "\x1b[33mWARN\x1b[0m",
        Level::INFO => "\x1b[32mINFO\x1b[0m",
        Level::DEBUG => "\x1b[34mDEBUG\x1b[0m",
        Level::TRACE => "\x1b[35mTRACE\x1b[0m",
    }
}

impl<S, N> FormatEvent<S, N> for BracketFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        use chrono::Local;

        let metadata = event.metadata();
        let level = *metadata.level();

        write!(
            writer,
            "[{} {} ",
            level_tag(level),
            Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;

        match (level >= Level::DEBUG, metadata.file()) {
            (true, Some(file)) => {
                let filename = file.rsplit('/').next().unwrap_or(file);
                match metadata.line() {
                    Some(line) => write!(writer, "{}:{}", filename, line)?,
                    None => write!(writer, "{}", filename)?,
                }
            }
            _ => write!(writer, "{}", metadata.target())?,
        }

        write!(writer, "] ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
