//! Log file setup
//!
//! Routes `tracing` output to the append-only proxy log, one event per
//! line in the form `HH:MM:SS:LEVEL:message`.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

struct ProxyLogFormat;

impl<S, N> FormatEvent<S, N> for ProxyLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        write!(
            writer,
            "{}:{}:",
            Local::now().format("%H:%M:%S"),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the global subscriber writing to `path`. INFO by default for
/// this crate; `RUST_LOG` overrides.
pub fn init(path: &str) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path))?;

    tracing_subscriber::fmt()
        .event_format(ProxyLogFormat)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("siprelay=info".parse().unwrap()),
        )
        .with_writer(Mutex::new(file))
        .init();

    Ok(())
}
