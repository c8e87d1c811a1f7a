use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::settings::LogSettings;

/// Setup logging for the library
///
/// This function sets up logging for the library. It uses the `tracing` crate, and the `tracing-subscriber` crate for formatting.
///
/// The log level is any `EnvFilter` directive and defaults to `info`.
///
/// If `file` is set, a log file is created (or truncated) with that name, and
/// messages are written to stdout unless `stdout` is disabled.
///
/// The library never installs a subscriber on its own; callers opt in with this function.
pub fn setup_log(settings: &LogSettings) -> Result<(), LogError> {
    let log_level = settings.level.to_lowercase();
    let env_filter = EnvFilter::try_new(&log_level)?;

    let subscriber = Registry::default().with(env_filter);

    let file_layer = match &settings.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)?;
            Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_timer(CompactTimestamp),
            )
        }
        None => None,
    };

    let stdout_layer = settings.stdout.then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(false)
            .with_timer(CompactTimestamp)
    });

    subscriber.with(file_layer).with(stdout_layer).try_init()?;
    tracing::debug!("Logging is configured with level: {}", log_level);
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Invalid log level: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("Could not open the log file: {0}")]
    File(#[from] std::io::Error),
    #[error(transparent)]
    Init(#[from] TryInitError),
}

#[derive(Clone)]
struct CompactTimestamp;

impl FormatTime for CompactTimestamp {
    fn format_time(
        &self,
        w: &mut tracing_subscriber::fmt::format::Writer<'_>,
    ) -> Result<(), std::fmt::Error> {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S"))
    }
}
