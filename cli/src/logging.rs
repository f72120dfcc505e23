use crate::settings::Settings;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, time::OffsetTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

fn timer() -> OffsetTime<time::format_description::well_known::Rfc3339> {
    // Local offset is unavailable in some environments
    OffsetTime::local_rfc_3339().unwrap_or_else(|_| {
        OffsetTime::new(
            time::UtcOffset::UTC,
            time::format_description::well_known::Rfc3339,
        )
    })
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Console and daily-rotated file logging for the server
pub fn init_logging(
    settings: &Settings,
    verbose: bool,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    let logs_dir = settings.logs_dir();
    std::fs::create_dir_all(&logs_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("inklog")
        .filename_suffix("log")
        .build(&logs_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let timer = timer();
    tracing_subscriber::registry()
        // File layer with full details
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_timer(timer.clone())
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(
            fmt::layer()
                .with_timer(timer)
                .with_target(false)
                .with_file(false)
                .with_line_number(false),
        )
        .with(filter(if verbose { "debug" } else { "info" }))
        .init();

    tracing::info!("Logging system initialized");
    tracing::info!("Log files are being written to: {:?}", logs_dir);

    Ok(guard)
}

/// Console-only logging for one-shot commands. Goes to stderr so command
/// output on stdout stays machine readable.
pub fn init_console(verbose: bool) {
    tracing_subscriber::fmt()
        .with_timer(timer())
        .with_writer(std::io::stderr)
        .with_env_filter(filter(if verbose { "debug" } else { "warn" }))
        .init();
}

pub fn log_shutdown() {
    tracing::info!("=== Inklog shutdown complete ===");
}
