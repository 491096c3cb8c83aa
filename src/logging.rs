use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Routes tracing output to a daily-rolling file in `log_dir`. The terminal
/// belongs to the TUI, so nothing goes to stdout.
///
/// `RUST_LOG` overrides the default filter, which keeps this crate's
/// per-fix debug lines and everything else at info.
pub fn initialize_logging(log_dir: &str) -> WorkerGuard {
    let _ = std::fs::create_dir_all(log_dir);

    let file_appender = tracing_appender::rolling::daily(log_dir, "trailhead.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,trailhead=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!("Logging initialized in {}", log_dir);
    guard
}
