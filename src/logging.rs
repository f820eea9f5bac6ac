use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Initialise logging to `blackout.log` in `dir`. The default level is
/// `info`; `debug` can be enabled from the settings file, in which case
/// `RUST_LOG` may override it. Falls back to stderr when the log file
/// cannot be opened.
///
/// The returned guard flushes the file writer and must outlive the message
/// loop.
pub fn init(debug: bool, dir: &Path) -> Option<WorkerGuard> {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    let appender = std::fs::create_dir_all(dir)
        .map_err(|e| e.to_string())
        .and_then(|_| {
            RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix("blackout")
                .filename_suffix("log")
                .build(dir)
                .map_err(|e| e.to_string())
        });

    match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(writer)
                .try_init();
            Some(guard)
        }
        Err(e) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
            tracing::warn!("cannot open log file in {}: {e}", dir.display());
            None
        }
    }
}
