use std::env;
use std::ffi::OsString;
use std::path::Path;

use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/devsplit.log";

fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn,devsplit=info,devsplit_core=info",
        1 => "info,devsplit_core=debug",
        _ => "debug",
    }
}

/// Install the global subscriber. `TRACING_LEVEL` overrides the `-v` count.
///
/// Console output goes to stderr; stdout is reserved for command output. The
/// file layer writes to `LOG_FILE_PATH` and is skipped when that is set empty.
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init_logger(verbose: u8) -> Option<WorkerGuard> {
    let directive =
        env::var("TRACING_LEVEL").unwrap_or_else(|_| default_directive(verbose).to_string());

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let log_file = env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let (file_layer, guard) = if log_file.trim().is_empty() {
        (None, None)
    } else {
        let path = Path::new(&log_file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("devsplit.log"));

        let appender = tracing_appender::rolling::never(dir, name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        )
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(directive))
        .with(console)
        .with(file_layer)
        .init();

    debug!("Logging to stderr and '{}'", log_file);

    guard
}
