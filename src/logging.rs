use std::fs::OpenOptions;
use std::sync::Mutex;

use camino::Utf8Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::FetchError;
use crate::output::stream_color;

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber: events on stderr (coloured when stderr is a
/// terminal) and, when a path is given, plain-text events appended to that file.
pub fn init(log_file: Option<&Utf8Path>) -> Result<(), FetchError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_ansi(stream_color(&std::io::stderr()))
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path.as_std_path())
                .map_err(|err| FetchError::Logging(format!("open {path}: {err}")))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| FetchError::Logging(err.to_string()))
}
