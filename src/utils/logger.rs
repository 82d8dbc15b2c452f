use crate::utils::config::LoggingConfig;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log line layout selected by `logging.output`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored when writing to a terminal
    Pretty,
    /// One JSON object per line, for log shippers
    Json,
}

impl LogFormat {
    /// Anything but "json" falls back to pretty output
    pub fn from_setting(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Install the global subscriber for a run
///
/// `RUST_LOG` wins over `logging.level`. Lines are appended to
/// `logging.file_path` when set, stderr otherwise. Returns `false` when a
/// subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> std::io::Result<bool> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let to_file = !config.file_path.is_empty();
    let writer = if to_file {
        let file = OpenOptions::new().create(true).append(true).open(&config.file_path)?;
        BoxMakeWriter::new(Mutex::new(file))
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };

    let installed = match LogFormat::from_setting(&config.output) {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(writer))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty().with_ansi(!to_file).with_writer(writer))
            .try_init(),
    };

    Ok(installed.is_ok())
}
