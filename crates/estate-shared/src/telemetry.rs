//! Telemetry setup

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, LoggingSettings};
use crate::error::AppError;

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
///
/// The returned guard flushes the file writer on drop and must be kept
/// alive for the lifetime of the process.
pub fn init_telemetry(settings: &LoggingSettings) -> Result<Option<WorkerGuard>, AppError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| AppError::TelemetryError(e.to_string()))?;

    let stdout_layer = match settings.format {
        LogFormat::Json => fmt::layer().json().with_target(true).with_thread_ids(true).boxed(),
        LogFormat::Pretty => fmt::layer().with_target(true).boxed(),
    };

    let (file_layer, guard) = match &settings.directory {
        Some(directory) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("estate")
                .filename_suffix("log")
                .build(directory)
                .map_err(|e| AppError::TelemetryError(e.to_string()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::TelemetryError(e.to_string()))?;

    Ok(guard)
}
