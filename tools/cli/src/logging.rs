//! Log subscriber setup.
//!
//! Two outputs: the application log (everything except the access log
//! target) and the request log (only the access log target). Each goes to
//! stdout unless a file is given.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::{Filter, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use muxd_config::{LogFormat, LogLevel};
use muxd_server::ACCESS_LOG_TARGET;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Logging settings after command-line overrides.
#[derive(Debug, Clone, Copy)]
pub struct LogOptions<'a> {
    pub level: LogLevel,
    pub format: LogFormat,
    pub app_log: Option<&'a Path>,
    pub request_log: Option<&'a Path>,
}

/// Install the global subscriber.
///
/// `RUST_LOG` directives refine the application log on top of `level`.
pub fn init(options: &LogOptions<'_>) -> Result<()> {
    let app_filter = EnvFilter::builder()
        .with_default_directive(options.level.level_filter().into())
        .from_env_lossy()
        .add_directive(
            format!("{}=off", ACCESS_LOG_TARGET)
                .parse()
                .context("Invalid access log directive")?,
        );
    let access_filter = Targets::new().with_target(ACCESS_LOG_TARGET, LevelFilter::INFO);

    let layers: Vec<BoxedLayer> = vec![
        layer(options.format, options.app_log, app_filter)?,
        layer(options.format, options.request_log, access_filter)?,
    ];

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("Failed to install log subscriber")?;
    Ok(())
}

fn layer<F>(format: LogFormat, path: Option<&Path>, filter: F) -> Result<BoxedLayer>
where
    F: Filter<Registry> + Send + Sync + 'static,
{
    let ansi = path.is_none();
    let writer = writer(path)?;
    let layer = match format {
        LogFormat::Text => fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    };
    Ok(layer)
}

fn writer(path: Option<&Path>) -> Result<BoxMakeWriter> {
    let Some(path) = path else {
        return Ok(BoxMakeWriter::new(std::io::stdout));
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    Ok(BoxMakeWriter::new(Mutex::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_writer_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");

        writer(Some(&path)).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_file_writer_reports_bad_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("app.log");

        let err = writer(Some(&path)).err().unwrap();

        assert!(err.to_string().contains("app.log"));
    }
}
