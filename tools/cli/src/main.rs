//! muxd - multiplexing API daemon.
//!
//! Runs the HTTP server, or with `--createconfig` the interactive wizard
//! that writes a fresh configuration file.

mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use logging::LogOptions;
use muxd_config::{run_wizard, Config, LogFormat, LogLevel, DEFAULT_CONFIG_NAME};
use muxd_server::{serve, Dispatcher, ProviderSet};

#[derive(Parser, Debug)]
#[command(name = "muxd")]
#[command(about = "muxd - authentication, storage and API multiplexing daemon")]
#[command(version)]
struct Cli {
    /// Run the configuration wizard and exit.
    #[arg(long)]
    createconfig: bool,

    /// Port to listen on (default 8080, overrides the config file).
    #[arg(long)]
    port: Option<u16>,

    /// Configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_NAME)]
    config: PathBuf,

    /// Log level: 0 panic, 1 fatal, 2 error, 3 warning, 4 info, 5 debug.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=5))]
    loglevel: Option<u8>,

    /// Log format: "text" or "json".
    #[arg(long)]
    logformat: Option<LogFormat>,

    /// Application log file (default stdout).
    #[arg(long)]
    applog: Option<PathBuf>,

    /// Request log file (default stdout).
    #[arg(long)]
    reqlog: Option<PathBuf>,
}

impl Cli {
    fn log_level(&self) -> Result<Option<LogLevel>> {
        self.loglevel
            .map(LogLevel::new)
            .transpose()
            .context("Invalid log level")
    }

    fn log_options(&self, level: LogLevel, format: LogFormat) -> LogOptions<'_> {
        LogOptions {
            level,
            format,
            app_log: self.applog.as_deref(),
            request_log: self.reqlog.as_deref(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.createconfig {
        return create_config(&cli.config).await;
    }
    run(cli).await
}

async fn create_config(default_path: &Path) -> Result<()> {
    let stdin = std::io::stdin();
    let outcome = run_wizard(stdin.lock(), std::io::stdout(), default_path)
        .context("Configuration wizard failed")?;

    outcome
        .config
        .save(&outcome.path)
        .await
        .with_context(|| format!("Failed to write {}", outcome.path.display()))?;

    println!("Configuration created successfully!");
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let level = cli.log_level()?;

    let config = match Config::load(&cli.config).await {
        Ok(config) => config.with_overrides(cli.port, level, cli.logformat),
        Err(err) => {
            let options = cli.log_options(
                level.unwrap_or_default(),
                cli.logformat.unwrap_or_default(),
            );
            logging::init(&options)?;
            error!(path = %cli.config.display(), error = %err, "cannot load configuration");
            return Err(err).with_context(|| {
                format!("Failed to load configuration from {}", cli.config.display())
            });
        }
    };

    logging::init(&cli.log_options(config.log_level, config.log_format))?;
    info!(
        config = %cli.config.display(),
        port = config.port,
        level = config.log_level.value(),
        "starting muxd"
    );

    let config = Arc::new(config);
    let providers = ProviderSet::new(config.clone());
    let dispatcher = Dispatcher::bootstrap(&providers)
        .await
        .context("Failed to start providers")?;

    serve(Arc::new(dispatcher), config.port)
        .await
        .context("Server failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["muxd"]).unwrap();

        assert!(!cli.createconfig);
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert_eq!(cli.port, None);
        assert!(cli.log_level().unwrap().is_none());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "muxd",
            "--port",
            "9000",
            "--config",
            "/etc/muxd.json",
            "--loglevel",
            "5",
            "--logformat",
            "json",
            "--reqlog",
            "access.log",
        ])
        .unwrap();

        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.config, PathBuf::from("/etc/muxd.json"));
        assert_eq!(cli.log_level().unwrap().map(|l| l.value()), Some(5));
        assert_eq!(cli.logformat, Some(LogFormat::Json));
        assert_eq!(cli.reqlog, Some(PathBuf::from("access.log")));
        assert!(cli.applog.is_none());
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(Cli::try_parse_from(["muxd", "--loglevel", "6"]).is_err());
        assert!(Cli::try_parse_from(["muxd", "--port", "70000"]).is_err());
        assert!(Cli::try_parse_from(["muxd", "--logformat", "xml"]).is_err());
    }

    #[test]
    fn test_createconfig_flag() {
        let cli = Cli::try_parse_from(["muxd", "--createconfig", "--config", "x.json"]).unwrap();
        assert!(cli.createconfig);
        assert_eq!(cli.config, PathBuf::from("x.json"));
    }
}
