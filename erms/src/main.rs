mod config;

use clap::{Args, Parser};
use config::{Config, ConfigError, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use shared::metrics_defs::describe_all;
use shared::session::Sessions;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "erms", about = "Employee and resource management services")]
enum CliCommand {
    /// Browser-facing relay in front of the resource API
    Relay(ConfigArgs),
    /// Resource API over the in-memory store
    ResourceApi(ConfigArgs),
    /// Both services in one process
    All(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// Path to the YAML config file
    #[arg(long, default_value = "erms.yaml")]
    config: PathBuf,
}

impl CliCommand {
    fn config_path(&self) -> &PathBuf {
        match self {
            CliCommand::Relay(args) | CliCommand::ResourceApi(args) | CliCommand::All(args) => {
                &args.config
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("missing `{0}` section in config")]
    MissingSection(&'static str),
    #[error("could not set up metrics: {0}")]
    Metrics(#[from] metrics_exporter_statsd::StatsdError),
    #[error("a metrics recorder is already installed")]
    RecorderInstalled,
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("relay failed: {0}")]
    Relay(#[from] relay::errors::RelayError),
    #[error("resource API failed: {0}")]
    ResourceApi(#[from] resource_api::errors::ResourceApiError),
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    let config = match Config::from_file(cli.config_path()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Flushes pending Sentry events on drop.
    let _sentry = init_logging(config.common.logging.as_ref());

    match start(&cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Exiting");
            ExitCode::FAILURE
        }
    }
}

fn start(cli: &CliCommand, config: Config) -> Result<(), CliError> {
    if let Some(metrics) = &config.common.metrics {
        init_metrics(metrics)?;
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(run(cli, config))
}

async fn run(cli: &CliCommand, config: Config) -> Result<(), CliError> {
    let sessions = Sessions::from_config(&config.sessions);

    match cli {
        CliCommand::Relay(_) => {
            let relay_config = config.relay.ok_or(CliError::MissingSection("relay"))?;
            tracing::info!("Starting relay");
            relay::run(relay_config, sessions).await?;
        }
        CliCommand::ResourceApi(_) => {
            let api_config = config
                .resource_api
                .ok_or(CliError::MissingSection("resource_api"))?;
            tracing::info!("Starting resource API");
            resource_api::run(api_config, sessions).await?;
        }
        CliCommand::All(_) => {
            let relay_config = config.relay.ok_or(CliError::MissingSection("relay"))?;
            let api_config = config
                .resource_api
                .ok_or(CliError::MissingSection("resource_api"))?;
            tracing::info!("Starting relay and resource API");

            let api_task = async {
                resource_api::run(api_config, sessions.clone()).await?;
                Ok::<(), CliError>(())
            };
            let relay_task = async {
                relay::run(relay_config, sessions.clone()).await?;
                Ok::<(), CliError>(())
            };
            tokio::try_join!(api_task, relay_task)?;
        }
    }
    Ok(())
}

fn init_logging(config: Option<&LoggingConfig>) -> Option<sentry::ClientInitGuard> {
    let level = config.map_or("info", |logging| logging.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let guard = config
        .and_then(|logging| logging.sentry_dsn.as_deref())
        .map(|dsn| {
            sentry::init((
                dsn,
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    ..Default::default()
                },
            ))
        });
    let sentry_layer = guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();

    guard
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some("erms"))?;
    metrics::set_global_recorder(recorder).map_err(|_| CliError::RecorderInstalled)?;

    describe_all(relay::metrics_defs::ALL_METRICS);
    describe_all(resource_api::metrics_defs::ALL_METRICS);
    Ok(())
}
