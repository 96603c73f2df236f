use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use votegate::config::VotegateConfig;
use votegate::grpc::GrpcServer;
use votegate::ratelimit::{PolicyEntry, RateLimiter, SystemClock};

#[derive(Parser, Debug)]
#[command(name = "votegate", version)]
#[command(about = "Sliding-window rate limiting service for the voting platform")]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true, env = "VOTEGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the gRPC decision service (default)
    Serve {
        /// Override the configured gRPC listen address
        #[arg(long)]
        grpc_addr: Option<SocketAddr>,
    },
    /// Validate the configuration and print the effective policies as JSON
    CheckConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct EffectiveConfig<'a> {
    grpc_addr: SocketAddr,
    policies: Vec<PolicyEntry>,
    excluded_paths: &'a [String],
    retention_secs: u64,
    sweep_interval_secs: u64,
    record_rejected: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut config = VotegateConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve { grpc_addr: None }) {
        Command::Serve { grpc_addr } => {
            if let Some(addr) = grpc_addr {
                config.server.grpc_addr = addr;
            }
            serve(config).await
        }
        Command::CheckConfig => check_config(&config),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn serve(config: VotegateConfig) -> anyhow::Result<()> {
    info!("Starting Votegate Rate Limiting Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let policies = config.policy_table()?;
    let exclusions = config.rate_limiting.exclusions()?;
    info!(
        grpc_addr = %config.server.grpc_addr,
        policies = policies.len(),
        excluded_paths = exclusions.patterns().len(),
        record_rejected = config.rate_limiting.record_rejected,
        "Configuration loaded"
    );

    let rate_limiter = Arc::new(RateLimiter::new(
        policies,
        config.rate_limiting.limiter_settings(),
        Arc::new(SystemClock),
    ));
    info!("Rate limiter initialized");

    let grpc_server = GrpcServer::new(config.server.grpc_addr, rate_limiter.clone(), exclusions);

    grpc_server.serve_with_shutdown(shutdown_signal()).await?;

    info!(
        tracked_clients = rate_limiter.tracked_clients(),
        "Votegate Rate Limiting Service stopped"
    );
    Ok(())
}

fn check_config(config: &VotegateConfig) -> anyhow::Result<()> {
    let policies = config.policy_table()?;
    config.rate_limiting.exclusions()?;

    let effective = EffectiveConfig {
        grpc_addr: config.server.grpc_addr,
        policies: policies.entries(),
        excluded_paths: &config.rate_limiting.excluded_paths,
        retention_secs: config.rate_limiting.retention_secs,
        sweep_interval_secs: config.rate_limiting.sweep_interval_secs,
        record_rejected: config.rate_limiting.record_rejected,
    };
    println!("{}", serde_json::to_string_pretty(&effective)?);
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
