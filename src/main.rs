use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use easypub::logger::init_logger;
use easypub::prelude::*;
use easypub::{Config, PublishError};
use tokio::signal;
use tracing::{error, info, warn};

/// easypub - publish a page, get a link and a secret.
#[derive(Debug, Parser)]
#[command(name = "easypub")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true, env = "CONFIG_PATH")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the HTTP server (default if no command specified)
    Runserver {
        /// Overrides `server.host`
        #[arg(long)]
        host: Option<String>,
        /// Overrides `server.port`
        #[arg(long)]
        port: Option<u16>,
    },
    /// Load and validate the configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logger(config.debug);

    let result = match cli.command.unwrap_or(Commands::Runserver {
        host: None,
        port: None,
    }) {
        Commands::Runserver { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            runserver(config).await
        }
        Commands::CheckConfig => {
            println!("{:#?}", config);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn runserver(config: Config) -> Result<(), PublishError> {
    info!("Starting easypub");

    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .map_err(|e| PublishError::Config(format!("bad listen address {}: {}", config.bind_addr(), e)))?;

    let services = build_services(&config).await?;
    let state = Arc::new(AppState::with_cache_control(config.cache_control));
    let app = build_app(&config, services.clone(), state)?;

    let health = services.registry.health_check().await;
    info!("Backend health: {:?}", health);

    let server = PublishServer::new(addr, app);
    let result = server.run(wait_for_shutdown()).await;

    // 优雅关闭
    info!("Shutting down...");
    services.registry.cleanup().await;
    info!("Shutdown complete");

    result
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
