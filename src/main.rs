#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use greenroom_server::config;
use greenroom_server::logging;
use greenroom_server::server::LobbyServer;
use greenroom_server::websocket;
use std::net::SocketAddr;

/// Greenroom -- multi-tenant, in-memory lobby coordination server for games
#[derive(Parser, Debug)]
#[command(name = "greenroom-server")]
#[command(about = "A multi-tenant, in-memory WebSocket lobby coordination server for game matchmaking")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    /// Useful for debugging configuration loading.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from config.json if present; otherwise use code
    // defaults.
    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Storage: in-memory (nothing survives a restart)");
                println!("  CORS origins: {}", cfg.security.cors_origins);
                println!("  Provisioned sessions: {}", cfg.sessions.len());
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result.map_err(|e| anyhow::anyhow!("invalid configuration:\n{e}"))?;

    logging::init_with_config(&cfg.logging);

    let port: u16 = cfg.port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "Starting Greenroom server");

    let cors_origins = cfg.security.cors_origins.clone();
    let server = LobbyServer::new(cfg);

    let app = websocket::create_router(&cors_origins).with_state(server.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        cors_origins = %cors_origins,
        "Server started - lobby API under /v1, event channel on the lobby events route"
    );

    let shutdown_server = server.clone();
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received, stopping background loops");
            shutdown_server.begin_shutdown();
        })
        .await?;

    Ok(())
}
