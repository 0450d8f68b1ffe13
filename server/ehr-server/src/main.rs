use clap::Parser;
use colored::*;
use std::env;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use ehr_server::{create_app, EhrServer, ServerConfig};
use error_common::{log_error, EhrError, Result};

/// EHR Engine HTTP Server
#[derive(Parser, Debug)]
#[command(name = "ehr-server")]
#[command(about = "Patient and doctor records API server")]
struct Args {
    /// Server bind address, overrides the config file
    #[arg(long, env = "EHR_HOST")]
    host: Option<String>,

    /// Server port, overrides the config file
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short, long, default_value = "ehr-server.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = ServerConfig::load(&args.config)
        .map_err(|e| EhrError::ConfigError(e.to_string()))?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    init_tracing(&config, args.verbose);
    logger_redacted::configure(&config.logging);

    if let Err(reason) = config.validate() {
        let err = EhrError::ConfigError(reason);
        log_error("startup", &err);
        return Err(err);
    }

    info!("{}", "Starting EHR Engine HTTP Server".bright_cyan());
    info!("Version: {}", env!("CARGO_PKG_VERSION").bright_white());
    info!("Environment: {:?}", config.environment);
    if config.identity.uses_default_secret() {
        tracing::warn!("{}", "Using the default JWT secret; set JWT_SECRET before deploying".bright_yellow());
    }

    let bind_address = config.bind_address();
    let server = EhrServer::new(config).await.map_err(|e| {
        log_error("startup", &e);
        e
    })?;
    let app = create_app(server);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| EhrError::NetworkError(format!("Failed to bind to {bind_address}: {e}")))?;

    info!("{}", format!("EHR Engine server running on http://{bind_address}").bright_green());
    info!("{}", format!("Health check available at: http://{bind_address}/health").bright_blue());
    info!("{}", format!("API available at: http://{bind_address}/api").bright_blue());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| EhrError::ServerError(format!("HTTP server error: {e}")))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn init_tracing(config: &ServerConfig, verbose: bool) {
    let default_level = if verbose {
        "debug".to_string()
    } else {
        config.logging.log_level.clone()
    };

    let use_colors = env::var("NO_COLOR").is_err() && atty::is(atty::Stream::Stdout);
    let pretty = !config.is_production() && !config.logging.json && use_colors;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "ehr_server={default_level},auth_identity={default_level},clinical_records={default_level},tower_http=info,sqlx=warn"
        )
        .into()
    });

    if pretty {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true),
            )
            .init();

        print_startup_banner();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .init();
    }
}

fn print_startup_banner() {
    println!("{}", "╔══════════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║                  EHR ENGINE                  ║".bright_cyan());
    println!("{}", "║        Patient and Doctor Records API        ║".bright_cyan());
    println!("{}", "╚══════════════════════════════════════════════╝".bright_cyan());
    println!();
}
