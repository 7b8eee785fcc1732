//! Nimbus - Multi-tenant SaaS platform backend

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::Config;
use nimbus_api::{AppState, create_router};
use nimbus_auth::{AuthGuard, AuthPolicy, AuthService, LogMailer, TokenConfig, TokenIssuer};
use nimbus_db::{Database, NewAccount, Role};

/// Nimbus - Multi-tenant SaaS platform backend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "NIMBUS_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "NIMBUS_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)?;

    // Initialize logging
    init_logging(&config.logging.level);

    info!("Starting Nimbus v{}", env!("CARGO_PKG_VERSION"));

    if config.uses_default_secret() {
        warn!("auth.jwt_secret is the shipped default; set a real secret in production");
    }

    // Create the data directory
    if let Some(parent) = Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // Initialize database
    let db_path = format!("sqlite:{}?mode=rwc", config.database.path);
    let db = Database::new(&db_path).await?;

    // Create a bootstrap admin account if the directory is empty
    if !db.has_accounts().await? {
        bootstrap_admin(&db, &config).await?;
    }

    // Initialize the token issuer
    let tokens = Arc::new(TokenIssuer::new(
        &config.auth.jwt_secret,
        TokenConfig {
            access_ttl_secs: config.auth.access_token_ttl_secs,
            refresh_ttl_secs: config.auth.refresh_token_ttl_secs,
            verification_ttl_secs: config.auth.verification_token_ttl_secs,
            reset_ttl_secs: config.auth.reset_token_ttl_secs,
        },
    ));

    // Initialize the authentication service and request guard
    let auth = Arc::new(AuthService::new(
        db.clone(),
        tokens.clone(),
        Arc::new(LogMailer),
        AuthPolicy {
            lockout_threshold: config.auth.lockout_threshold,
            allow_unverified_login: config.auth.allow_unverified_login,
            min_password_length: config.auth.min_password_length,
        },
    ));
    let guard = Arc::new(AuthGuard::new(db.clone(), tokens.clone()));

    // Create application state
    let state = AppState::new(db, auth, guard);

    // Create router with request correlation and tracing
    let app = create_router(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    // Determine bind address
    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Create the first admin account
async fn bootstrap_admin(db: &Database, config: &Config) -> Result<()> {
    info!("Creating bootstrap admin account");

    let password = match &config.bootstrap.admin_password {
        Some(password) => password.clone(),
        None => {
            warn!("bootstrap.admin_password not set; using the default (change it immediately)");
            "change-me-123".to_string()
        }
    };

    let password_hash = nimbus_auth::hash_password(&password)?;
    let account = db
        .insert_account(NewAccount::provisioned(
            config.bootstrap.admin_email.clone(),
            password_hash,
            Role::SuperAdmin,
            None,
        ))
        .await?;

    info!(account_id = %account.id, email = %account.email, "Bootstrap admin created");
    Ok(())
}

/// Initialize logging
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Shutdown signal received");
}
