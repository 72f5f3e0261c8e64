//! # group-auth HTTP Server
//!
//! Serves authorization checks over HTTP.
//!
//! ## Endpoints
//!
//! - `POST /v1/check` - Authorization check
//! - `POST /v1/cache/invalidate` - Drop cached resolutions
//! - `GET /health` - Health check
//!
//! ## Configuration
//!
//! A TOML file (`--config`, env `GROUP_AUTH_CONFIG`) with a `[server]`
//! section and an `[auth]` section. Rules come from PostgreSQL when
//! `server.database_url` is set and the `postgres` feature is enabled,
//! otherwise from `server.fixture`, otherwise the store starts empty.
//! `RUST_LOG` sets the log level (default: info).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use group_auth::web::{self, AppState};
use group_auth::{
    AuthConfig, Authorizer, InMemoryRuleStore, MatchMode, Relation, RequestParams, RequestScope,
    RuleStore, StaticIdentity, User,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// group-auth server CLI
#[derive(Parser)]
#[command(name = "group-auth-server")]
#[command(about = "Group/rule authorization server")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "GROUP_AUTH_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP port (overrides config)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one check against the configured store and exit
    Check {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Permission names, comma-separated
        #[arg(short = 'n', long)]
        permissions: String,

        /// Request parameters as a query string, e.g. `status=1&id=5`
        #[arg(long, default_value = "")]
        params: String,

        /// `any` or `all`
        #[arg(long, default_value = "any")]
        relation: Relation,

        /// `url` or `plain`
        #[arg(long, default_value = "url")]
        mode: MatchMode,
    },
}

/// Server configuration file
#[derive(Debug, Default, Deserialize)]
struct ServerConfig {
    #[serde(default)]
    server: ServerSection,

    #[serde(default)]
    auth: AuthConfig,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_port")]
    port: u16,

    /// Rule fixture for the in-memory store (TOML or JSON)
    #[serde(default)]
    fixture: Option<PathBuf>,

    /// PostgreSQL connection string
    #[serde(default)]
    database_url: Option<String>,

    /// Apply bundled migrations on startup
    #[serde(default)]
    run_migrations: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            fixture: None,
            database_url: None,
            run_migrations: false,
        }
    }
}

fn default_port() -> u16 {
    8080
}

impl ServerConfig {
    fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: ServerConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.auth.validate()?;
        Ok(config)
    }
}

/// Main server entrypoint
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            let config = ServerConfig::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => ServerConfig::default(),
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let store = open_store(&config).await?;
    let authorizer = Arc::new(Authorizer::new(config.auth.clone(), store));

    if let Some(Command::Check {
        user,
        permissions,
        params,
        relation,
        mode,
    }) = cli.command
    {
        let identity = StaticIdentity::new(User::new(user));
        let scope = RequestScope::new(&identity).with_params(RequestParams::from_query(&params)?);
        let allowed = authorizer
            .check_string(&scope, &permissions, mode, relation)
            .await?;
        println!("{}", if allowed { "allow" } else { "deny" });
        return Ok(());
    }

    info!("Starting group-auth server v{}", group_auth::VERSION);

    let app = web::router(AppState::new(authorizer));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Pick the rule store from configuration
async fn open_store(config: &ServerConfig) -> Result<Arc<dyn RuleStore>> {
    if let Some(url) = &config.server.database_url {
        return open_postgres(url, config).await;
    }

    match &config.server.fixture {
        Some(path) => {
            let store = InMemoryRuleStore::load(path)
                .await
                .with_context(|| format!("Failed to load fixture {}", path.display()))?;
            info!("Loaded rule fixture from {:?}", path);
            Ok(Arc::new(store))
        }
        None => {
            warn!("No rule store configured, starting with an empty in-memory store");
            Ok(Arc::new(InMemoryRuleStore::new()))
        }
    }
}

#[cfg(feature = "postgres")]
async fn open_postgres(url: &str, config: &ServerConfig) -> Result<Arc<dyn RuleStore>> {
    let store = group_auth::PostgresRuleStore::new(
        url,
        &config.auth.tables,
        config.auth.store_timeout(),
    )
    .await?;

    if config.server.run_migrations {
        store.run_migrations().await?;
        info!("Database migrations applied");
    }

    info!("Using PostgreSQL rule store");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(_url: &str, _config: &ServerConfig) -> Result<Arc<dyn RuleStore>> {
    anyhow::bail!("database_url is set but the server was built without the `postgres` feature")
}

/// Graceful shutdown handler
async fn shutdown_signal() {
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
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Starting graceful shutdown");
}
