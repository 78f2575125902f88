//! `cookeryd` — the Cookery server binary.
//!
//! Usage:
//!   cookeryd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/cookery/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod auth_middleware;
mod config;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use jsonwebtoken::{DecodingKey, Validation};
use tracing::info;

use cookery_core::Module;

use auth_middleware::JwtState;
use config::ServerConfig;

/// Cookery server.
#[derive(Parser, Debug)]
#[command(name = "cookeryd", about = "Cookery recipe server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides default 0.0.0.0:8080).
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;
    server_config.verify()?;

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = cookery_core::ServiceConfig {
        data_dir: Some(data_dir),
        listen: cli.listen.clone(),
        ..Default::default()
    };

    let sql: Arc<dyn cookery_sql::SQLStore> = Arc::new(
        cookery_sql::SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {e}"))?,
    );

    // Build the recipe module with any configured overrides.
    let mut engagement = recipe::service::EngagementConfig::default();
    if let Some(secs) = server_config.engagement.view_cooldown_secs {
        engagement.view_cooldown_secs = secs;
    }
    let mut worker_config = recipe::worker::WorkerConfig::default();
    if let Some(secs) = server_config.engagement.checks_poll_interval {
        worker_config.poll_interval = secs;
    }

    let recipe_module = recipe::RecipeModule::with_config(sql, engagement, worker_config)?;
    info!("Recipe module initialized");

    let module_routes = vec![(recipe_module.name(), recipe_module.routes())];

    // Build JWT state for the identity middleware.
    let jwt_state = Arc::new(JwtState {
        decoding_key: DecodingKey::from_secret(server_config.jwt.secret.as_bytes()),
        validation: Validation::default(),
    });

    // Build router and start the server.
    let app = routes::build_router(jwt_state, module_routes);

    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    info!("Cookery server listening on {}", cli.listen);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
