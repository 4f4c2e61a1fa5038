//! `labdentd` — the LabDent server binary.
//!
//! Usage:
//!   labdentd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/labdent/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use labdent_cases::catalog::{AllowAllDirectory, LogNotifier, StaticCatalog};
use labdent_cases::CasesModule;
use labdent_core::Module;

use config::ServerConfig;

/// LabDent server.
#[derive(Parser, Debug)]
#[command(name = "labdentd", about = "LabDent lab management server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides the configured one).
    #[arg(long = "listen")]
    listen: Option<String>,
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
    let listen = cli.listen.unwrap_or(server_config.server.listen.clone());

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = labdent_core::ServiceConfig {
        data_dir: Some(data_dir.clone()),
        listen: listen.clone(),
        ..Default::default()
    };

    let sql: Arc<dyn labdent_sql::SQLStore> = Arc::new(
        labdent_sql::SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );

    // Collaborators. The stock catalog and an open client directory until a
    // deployment wires real ones in.
    let cases_module = CasesModule::new(
        sql,
        Arc::new(StaticCatalog::with_defaults()),
        Arc::new(AllowAllDirectory),
        Arc::new(LogNotifier),
    )?;
    info!("Cases module initialized");

    let module_routes = vec![(cases_module.name(), cases_module.routes())];

    // Build router.
    let app = routes::build_router(module_routes);

    // Start server.
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!("LabDent server listening on {}", listen);
    axum::serve(listener, app).await?;

    Ok(())
}
