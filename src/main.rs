use tracing::{error, info};

use orgfiles::{Config, Database, FileStorage, SessionManager, WebServer};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    let config = match Config::load_or_default(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {CONFIG_PATH}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = orgfiles::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        orgfiles::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "orgfiles exited with an error");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> orgfiles::Result<()> {
    config.validate()?;
    info!("orgfiles - organisation file manager");

    let db = Database::open(&config.database.path).await?;
    info!(path = %config.database.path, version = db.schema_version().await?, "database ready");

    let storage = FileStorage::new(&config.storage.root)?;
    info!(root = %storage.base_path().display(), "file storage ready");

    let purged = SessionManager::new(&db, config.session.ttl_days)
        .purge_expired()
        .await?;
    if purged > 0 {
        info!(purged, "removed expired sessions");
    }

    let server = WebServer::new(&config, db, storage)?;
    server.run().await?;
    Ok(())
}
