use std::{net::SocketAddr, sync::Arc};

use engine::{BlobStore, LocalBlobStore, MemoryBlobStore};
use migration::{Migrator, MigratorTrait};
use settings::{Database, Storage};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "receipt_desk={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        tracing::warn!("no [server] section configured, nothing to run");
        return Ok(());
    };

    tracing::info!("Found server settings...");
    let db = parse_database(&server.database).await?;
    let engine = engine::Engine::builder()
        .database(db)
        .blob_store(blob_store(&settings.storage))
        .policy(settings.policy)
        .build()
        .await?;

    let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{}:{}", bind, server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(engine, listener).await?;

    Ok(())
}

fn blob_store(config: &Storage) -> Arc<dyn BlobStore> {
    match config {
        Storage::Memory => {
            tracing::warn!("using in-memory blob storage, uploads are lost on restart");
            Arc::new(MemoryBlobStore::new())
        }
        Storage::Local(local) => Arc::new(LocalBlobStore::new(&local.root, &local.public_url)),
    }
}

async fn parse_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
