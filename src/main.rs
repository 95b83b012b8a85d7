use carsharing::config::{AppConfig, StorageBackend};
use carsharing::db::{init_pool, run_migrations};
use carsharing::error::AppError;
use carsharing::routes::create_router;
use carsharing::services::{sql::SqlCarStore, storage::FileCarStore};
use carsharing::state::AppState;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;

    let state = match config.storage_backend {
        StorageBackend::Sqlite => {
            let db = init_pool(&config.database_url).await?;
            if let Err(err) = run_migrations(&db).await {
                error!("migration failed: {err:?}");
                return Err(err);
            }
            info!("using sqlite storage at {}", config.database_url);
            AppState::new(config.clone(), SqlCarStore::new(db))
        }
        StorageBackend::File => {
            let store = FileCarStore::new(config.cars_file.clone());
            store.ensure_structure().await?;
            info!("using file storage at {}", store.path().display());
            AppState::new(config.clone(), store)
        }
    };

    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,carsharing=debug,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
