use momento_gallery::app::create_app;
use momento_gallery::config::{load_config, save_default_config, Config, StoreConfig};
use momento_gallery::constants::CONFIG_PATH;
use momento_gallery::database::{
    create_pool, get_connection, init_media_store, schema::missing_columns, DbPool,
    SqliteMediaStore,
};
use momento_gallery::logging::{init_logging, install_panic_hook};
use momento_gallery::store::Collection;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

fn exit_with(context: &str, error: impl std::fmt::Display) -> ! {
    error!("{}: {}", context, error);
    std::process::exit(1);
}

/// Creates the store tables in a writable copy of the configured store.
fn init_store(config: &Config) {
    let store_config = StoreConfig {
        read_only: false,
        ..config.store.clone()
    };
    if let Some(parent) = store_config.database_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let pool = create_pool(&store_config).unwrap_or_else(|e| exit_with("Failed to open store", e));
    let conn = get_connection(&pool).unwrap_or_else(|e| exit_with("Failed to get connection", e));
    init_media_store(&conn).unwrap_or_else(|e| exit_with("Failed to initialize store", e));

    info!("Initialized media store at {:?}", store_config.database_path);
}

/// Warns about store tables that lack columns queries depend on.
fn check_store_layout(pool: &DbPool) {
    let conn = match get_connection(pool) {
        Ok(c) => c,
        Err(e) => {
            warn!("Could not inspect media store: {}", e);
            return;
        }
    };

    for collection in Collection::BOTH {
        match missing_columns(&conn, collection.table()) {
            Ok(missing) if missing.is_empty() => {}
            Ok(missing) => warn!(
                "Table {} is missing columns {:?}; queries on it will fail",
                collection, missing
            ),
            Err(e) => warn!("Could not inspect table {}: {}", collection, e),
        }
    }
}

#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--init-config") {
        match save_default_config(&CONFIG_PATH) {
            Ok(_) => {
                println!("Default configuration saved to {:?}", *CONFIG_PATH);
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("Failed to save default configuration: {}", e);
                std::process::exit(1);
            }
        }
    }

    init_logging();
    install_panic_hook();

    let config = Arc::new(load_config(&CONFIG_PATH));

    if std::env::args().any(|arg| arg == "--init-store") {
        init_store(&config);
        return;
    }

    let pool = create_pool(&config.store)
        .unwrap_or_else(|e| exit_with("Failed to open media store", e));
    check_store_layout(&pool);

    let store = Arc::new(SqliteMediaStore::new(pool));
    let app = create_app(Arc::clone(&config), store);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .unwrap_or_else(|e| exit_with("Invalid server address", e));
    info!("Starting Momento Gallery on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| exit_with("Failed to bind", e));

    if let Err(e) = axum::serve(listener, app).await {
        exit_with("Server failed", e);
    }
}
