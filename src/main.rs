use std::str::FromStr;
use std::sync::Arc;

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use dotenvy::dotenv;
use tracing::{Level, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use hrm_leave::clock::SystemClock;
use hrm_leave::config::{Config, StorageBackend};
use hrm_leave::db::{init_db, run_migrations};
use hrm_leave::docs::ApiDoc;
use hrm_leave::leave::LeaveService;
use hrm_leave::routes;
use hrm_leave::storage::{MemoryStore, MySqlStore, Store};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let level = Level::from_str(&config.log_level)
        .with_context(|| format!("LOG_LEVEL={:?} is invalid", config.log_level))?;

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(backend = %config.storage_backend, "Server starting...");

    let store = match config.storage_backend {
        StorageBackend::MySql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = init_db(url).await?;
            if config.run_migrations {
                run_migrations(&pool).await?;
            }
            Store::MySql(MySqlStore::new(pool))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; nothing survives a restart");
            Store::Memory(MemoryStore::new())
        }
    };

    let service = Data::new(LeaveService::new(Arc::new(store), Arc::new(SystemClock)));
    let limiter = routes::build_limiter(config.rate_protected_per_min)?;

    // Clone values for the closure (avoid move issues)
    let server_addr = config.server_addr.clone();
    let api_prefix = config.api_prefix.clone();
    let config_data = Data::new(config);

    HttpServer::new(move || {
        let api_prefix = api_prefix.clone();
        let limiter = limiter.clone();
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(service.clone())
            .app_data(config_data.clone())
            .configure(move |cfg| routes::configure(cfg, &api_prefix, limiter))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
