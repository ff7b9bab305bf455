use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod documents;
mod error;
mod model;
mod models;
mod routes;
mod store;
mod utils;
mod workflow;

use config::{Config, StoreBackend};
use db::init_db;

use crate::auth::password::hash_password;
use crate::docs::ApiDoc;
use crate::documents::LocalDocumentStorage;
use crate::model::{role::Role, user::NewUser};
use crate::routes::Limiters;
use crate::store::{Store, memory::MemoryStore, mysql::MySqlStore};
use crate::utils::employee_cache;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Attendance desk is running"
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    match config.store_backend {
        StoreBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = init_db(url, config.db_max_connections).await?;

            let pool_for_cache_warmup = pool.clone();
            actix_web::rt::spawn(async move {
                if let Err(e) = employee_cache::warmup_employee_cache(&pool_for_cache_warmup, 250).await {
                    error!(error = %e, "Failed to warmup employee cache");
                }
            });

            Ok(Arc::new(MySqlStore::new(pool)))
        }
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Creates the ADMIN_USERNAME account on first start.
async fn seed_admin(store: &dyn Store, config: &Config) -> anyhow::Result<()> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        if config.store_backend == StoreBackend::Memory {
            warn!("Memory store without ADMIN_USERNAME/ADMIN_PASSWORD; nobody can log in");
        }
        return Ok(());
    };
    if store.find_user(username).await?.is_some() {
        return Ok(());
    }

    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {e}"))?;
    store
        .insert_user(&NewUser {
            username: username.clone(),
            password_hash,
            role: Role::Admin,
            employee_id: None,
        })
        .await?;
    info!(username = %username, "Seeded admin account");
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(backend = config.store_backend.as_ref(), "Server starting...");

    let store = build_store(&config).await?;
    seed_admin(store.as_ref(), &config).await?;
    let limiters = Limiters::from_config(&config)?;
    let documents = Data::new(LocalDocumentStorage::new(&config.document_dir));
    let store = Data::from(store);
    let config_data = Data::new(config.clone());
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        let config = config.clone();
        let limiters = limiters.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(store.clone())
            .app_data(documents.clone())
            .app_data(config_data.clone())
            .service(index)
            // Configure auth + protected routes with rate limiting
            .configure(move |cfg| routes::configure(cfg, &config, limiters))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
