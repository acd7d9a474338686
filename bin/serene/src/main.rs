//! # Serene Binary
//!
//! The entry point that assembles the site from the adapters enabled at
//! compile time.

use std::path::Path;
use std::sync::Arc;

use actix_files::Files;
use actix_web::{web, App, HttpServer};
use sb_api::middleware::{access_log, cors_policy, security_headers};
use sb_api::{configure_routes, AppState};
use sb_config::Settings;

#[cfg(feature = "store-memory")]
use sb_store_memory::MemoryDocumentStore;

#[cfg(feature = "auth-simple")]
use sb_auth_simple::SimpleIdentityProvider;

#[cfg(not(all(feature = "store-memory", feature = "auth-simple")))]
compile_error!("enable a document store feature and an identity provider feature");

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    env_logger::init_from_env(
        env_logger::Env::new().default_filter_or(settings.log_level.as_str()),
    );

    // 1. Document store
    #[cfg(feature = "store-memory")]
    let store = open_store(&settings.seed_path).await?;

    // 2. Identity provider
    #[cfg(feature = "auth-simple")]
    let auth = SimpleIdentityProvider::new();
    #[cfg(feature = "auth-simple")]
    if let (Some(email), Some(password)) = (&settings.admin_email, &settings.admin_password) {
        auth.register(email, password, Some("Serene admin"))?;
        log::info!("admin account {email} registered");
    }

    let state = web::Data::new(
        AppState::new(Arc::new(store), Arc::new(auth), settings.post_order)
            .with_admin(settings.admin_email.clone()),
    );

    let (host, port) = settings.bind_address();
    log::info!("Serene starting on http://{host}:{port} (post order: {:?})", settings.post_order);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors_policy())
            .wrap(security_headers())
            .wrap(access_log())
            .configure(configure_routes)
            .service(Files::new("/static", "./static"))
    })
    .bind((host, port))?
    .run()
    .await?;
    Ok(())
}

#[cfg(feature = "store-memory")]
async fn open_store(seed_path: &str) -> anyhow::Result<MemoryDocumentStore> {
    if Path::new(seed_path).exists() {
        MemoryDocumentStore::load(seed_path).await
    } else {
        log::warn!("seed file {seed_path} not found, starting with an empty store");
        Ok(MemoryDocumentStore::new())
    }
}
