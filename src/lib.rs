pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod openapi;
pub mod schema;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use actix_web::middleware::{from_fn, Condition, Logger};
use actix_web::{web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use thiserror::Error;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::auth_service::AuthService;
use application::catalog_service::CatalogService;
use application::order_service::{OrderService, OrderSettings};
use application::token::TokenSigner;
use config::{AppConfig, ConfigError};
use errors::{expose_internal_errors, AppError};
use handlers::media::MediaMount;
use handlers::users::CookieSettings;
use infrastructure::media_store::FsMediaStore;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::product_repo::DieselProductRepository;
use infrastructure::user_repo::DieselUserRepository;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("failed to run migrations: {0}")]
    Migrations(String),
    #[error("JWT_SECRET cannot be used as a signing key")]
    SigningKey,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), StartupError> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StartupError::Migrations(e.to_string()))?;
    if !applied.is_empty() {
        log::info!("Applied {} migration(s)", applied.len());
    }
    Ok(())
}

/// Services shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub orders: web::Data<OrderService>,
    pub catalog: web::Data<CatalogService>,
    pub auth: web::Data<AuthService>,
    pub cookies: web::Data<CookieSettings>,
    pub media: Option<MediaMount>,
    /// Echo internal error details in 500 bodies.
    pub detailed_errors: bool,
}

impl AppState {
    pub fn build(pool: DbPool, config: &AppConfig) -> Result<Self, StartupError> {
        std::fs::create_dir_all(&config.media_root)?;
        let products = Arc::new(DieselProductRepository::new(pool.clone()));
        let orders = Arc::new(DieselOrderRepository::new(pool.clone()));
        let users = Arc::new(DieselUserRepository::new(pool));
        let media = Arc::new(FsMediaStore::new(
            config.media_root.clone(),
            &config.media_base_url,
        ));

        let signer = TokenSigner::new(
            config.jwt_secret.as_bytes(),
            chrono::Duration::hours(config.token_ttl_hours),
        )
        .map_err(|_| StartupError::SigningKey)?;

        let catalog = CatalogService::new(products, media.clone());
        let order_service = OrderService::new(
            orders,
            catalog.clone(),
            media,
            OrderSettings {
                tracking_prefix: config.tracking_prefix.clone(),
                status_policy: config.status_policy,
            },
        );
        let auth = AuthService::new(users, signer, config.allow_registration);

        Ok(AppState {
            orders: web::Data::new(order_service),
            catalog: web::Data::new(catalog),
            auth: web::Data::new(auth),
            cookies: web::Data::new(CookieSettings {
                secure: config.production,
            }),
            media: config.media_mount.clone().map(|path| MediaMount {
                path,
                root: config.media_root.clone(),
            }),
            detailed_errors: !config.production,
        })
    }

    fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.orders.clone())
            .app_data(self.catalog.clone())
            .app_data(self.auth.clone())
            .app_data(self.cookies.clone());
        if let Some(media) = &self.media {
            media.configure(cfg);
        }
    }
}

/// Extractor error handlers plus every route: `/api/...` and `/health`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        log::debug!("Rejected JSON body: {err}");
        AppError::BadRequest("Invalid JSON data in request".to_string()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid path parameter: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid query string: {err}")).into()
    }))
    .service(
        web::scope("/api")
            .configure(handlers::orders::configure)
            .configure(handlers::products::configure)
            .configure(handlers::users::configure),
    )
    .route("/health", web::get().to(handlers::health::health));
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = openapi::ApiDoc::openapi();
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Condition::new(
                state.detailed_errors,
                from_fn(expose_internal_errors),
            ))
            .wrap(Logger::default())
            .configure(|cfg| state.register(cfg))
            .configure(configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
