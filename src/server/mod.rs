//! Thin actix-web layer over the library. Images travel as base64 inside JSON
//! bodies; every route answers with the `{code, message, data}` envelope.

pub mod response;
pub mod routes;
pub mod segment;

use std::sync::Arc;

use actix_web::{error::InternalError, middleware::Logger, web, App, HttpResponse, HttpServer};

use crate::config::Config;
use crate::error::{Result, RoomGenError};
use crate::storage::ImageStorageManager;
use crate::upstream::UpstreamContext;
use response::ApiResponse;

/// Base64 of a 10 MiB reference image plus the other form fields.
const JSON_BODY_LIMIT: usize = 16 * 1024 * 1024;

pub struct AppState {
    pub config: Arc<Config>,
    pub upstream: UpstreamContext,
    pub storage: Arc<ImageStorageManager>,
}

impl AppState {
    pub fn new(config: Config, upstream: UpstreamContext, storage: ImageStorageManager) -> Self {
        Self {
            config: Arc::new(config),
            upstream,
            storage: Arc::new(storage),
        }
    }
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err, _req| {
            let message = format!("Invalid request body: {}", err);
            InternalError::from_response(err, HttpResponse::BadRequest().json(ApiResponse::error(message)))
                .into()
        })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config()).configure(routes::configure_routes);
}

pub async fn run(state: AppState) -> Result<()> {
    let bind_addr = format!("0.0.0.0:{}", state.config.server_port());
    let state = web::Data::new(state);

    log::info!("🌐 Starting HTTP server on {}", bind_addr);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(configure)
    })
    .bind(&bind_addr)
    .map_err(|e| RoomGenError::ConfigError(format!("Failed to bind {}: {}", bind_addr, e)))?
    .run();

    server
        .await
        .map_err(|e| RoomGenError::InternalError(format!("Server error: {}", e)))?;

    log::info!("👋 HTTP server stopped");
    Ok(())
}
