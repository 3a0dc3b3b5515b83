use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::order_service::OrderService;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// `connected` or `disconnected`
    pub database: String,
}

/// GET /health
///
/// Always answers 200; a failed database ping only shows in `database`.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "health"
)]
pub async fn health(service: web::Data<OrderService>) -> HttpResponse {
    let database = match web::block(move || service.ping()).await {
        Ok(Ok(())) => "connected",
        Ok(Err(e)) => {
            log::warn!("Health check database ping failed: {e}");
            "disconnected"
        }
        Err(e) => {
            log::warn!("Health check could not run: {e}");
            "disconnected"
        }
    };
    HttpResponse::Ok().json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        database: database.to_string(),
    })
}
