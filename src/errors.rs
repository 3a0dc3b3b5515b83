use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::Next;
use actix_web::HttpResponse;
use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(_) | DomainError::InsufficientStock { .. } => {
                AppError::BadRequest(e.to_string())
            }
            DomainError::NotFound(msg) => AppError::NotFound(msg),
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::Unauthorized(msg) => AppError::Unauthorized(msg),
            DomainError::Forbidden(msg) => AppError::Forbidden(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Internal details are logged, never sent; see [`expose_internal_errors`].
    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Internal(detail) => {
                log::error!("Request failed: {detail}");
                internal_body(None)
            }
            other => json!({
                "success": false,
                "message": other.to_string()
            }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

fn internal_body(detail: Option<&str>) -> Value {
    let mut body = json!({
        "success": false,
        "message": "Internal server error"
    });
    if let Some(detail) = detail {
        body["error"] = Value::from(detail);
    }
    body
}

/// Middleware that adds the detail of an [`AppError::Internal`] to its 500
/// body as `error`. Installed outside production only.
pub async fn expose_internal_errors<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, actix_web::Error> {
    let res = next.call(req).await?;
    let detail = match res.response().error().and_then(|e| e.as_error::<AppError>()) {
        Some(AppError::Internal(detail)) => detail.clone(),
        _ => return Ok(res.map_into_left_body()),
    };
    let response = HttpResponse::build(res.status()).json(internal_body(Some(&detail)));
    Ok(res.into_response(response).map_into_right_body())
}
