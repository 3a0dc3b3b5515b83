use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use uuid::Uuid;

use crate::application::auth_service::AuthService;
use crate::errors::AppError;

/// Cookie carrying the session token for browser clients.
pub const TOKEN_COOKIE: &str = "token";

/// An authenticated admin. Extracting it rejects the request with 401 unless
/// a valid token arrives as a bearer header or in the `token` cookie.
#[derive(Debug, Clone, Copy)]
pub struct AdminSession {
    pub user_id: Uuid,
}

impl FromRequest for AdminSession {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AdminSession, AppError> {
    let auth = req
        .app_data::<web::Data<AuthService>>()
        .ok_or_else(|| AppError::Internal("auth service is not configured".to_string()))?;
    let token = bearer_token(req)
        .or_else(|| req.cookie(TOKEN_COOKIE).map(|c| c.value().to_string()))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".to_string()))?;
    let claims = auth.verify(&token)?;
    Ok(AdminSession {
        user_id: claims.sub,
    })
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
}
