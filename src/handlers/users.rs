use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::auth_service::{AuthService, Registration, Session};
use crate::errors::AppError;

use super::auth::{AdminSession, TOKEN_COOKIE};

/// Attributes of the session cookie that depend on the deployment.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieSettings {
    pub secure: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub success: bool,
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub message: String,
}

fn session_cookie(
    value: String,
    max_age: CookieDuration,
    settings: CookieSettings,
) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(settings.secure)
        .max_age(max_age)
        .finish()
}

fn session_response(
    session: Session,
    settings: CookieSettings,
    ttl_seconds: i64,
    message: &str,
) -> HttpResponse {
    let cookie = session_cookie(
        session.token.token.clone(),
        CookieDuration::seconds(ttl_seconds),
        settings,
    );
    HttpResponse::Ok().cookie(cookie).json(SessionResponse {
        success: true,
        id: session.user.id,
        username: session.user.username,
        email: session.user.email,
        token: session.token.token,
        expires_at: session.token.expires_at,
        message: message.to_string(),
    })
}

/// POST /api/users/register
///
/// Open while no admin exists; afterwards only with `ALLOW_REGISTRATION=true`.
#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Admin registered", body = UserResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Registration is closed"),
        (status = 409, description = "User already exists"),
    ),
    tag = "users"
)]
pub async fn register(
    service: web::Data<AuthService>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let registration = Registration {
        username: body.username,
        email: body.email,
        password: body.password,
    };
    let user = web::block(move || service.register(registration)).await??;
    Ok(HttpResponse::Created().json(UserResponse {
        success: true,
        id: user.id,
        username: user.username,
        email: user.email,
        message: "User registered successfully".to_string(),
    }))
}

/// POST /api/users/login
///
/// Returns the token and also sets it as an HTTP-only cookie.
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "users"
)]
pub async fn login(
    service: web::Data<AuthService>,
    settings: web::Data<CookieSettings>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let LoginRequest { email, password } = body.into_inner();
    let (Some(email), Some(password)) = (email, password) else {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    };
    let ttl = service.token_ttl().num_seconds();
    let session = web::block(move || service.login(&email, &password)).await??;
    Ok(session_response(session, **settings, ttl, "Login successful"))
}

/// POST /api/users/logout
#[utoipa::path(
    post,
    path = "/api/users/logout",
    responses((status = 200, description = "Cookie cleared")),
    tag = "users"
)]
pub async fn logout(settings: web::Data<CookieSettings>) -> HttpResponse {
    let cookie = session_cookie(String::new(), CookieDuration::ZERO, **settings);
    HttpResponse::Ok().cookie(cookie).json(serde_json::json!({
        "success": true,
        "message": "Logged out successfully"
    }))
}

/// POST /api/users/refresh
#[utoipa::path(
    post,
    path = "/api/users/refresh",
    responses(
        (status = 200, description = "Fresh token issued", body = SessionResponse),
        (status = 401, description = "Not signed in or session expired"),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn refresh(
    admin: AdminSession,
    service: web::Data<AuthService>,
    settings: web::Data<CookieSettings>,
) -> Result<HttpResponse, AppError> {
    let ttl = service.token_ttl().num_seconds();
    let session = web::block(move || service.refresh(admin.user_id)).await??;
    Ok(session_response(session, **settings, ttl, "Session refreshed"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/refresh", web::post().to(refresh)),
    );
}
