//! Admin accounts and session tokens.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::parse::{check_len, non_blank};
use crate::domain::ports::UserRepository;
use crate::domain::user::{NewUser, User};

use super::token::{Claims, IssuedToken, TokenError, TokenSigner};

const MIN_PASSWORD_LEN: usize = 8;
const USERNAME_MAX: usize = 100;
const EMAIL_MAX: usize = 255;

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A signed-in admin.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: IssuedToken,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    signer: TokenSigner,
    allow_registration: bool,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        signer: TokenSigner,
        allow_registration: bool,
    ) -> Self {
        Self {
            users,
            signer,
            allow_registration,
        }
    }

    pub fn token_ttl(&self) -> Duration {
        self.signer.ttl()
    }

    /// Registration is open while no admin exists, and afterwards only when
    /// explicitly enabled.
    pub fn register(&self, registration: Registration) -> Result<User, DomainError> {
        let username = non_blank(registration.username.as_deref());
        let email = non_blank(registration.email.as_deref());
        let password = registration.password.as_deref().filter(|p| !p.is_empty());
        let (Some(username), Some(email), Some(password)) = (username, email, password) else {
            return Err(DomainError::validation(
                "Username, email and password are required",
            ));
        };
        if !email.contains('@') {
            return Err(DomainError::validation("A valid email is required"));
        }
        check_len("username", username, USERNAME_MAX)?;
        check_len("email", email, EMAIL_MAX)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if !self.allow_registration && self.users.count()? > 0 {
            return Err(DomainError::Forbidden("Registration is closed".to_string()));
        }

        let user = self.users.create(NewUser {
            username: username.to_string(),
            email: email.to_lowercase(),
            password_hash: hash_password(password)?,
        })?;
        log::info!("Admin registered: {}", user.email);
        Ok(user)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session, DomainError> {
        let invalid = || DomainError::Unauthorized("Invalid credentials".to_string());
        let (user, hash) = self
            .users
            .find_by_email(&email.trim().to_lowercase())?
            .ok_or_else(invalid)?;
        if !verify_password(password, &hash) {
            log::warn!("Failed login for {}", user.email);
            return Err(invalid());
        }
        log::info!("Admin logged in: {}", user.email);
        let token = self.signer.issue(user.id, Utc::now());
        Ok(Session { user, token })
    }

    /// Issues a fresh token for a still-existing admin.
    pub fn refresh(&self, subject: Uuid) -> Result<Session, DomainError> {
        let user = self
            .users
            .find_by_id(subject)?
            .ok_or_else(|| DomainError::Unauthorized("Account no longer exists".to_string()))?;
        let token = self.signer.issue(user.id, Utc::now());
        Ok(Session { user, token })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, DomainError> {
        self.signer.verify(token, Utc::now()).map_err(|e| {
            DomainError::Unauthorized(
                match e {
                    TokenError::Expired => "Session expired, please log in again",
                    TokenError::Malformed | TokenError::BadSignature => {
                        "Not authorized, token failed"
                    }
                }
                .to_string(),
            )
        })
    }
}

fn hash_password(password: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
