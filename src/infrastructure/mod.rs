pub mod media_store;
pub mod models;
pub mod order_repo;
pub mod product_repo;
pub mod user_repo;

use diesel::result::DatabaseErrorKind;

use crate::domain::errors::DomainError;

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                DomainError::Conflict(info.message().to_string())
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

/// Parses a value the database is expected to hold in canonical form.
fn stored<T>(column: &str, raw: &str) -> Result<T, DomainError>
where
    T: std::str::FromStr<Err = DomainError>,
{
    raw.parse()
        .map_err(|_| DomainError::Internal(format!("unexpected {column} '{raw}' in database")))
}
