use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::domain::user::{NewUser, User};
use crate::schema::users;

use super::models::{NewUserRow, UserRow};

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for DieselUserRepository {
    fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(users::table)
            .values(&NewUserRow {
                id: Uuid::new_v4(),
                username: user.username,
                email: user.email,
                password_hash: user.password_hash,
            })
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .map_err(|e| match DomainError::from(e) {
                DomainError::Conflict(_) => {
                    DomainError::Conflict("User already exists".to_string())
                }
                other => other,
            })?;
        Ok(row.into())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<(User, String)>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(|row| {
            let hash = row.password_hash.clone();
            (row.into(), hash)
        }))
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = users::table
            .find(id)
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(User::from))
    }

    fn count(&self) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(users::table.count().get_result(&mut conn)?)
    }
}
