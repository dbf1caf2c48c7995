use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use carpool_core::repository::UserRepository;
use carpool_core::{ConflictKind, CoreResult};
use carpool_shared::{Masked, Role, User};

use crate::error::{map_insert_error, StoreError};

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| StoreError::CorruptRow(format!("user {} has role {}", row.id, row.role)))?;
        Ok(User {
            id: row.id,
            username: row.username,
            email: Masked(row.email),
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, updated_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: &User) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(user.email.expose())
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_insert_error(e, |constraint| match constraint {
                "users_username_key" => Some(ConflictKind::DuplicateUsername(user.username.clone())),
                "users_email_key" => Some(ConflictKind::DuplicateEmail),
                _ => None,
            })
        })?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(row.map(User::try_from).transpose()?)
    }

    async fn find_by_username(&self, username: &str) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(row.map(User::try_from).transpose()?)
    }

    async fn usernames(&self, ids: &[Uuid]) -> CoreResult<HashMap<Uuid, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, username FROM users WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::from)?;

        Ok(rows.into_iter().collect())
    }
}
