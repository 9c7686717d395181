//! User repository for PostgreSQL

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::{CreateOutcome, UserStore};
use crate::models::{NewUser, Role, User, normalize_email};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, totp_secret, totp_enabled, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> DatabaseResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("User schema migrations applied");
        Ok(())
    }
}

fn row_to_user(row: &PgRow) -> DatabaseResult<User> {
    let role: String = row.try_get("role").map_err(DatabaseError::Query)?;

    Ok(User {
        id: row.try_get("id").map_err(DatabaseError::Query)?,
        name: row.try_get("name").map_err(DatabaseError::Query)?,
        email: row.try_get("email").map_err(DatabaseError::Query)?,
        password_hash: row.try_get("password_hash").map_err(DatabaseError::Query)?,
        role: role.parse::<Role>().map_err(DatabaseError::CorruptRow)?,
        totp_secret: row.try_get("totp_secret").map_err(DatabaseError::Query)?,
        totp_enabled: row.try_get("totp_enabled").map_err(DatabaseError::Query)?,
        created_at: row.try_get("created_at").map_err(DatabaseError::Query)?,
        updated_at: row.try_get("updated_at").map_err(DatabaseError::Query)?,
    })
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn create_or_conflict(&self, new_user: &NewUser) -> DatabaseResult<CreateOutcome> {
        info!("Creating new user: {}", new_user.email);

        // The unique index on LOWER(email) turns a lost race into zero returned rows.
        let query = format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(new_user.name.trim())
            .bind(normalize_email(&new_user.email))
            .bind(&new_user.password_hash)
            .bind(Role::User.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query);

        match row {
            Ok(Some(row)) => Ok(CreateOutcome::Created(row_to_user(&row)?)),
            Ok(None) => Ok(CreateOutcome::Conflict { field: "email" }),
            Err(e) if e.is_unique_violation() => Ok(CreateOutcome::Conflict { field: "email" }),
            Err(e) => Err(e),
        }
    }

    async fn update_totp(
        &self,
        id: Uuid,
        secret: Option<&str>,
        enabled: bool,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET totp_secret = $1, totp_enabled = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(secret)
        .bind(enabled)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() == 1)
    }
}
