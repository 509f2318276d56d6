use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expiry: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, reset_token, reset_token_expiry, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, reset_token, reset_token_expiry, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create(db: &PgPool, email: &str, password_hash: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, reset_token, reset_token_expiry, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Open a reset window. Token and expiry are always written together.
    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expiry: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"UPDATE users SET reset_token = $2, reset_token_expiry = $3 WHERE id = $1"#,
        )
        .bind(id)
        .bind(token)
        .bind(expiry)
        .execute(db)
        .await?;
        Ok(())
    }

    /// A token only matches while the current time is strictly before its
    /// expiry.
    pub async fn find_by_live_reset_token(
        db: &PgPool,
        token: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, reset_token, reset_token_expiry, created_at
            FROM users
            WHERE reset_token = $1 AND reset_token_expiry > now()
            "#,
        )
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// One write sets the new hash and clears the token pair, so a consumed
    /// or expired token can never be replayed. Returns false when the token
    /// matched nothing live.
    pub async fn complete_password_reset(
        db: &PgPool,
        token: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, reset_token = NULL, reset_token_expiry = NULL
            WHERE reset_token = $2 AND reset_token_expiry > now()
            "#,
        )
        .bind(password_hash)
        .bind(token)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
