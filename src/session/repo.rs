use rand::{distributions::Alphanumeric, Rng};
use sqlx::{FromRow, PgPool};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Server-side session row. The cookie only ever carries the id.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub csrf_token: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// Anti-forgery token tied to one session for its whole lifetime.
pub fn generate_csrf_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

impl SessionRecord {
    /// Allocate a fresh anonymous session.
    pub async fn create(db: &PgPool, ttl_minutes: i64) -> anyhow::Result<SessionRecord> {
        let expires_at = OffsetDateTime::now_utc() + Duration::minutes(ttl_minutes);
        let session = sqlx::query_as::<_, SessionRecord>(
            r#"
            INSERT INTO sessions (id, csrf_token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, csrf_token, created_at, expires_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(generate_csrf_token())
        .bind(expires_at)
        .fetch_one(db)
        .await?;
        Ok(session)
    }

    /// Look up a session that is still inside its inactivity window.
    pub async fn find_live(db: &PgPool, id: Uuid) -> anyhow::Result<Option<SessionRecord>> {
        let session = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT id, user_id, csrf_token, created_at, expires_at
            FROM sessions
            WHERE id = $1 AND expires_at > now()
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(session)
    }

    /// Slide the inactivity window forward.
    pub async fn touch(db: &PgPool, id: Uuid, ttl_minutes: i64) -> anyhow::Result<()> {
        let expires_at = OffsetDateTime::now_utc() + Duration::minutes(ttl_minutes);
        sqlx::query(r#"UPDATE sessions SET expires_at = $2 WHERE id = $1"#)
            .bind(id)
            .bind(expires_at)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Mark the session as belonging to a verified user. Only called after
    /// password verification has succeeded.
    pub async fn attach_user(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE sessions SET user_id = $2 WHERE id = $1"#)
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Remove the row entirely so a captured session id cannot be replayed.
    pub async fn destroy(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM sessions WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn delete_expired(db: &PgPool) -> anyhow::Result<u64> {
        let result = sqlx::query(r#"DELETE FROM sessions WHERE expires_at <= now()"#)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csrf_tokens_are_long_and_unique() {
        let a = generate_csrf_token();
        let b = generate_csrf_token();
        assert_eq!(a.len(), 48);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
