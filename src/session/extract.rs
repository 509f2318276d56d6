use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::repo::User;
use crate::error::AppError;

use super::repo::SessionRecord;

/// Per-request context produced by the resolve-session middleware: the
/// session row plus the user it resolves to, if any. Absence of a user is a
/// valid state, not an error.
#[derive(Debug, Clone)]
pub struct SessionCtx {
    pub record: SessionRecord,
    pub user: Option<User>,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionCtx
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionCtx>()
            .cloned()
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("session middleware not installed"))
            })
    }
}

/// Rejects anonymous requests and yields the authenticated user.
#[derive(Debug)]
pub struct RequireUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = SessionCtx::from_request_parts(parts, state).await?;
        ctx.user.map(RequireUser).ok_or(AppError::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::{Extension, Router};
    use time::{Duration, OffsetDateTime};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn ctx(user: Option<User>) -> SessionCtx {
        let now = OffsetDateTime::now_utc();
        SessionCtx {
            record: SessionRecord {
                id: Uuid::new_v4(),
                user_id: user.as_ref().map(|u| u.id),
                csrf_token: "tok".into(),
                created_at: now,
                expires_at: now + Duration::minutes(60),
            },
            user,
        }
    }

    fn seller() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            password_hash: "hash".into(),
            reset_token: None,
            reset_token_expiry: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    async fn whoami(RequireUser(user): RequireUser) -> String {
        user.email
    }

    fn app(ctx: SessionCtx) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(Extension(ctx))
    }

    #[tokio::test]
    async fn anonymous_sessions_are_denied() {
        let res = app(ctx(None))
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticated_sessions_resolve_their_user() {
        let res = app(ctx(Some(seller())))
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"a@x.com");
    }
}
