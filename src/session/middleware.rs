use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::auth::repo::User;
use crate::error::AppError;
use crate::state::AppState;

use super::extract::SessionCtx;
use super::repo::SessionRecord;

/// Header carrying the anti-forgery token on state-changing requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// First pipeline stage: every request gets a session. A valid cookie maps
/// to its live row (window slid forward); anything else gets a fresh
/// anonymous row and a new cookie. The resolved context is placed in request
/// extensions for the stages behind it.
pub async fn resolve_session(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let cookie_name = state.config.session.cookie_name.clone();
    let ttl = state.config.session.ttl_minutes;

    let presented = cookies
        .get(&cookie_name)
        .and_then(|c| Uuid::parse_str(c.value()).ok());

    let existing = match presented {
        Some(id) => SessionRecord::find_live(&state.db, id).await?,
        None => None,
    };

    let record = match existing {
        Some(record) => {
            SessionRecord::touch(&state.db, record.id, ttl).await?;
            record
        }
        None => {
            let record = SessionRecord::create(&state.db, ttl).await?;
            cookies.add(session_cookie(&cookie_name, &record.id.to_string()));
            record
        }
    };

    // A session can outlive its user; that is an anonymous session, not an
    // error.
    let user = match record.user_id {
        Some(user_id) => User::find_by_id(&state.db, user_id).await?,
        None => None,
    };

    req.extensions_mut().insert(SessionCtx { record, user });
    Ok(next.run(req).await)
}

/// Second pipeline stage: state-changing methods must present the token of
/// the session they ride on. Read-only methods pass through.
pub async fn require_csrf(req: Request, next: Next) -> Result<Response, AppError> {
    if req.method().is_safe() {
        return Ok(next.run(req).await);
    }

    let ctx = req.extensions().get::<SessionCtx>().ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("session middleware not installed"))
    })?;

    let supplied = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok());

    match supplied {
        Some(token) if token == ctx.record.csrf_token => Ok(next.run(req).await),
        _ => Err(AppError::InvalidCsrf),
    }
}

fn session_cookie(name: &str, value: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), value.to_string()))
        .path("/")
        .http_only(true)
        .build()
}

/// Expire the cookie on the client after the server-side row is gone.
pub fn clear_session_cookie(cookies: &Cookies, name: &str) {
    let cookie = Cookie::build((name.to_string(), String::new()))
        .path("/")
        .http_only(true)
        .max_age(tower_cookies::cookie::time::Duration::ZERO)
        .build();
    cookies.add(cookie);
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::{get, post};
    use axum::{Extension, Router};
    use time::{Duration, OffsetDateTime};
    use tower::ServiceExt;

    fn anonymous_ctx(token: &str) -> SessionCtx {
        let now = OffsetDateTime::now_utc();
        SessionCtx {
            record: SessionRecord {
                id: Uuid::new_v4(),
                user_id: None,
                csrf_token: token.into(),
                created_at: now,
                expires_at: now + Duration::minutes(60),
            },
            user: None,
        }
    }

    /// Stand-in for the full pipeline: the extension layer plays the part of
    /// resolve_session.
    fn guarded_app(token: &str) -> Router {
        Router::new()
            .route("/submit", post(|| async { "ok" }))
            .route("/view", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(require_csrf))
            .layer(Extension(anonymous_ctx(token)))
    }

    #[tokio::test]
    async fn state_changing_requests_without_a_token_are_rejected() {
        let res = guarded_app("tok-1")
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/submit")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn the_session_token_is_accepted() {
        let res = guarded_app("tok-1")
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/submit")
                    .header(CSRF_HEADER, "tok-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn a_token_from_another_session_is_rejected() {
        let res = guarded_app("tok-1")
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/submit")
                    .header(CSRF_HEADER, "tok-2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn read_only_requests_are_exempt() {
        let res = guarded_app("tok-1")
            .oneshot(
                HttpRequest::builder()
                    .uri("/view")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
