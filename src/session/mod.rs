use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::instrument;

use crate::auth::dto::PublicUser;
use crate::state::AppState;

mod extract;
mod middleware;
mod repo;

pub use extract::{RequireUser, SessionCtx};
pub use middleware::{clear_session_cookie, require_csrf, resolve_session, CSRF_HEADER};
pub use repo::SessionRecord;

pub fn router() -> Router<AppState> {
    Router::new().route("/session", get(session_context))
}

/// What the rendering layer needs to know about the caller: whether it is
/// authenticated, as whom, and which CSRF token to embed in forms.
#[derive(Debug, Serialize)]
pub struct SessionContext {
    pub authenticated: bool,
    pub csrf_token: String,
    pub user: Option<PublicUser>,
}

#[instrument(skip(ctx))]
async fn session_context(ctx: SessionCtx) -> Json<SessionContext> {
    Json(SessionContext {
        authenticated: ctx.user.is_some(),
        csrf_token: ctx.record.csrf_token.clone(),
        user: ctx.user.map(PublicUser::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_context_serializes_csrf_token_for_forms() {
        let context = SessionContext {
            authenticated: false,
            csrf_token: "tok123".into(),
            user: None,
        };
        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(json["authenticated"], false);
        assert_eq!(json["csrf_token"], "tok123");
        assert!(json["user"].is_null());
    }
}
