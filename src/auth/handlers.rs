use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use time::{Duration, OffsetDateTime};
use tower_cookies::Cookies;
use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::session::{clear_session_cookie, SessionCtx, SessionRecord};
use crate::state::AppState;

use super::dto::{AckResponse, LoginRequest, NewPasswordRequest, PublicUser, ResetRequest, SignupRequest};
use super::repo::User;
use super::services::{generate_reset_token, hash_password, is_valid_email, verify_password};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/reset", post(request_reset))
        .route("/auth/reset/:token", get(check_reset))
        .route("/auth/new-password", post(new_password))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "signup with invalid email");
        return Err(AppError::Validation("Please enter a valid email.".into()));
    }
    if payload.password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters.".into(),
        ));
    }
    if payload.password != payload.confirm_password {
        return Err(AppError::Validation("Passwords have to match!".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "signup for taken email");
        return Err(AppError::EmailTaken);
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.email, &hash).await?;

    // No session is attached here; the client logs in explicitly.
    info!(user_id = %user.id, "user signed up");
    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

#[instrument(skip(state, ctx, payload))]
pub async fn login(
    State(state): State<AppState>,
    ctx: SessionCtx,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<PublicUser>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login for unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    SessionRecord::attach_user(&state.db, ctx.record.id, user.id).await?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state, cookies, ctx))]
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
    ctx: SessionCtx,
) -> Result<Json<AckResponse>, AppError> {
    let Some(user) = ctx.user.as_ref() else {
        return Err(AppError::NotAuthenticated);
    };

    SessionRecord::destroy(&state.db, ctx.record.id).await?;
    clear_session_cookie(&cookies, &state.config.session.cookie_name);

    info!(user_id = %user.id, "user logged out");
    Ok(Json(AckResponse { success: true }))
}

#[instrument(skip(state, payload))]
pub async fn request_reset(
    State(state): State<AppState>,
    Json(mut payload): Json<ResetRequest>,
) -> Result<Json<AckResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown addresses get the same answer as known ones.
    if let Some(user) = User::find_by_email(&state.db, &payload.email).await? {
        let token = generate_reset_token();
        let expiry =
            OffsetDateTime::now_utc() + Duration::minutes(state.config.reset_ttl_minutes);
        User::set_reset_token(&state.db, user.id, &token, expiry).await?;

        let reset_url = format!("{}/auth/reset/{}", state.config.base_url, token);
        state.mailer.send_password_reset(&user.email, &reset_url).await?;

        info!(user_id = %user.id, "password reset requested");
    }

    Ok(Json(AckResponse { success: true }))
}

#[instrument(skip(state, token))]
pub async fn check_reset(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<AckResponse>, AppError> {
    User::find_by_live_reset_token(&state.db, &token)
        .await?
        .ok_or(AppError::ResetTokenInvalid)?;
    Ok(Json(AckResponse { success: true }))
}

#[instrument(skip(state, payload))]
pub async fn new_password(
    State(state): State<AppState>,
    Json(payload): Json<NewPasswordRequest>,
) -> Result<Json<AckResponse>, AppError> {
    if payload.password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters.".into(),
        ));
    }

    let hash = hash_password(&payload.password)?;
    if !User::complete_password_reset(&state.db, &payload.token, &hash).await? {
        warn!("reset completion with dead token");
        return Err(AppError::ResetTokenInvalid);
    }

    // No auto-login; the user signs in with the new password.
    info!("password reset completed");
    Ok(Json(AckResponse { success: true }))
}
