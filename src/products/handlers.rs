use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::session::RequireUser;
use crate::state::AppState;

use super::dto::{ProductForm, ProductResponse};
use super::repo::Product;
use super::services;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/:id", put(edit_product).delete(delete_product))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
}

#[instrument(skip(state, user))]
pub async fn list_products(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let products = Product::list_by_owner(&state.db, user.id).await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

#[instrument(skip(state, user))]
pub async fn get_product(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = Product::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    if product.owner_id != user.id {
        return Err(AppError::NotOwner);
    }
    Ok(Json(product.into()))
}

#[instrument(skip(state, user, mp))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    mp: Multipart,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let fields = ProductForm::from_multipart(mp).await?.validate()?;
    let product = services::create_product(&state, user.id, fields).await?;

    info!(product_id = %product.id, owner_id = %user.id, "product created");
    Ok((StatusCode::CREATED, Json(product.into())))
}

#[instrument(skip(state, user, mp))]
pub async fn edit_product(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> Result<Json<ProductResponse>, AppError> {
    let fields = ProductForm::from_multipart(mp).await?.validate()?;
    let product = services::update_product(&state, user.id, id, fields).await?;

    info!(product_id = %product.id, owner_id = %user.id, "product updated");
    Ok(Json(product.into()))
}

#[instrument(skip(state, user))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_product(&state, user.id, id).await?;

    info!(product_id = %id, owner_id = %user.id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}
