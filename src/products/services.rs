//! Create, edit and delete flows that keep product rows and stored image
//! files in step with each other.

use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

use super::dto::ValidatedProduct;
use super::repo::Product;

/// Image first, record second: a failed store aborts before any row exists,
/// and a failed insert leaves at worst an orphaned file, never a row that
/// points at nothing.
pub async fn create_product(
    state: &AppState,
    owner_id: Uuid,
    fields: ValidatedProduct,
) -> Result<Product, AppError> {
    let Some(image) = fields.image else {
        return Err(AppError::Validation("Attached file is not an image.".into()));
    };

    let image_url = state
        .images
        .store(image.body, &image.file_name, &image.content_type)
        .await?;

    match Product::insert(
        &state.db,
        owner_id,
        &fields.title,
        fields.price,
        &fields.description,
        &image_url,
    )
    .await
    {
        Ok(product) => Ok(product),
        Err(e) => {
            if let Err(del) = state.images.delete(&image_url).await {
                warn!(error = %del, %image_url, "orphaned image left after failed insert");
            }
            Err(e.into())
        }
    }
}

/// The old file is only removed once the row points at the new one; if the
/// row update fails, the new file is cleaned up and the old state stays
/// fully intact.
pub async fn update_product(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
    fields: ValidatedProduct,
) -> Result<Product, AppError> {
    let product = Product::find_by_id(&state.db, product_id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    if product.owner_id != user_id {
        return Err(AppError::NotOwner);
    }

    match fields.image {
        Some(image) => {
            let new_url = state
                .images
                .store(image.body, &image.file_name, &image.content_type)
                .await?;

            let updated = match Product::update(
                &state.db,
                product.id,
                &fields.title,
                fields.price,
                &fields.description,
                &new_url,
            )
            .await
            {
                Ok(updated) => updated,
                Err(e) => {
                    if let Err(del) = state.images.delete(&new_url).await {
                        warn!(error = %del, image_url = %new_url, "orphaned image left after failed update");
                    }
                    return Err(e.into());
                }
            };

            if let Err(e) = state.images.delete(&product.image_url).await {
                warn!(error = %e, image_url = %product.image_url, "old image left behind after replace");
            }
            Ok(updated)
        }
        None => {
            let updated = Product::update(
                &state.db,
                product.id,
                &fields.title,
                fields.price,
                &fields.description,
                &product.image_url,
            )
            .await?;
            Ok(updated)
        }
    }
}

/// A file that will not delete must not keep the record alive; the reverse,
/// a record pointing at a deleted file, is the case this ordering avoids.
pub async fn delete_product(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<(), AppError> {
    let product = Product::find_by_id(&state.db, product_id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    if product.owner_id != user_id {
        return Err(AppError::NotOwner);
    }

    if let Err(e) = state.images.delete(&product.image_url).await {
        warn!(error = %e, image_url = %product.image_url, "image delete failed; removing record anyway");
    }
    Product::delete(&state.db, product.id).await?;
    Ok(())
}
