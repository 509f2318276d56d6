use axum::extract::Multipart;
use bytes::Bytes;
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::storage::ext_for_image;

use super::repo::Product;

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub description: String,
    pub image_url: String,
    pub created_at: OffsetDateTime,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            title: p.title,
            price: p.price,
            description: p.description,
            image_url: p.image_url,
            created_at: p.created_at,
        }
    }
}

/// An upload that passed the image allow-list.
#[derive(Debug)]
pub struct ImageUpload {
    pub body: Bytes,
    pub file_name: String,
    pub content_type: String,
}

/// Raw fields collected from the create/edit multipart form.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub title: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageUpload>,
}

impl ProductForm {
    pub async fn from_multipart(mut mp: Multipart) -> Result<Self, AppError> {
        let mut form = ProductForm::default();
        while let Some(field) = mp
            .next_field()
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?
        {
            let name = field.name().map(|s| s.to_string());
            match name.as_deref() {
                Some("title") => form.title = Some(read_text(field).await?),
                Some("price") => form.price = Some(read_text(field).await?),
                Some("description") => form.description = Some(read_text(field).await?),
                Some("image") => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let file_name = field.file_name().unwrap_or("upload").to_string();
                    let body = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(e.to_string()))?;
                    // A disallowed type is treated as if no file was sent.
                    if ext_for_image(&content_type).is_some() {
                        form.image = Some(ImageUpload {
                            body,
                            file_name,
                            content_type,
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(form)
    }

    pub fn validate(self) -> Result<ValidatedProduct, AppError> {
        let title = self.title.map(|t| t.trim().to_string()).unwrap_or_default();
        if title.len() < 3 {
            return Err(AppError::Validation(
                "Title must have at least 3 characters.".into(),
            ));
        }

        let price: Decimal = self
            .price
            .as_deref()
            .unwrap_or("")
            .trim()
            .parse()
            .map_err(|_| AppError::Validation("Please enter a valid price.".into()))?;
        if price <= Decimal::ZERO {
            return Err(AppError::Validation("Price must be positive.".into()));
        }

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .unwrap_or_default();
        if description.len() < 5 || description.len() > 255 {
            return Err(AppError::Validation(
                "Description must be between 5 and 255 characters.".into(),
            ));
        }

        Ok(ValidatedProduct {
            title,
            price,
            description,
            image: self.image,
        })
    }
}

/// Field set that passed validation; the image stays optional because edit
/// can keep the existing one.
#[derive(Debug)]
pub struct ValidatedProduct {
    pub title: String,
    pub price: Decimal,
    pub description: String,
    pub image: Option<ImageUpload>,
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))
}
