use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub description: String,
    pub image_url: String,
    pub created_at: OffsetDateTime,
}

impl Product {
    pub async fn list_by_owner(db: &PgPool, owner_id: Uuid) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, owner_id, title, price, description, image_url, created_at
            FROM products
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, owner_id, title, price, description, image_url, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(product)
    }

    pub async fn insert(
        db: &PgPool,
        owner_id: Uuid,
        title: &str,
        price: Decimal,
        description: &str,
        image_url: &str,
    ) -> anyhow::Result<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (owner_id, title, price, description, image_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, title, price, description, image_url, created_at
            "#,
        )
        .bind(owner_id)
        .bind(title)
        .bind(price)
        .bind(description)
        .bind(image_url)
        .fetch_one(db)
        .await?;
        Ok(product)
    }

    /// Last writer wins; concurrent edits to the same product are not
    /// conflict-checked.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        title: &str,
        price: Decimal,
        description: &str,
        image_url: &str,
    ) -> anyhow::Result<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET title = $2, price = $3, description = $4, image_url = $5
            WHERE id = $1
            RETURNING id, owner_id, title, price, description, image_url, created_at
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(price)
        .bind(description)
        .bind(image_url)
        .fetch_one(db)
        .await?;
        Ok(product)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM products WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
