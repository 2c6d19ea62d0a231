use actix_web::{web, HttpResponse};
use anyhow::Context;
use uuid::Uuid;

use crate::{auth::extractors::IsUser, db_interaction::{clear_cart, remove_from_cart}, utils::{get_pooled_connection, DbPool}};

use super::CartError;

#[tracing::instrument(
    "Removing item from cart",
    skip(pool, uid)
)]
pub async fn delete_cart_item(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    uid: IsUser
) -> Result<HttpResponse, CartError>{
    let product_id = path.into_inner();
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    if !remove_from_cart(conn, uid.0, product_id).await? {
        return Err(CartError::NotFound(format!("product {} is not in the cart", product_id)))
    }

    Ok(HttpResponse::NoContent().finish())
}

#[tracing::instrument(
    "Clearing cart",
    skip(pool, uid)
)]
pub async fn clear_cart_items(
    pool: web::Data<DbPool>,
    uid: IsUser
) -> Result<HttpResponse, CartError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    clear_cart(conn, uid.0).await?;

    Ok(HttpResponse::NoContent().finish())
}
