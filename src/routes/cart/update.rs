use actix_web::{web, HttpResponse};
use anyhow::Context;
use serde::Deserialize;
use uuid::Uuid;

use crate::{auth::extractors::IsUser, db_interaction::{replace_cart, set_cart_quantity}, utils::{get_pooled_connection, DbPool}};

use super::{CartError, CartItemForm, CartView};

#[derive(Deserialize, Debug)]
pub struct QuantityForm{
    pub quantity: i32
}

#[tracing::instrument(
    "Setting quantity of cart item",
    skip(pool, uid)
)]
pub async fn update_cart_item(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    form: web::Json<QuantityForm>,
    uid: IsUser
) -> Result<HttpResponse, CartError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let lines = set_cart_quantity(conn, uid.0, path.into_inner(), form.quantity).await?;

    Ok(HttpResponse::Ok().json(CartView::new(lines)?))
}

// Used by clients that keep a local cart and sync it after login
#[tracing::instrument(
    "Replacing cart",
    skip(pool, items, uid)
)]
pub async fn replace_cart_items(
    pool: web::Data<DbPool>,
    items: web::Json<Vec<CartItemForm>>,
    uid: IsUser
) -> Result<HttpResponse, CartError>{
    let items: Vec<(Uuid, i32)> = items.into_inner()
        .into_iter()
        .map(|item| (item.product_id, item.quantity))
        .collect();

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let lines = replace_cart(conn, uid.0, items).await?;

    Ok(HttpResponse::Ok().json(CartView::new(lines)?))
}
