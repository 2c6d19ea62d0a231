use actix_web::{web, HttpResponse};
use anyhow::Context;
use serde::Deserialize;
use uuid::Uuid;

use crate::{auth::extractors::IsUser, db_interaction::add_to_cart, utils::{get_pooled_connection, DbPool}};

use super::{CartError, CartView};

#[derive(Deserialize, Debug)]
pub struct CartItemForm{
    pub product_id: Uuid,
    #[serde(default = "one")]
    pub quantity: i32
}

fn one() -> i32 {
    1
}

#[tracing::instrument(
    "Adding item to cart",
    skip(pool, uid)
)]
pub async fn add_cart_item(
    pool: web::Data<DbPool>,
    form: web::Json<CartItemForm>,
    uid: IsUser
) -> Result<HttpResponse, CartError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let lines = add_to_cart(conn, uid.0, form.product_id, form.quantity).await?;

    Ok(HttpResponse::Ok().json(CartView::new(lines)?))
}
