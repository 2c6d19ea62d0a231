use actix_web::{web, HttpResponse};
use anyhow::Context;

use crate::{auth::extractors::IsUser, db_interaction::get_cart, utils::{get_pooled_connection, DbPool}};

use super::{CartError, CartView};

#[tracing::instrument(
    "Getting cart",
    skip(pool, uid)
)]
pub async fn get_cart_items(
    pool: web::Data<DbPool>,
    uid: IsUser
) -> Result<HttpResponse, CartError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let lines = get_cart(conn, uid.0).await?;

    Ok(HttpResponse::Ok().json(CartView::new(lines)?))
}
