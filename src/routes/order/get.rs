use actix_web::{web, HttpResponse};
use anyhow::Context;
use uuid::Uuid;

use crate::{auth::extractors::IsUser, db_interaction::{get_order_with_items, list_user_orders}, utils::{get_pooled_connection, DbPool, Pagination}};

use super::OrderError;

#[tracing::instrument(
    "Getting list of orders",
    skip(pool, uid)
)]
pub async fn get_orders(
    pool: web::Data<DbPool>,
    query: web::Query<Pagination>,
    uid: IsUser
) -> Result<HttpResponse, OrderError> {
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let orders = list_user_orders(conn, uid.0, query.into_inner()).await?;

    Ok(HttpResponse::Ok().json(orders))
}

// Orders of other users are reported as missing
#[tracing::instrument(
    "Getting order",
    skip(pool, uid)
)]
pub async fn get_order(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    uid: IsUser
) -> Result<HttpResponse, OrderError> {
    let IsUser(user_id, is_admin) = uid;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let order = get_order_with_items(conn, path.into_inner())
        .await?
        .filter(|o| is_admin || o.order.user_id == user_id)
        .ok_or(OrderError::NotFound)?;

    Ok(HttpResponse::Ok().json(order))
}
