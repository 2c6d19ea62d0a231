use actix_web::{web, HttpResponse};
use anyhow::Context;
use serde::Deserialize;
use uuid::Uuid;

use crate::{auth::extractors::IsAdmin, db_interaction::{list_all_orders, update_order_status}, domain::{order_status::OrderStatus, payment::PaymentStatus}, routes::OrderError, utils::{get_pooled_connection, DbPool, Pagination}};

#[derive(Deserialize, Debug)]
pub struct AdminOrderQuery{
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>
}

#[derive(Deserialize, Debug)]
pub struct UpdateOrderStatusForm{
    pub status: OrderStatus
}

#[tracing::instrument(
    "Listing all orders",
    skip(pool, _admin)
)]
pub async fn admin_get_orders(
    pool: web::Data<DbPool>,
    query: web::Query<AdminOrderQuery>,
    _admin: IsAdmin
) -> Result<HttpResponse, OrderError>{
    let query = query.into_inner();
    let pagination = Pagination{ page: query.page, limit: query.limit };

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let orders = list_all_orders(
        conn,
        query.status,
        query.payment_status,
        pagination
    ).await?;

    Ok(HttpResponse::Ok().json(orders))
}

#[tracing::instrument(
    "Updating order status",
    skip(pool, admin),
    fields(admin_id = %admin.0)
)]
pub async fn admin_update_order_status(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    form: web::Json<UpdateOrderStatusForm>,
    admin: IsAdmin
) -> Result<HttpResponse, OrderError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let order = update_order_status(conn, form.status, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(order))
}
