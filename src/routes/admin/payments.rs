use actix_web::{web, HttpResponse};
use anyhow::Context;
use serde::Deserialize;
use uuid::Uuid;

use crate::{auth::extractors::IsAdmin, db_interaction::verify_payment, routes::OrderError, utils::{get_pooled_connection, DbPool}};

#[derive(Deserialize, Debug)]
pub struct VerifyPaymentForm{
    pub order_id: Uuid,
    pub approved: bool,
    pub note: Option<String>
}

#[tracing::instrument(
    "Verifying order payment",
    skip(pool, admin),
    fields(admin_id = %admin.0)
)]
pub async fn admin_verify_payment(
    pool: web::Data<DbPool>,
    form: web::Json<VerifyPaymentForm>,
    admin: IsAdmin
) -> Result<HttpResponse, OrderError>{
    let form = form.into_inner();
    let note = form.note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let order = verify_payment(conn, form.order_id, form.approved, note).await?;

    Ok(HttpResponse::Ok().json(order))
}
