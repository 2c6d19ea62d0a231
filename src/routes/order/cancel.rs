use actix_web::{web, HttpResponse};
use anyhow::Context;
use uuid::Uuid;

use crate::{auth::extractors::IsUser, db_interaction::cancel_user_order, utils::{get_pooled_connection, DbPool}};

use super::OrderError;

#[tracing::instrument(
    "Cancelling order",
    skip(pool, uid)
)]
pub async fn cancel_order(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    uid: IsUser
) -> Result<HttpResponse, OrderError> {
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let order = cancel_user_order(conn, uid.0, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(order))
}
