use actix_web::{error::ErrorInternalServerError, web, HttpResponse};

use crate::{auth::extractors::IsAdmin, configuration::StoreSettings, db_interaction::get_store_stats, utils::{get_pooled_connection, DbPool}};

#[tracing::instrument(
    "Getting dashboard stats",
    skip(pool, store, _admin)
)]
pub async fn admin_get_stats(
    pool: web::Data<DbPool>,
    store: web::Data<StoreSettings>,
    _admin: IsAdmin
) -> Result<HttpResponse, actix_web::Error>{
    let conn = get_pooled_connection(&pool)
        .await
        .map_err(|_| ErrorInternalServerError("Failed due to internal error"))?;

    let stats = get_store_stats(conn, store.low_stock_threshold)
        .await
        .map_err(ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(stats))
}
