use std::collections::BTreeMap;

use anyhow::Context;
use diesel::{dsl::{count_star, sql}, sql_types::BigInt, ExpressionMethods, QueryDsl, Queryable, RunQueryDsl};
use serde::Serialize;
use uuid::Uuid;

use crate::{domain::payment::PaymentStatus, schema::{orders, products}, telemetry::spawn_blocking_with_tracing, utils::DbConnection};

#[derive(Queryable, Serialize, Debug)]
pub struct LowStockProduct{
    pub product_id: Uuid,
    pub name: String,
    pub brand: String,
    pub stock: i32
}

#[derive(Serialize, Debug)]
pub struct StoreStats{
    pub orders_by_status: BTreeMap<String, i64>,
    pub total_orders: i64,
    pub paid_revenue: i64,
    pub awaiting_verification: i64,
    pub low_stock: Vec<LowStockProduct>
}

#[tracing::instrument(
    "Collecting dashboard stats",
    skip(conn)
)]
pub async fn get_store_stats(
    mut conn: DbConnection,
    low_stock_threshold: i32
) -> Result<StoreStats, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        let orders_by_status: BTreeMap<String, i64> = orders::table
            .group_by(orders::status)
            .select((orders::status, count_star()))
            .load::<(String, i64)>(&mut conn)
            .context("Failed to count orders by status")?
            .into_iter()
            .collect();

        // SUM over BIGINT is NUMERIC in postgres, cast back to fit i64
        let paid_revenue = orders::table
            .filter(orders::payment_status.eq(PaymentStatus::Paid.as_str()))
            .select(sql::<BigInt>("COALESCE(SUM(total), 0)::BIGINT"))
            .get_result::<i64>(&mut conn)
            .context("Failed to sum paid order totals")?;

        let awaiting_verification = orders::table
            .filter(orders::payment_status.eq(PaymentStatus::AwaitingVerification.as_str()))
            .count()
            .get_result::<i64>(&mut conn)
            .context("Failed to count payments awaiting verification")?;

        let low_stock = products::table
            .filter(products::stock.le(low_stock_threshold))
            .order((products::stock.asc(), products::name.asc()))
            .select((products::product_id, products::name, products::brand, products::stock))
            .load::<LowStockProduct>(&mut conn)
            .context("Failed to load low stock products")?;

        Ok(StoreStats{
            total_orders: orders_by_status.values().sum(),
            orders_by_status,
            paid_revenue,
            awaiting_verification,
            low_stock
        })
    })
    .await
    .context("Failed due to threadpool error")?
}
