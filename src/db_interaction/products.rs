use std::{error::Error, fmt::Debug};

use anyhow::Context;
use diesel::{pg::Pg, BoolExpressionMethods, ExpressionMethods, OptionalExtension, PgTextExpressionMethods, QueryDsl, RunQueryDsl};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{domain::product_filter::{ProductFilter, ProductSort}, models::{Product, ProductChanges}, schema::products, telemetry::spawn_blocking_with_tracing, utils::{error_fmt_chain, DbConnection}};

#[derive(Serialize, Deserialize, Debug)]
pub struct ProductPage{
    pub items: Vec<Product>,
    pub page: i64,
    pub limit: i64,
    pub total: i64
}

fn filtered_products(filter: &ProductFilter) -> products::BoxedQuery<'static, Pg>{
    let mut query = products::table.into_boxed();

    if let Some(brand) = &filter.brand {
        query = query.filter(products::brand.ilike(brand.clone()));
    }
    if let Some(category) = &filter.category {
        query = query.filter(products::category.eq(category.clone()));
    }
    if let Some(gender) = filter.gender {
        query = query.filter(products::gender.eq(gender.as_str()));
    }
    if let Some(min_price) = filter.min_price {
        query = query.filter(products::price.ge(min_price));
    }
    if let Some(max_price) = filter.max_price {
        query = query.filter(products::price.le(max_price));
    }
    if filter.in_stock {
        query = query.filter(products::stock.gt(0));
    }
    if let Some(featured) = filter.featured {
        query = query.filter(products::is_featured.eq(featured));
    }
    if let Some(pattern) = &filter.search {
        query = query.filter(
            products::name.ilike(pattern.clone())
                .or(products::brand.ilike(pattern.clone()))
        );
    }

    query
}

#[tracing::instrument(
    "Getting filtered products from db",
    skip(conn)
)]
pub async fn list_products(
    mut conn: DbConnection,
    filter: ProductFilter
) -> Result<ProductPage, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        let total = filtered_products(&filter)
            .count()
            .get_result::<i64>(&mut conn)
            .context("Failed to count products")?;

        let query = match filter.sort {
            ProductSort::Newest => filtered_products(&filter)
                .order(products::created_at.desc()),
            ProductSort::PriceAsc => filtered_products(&filter)
                .order((products::price.asc(), products::created_at.desc())),
            ProductSort::PriceDesc => filtered_products(&filter)
                .order((products::price.desc(), products::created_at.desc())),
            ProductSort::Name => filtered_products(&filter)
                .order((products::name.asc(), products::product_id.asc())),
        };

        let items = query
            .limit(filter.limit)
            .offset(filter.offset())
            .load::<Product>(&mut conn)
            .context("Failed to get products")?;

        Ok(ProductPage{
            items,
            page: filter.page,
            limit: filter.limit,
            total
        })
    })
    .await
    .context("Failed due to threadpool error")?
}

#[tracing::instrument(
    "Getting distinct brands",
    skip_all
)]
pub async fn list_brands(
    mut conn: DbConnection
) -> Result<Vec<String>, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        products::table
            .select(products::brand)
            .distinct()
            .order(products::brand.asc())
            .load::<String>(&mut conn)
            .context("Failed to get brands")
    })
    .await
    .context("Failed due to threadpool error")?
}

#[tracing::instrument(
    "Getting product by id",
    skip(conn)
)]
pub async fn get_product_by_id(
    mut conn: DbConnection,
    product_id: Uuid
) -> Result<Option<Product>, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        products::table
            .find(product_id)
            .first::<Product>(&mut conn)
            .optional()
            .context("Failed to get product")
    })
    .await
    .context("Failed due to threadpool error")?
}

#[derive(Error)]
pub enum ProductWriteError{
    #[error("Failed due to threadpool error")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to write to products table")]
    QueryError(#[from] diesel::result::Error)
}

impl Debug for ProductWriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

#[tracing::instrument(
    "Insert a product to db",
    skip_all,
    fields(product_id = %product.product_id)
)]
pub async fn insert_product(
    mut conn: DbConnection,
    product: Product
) -> Result<Product, ProductWriteError> {
    let res = spawn_blocking_with_tracing(move || {
        diesel::insert_into(products::table)
            .values(&product)
            .get_result::<Product>(&mut conn)
    })
    .await??;

    Ok(res)
}

#[tracing::instrument(
    "Update a product in db",
    skip(conn, changes)
)]
pub async fn update_product(
    mut conn: DbConnection,
    product_id: Uuid,
    changes: ProductChanges
) -> Result<Option<Product>, ProductWriteError> {
    let res = spawn_blocking_with_tracing(move || {
        diesel::update(products::table.find(product_id))
            .set(&changes)
            .get_result::<Product>(&mut conn)
            .optional()
    })
    .await??;

    Ok(res)
}

// Cart rows cascade, order items keep their snapshot with a null product_id
#[tracing::instrument(
    "Delete a product from db",
    skip(conn)
)]
pub async fn delete_product(
    mut conn: DbConnection,
    product_id: Uuid
) -> Result<bool, ProductWriteError> {
    let affected_rows = spawn_blocking_with_tracing(move || {
        diesel::delete(products::table.find(product_id))
            .execute(&mut conn)
    })
    .await??;

    Ok(affected_rows > 0)
}
