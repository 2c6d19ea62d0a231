use std::{error::Error, fmt::Debug};

use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use thiserror::Error;
use uuid::Uuid;

use crate::{db_interaction::{get_product_by_id, list_brands, list_products}, domain::product_filter::{ProductFilter, ProductQuery}, utils::{error_fmt_chain, get_pooled_connection, DbPool}};

#[derive(Error)]
pub enum GetProductsError{
    #[error("{0}")]
    InvalidQuery(String),
    #[error("product {0} not found")]
    NotFound(Uuid),
    #[error("Failed due to internal server error")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for GetProductsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for GetProductsError {
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            GetProductsError::InvalidQuery(_) => HttpResponse::BadRequest().body(format!("{}", self)),
            GetProductsError::NotFound(_) => HttpResponse::NotFound().body(format!("{}", self)),
            GetProductsError::UnexpectedError(_) => HttpResponse::InternalServerError().body(format!("{}", self))
        }
    }
}

#[tracing::instrument(
    "Listing products",
    skip(pool)
)]
pub async fn get_products(
    pool: web::Data<DbPool>,
    query: web::Query<ProductQuery>
) -> Result<HttpResponse, GetProductsError>{
    let filter = ProductFilter::parse(query.into_inner())
        .map_err(GetProductsError::InvalidQuery)?;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    Ok(HttpResponse::Ok().json(list_products(conn, filter).await?))
}

#[tracing::instrument(
    "Listing brands",
    skip(pool)
)]
pub async fn get_brands(
    pool: web::Data<DbPool>
) -> Result<HttpResponse, GetProductsError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    Ok(HttpResponse::Ok().json(list_brands(conn).await?))
}

#[tracing::instrument(
    "Getting product",
    skip(pool)
)]
pub async fn get_product(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>
) -> Result<HttpResponse, GetProductsError>{
    let product_id = path.into_inner();
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let product = get_product_by_id(conn, product_id)
        .await?
        .ok_or(GetProductsError::NotFound(product_id))?;

    Ok(HttpResponse::Ok().json(product))
}
