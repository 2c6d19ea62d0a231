use std::{error::Error, fmt::Debug};

use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use thiserror::Error;
use uuid::Uuid;

use crate::{auth::extractors::IsAdmin, db_interaction::{delete_product, get_product_by_id, insert_product, update_product, ProductWriteError}, domain::product::{NewProductData, ProductForm, ProductUpdate, ProductUpdateForm}, utils::{error_fmt_chain, get_pooled_connection, DbPool}};

#[derive(Error)]
pub enum AdminProductError{
    #[error("{0}")]
    InvalidProduct(String),
    #[error("product {0} not found")]
    NotFound(Uuid),
    #[error("Failed to write product")]
    WriteError(#[from] ProductWriteError),
    #[error("Failed due to internal server error")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for AdminProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for AdminProductError {
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            AdminProductError::InvalidProduct(_) => HttpResponse::BadRequest().body(format!("{}", self)),
            AdminProductError::NotFound(_) => HttpResponse::NotFound().body(format!("{}", self)),
            _ => HttpResponse::InternalServerError().body(format!("{}", self))
        }
    }
}

#[tracing::instrument(
    "Creating product",
    skip(pool, form, admin),
    fields(admin_id = %admin.0)
)]
pub async fn create_product(
    pool: web::Data<DbPool>,
    form: web::Json<ProductForm>,
    admin: IsAdmin
) -> Result<HttpResponse, AdminProductError>{
    let NewProductData(product) = NewProductData::parse(form.into_inner())
        .map_err(AdminProductError::InvalidProduct)?;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let product = insert_product(conn, product).await?;

    Ok(HttpResponse::Created().json(product))
}

#[tracing::instrument(
    "Updating product",
    skip(pool, form, admin),
    fields(admin_id = %admin.0)
)]
pub async fn edit_product(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    form: web::Json<ProductUpdateForm>,
    admin: IsAdmin
) -> Result<HttpResponse, AdminProductError>{
    let product_id = path.into_inner();

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let current = get_product_by_id(conn, product_id)
        .await?
        .ok_or(AdminProductError::NotFound(product_id))?;

    let ProductUpdate(changes) = ProductUpdate::parse(form.into_inner(), &current)
        .map_err(AdminProductError::InvalidProduct)?;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let product = update_product(conn, product_id, changes)
        .await?
        .ok_or(AdminProductError::NotFound(product_id))?;

    Ok(HttpResponse::Ok().json(product))
}

#[tracing::instrument(
    "Deleting product",
    skip(pool, admin),
    fields(admin_id = %admin.0)
)]
pub async fn remove_product(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    admin: IsAdmin
) -> Result<HttpResponse, AdminProductError>{
    let product_id = path.into_inner();

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    if !delete_product(conn, product_id).await? {
        return Err(AdminProductError::NotFound(product_id))
    }

    Ok(HttpResponse::NoContent().finish())
}
