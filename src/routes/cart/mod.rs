mod delete;
mod get;
mod post;
mod update;

pub use delete::*;
pub use get::*;
pub use post::*;
pub use update::*;

use std::{error::Error, fmt::Debug};

use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{db_interaction::CartUpdateError, domain::pricing::subtotal, models::CartLine, utils::error_fmt_chain};

// Cart lines with the running subtotal, returned by every cart endpoint
#[derive(Serialize, Deserialize, Debug)]
pub struct CartView{
    pub items: Vec<CartLine>,
    pub subtotal: i64,
    pub item_count: i64
}

impl CartView {
    fn new(items: Vec<CartLine>) -> Result<CartView, CartError>{
        let subtotal = subtotal(&items)
            .map_err(|e| CartError::UnexpectedError(e.into()))?;
        let item_count = items.iter().map(|line| i64::from(line.quantity)).sum();

        Ok(Self{ items, subtotal, item_count })
    }
}

#[derive(Error)]
pub enum CartError{
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Failed due to internal server error")]
    UnexpectedError(#[from] anyhow::Error)
}

impl From<CartUpdateError> for CartError {
    fn from(e: CartUpdateError) -> Self {
        match e {
            CartUpdateError::InvalidQuantity => CartError::InvalidRequest(e.to_string()),
            CartUpdateError::ProductNotFound(_) | CartUpdateError::NotInCart(_) => CartError::NotFound(e.to_string()),
            CartUpdateError::InsufficientStock{ .. } => CartError::Conflict(e.to_string()),
            CartUpdateError::ThreadpoolError(_) | CartUpdateError::QueryError(_) => CartError::UnexpectedError(e.into())
        }
    }
}

impl Debug for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for CartError {
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            CartError::InvalidRequest(_) => HttpResponse::BadRequest().body(format!("{}", self)),
            CartError::NotFound(_) => HttpResponse::NotFound().body(format!("{}", self)),
            CartError::Conflict(_) => HttpResponse::Conflict().body(format!("{}", self)),
            CartError::UnexpectedError(_) => HttpResponse::InternalServerError().body(format!("{}", self))
        }
    }
}
