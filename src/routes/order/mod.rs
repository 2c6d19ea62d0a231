mod cancel;
mod get;
mod payment;
mod post;

pub use cancel::*;
pub use get::*;
pub use payment::*;
pub use post::*;

use std::{error::Error, fmt::Debug};

use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::{db_interaction::{PaymentUpdateError, UpdateOrderStatusError}, utils::error_fmt_chain};

// Errors shared by the endpoints that read or change an existing order
#[derive(Error)]
pub enum OrderError{
    #[error("{0}")]
    InvalidRequest(String),
    #[error("order not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("Failed due to internal server error")]
    UnexpectedError(#[from] anyhow::Error)
}

impl From<UpdateOrderStatusError> for OrderError {
    fn from(e: UpdateOrderStatusError) -> Self {
        match e {
            UpdateOrderStatusError::NoOrderIdError(_) => OrderError::NotFound,
            UpdateOrderStatusError::TransitionError(_) => OrderError::Conflict(e.to_string()),
            _ => OrderError::UnexpectedError(e.into())
        }
    }
}

impl From<PaymentUpdateError> for OrderError {
    fn from(e: PaymentUpdateError) -> Self {
        match e {
            PaymentUpdateError::NoOrderIdError(_) => OrderError::NotFound,
            PaymentUpdateError::CashOnDelivery
            | PaymentUpdateError::OrderClosed(_)
            | PaymentUpdateError::PaymentLocked(_) => OrderError::Conflict(e.to_string()),
            _ => OrderError::UnexpectedError(e.into())
        }
    }
}

impl Debug for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for OrderError {
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            OrderError::InvalidRequest(_) => HttpResponse::BadRequest().body(format!("{}", self)),
            OrderError::NotFound => HttpResponse::NotFound().body(format!("{}", self)),
            OrderError::Conflict(_) => HttpResponse::Conflict().body(format!("{}", self)),
            OrderError::UnexpectedError(_) => HttpResponse::InternalServerError().body(format!("{}", self))
        }
    }
}
