use std::{error::Error, fmt::Debug};

use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{db_interaction::confirm_user, utils::{error_fmt_chain, get_pooled_connection, DbPool}};

// Struct representing query parameter for confirmation endpoint
#[derive(Deserialize, Debug)]
pub struct Confirmation{
    id: Uuid
}

#[derive(Error)]
pub enum ConfirmError{
    #[error("confirmation link is invalid")]
    UnknownConfirmationId,
    #[error("Failed due to internal server error")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for ConfirmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for ConfirmError {
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            ConfirmError::UnknownConfirmationId => HttpResponse::NotFound().body(format!("{}", self)),
            ConfirmError::UnexpectedError(_) => HttpResponse::InternalServerError().body(format!("{}", self))
        }
    }
}

#[tracing::instrument(
    "Confirm user status",
    skip(pool)
)]
pub async fn confirm(
    pool: web::Data<DbPool>,
    form: web::Query<Confirmation>
) -> Result<HttpResponse, ConfirmError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    if !confirm_user(conn, form.0.id).await? {
        return Err(ConfirmError::UnknownConfirmationId)
    }

    Ok(HttpResponse::Ok().body("confirmed account"))
}
