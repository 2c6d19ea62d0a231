use actix_web::{web, HttpResponse};
use anyhow::Context;
use serde::Deserialize;
use uuid::Uuid;
use validator::ValidateUrl;

use crate::{auth::extractors::IsUser, db_interaction::submit_payment_proof, utils::{get_pooled_connection, DbPool}};

use super::OrderError;

const MAX_REFERENCE_LENGTH: usize = 100;

#[derive(Deserialize, Debug)]
pub struct PaymentProofForm{
    pub reference: String,
    pub proof_url: Option<String>
}

impl PaymentProofForm {
    fn parse(self) -> Result<(String, Option<String>), String>{
        let reference = self.reference.trim().to_string();
        if reference.is_empty() {
            return Err("payment reference is required".to_string())
        }
        if reference.chars().count() > MAX_REFERENCE_LENGTH {
            return Err(format!("payment reference cannot exceed {} characters", MAX_REFERENCE_LENGTH))
        }

        let proof_url = self.proof_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        if let Some(url) = &proof_url {
            if !url.validate_url() {
                return Err(format!("{} is not a valid url", url))
            }
        }

        Ok((reference, proof_url))
    }
}

#[tracing::instrument(
    "Submitting payment proof for order",
    skip(pool, uid)
)]
pub async fn post_payment_proof(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    form: web::Json<PaymentProofForm>,
    uid: IsUser
) -> Result<HttpResponse, OrderError> {
    let (reference, proof_url) = form.into_inner()
        .parse()
        .map_err(OrderError::InvalidRequest)?;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let order = submit_payment_proof(conn, uid.0, path.into_inner(), reference, proof_url).await?;

    Ok(HttpResponse::Ok().json(order))
}
