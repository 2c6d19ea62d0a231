use std::{error::Error, fmt::Debug};

use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;

use crate::{auth::extractors::IsUser, configuration::StoreSettings, db_interaction::{get_user_profile_info, place_order, CheckoutRequest, PlaceOrderError}, domain::{payment::{PaymentChoice, PaymentMethod}, pricing::Shortage, shipping::{ShippingDetails, ShippingForm}, user_email::UserEmail}, email_client::{EmailClient, EmailContent}, utils::{error_fmt_chain, get_pooled_connection, DbPool}};

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
const MAX_IDEMPOTENCY_KEY_LENGTH: usize = 128;
const MAX_NOTES_LENGTH: usize = 500;

#[derive(Deserialize, Debug)]
pub struct CheckoutForm{
    #[serde(default)]
    pub shipping: ShippingForm,
    pub payment_method: PaymentMethod,
    pub wallet_provider: Option<String>,
    pub notes: Option<String>
}

#[derive(Error)]
pub enum CheckoutError{
    #[error("{0}")]
    InvalidRequest(String),
    #[error("cart is empty")]
    EmptyCart,
    #[error("some items are out of stock")]
    OutOfStock(Vec<Shortage>),
    #[error("an order with this idempotency key is already being placed")]
    DuplicateRequest,
    #[error("Failed due to internal server error")]
    UnexpectedError(#[from] anyhow::Error)
}

impl From<PlaceOrderError> for CheckoutError {
    fn from(e: PlaceOrderError) -> Self {
        match e {
            PlaceOrderError::EmptyCart => CheckoutError::EmptyCart,
            PlaceOrderError::OutOfStock(shortages) => CheckoutError::OutOfStock(shortages),
            PlaceOrderError::DuplicateRequest => CheckoutError::DuplicateRequest,
            PlaceOrderError::PricingError(e) => CheckoutError::InvalidRequest(e.to_string()),
            _ => CheckoutError::UnexpectedError(e.into())
        }
    }
}

impl Debug for CheckoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for CheckoutError {
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            CheckoutError::InvalidRequest(_) | CheckoutError::EmptyCart => HttpResponse::BadRequest().body(format!("{}", self)),
            CheckoutError::OutOfStock(shortages) => HttpResponse::Conflict().json(serde_json::json!({
                "error": format!("{}", self),
                "shortages": shortages
            })),
            CheckoutError::DuplicateRequest => HttpResponse::Conflict().body(format!("{}", self)),
            CheckoutError::UnexpectedError(_) => HttpResponse::InternalServerError().body(format!("{}", self))
        }
    }
}

fn idempotency_key(req: &HttpRequest) -> Result<Option<String>, CheckoutError>{
    let value = match req.headers().get(IDEMPOTENCY_HEADER) {
        Some(value) => value,
        None => return Ok(None)
    };

    let key = value.to_str()
        .map_err(|_| CheckoutError::InvalidRequest("idempotency key must be visible ascii".to_string()))?
        .trim();

    if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LENGTH {
        return Err(CheckoutError::InvalidRequest(
            format!("idempotency key must be between 1 and {} characters", MAX_IDEMPOTENCY_KEY_LENGTH)
        ))
    }

    Ok(Some(key.to_string()))
}

fn parse_notes(notes: Option<String>) -> Result<Option<String>, CheckoutError>{
    let notes = notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH) {
        return Err(CheckoutError::InvalidRequest(format!("notes cannot exceed {} characters", MAX_NOTES_LENGTH)))
    }
    Ok(notes)
}

/// Places an order from the caller's cart. Replaying an `Idempotency-Key`
/// returns the order created by the first request with status 200.
#[tracing::instrument(
    "Posting order",
    skip(req, pool, email_client, store, form, uid)
)]
pub async fn post_order(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    email_client: web::Data<EmailClient>,
    store: web::Data<StoreSettings>,
    form: web::Json<CheckoutForm>,
    uid: IsUser
) -> Result<HttpResponse, CheckoutError> {
    let user_id = uid.0;
    let idempotency_key = idempotency_key(&req)?;
    let form = form.into_inner();

    let payment = PaymentChoice::parse(form.payment_method, form.wallet_provider, &store)
        .map_err(CheckoutError::InvalidRequest)?;
    let notes = parse_notes(form.notes)?;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let profile = get_user_profile_info(conn, user_id)
        .await?
        .context("Logged in user no longer exists")?;

    let shipping = ShippingDetails::parse(form.shipping, &profile, &store.phone_region)
        .map_err(CheckoutError::InvalidRequest)?;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let placed = place_order(
        conn,
        CheckoutRequest{
            user_id,
            shipping,
            payment,
            notes,
            idempotency_key
        },
        store.get_ref().clone()
    ).await?;

    if placed.replayed {
        return Ok(HttpResponse::Ok().json(placed.order))
    }

    tracing::info!(order_number = %placed.order.order.order_number, "Order placed");

    // The order is committed at this point, a failed email must not fail the request
    match UserEmail::parse(profile.email) {
        Ok(recipient) => {
            let content = EmailContent::order_confirmation(&placed.order.order, &placed.order.items, &store.currency);
            if let Err(e) = email_client.send(&recipient, &content).await {
                tracing::warn!(error = %e, "Failed to send order confirmation email");
            }
        },
        Err(e) => tracing::warn!(error = %e, "Stored email is invalid, skipping order confirmation")
    }

    Ok(HttpResponse::Created().json(placed.order))
}
