use std::{error::Error, fmt::Debug};

use chrono::Utc;
use diesel::{Connection, ExpressionMethods, QueryDsl, RunQueryDsl};
use thiserror::Error;
use uuid::Uuid;

use crate::{domain::{order_status::OrderStatus, payment::PaymentStatus}, models::Order, schema::orders, telemetry::spawn_blocking_with_tracing, utils::{error_fmt_chain, DbConnection}};

use super::orders::{load_order_items, lock_order, OrderState, OrderWithItems};

#[derive(Error)]
pub enum PaymentUpdateError{
    #[error("Tokio threadpool error occured")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to run query")]
    RunQueryError(#[from] diesel::result::Error),
    #[error("order_id: {0} doesn't exist")]
    NoOrderIdError(Uuid),
    #[error("cash on delivery orders are paid to the courier")]
    CashOnDelivery,
    #[error("order is {0}")]
    OrderClosed(OrderStatus),
    #[error("payment is {0} and cannot be changed")]
    PaymentLocked(&'static str),
    #[error("order has an invalid stored state: {0}")]
    CorruptOrder(String)
}

impl Debug for PaymentUpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

// Loads and locks an order that is waiting for a prepaid payment. Orders of
// other customers than `owner` look the same as missing ones.
fn prepaid_order(
    conn: &mut diesel::PgConnection,
    order_id: Uuid,
    owner: Option<Uuid>
) -> Result<(Order, OrderState), PaymentUpdateError>{
    let order = lock_order(conn, order_id)?
        .filter(|o| owner.map_or(true, |user_id| o.user_id == user_id))
        .ok_or(PaymentUpdateError::NoOrderIdError(order_id))?;
    let state = OrderState::of(&order).map_err(PaymentUpdateError::CorruptOrder)?;

    if !state.method.is_prepaid() {
        return Err(PaymentUpdateError::CashOnDelivery)
    }
    if state.status == OrderStatus::Cancelled {
        return Err(PaymentUpdateError::OrderClosed(state.status))
    }
    Ok((order, state))
}

/// Records the customer's transfer reference for a bank or wallet payment and
/// queues the order for verification.
#[tracing::instrument(
    "Submitting payment proof",
    skip(conn, reference, proof_url)
)]
pub async fn submit_payment_proof(
    mut conn: DbConnection,
    user_id: Uuid,
    order_id: Uuid,
    reference: String,
    proof_url: Option<String>
) -> Result<OrderWithItems, PaymentUpdateError>{
    spawn_blocking_with_tracing(move || {
        conn.transaction::<_, PaymentUpdateError, _>(|conn| {
            let (_, state) = prepaid_order(conn, order_id, Some(user_id))?;

            if !state.payment.accepts_proof() {
                return Err(PaymentUpdateError::PaymentLocked(state.payment.as_str()))
            }

            let order = diesel::update(orders::table.find(order_id))
                .set((
                    orders::payment_status.eq(PaymentStatus::AwaitingVerification.as_str()),
                    orders::payment_reference.eq(Some(reference)),
                    orders::payment_proof_url.eq(proof_url),
                    orders::payment_note.eq(None::<String>),
                    orders::updated_at.eq(Utc::now())
                ))
                .get_result::<Order>(conn)?;

            let items = load_order_items(conn, order_id)?;
            Ok(OrderWithItems{ order, items })
        })
    })
    .await?
}

/// Approving marks the payment paid and confirms a still pending order.
/// Rejecting lets the customer submit a new proof.
#[tracing::instrument(
    "Verifying payment",
    skip(conn, note)
)]
pub async fn verify_payment(
    mut conn: DbConnection,
    order_id: Uuid,
    approved: bool,
    note: Option<String>
) -> Result<OrderWithItems, PaymentUpdateError>{
    spawn_blocking_with_tracing(move || {
        conn.transaction::<_, PaymentUpdateError, _>(|conn| {
            let (_, state) = prepaid_order(conn, order_id, None)?;

            if !state.payment.can_be_verified() {
                return Err(PaymentUpdateError::PaymentLocked(state.payment.as_str()))
            }

            let (payment, status) = if approved {
                let status = match state.status {
                    OrderStatus::Pending => OrderStatus::Confirmed,
                    other => other
                };
                (PaymentStatus::Paid, status)
            } else {
                (PaymentStatus::Rejected, state.status)
            };

            let order = diesel::update(orders::table.find(order_id))
                .set((
                    orders::payment_status.eq(payment.as_str()),
                    orders::status.eq(status.as_str()),
                    orders::payment_note.eq(note),
                    orders::updated_at.eq(Utc::now())
                ))
                .get_result::<Order>(conn)?;

            tracing::info!(payment_status = payment.as_str(), order_status = status.as_str(), "Payment verified");

            let items = load_order_items(conn, order_id)?;
            Ok(OrderWithItems{ order, items })
        })
    })
    .await?
}
