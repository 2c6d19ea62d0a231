use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::payment::{PaymentMethod, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus{
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled"
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Shipped)
                | (Confirmed, Cancelled)
                | (Shipped, Delivered)
        )
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("{} is not a valid order status", other))
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransitionError{
    #[error("order cannot move from {from} to {to}")]
    NotAllowed{ from: OrderStatus, to: OrderStatus },
    #[error("payment must be verified before the order is confirmed")]
    PaymentNotSettled
}

/// Validates an order status change. Prepaid orders stay `pending` until their
/// payment has been verified.
pub fn check_transition(
    current: OrderStatus,
    next: OrderStatus,
    method: PaymentMethod,
    payment: PaymentStatus
) -> Result<(), TransitionError>{
    if !current.can_transition_to(next) {
        return Err(TransitionError::NotAllowed{ from: current, to: next })
    }

    if next == OrderStatus::Confirmed && method.is_prepaid() && payment != PaymentStatus::Paid {
        return Err(TransitionError::PaymentNotSettled)
    }

    Ok(())
}
