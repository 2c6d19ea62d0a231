use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::payment::PaymentMethod;
use crate::{configuration::StoreSettings, models::CartLine};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Shortage{
    pub product_id: Uuid,
    pub name: String,
    pub requested: i32,
    pub available: i32
}

pub fn find_shortages(lines: &[CartLine]) -> Vec<Shortage>{
    lines.iter()
        .filter(|line| line.quantity > line.stock)
        .map(|line| Shortage{
            product_id: line.product_id,
            name: line.name.clone(),
            requested: line.quantity,
            available: line.stock.max(0)
        })
        .collect()
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PricingError{
    #[error("cart is empty")]
    EmptyCart,
    #[error("order total is too large")]
    Overflow
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals{
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub cod_fee: i64,
    pub total: i64
}

impl OrderTotals {
    pub fn compute(
        lines: &[CartLine],
        store: &StoreSettings,
        method: PaymentMethod
    ) -> Result<OrderTotals, PricingError>{
        if lines.is_empty() {
            return Err(PricingError::EmptyCart)
        }

        let subtotal = subtotal(lines)?;

        let shipping_fee = match store.free_shipping_threshold {
            Some(threshold) if subtotal >= threshold => 0,
            _ => store.shipping_fee
        };

        let cod_fee = match method {
            PaymentMethod::Cod => store.cod_fee,
            _ => 0
        };

        let total = subtotal
            .checked_add(shipping_fee)
            .and_then(|t| t.checked_add(cod_fee))
            .ok_or(PricingError::Overflow)?;

        Ok(Self{ subtotal, shipping_fee, cod_fee, total })
    }
}

pub fn subtotal(lines: &[CartLine]) -> Result<i64, PricingError>{
    lines.iter().try_fold(0_i64, |acc, line| {
        line.price
            .checked_mul(i64::from(line.quantity))
            .and_then(|line_total| acc.checked_add(line_total))
            .ok_or(PricingError::Overflow)
    })
}
