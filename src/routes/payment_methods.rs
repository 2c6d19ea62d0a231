use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::{configuration::{BankAccountSettings, StoreSettings, WalletSettings}, domain::payment::PaymentMethod};

#[derive(Serialize, Debug)]
pub struct PaymentMethodsResponse<'a>{
    pub currency: &'a str,
    pub methods: Vec<PaymentMethodInfo<'a>>,
    pub shipping_fee: i64,
    pub free_shipping_threshold: Option<i64>
}

#[derive(Serialize, Debug)]
pub struct PaymentMethodInfo<'a>{
    pub method: PaymentMethod,
    pub fee: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank: Option<&'a BankAccountSettings>,
    pub wallets: &'a [WalletSettings]
}

fn describe(store: &StoreSettings) -> PaymentMethodsResponse<'_>{
    let mut methods = vec![
        PaymentMethodInfo{ method: PaymentMethod::Cod, fee: store.cod_fee, bank: None, wallets: &[] },
        PaymentMethodInfo{ method: PaymentMethod::BankTransfer, fee: 0, bank: Some(&store.bank), wallets: &[] },
    ];

    // Wallet payments need at least one configured wallet
    if !store.wallets.is_empty() {
        methods.push(PaymentMethodInfo{
            method: PaymentMethod::MobileWallet,
            fee: 0,
            bank: None,
            wallets: &store.wallets
        });
    }

    PaymentMethodsResponse{
        currency: &store.currency,
        methods,
        shipping_fee: store.shipping_fee,
        free_shipping_threshold: store.free_shipping_threshold
    }
}

#[tracing::instrument(
    "Listing payment methods",
    skip(store)
)]
pub async fn get_payment_methods(
    store: web::Data<StoreSettings>
) -> HttpResponse{
    HttpResponse::Ok().json(describe(&store))
}
