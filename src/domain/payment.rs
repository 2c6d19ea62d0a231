use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::configuration::StoreSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod{
    Cod,
    BankTransfer,
    MobileWallet
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::MobileWallet => "mobile_wallet"
        }
    }

    // Paid up front and verified by an admin, as opposed to cash on delivery
    pub fn is_prepaid(&self) -> bool {
        !matches!(self, PaymentMethod::Cod)
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(PaymentMethod::Cod),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "mobile_wallet" => Ok(PaymentMethod::MobileWallet),
            other => Err(format!("{} is not a supported payment method", other))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus{
    Pending,
    AwaitingVerification,
    Paid,
    Rejected
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::AwaitingVerification => "awaiting_verification",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Rejected => "rejected"
        }
    }

    pub fn accepts_proof(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Rejected)
    }

    pub fn can_be_verified(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::AwaitingVerification)
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "awaiting_verification" => Ok(PaymentStatus::AwaitingVerification),
            "paid" => Ok(PaymentStatus::Paid),
            "rejected" => Ok(PaymentStatus::Rejected),
            other => Err(format!("{} is not a valid payment status", other))
        }
    }
}

/// A payment method accepted by this store, with the wallet it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentChoice{
    pub method: PaymentMethod,
    pub wallet_provider: Option<String>
}

impl PaymentChoice {
    pub fn parse(
        method: PaymentMethod,
        wallet_provider: Option<String>,
        store: &StoreSettings
    ) -> Result<PaymentChoice, String>{
        match method {
            PaymentMethod::MobileWallet => {
                let provider = wallet_provider
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| "a wallet provider is required for mobile wallet payments".to_string())?;

                let wallet = store.wallet(provider.trim())
                    .ok_or_else(|| format!("{} is not an accepted wallet", provider))?;

                Ok(Self{ method, wallet_provider: Some(wallet.provider.clone()) })
            },
            _ => Ok(Self{ method, wallet_provider: None })
        }
    }
}
