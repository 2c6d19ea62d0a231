use serde::Deserialize;

use super::phone_number::PhoneNumberDomain;
use crate::models::UserProfileInfo;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ShippingForm{
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>
}

#[derive(Debug, Clone)]
pub struct ShippingDetails{
    pub full_name: String,
    pub phone: PhoneNumberDomain,
    pub address: String,
    pub city: String
}

impl ShippingDetails {
    /// Missing fields are filled from the customer's saved profile.
    pub fn parse(
        form: ShippingForm,
        profile: &UserProfileInfo,
        region: &str
    ) -> Result<ShippingDetails, String>{
        let full_name = required(form.full_name.or_else(|| Some(profile.name.clone())), "full name")?;
        let phone = required(form.phone.or_else(|| profile.phone_number.clone()), "phone")?;
        let address = required(form.address.or_else(|| profile.address.clone()), "address")?;
        let city = required(form.city.or_else(|| profile.city.clone()), "city")?;

        Ok(Self{
            full_name,
            phone: PhoneNumberDomain::parse(phone, region)?,
            address,
            city
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, String>{
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format!("shipping {} is required", field))
    }
}
