use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::ValidateUrl;

use crate::models::{Product, ProductChanges};

const MAX_NAME_LENGTH: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender{
    Men,
    Women,
    Unisex
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Men => "men",
            Gender::Women => "women",
            Gender::Unisex => "unisex"
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "men" => Ok(Gender::Men),
            "women" => Ok(Gender::Women),
            "unisex" => Ok(Gender::Unisex),
            other => Err(format!("{} is not a valid gender", other))
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ProductForm{
    pub name: String,
    pub brand: String,
    pub description: Option<String>,
    pub category: String,
    pub gender: Option<String>,
    pub price: i64,
    pub compare_at_price: Option<i64>,
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_featured: bool
}

/// Partial update. For `description` and `compare_at_price` an explicit
/// `null` clears the stored value while a missing key leaves it alone.
#[derive(Deserialize, Debug, Default)]
pub struct ProductUpdateForm{
    pub name: Option<String>,
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub category: Option<String>,
    pub gender: Option<String>,
    pub price: Option<i64>,
    #[serde(default, deserialize_with = "present")]
    pub compare_at_price: Option<Option<i64>>,
    pub stock: Option<i32>,
    pub images: Option<Vec<String>>,
    pub is_featured: Option<bool>
}

// Distinguishes a key sent as `null` from a missing key
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug)]
pub struct NewProductData(pub Product);

impl NewProductData {
    pub fn parse(form: ProductForm) -> Result<NewProductData, String>{
        let gender = match form.gender {
            Some(g) => g.parse::<Gender>()?,
            None => Gender::Unisex
        };
        check_prices(form.price, form.compare_at_price)?;
        check_stock(form.stock)?;

        let now = Utc::now();
        Ok(Self(Product{
            product_id: Uuid::new_v4(),
            name: text(form.name, "name")?,
            brand: text(form.brand, "brand")?,
            description: description(form.description),
            category: category(form.category)?,
            gender: gender.as_str().to_string(),
            price: form.price,
            compare_at_price: form.compare_at_price,
            stock: form.stock,
            images: images(form.images)?,
            is_featured: form.is_featured,
            created_at: now,
            updated_at: now
        }))
    }
}

#[derive(Debug)]
pub struct ProductUpdate(pub ProductChanges);

impl ProductUpdate {
    /// Validates the update against the product as it currently stands, so that
    /// price rules hold for the merged result.
    pub fn parse(form: ProductUpdateForm, current: &Product) -> Result<ProductUpdate, String>{
        let price = form.price.unwrap_or(current.price);
        let compare_at_price = form.compare_at_price.unwrap_or(current.compare_at_price);
        check_prices(price, compare_at_price)?;

        if let Some(stock) = form.stock {
            check_stock(stock)?;
        }

        Ok(Self(ProductChanges{
            name: form.name.map(|n| text(n, "name")).transpose()?,
            brand: form.brand.map(|b| text(b, "brand")).transpose()?,
            description: form.description.map(description),
            category: form.category.map(category).transpose()?,
            gender: form.gender
                .map(|g| g.parse::<Gender>().map(|g| g.as_str().to_string()))
                .transpose()?,
            price: form.price,
            compare_at_price: form.compare_at_price,
            stock: form.stock,
            images: form.images.map(images).transpose()?,
            is_featured: form.is_featured,
            updated_at: Some(Utc::now())
        }))
    }
}

fn text(value: String, field: &str) -> Result<String, String>{
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(format!("product {} cannot be empty", field))
    }
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(format!("product {} is longer than {} characters", field, MAX_NAME_LENGTH))
    }
    Ok(value)
}

fn description(value: Option<String>) -> Option<String>{
    value.map(|d| d.trim().to_string()).filter(|d| !d.is_empty())
}

fn category(value: String) -> Result<String, String>{
    text(value, "category").map(|c| c.to_lowercase())
}

fn check_prices(price: i64, compare_at_price: Option<i64>) -> Result<(), String>{
    if price <= 0 {
        return Err("price must be greater than zero".to_string())
    }
    match compare_at_price {
        Some(compare) if compare <= price => {
            Err("compare at price must be greater than price".to_string())
        },
        _ => Ok(())
    }
}

fn check_stock(stock: i32) -> Result<(), String>{
    if stock < 0 {
        Err("stock cannot be negative".to_string())
    } else {
        Ok(())
    }
}

fn images(urls: Vec<String>) -> Result<Vec<String>, String>{
    urls.into_iter()
        .map(|u| u.trim().to_string())
        .map(|u| if u.validate_url() { Ok(u) } else { Err(format!("{} is not a valid image url", u)) })
        .collect()
}
