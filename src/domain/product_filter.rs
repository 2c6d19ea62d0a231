use std::str::FromStr;

use serde::Deserialize;

use super::product::Gender;
use crate::utils::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

#[derive(Deserialize, Debug, Default)]
pub struct ProductQuery{
    pub brand: Option<String>,
    pub category: Option<String>,
    pub gender: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort{
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name
}

impl FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(ProductSort::Newest),
            "price_asc" => Ok(ProductSort::PriceAsc),
            "price_desc" => Ok(ProductSort::PriceDesc),
            "name" => Ok(ProductSort::Name),
            other => Err(format!("{} is not a valid sort order", other))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter{
    /// Case-insensitive exact match, escaped for `ILIKE`
    pub brand: Option<String>,
    pub category: Option<String>,
    pub gender: Option<Gender>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub in_stock: bool,
    pub featured: Option<bool>,
    /// Already escaped `ILIKE` pattern
    pub search: Option<String>,
    pub sort: ProductSort,
    pub page: i64,
    pub limit: i64
}

impl ProductFilter {
    pub fn parse(query: ProductQuery) -> Result<ProductFilter, String>{
        if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
            if min > max {
                return Err("min_price cannot be greater than max_price".to_string())
            }
        }

        if query.min_price.is_some_and(|p| p < 0) || query.max_price.is_some_and(|p| p < 0) {
            return Err("prices cannot be negative".to_string())
        }

        let sort = match non_blank(query.sort) {
            Some(s) => s.parse::<ProductSort>()?,
            None => ProductSort::default()
        };

        let gender = non_blank(query.gender)
            .map(|g| g.parse::<Gender>())
            .transpose()?;

        Ok(Self{
            brand: non_blank(query.brand).map(|b| escape_like(&b)),
            category: non_blank(query.category).map(|c| c.to_lowercase()),
            gender,
            min_price: query.min_price,
            max_price: query.max_price,
            in_stock: query.in_stock.unwrap_or(false),
            featured: query.featured,
            search: non_blank(query.search).map(|s| format!("%{}%", escape_like(&s))),
            sort,
            page: query.page.unwrap_or(1).max(1),
            limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn non_blank(value: Option<String>) -> Option<String>{
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn escape_like(term: &str) -> String{
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
