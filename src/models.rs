use chrono::{DateTime, Utc};
use diesel::prelude::{AsChangeset, Insertable, Queryable, Selectable};
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::{cart_items, confirmation, order_items, orders, products, users};

#[derive(Queryable, Insertable, Clone)]
#[diesel(table_name = users)]
pub struct User{
    pub user_id : Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub status: Option<String>,
    pub is_admin: bool
}

#[derive(Queryable, Serialize, Deserialize, Debug, Clone)]
pub struct UserProfileInfo{
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>
}

#[derive(Queryable, Insertable)]
#[diesel(table_name = confirmation)]
pub struct ConfirmationMap{
    pub confirmation_id: Uuid,
    pub user_id: Option<Uuid>
}

#[derive(Queryable, Selectable, Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Product{
    pub product_id: Uuid,
    pub name: String,
    pub brand: String,
    pub description: Option<String>,
    pub category: String,
    pub gender: String,
    pub price: i64,
    pub compare_at_price: Option<i64>,
    pub stock: i32,
    pub images: Vec<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>
}

// `None` fields are left untouched by diesel, `Some(None)` writes NULL
#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = products)]
pub struct ProductChanges{
    pub name: Option<String>,
    pub brand: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<String>,
    pub gender: Option<String>,
    pub price: Option<i64>,
    pub compare_at_price: Option<Option<i64>>,
    pub stock: Option<i32>,
    pub images: Option<Vec<String>>,
    pub is_featured: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>
}

#[derive(Queryable, Insertable)]
#[diesel(table_name = cart_items)]
pub struct CartItemModel{
    pub cart_item_id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub added_at: DateTime<Utc>
}

// Cart row joined with the product it points to
#[derive(Queryable, Serialize, Deserialize, Debug, Clone)]
pub struct CartLine{
    pub product_id: Uuid,
    pub name: String,
    pub brand: String,
    pub price: i64,
    pub stock: i32,
    pub images: Vec<String>,
    pub quantity: i32
}

#[derive(Queryable, Selectable, Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Order{
    pub order_id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
    pub payment_method: String,
    pub wallet_provider: Option<String>,
    pub payment_status: String,
    pub payment_reference: Option<String>,
    pub payment_proof_url: Option<String>,
    pub payment_note: Option<String>,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub cod_fee: i64,
    pub total: i64,
    pub shipping_name: String,
    pub shipping_phone: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub notes: Option<String>,
    #[serde(skip)]
    pub idempotency_key: Option<String>,
    pub order_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>
}

#[derive(Queryable, Selectable, Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemModel{
    pub order_item_id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub unit_price: i64,
    pub quantity: i32
}
