pub mod user_email;
pub mod phone_number;
pub mod order_status;
pub mod payment;
pub mod shipping;
pub mod product;
pub mod product_filter;
pub mod pricing;
pub mod money;
