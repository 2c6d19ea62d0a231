mod admin;
mod authentication;
mod cart;
mod confirm;
mod health_check;
mod order;
mod payment_methods;
mod products;
mod profile;

pub use admin::*;
pub use authentication::*;
pub use cart::*;
pub use confirm::*;
pub use health_check::*;
pub use order::*;
pub use payment_methods::*;
pub use products::*;
pub use profile::*;
