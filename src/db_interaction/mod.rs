mod user;
mod products;
mod cart;
mod orders;
mod payments;
mod stats;

pub use user::*;
pub use products::*;
pub use cart::*;
pub use orders::*;
pub use payments::*;
pub use stats::*;
