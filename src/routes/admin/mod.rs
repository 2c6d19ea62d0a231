mod orders;
mod payments;
mod products;
mod stats;

pub use orders::*;
pub use payments::*;
pub use products::*;
pub use stats::*;
