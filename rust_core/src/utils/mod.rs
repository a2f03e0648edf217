pub mod batch;
pub mod normalize;

pub use batch::chunked;
pub use normalize::{normalize_price, normalize_stock, price_as_integer};
