//! Feed value normalization.
//!
//! The distributor feed carries free text in its quantity and price columns.
//! These helpers turn that text into what the marketplace APIs accept.
//!
//! ```rust
//! use stock_sync_core::utils::normalize::{normalize_price, normalize_stock};
//!
//! assert_eq!(normalize_price("3 490 руб."), "3490");
//! assert_eq!(normalize_stock(">10").unwrap(), 100);
//! ```

use crate::error::{Result, SyncError};

/// Feed marker for "more than ten units".
pub const OVERSTOCK_MARKER: &str = ">10";
/// Stock reported for [`OVERSTOCK_MARKER`].
pub const OVERSTOCK_COUNT: u32 = 100;
/// A single remaining unit is held back and reported as zero.
pub const LAST_UNIT_MARKER: &str = "1";

/// Convert a feed price into a string of digits.
///
/// Everything from the first `.` onwards is dropped, then every non-digit
/// character is removed. A price written as `1.990,00` therefore becomes
/// `"1"`. Returns an empty string when no digits remain.
pub fn normalize_price(price: &str) -> String {
    let whole = price.split('.').next().unwrap_or_default();
    whole.chars().filter(char::is_ascii_digit).collect()
}

/// Convert a feed quantity into a stock count.
pub fn normalize_stock(quantity: &str) -> Result<u32> {
    match quantity {
        OVERSTOCK_MARKER => Ok(OVERSTOCK_COUNT),
        LAST_UNIT_MARKER => Ok(0),
        other => other
            .trim()
            .parse::<u32>()
            .map_err(|_| SyncError::InvalidQuantity(other.to_string())),
    }
}

/// Parse a normalized price for APIs that take a numeric value.
pub fn price_as_integer(price_value: &str) -> Result<u64> {
    price_value
        .parse::<u64>()
        .map_err(|_| SyncError::InvalidPrice(price_value.to_string()))
}
