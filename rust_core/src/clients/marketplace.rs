//! Marketplace Trait
//!
//! Common interface over the seller APIs the feed is pushed to. Each
//! implementation owns its HTTP client, credentials and wire formats; the
//! sync runner only sees listing ids and reconciled entries.

use crate::error::Result;
use crate::models::{BatchLimits, Campaign, ListingId, PriceEntry, StockEntry};
use async_trait::async_trait;

#[async_trait]
pub trait Marketplace: Send + Sync {
    /// Short name used in logs and reports (e.g. "ozon")
    fn name(&self) -> &str;

    /// Currency code the price API expects
    fn currency_code(&self) -> &str;

    /// Maximum entries per update request
    fn batch_limits(&self) -> BatchLimits;

    /// Reject price entries the price API cannot accept, before any batch is sent.
    fn validate_prices(&self, _prices: &[PriceEntry]) -> Result<()> {
        Ok(())
    }

    /// Page through the catalog and return every listing id of `campaign`.
    ///
    /// Transport failures are returned as-is; nothing is retried.
    async fn fetch_listing_ids(&self, campaign: &Campaign) -> Result<Vec<ListingId>>;

    /// Push one batch of stock entries. Returns the raw response body.
    async fn update_stocks(
        &self,
        campaign: &Campaign,
        stocks: &[StockEntry],
    ) -> Result<serde_json::Value>;

    /// Push one batch of price entries. Returns the raw response body.
    async fn update_prices(
        &self,
        campaign: &Campaign,
        prices: &[PriceEntry],
    ) -> Result<serde_json::Value>;
}
