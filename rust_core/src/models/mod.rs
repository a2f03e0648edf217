// Shared models for stock sync services
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marketplace listing identifier (Ozon `offer_id`, Yandex `shopSku`).
pub type ListingId = String;

// ============================================================================
// Feed
// ============================================================================

/// One row of the distributor stock feed.
///
/// Fields are kept as the feed's free text; normalization happens during
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRecord {
    /// "Код" column, matched against listing identifiers
    pub code: String,
    /// "Количество" column, e.g. "5", "1" or ">10"
    pub quantity: String,
    /// "Цена" column, e.g. "3 490 руб."
    pub price: String,
}

impl FeedRecord {
    pub fn new(
        code: impl Into<String>,
        quantity: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            quantity: quantity.into(),
            price: price.into(),
        }
    }
}

// ============================================================================
// Reconciliation output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub listing_id: ListingId,
    pub warehouse_id: Option<String>,
    pub stock_count: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub listing_id: ListingId,
    /// Digits only; empty when the feed price could not be parsed
    pub price_value: String,
    pub currency_code: String,
}

// ============================================================================
// Campaigns
// ============================================================================

/// A marketplace selling context with its own catalog and warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    /// Label used in logs and reports, e.g. "FBS"
    pub name: String,
    /// Marketplace campaign id; empty for marketplaces with a single implicit catalog
    pub campaign_id: String,
    pub warehouse_id: Option<String>,
}

impl Campaign {
    pub fn new(name: impl Into<String>, campaign_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            campaign_id: campaign_id.into(),
            warehouse_id: None,
        }
    }

    pub fn with_warehouse(mut self, warehouse_id: impl Into<String>) -> Self {
        self.warehouse_id = Some(warehouse_id.into());
        self
    }
}

/// Per-request item limits of a marketplace update API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub stock_batch_size: usize,
    pub price_batch_size: usize,
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub marketplace: String,
    pub campaign: String,
    pub listings: usize,
    pub stocks_uploaded: usize,
    /// Stock entries with a non-zero count
    pub in_stock: usize,
    pub prices_uploaded: usize,
    pub stock_batches: usize,
    pub price_batches: usize,
}
