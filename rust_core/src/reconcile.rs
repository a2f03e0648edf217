//! Reconciliation of the stock feed against a marketplace catalog.
//!
//! Stock is zero-filled: every listing the marketplace knows about gets exactly
//! one entry, and listings the feed does not mention are reported as empty.
//! Prices are only produced for listings the feed mentions.

use crate::error::Result;
use crate::models::{FeedRecord, ListingId, PriceEntry, StockEntry};
use crate::utils::normalize::{normalize_price, normalize_stock};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Build the stock list for one campaign.
///
/// Feed order comes first (the first occurrence of a code wins), followed by
/// the catalog listings the feed did not cover, in catalog order. A malformed
/// quantity on a matched record aborts the whole pass.
pub fn reconcile_stocks(
    feed: &[FeedRecord],
    listing_ids: &[ListingId],
    warehouse_id: Option<&str>,
    updated_at: Option<DateTime<Utc>>,
) -> Result<Vec<StockEntry>> {
    let catalog: HashSet<&str> = listing_ids.iter().map(String::as_str).collect();
    let mut emitted: HashSet<&str> = HashSet::with_capacity(catalog.len());
    let mut stocks = Vec::with_capacity(catalog.len());

    let entry = |listing_id: &str, stock_count: u32| StockEntry {
        listing_id: listing_id.to_string(),
        warehouse_id: warehouse_id.map(str::to_string),
        stock_count,
        updated_at,
    };

    for record in feed {
        let code = record.code.as_str();
        if catalog.contains(code) && !emitted.contains(code) {
            let count = normalize_stock(&record.quantity)?;
            emitted.insert(code);
            stocks.push(entry(code, count));
        }
    }

    for listing_id in listing_ids {
        if emitted.insert(listing_id.as_str()) {
            stocks.push(entry(listing_id, 0));
        }
    }

    Ok(stocks)
}

/// Build the price list for one campaign.
///
/// Every feed record whose code is in the catalog yields an entry, so a code
/// repeated in the feed is priced once per occurrence.
pub fn reconcile_prices(
    feed: &[FeedRecord],
    listing_ids: &[ListingId],
    currency_code: &str,
) -> Vec<PriceEntry> {
    let catalog: HashSet<&str> = listing_ids.iter().map(String::as_str).collect();

    feed.iter()
        .filter(|record| catalog.contains(record.code.as_str()))
        .map(|record| PriceEntry {
            listing_id: record.code.clone(),
            price_value: normalize_price(&record.price),
            currency_code: currency_code.to_string(),
        })
        .collect()
}
