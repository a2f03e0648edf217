//! Per-campaign sync: catalog fetch, reconciliation and batched upload.
//!
//! Batches go out one at a time in order. A failing batch stops the upload;
//! batches already sent stay applied on the marketplace side.

use crate::clients::marketplace::Marketplace;
use crate::error::Result;
use crate::models::{Campaign, CampaignReport, FeedRecord, PriceEntry, StockEntry};
use crate::reconcile::{reconcile_prices, reconcile_stocks};
use crate::utils::batch::chunked;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Upload stock entries in batches. Returns the number of batches sent.
pub async fn upload_stocks<M>(
    marketplace: &M,
    campaign: &Campaign,
    stocks: &[StockEntry],
) -> Result<usize>
where
    M: Marketplace + ?Sized,
{
    let size = marketplace.batch_limits().stock_batch_size;
    let mut sent = 0;
    for batch in chunked(stocks, size)? {
        let response = marketplace.update_stocks(campaign, batch).await?;
        sent += 1;
        debug!(
            "{} {}: stock batch {} ({} entries) -> {}",
            marketplace.name(),
            campaign.name,
            sent,
            batch.len(),
            response
        );
    }
    Ok(sent)
}

/// Upload price entries in batches. Returns the number of batches sent.
pub async fn upload_prices<M>(
    marketplace: &M,
    campaign: &Campaign,
    prices: &[PriceEntry],
) -> Result<usize>
where
    M: Marketplace + ?Sized,
{
    marketplace.validate_prices(prices)?;

    let size = marketplace.batch_limits().price_batch_size;
    let mut sent = 0;
    for batch in chunked(prices, size)? {
        let response = marketplace.update_prices(campaign, batch).await?;
        sent += 1;
        debug!(
            "{} {}: price batch {} ({} entries) -> {}",
            marketplace.name(),
            campaign.name,
            sent,
            batch.len(),
            response
        );
    }
    Ok(sent)
}

/// Run the full stock and price sync for one campaign.
///
/// `now` stamps every stock entry so a run produces one consistent timestamp.
pub async fn sync_campaign<M>(
    marketplace: &M,
    campaign: &Campaign,
    feed: &[FeedRecord],
    now: DateTime<Utc>,
) -> Result<CampaignReport>
where
    M: Marketplace + ?Sized,
{
    let name = marketplace.name();

    let listing_ids = marketplace.fetch_listing_ids(campaign).await?;
    info!("{} {}: {} listings in catalog", name, campaign.name, listing_ids.len());

    let stocks = reconcile_stocks(
        feed,
        &listing_ids,
        campaign.warehouse_id.as_deref(),
        Some(now),
    )?;
    let in_stock = stocks.iter().filter(|s| s.stock_count != 0).count();
    let stock_batches = upload_stocks(marketplace, campaign, &stocks).await?;
    info!(
        "{} {}: uploaded {} stock entries ({} in stock) in {} batches",
        name,
        campaign.name,
        stocks.len(),
        in_stock,
        stock_batches
    );

    let prices = reconcile_prices(feed, &listing_ids, marketplace.currency_code());
    let price_batches = upload_prices(marketplace, campaign, &prices).await?;
    info!(
        "{} {}: uploaded {} prices in {} batches",
        name,
        campaign.name,
        prices.len(),
        price_batches
    );

    Ok(CampaignReport {
        marketplace: name.to_string(),
        campaign: campaign.name.clone(),
        listings: listing_ids.len(),
        stocks_uploaded: stocks.len(),
        in_stock,
        prices_uploaded: prices.len(),
        stock_batches,
        price_batches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::models::{BatchLimits, ListingId};
    use crate::utils::normalize::price_as_integer;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMarketplace {
        listings: Vec<ListingId>,
        stock_batch: usize,
        price_batch: usize,
        numeric_prices: bool,
        fail_stock_batch: Option<usize>,
        stock_calls: Mutex<Vec<Vec<StockEntry>>>,
        price_calls: Mutex<Vec<Vec<PriceEntry>>>,
    }

    impl RecordingMarketplace {
        fn new(listings: &[&str], stock_batch: usize, price_batch: usize) -> Self {
            Self {
                listings: listings.iter().map(|l| l.to_string()).collect(),
                stock_batch,
                price_batch,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Marketplace for RecordingMarketplace {
        fn name(&self) -> &str {
            "recording"
        }

        fn currency_code(&self) -> &str {
            "RUB"
        }

        fn batch_limits(&self) -> BatchLimits {
            BatchLimits {
                stock_batch_size: self.stock_batch,
                price_batch_size: self.price_batch,
            }
        }

        fn validate_prices(&self, prices: &[PriceEntry]) -> Result<()> {
            if self.numeric_prices {
                for p in prices {
                    price_as_integer(&p.price_value)?;
                }
            }
            Ok(())
        }

        async fn fetch_listing_ids(&self, _campaign: &Campaign) -> Result<Vec<ListingId>> {
            Ok(self.listings.clone())
        }

        async fn update_stocks(
            &self,
            _campaign: &Campaign,
            stocks: &[StockEntry],
        ) -> Result<serde_json::Value> {
            let mut calls = self.stock_calls.lock().unwrap();
            if self.fail_stock_batch == Some(calls.len()) {
                return Err(SyncError::Api {
                    marketplace: "recording".to_string(),
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            calls.push(stocks.to_vec());
            Ok(json!({"result": "ok"}))
        }

        async fn update_prices(
            &self,
            _campaign: &Campaign,
            prices: &[PriceEntry],
        ) -> Result<serde_json::Value> {
            self.price_calls.lock().unwrap().push(prices.to_vec());
            Ok(json!({"result": "ok"}))
        }
    }

    fn feed() -> Vec<FeedRecord> {
        vec![
            FeedRecord::new("A", ">10", "1 000 руб."),
            FeedRecord::new("B", "1", "500"),
            FeedRecord::new("Z", "7", "900"),
        ]
    }

    #[tokio::test]
    async fn test_sync_campaign_end_to_end() {
        let marketplace = RecordingMarketplace::new(&["A", "B", "C"], 2, 10);
        let campaign = Campaign::new("FBS", "1").with_warehouse("wh");
        let now = Utc::now();

        let report = sync_campaign(&marketplace, &campaign, &feed(), now)
            .await
            .unwrap();

        assert_eq!(report.listings, 3);
        assert_eq!(report.stocks_uploaded, 3);
        assert_eq!(report.in_stock, 1);
        assert_eq!(report.stock_batches, 2);
        assert_eq!(report.prices_uploaded, 2);
        assert_eq!(report.price_batches, 1);

        let stock_calls = marketplace.stock_calls.lock().unwrap();
        assert_eq!(stock_calls.len(), 2);
        assert_eq!(stock_calls[0].len(), 2);
        assert_eq!(stock_calls[1].len(), 1);
        let all: Vec<&StockEntry> = stock_calls.iter().flatten().collect();
        assert!(all
            .iter()
            .all(|s| s.updated_at == Some(now) && s.warehouse_id.as_deref() == Some("wh")));

        let price_calls = marketplace.price_calls.lock().unwrap();
        let priced: Vec<&str> = price_calls[0].iter().map(|p| p.listing_id.as_str()).collect();
        assert_eq!(priced, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_failed_batch_stops_upload() {
        let mut marketplace = RecordingMarketplace::new(&["A", "B", "C", "D", "E"], 2, 10);
        marketplace.fail_stock_batch = Some(1);
        let campaign = Campaign::new("seller", "");

        let err = sync_campaign(&marketplace, &campaign, &feed(), Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_transport());

        // First batch applied, later batches and prices never attempted
        assert_eq!(marketplace.stock_calls.lock().unwrap().len(), 1);
        assert!(marketplace.price_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_price_rejected_before_upload() {
        let mut marketplace = RecordingMarketplace::new(&["A", "B"], 10, 1);
        marketplace.numeric_prices = true;
        let feed = vec![
            FeedRecord::new("A", "2", "100"),
            FeedRecord::new("B", "2", "по запросу"),
        ];

        let err = sync_campaign(&marketplace, &Campaign::new("FBS", "1"), &feed, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidPrice(_)));
        assert!(marketplace.price_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_invalid_argument() {
        let marketplace = RecordingMarketplace::new(&["A"], 0, 10);
        let err = upload_stocks(&marketplace, &Campaign::new("x", ""), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_empty_catalog_sends_nothing() {
        let marketplace = RecordingMarketplace::new(&[], 10, 10);
        let report = sync_campaign(&marketplace, &Campaign::new("x", ""), &feed(), Utc::now())
            .await
            .unwrap();
        assert_eq!(report.stock_batches, 0);
        assert_eq!(report.price_batches, 0);
        assert!(marketplace.stock_calls.lock().unwrap().is_empty());
    }
}
