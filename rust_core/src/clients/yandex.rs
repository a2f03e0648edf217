//! Yandex Market Partner API client.
//!
//! Every call is scoped to a campaign. The offer catalog is paged with an
//! opaque `page_token` until the server stops returning a next token.

use crate::clients::marketplace::Marketplace;
use crate::error::{Result, SyncError};
use crate::models::{BatchLimits, Campaign, ListingId, PriceEntry, StockEntry};
use crate::utils::normalize::price_as_integer;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

const MARKET_API_PROD: &str = "https://api.partner.market.yandex.ru";
const OFFER_PAGE_SIZE: u32 = 200;
pub const MARKET_CURRENCY: &str = "RUR";
const STOCK_TYPE_FIT: &str = "FIT";

pub const DEFAULT_STOCK_BATCH_SIZE: usize = 2000;
pub const DEFAULT_PRICE_BATCH_SIZE: usize = 500;

#[derive(Clone)]
pub struct YandexMarketClient {
    client: Client,
    base_url: String,
    access_token: String,
    limits: BatchLimits,
}

impl std::fmt::Debug for YandexMarketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YandexMarketClient")
            .field("base_url", &self.base_url)
            .field("limits", &self.limits)
            .finish()
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OfferMappingResponse {
    result: OfferMappingPage,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferMappingPage {
    #[serde(default)]
    pub paging: Paging,
    #[serde(default)]
    pub offer_mapping_entries: Vec<OfferMappingEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfferMappingEntry {
    pub offer: Offer,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub shop_sku: String,
}

#[derive(Debug, Serialize)]
struct StocksRequest<'a> {
    skus: Vec<SkuStock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SkuStock<'a> {
    sku: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse_id: Option<&'a str>,
    items: [StockItem; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StockItem {
    count: u32,
    #[serde(rename = "type")]
    item_type: &'static str,
    updated_at: String,
}

#[derive(Debug, Serialize)]
struct PricesRequest<'a> {
    offers: Vec<OfferPrice<'a>>,
}

#[derive(Debug, Serialize)]
struct OfferPrice<'a> {
    id: &'a str,
    price: PriceValue<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceValue<'a> {
    value: u64,
    currency_id: &'a str,
}

/// UTC timestamp without sub-seconds, e.g. `2024-11-13T10:00:00Z`.
fn format_updated_at(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn stocks_request(stocks: &[StockEntry], now: DateTime<Utc>) -> StocksRequest<'_> {
    StocksRequest {
        skus: stocks
            .iter()
            .map(|s| SkuStock {
                sku: &s.listing_id,
                warehouse_id: s.warehouse_id.as_deref(),
                items: [StockItem {
                    count: s.stock_count,
                    item_type: STOCK_TYPE_FIT,
                    updated_at: format_updated_at(s.updated_at.unwrap_or(now)),
                }],
            })
            .collect(),
    }
}

fn prices_request(prices: &[PriceEntry]) -> Result<PricesRequest<'_>> {
    let mut offers = Vec::with_capacity(prices.len());
    for p in prices {
        offers.push(OfferPrice {
            id: &p.listing_id,
            price: PriceValue {
                value: price_as_integer(&p.price_value)?,
                currency_id: &p.currency_code,
            },
        });
    }
    Ok(PricesRequest { offers })
}

/// Warn about `{"status": "ERROR", "errors": [...]}` bodies on 2xx responses.
fn check_envelope(operation: &str, body: &serde_json::Value) {
    if body.get("status").and_then(|s| s.as_str()) == Some("ERROR") {
        let errors = body
            .get("errors")
            .map(|e| e.to_string())
            .unwrap_or_default();
        warn!("Yandex Market {} returned an error envelope: {}", operation, errors);
    }
}

/// Follow `nextPageToken` until the server stops returning one.
async fn collect_shop_skus<F, Fut>(mut fetch_page: F) -> Result<Vec<ListingId>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<OfferMappingPage>>,
{
    let mut page_token = String::new();
    let mut shop_skus = Vec::new();

    loop {
        let page = fetch_page(std::mem::take(&mut page_token)).await?;
        debug!(
            "Yandex Market offer page: {} offers",
            page.offer_mapping_entries.len()
        );
        shop_skus.extend(
            page.offer_mapping_entries
                .into_iter()
                .map(|entry| entry.offer.shop_sku),
        );

        match page.paging.next_page_token {
            Some(token) if !token.is_empty() => page_token = token,
            _ => break,
        }
    }

    Ok(shop_skus)
}

impl YandexMarketClient {
    pub fn new(access_token: String, timeout: Duration) -> Result<Self> {
        Self::with_base_url(MARKET_API_PROD, access_token, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        access_token: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        info!("Yandex Market client initialized");

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
            limits: BatchLimits {
                stock_batch_size: DEFAULT_STOCK_BATCH_SIZE,
                price_batch_size: DEFAULT_PRICE_BATCH_SIZE,
            },
        })
    }

    pub fn with_batch_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    fn campaign_path(campaign: &Campaign, suffix: &str) -> Result<String> {
        if campaign.campaign_id.is_empty() {
            return Err(SyncError::InvalidArgument(format!(
                "campaign {} has no campaign id",
                campaign.name
            )));
        }
        Ok(format!("/campaigns/{}/{}", campaign.campaign_id, suffix))
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                marketplace: self.name().to_string(),
                status,
                body,
            });
        }

        Ok(resp.json().await?)
    }

    /// Fetch one page of offer mappings for `campaign`.
    pub async fn get_offer_mappings(
        &self,
        campaign: &Campaign,
        page_token: &str,
    ) -> Result<OfferMappingPage> {
        let path = Self::campaign_path(campaign, "offer-mapping-entries")?;
        let query = [
            ("page_token", page_token.to_string()),
            ("limit", OFFER_PAGE_SIZE.to_string()),
        ];
        let value = self
            .request::<()>(Method::GET, &path, &query, None)
            .await?;
        let response: OfferMappingResponse = serde_json::from_value(value)?;
        Ok(response.result)
    }
}

#[async_trait]
impl Marketplace for YandexMarketClient {
    fn name(&self) -> &str {
        "yandex-market"
    }

    fn currency_code(&self) -> &str {
        MARKET_CURRENCY
    }

    fn batch_limits(&self) -> BatchLimits {
        self.limits
    }

    fn validate_prices(&self, prices: &[PriceEntry]) -> Result<()> {
        prices
            .iter()
            .try_for_each(|p| price_as_integer(&p.price_value).map(|_| ()))
    }

    async fn fetch_listing_ids(&self, campaign: &Campaign) -> Result<Vec<ListingId>> {
        debug!("Yandex Market campaign {}: fetching offers", campaign.name);
        collect_shop_skus(move |page_token: String| async move {
            self.get_offer_mappings(campaign, &page_token).await
        })
        .await
    }

    async fn update_stocks(
        &self,
        campaign: &Campaign,
        stocks: &[StockEntry],
    ) -> Result<serde_json::Value> {
        let path = Self::campaign_path(campaign, "offers/stocks")?;
        let payload = stocks_request(stocks, Utc::now());
        let body = self
            .request(Method::PUT, &path, &[], Some(&payload))
            .await?;
        check_envelope("stock update", &body);
        Ok(body)
    }

    async fn update_prices(
        &self,
        campaign: &Campaign,
        prices: &[PriceEntry],
    ) -> Result<serde_json::Value> {
        let path = Self::campaign_path(campaign, "offer-prices/updates")?;
        let payload = prices_request(prices)?;
        let body = self
            .request(Method::POST, &path, &[], Some(&payload))
            .await?;
        check_envelope("price update", &body);
        Ok(body)
    }
}
