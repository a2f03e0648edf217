//! Ozon Seller API client.
//!
//! The seller account has one catalog, so the campaign id is unused; products
//! are paged with a `last_id` cursor until the server-reported total has been
//! collected.

use crate::clients::marketplace::Marketplace;
use crate::error::{Result, SyncError};
use crate::models::{BatchLimits, Campaign, ListingId, PriceEntry, StockEntry};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

const OZON_API_PROD: &str = "https://api-seller.ozon.ru";
const PRODUCT_LIST_PAGE_SIZE: u32 = 1000;
pub const OZON_CURRENCY: &str = "RUB";

pub const DEFAULT_STOCK_BATCH_SIZE: usize = 100;
pub const DEFAULT_PRICE_BATCH_SIZE: usize = 1000;

#[derive(Clone)]
pub struct OzonCredentials {
    pub client_id: String,
    pub api_key: String,
}

impl OzonCredentials {
    /// Last four characters of the client id, for logs.
    pub fn client_id_suffix(&self) -> &str {
        let start = self
            .client_id
            .char_indices()
            .rev()
            .nth(3)
            .map_or(0, |(i, _)| i);
        &self.client_id[start..]
    }
}

impl std::fmt::Debug for OzonCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OzonCredentials")
            .field("client_id", &self.client_id_suffix())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct OzonClient {
    client: Client,
    base_url: String,
    credentials: OzonCredentials,
    limits: BatchLimits,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ProductListRequest<'a> {
    filter: ProductFilter,
    last_id: &'a str,
    limit: u32,
}

#[derive(Debug, Serialize)]
struct ProductFilter {
    visibility: &'static str,
}

#[derive(Debug, Deserialize)]
struct ProductListResponse {
    result: ProductPage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductPage {
    #[serde(default)]
    pub items: Vec<ProductItem>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub last_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductItem {
    pub offer_id: String,
    #[serde(default)]
    pub product_id: Option<u64>,
}

#[derive(Debug, Serialize)]
struct StocksRequest<'a> {
    stocks: Vec<OzonStock<'a>>,
}

#[derive(Debug, Serialize)]
struct OzonStock<'a> {
    offer_id: &'a str,
    stock: u32,
}

#[derive(Debug, Serialize)]
struct PricesRequest<'a> {
    prices: Vec<OzonPrice<'a>>,
}

#[derive(Debug, Serialize)]
struct OzonPrice<'a> {
    auto_action_enabled: &'static str,
    currency_code: &'a str,
    offer_id: &'a str,
    old_price: &'static str,
    price: &'a str,
}

fn stocks_request(stocks: &[StockEntry]) -> StocksRequest<'_> {
    StocksRequest {
        stocks: stocks
            .iter()
            .map(|s| OzonStock {
                offer_id: &s.listing_id,
                stock: s.stock_count,
            })
            .collect(),
    }
}

fn prices_request(prices: &[PriceEntry]) -> PricesRequest<'_> {
    PricesRequest {
        prices: prices
            .iter()
            .map(|p| OzonPrice {
                auto_action_enabled: "UNKNOWN",
                currency_code: &p.currency_code,
                offer_id: &p.listing_id,
                old_price: "0",
                price: &p.price_value,
            })
            .collect(),
    }
}

/// Page through the product list until the collected ids reach the reported
/// total. An empty page also ends the walk.
async fn collect_offer_ids<F, Fut>(mut fetch_page: F) -> Result<Vec<ListingId>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<ProductPage>>,
{
    let mut last_id = String::new();
    let mut offer_ids = Vec::new();

    loop {
        let page = fetch_page(std::mem::take(&mut last_id)).await?;
        let received = page.items.len();
        offer_ids.extend(page.items.into_iter().map(|item| item.offer_id));
        debug!(
            "Ozon product page: {} items ({}/{})",
            received,
            offer_ids.len(),
            page.total
        );

        if offer_ids.len() as u64 >= page.total {
            break;
        }
        if received == 0 {
            warn!(
                "Ozon returned an empty page before reaching total {} (have {})",
                page.total,
                offer_ids.len()
            );
            break;
        }
        last_id = page.last_id;
    }

    Ok(offer_ids)
}

impl OzonClient {
    pub fn new(credentials: OzonCredentials, timeout: Duration) -> Result<Self> {
        Self::with_base_url(OZON_API_PROD, credentials, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        credentials: OzonCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        info!(
            "Ozon client initialized (client id ...{})",
            credentials.client_id_suffix()
        );

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
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

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let resp = self
            .client
            .post(&url)
            .header("Client-Id", &self.credentials.client_id)
            .header("Api-Key", &self.credentials.api_key)
            .json(body)
            .send()
            .await?;

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

    /// Fetch one page of the product list starting after `last_id`.
    pub async fn get_product_list(&self, last_id: &str) -> Result<ProductPage> {
        let request = ProductListRequest {
            filter: ProductFilter { visibility: "ALL" },
            last_id,
            limit: PRODUCT_LIST_PAGE_SIZE,
        };
        let value = self.post("/v2/product/list", &request).await?;
        let response: ProductListResponse = serde_json::from_value(value)?;
        Ok(response.result)
    }
}

#[async_trait]
impl Marketplace for OzonClient {
    fn name(&self) -> &str {
        "ozon"
    }

    fn currency_code(&self) -> &str {
        OZON_CURRENCY
    }

    fn batch_limits(&self) -> BatchLimits {
        self.limits
    }

    async fn fetch_listing_ids(&self, _campaign: &Campaign) -> Result<Vec<ListingId>> {
        collect_offer_ids(move |last_id: String| async move {
            self.get_product_list(&last_id).await
        })
        .await
    }

    async fn update_stocks(
        &self,
        _campaign: &Campaign,
        stocks: &[StockEntry],
    ) -> Result<serde_json::Value> {
        self.post("/v1/product/import/stocks", &stocks_request(stocks))
            .await
    }

    async fn update_prices(
        &self,
        _campaign: &Campaign,
        prices: &[PriceEntry],
    ) -> Result<serde_json::Value> {
        self.post("/v1/product/import/prices", &prices_request(prices))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credentials() -> OzonCredentials {
        OzonCredentials {
            client_id: "12345".to_string(),
            api_key: "secret-key".to_string(),
        }
    }

    #[test]
    fn test_stocks_payload() {
        let stocks = vec![
            StockEntry {
                listing_id: "68362".to_string(),
                warehouse_id: None,
                stock_count: 100,
                updated_at: None,
            },
            StockEntry {
                listing_id: "70190".to_string(),
                warehouse_id: None,
                stock_count: 0,
                updated_at: None,
            },
        ];
        let value = serde_json::to_value(stocks_request(&stocks)).unwrap();
        assert_eq!(
            value,
            json!({"stocks": [
                {"offer_id": "68362", "stock": 100},
                {"offer_id": "70190", "stock": 0}
            ]})
        );
    }

    #[test]
    fn test_prices_payload() {
        let prices = vec![PriceEntry {
            listing_id: "68362".to_string(),
            price_value: "12990".to_string(),
            currency_code: OZON_CURRENCY.to_string(),
        }];
        let value = serde_json::to_value(prices_request(&prices)).unwrap();
        assert_eq!(
            value,
            json!({"prices": [{
                "auto_action_enabled": "UNKNOWN",
                "currency_code": "RUB",
                "offer_id": "68362",
                "old_price": "0",
                "price": "12990"
            }]})
        );
    }

    #[test]
    fn test_product_list_request_shape() {
        let request = ProductListRequest {
            filter: ProductFilter { visibility: "ALL" },
            last_id: "",
            limit: PRODUCT_LIST_PAGE_SIZE,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"filter": {"visibility": "ALL"}, "last_id": "", "limit": 1000})
        );
    }

    #[test]
    fn test_parse_product_page() {
        let body = json!({
            "result": {
                "items": [
                    {"product_id": 223681945, "offer_id": "68362"},
                    {"product_id": 223681946, "offer_id": "70190"}
                ],
                "total": 2,
                "last_id": "WzIyMzY4MTk0Nl0="
            }
        });
        let response: ProductListResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.result.total, 2);
        assert_eq!(response.result.items[1].offer_id, "70190");
        assert_eq!(response.result.items[0].product_id, Some(223681945));
    }

    #[test]
    fn test_parse_empty_product_page() {
        let response: ProductListResponse =
            serde_json::from_value(json!({"result": {}})).unwrap();
        assert!(response.result.items.is_empty());
        assert_eq!(response.result.total, 0);
    }

    fn product_page(offer_ids: &[&str], total: u64, last_id: &str) -> ProductPage {
        ProductPage {
            items: offer_ids
                .iter()
                .map(|id| ProductItem {
                    offer_id: id.to_string(),
                    product_id: None,
                })
                .collect(),
            total,
            last_id: last_id.to_string(),
        }
    }

    /// Serve `pages` in order, recording the cursor each request was made with
    async fn walk(pages: Vec<ProductPage>) -> (Result<Vec<ListingId>>, Vec<String>) {
        let mut pages = pages.into_iter();
        let mut cursors = Vec::new();
        let result = collect_offer_ids(|last_id| {
            cursors.push(last_id);
            std::future::ready(
                pages
                    .next()
                    .ok_or_else(|| SyncError::InvalidResponse("no more pages".to_string())),
            )
        })
        .await;
        (result, cursors)
    }

    #[tokio::test]
    async fn test_paging_stops_at_total() {
        let (result, cursors) = walk(vec![
            product_page(&["A", "B"], 5, "c1"),
            product_page(&["C", "D"], 5, "c2"),
            product_page(&["E"], 5, "c3"),
            product_page(&["never"], 5, "c4"),
        ])
        .await;

        assert_eq!(result.unwrap(), vec!["A", "B", "C", "D", "E"]);
        assert_eq!(cursors, vec!["", "c1", "c2"]);
    }

    #[tokio::test]
    async fn test_paging_stops_on_empty_page() {
        let (result, cursors) = walk(vec![
            product_page(&["A", "B"], 10, "c1"),
            product_page(&[], 10, "c1"),
            product_page(&["never"], 10, "c2"),
        ])
        .await;

        assert_eq!(result.unwrap(), vec!["A", "B"]);
        assert_eq!(cursors, vec!["", "c1"]);
    }

    #[tokio::test]
    async fn test_paging_empty_catalog() {
        let (result, cursors) = walk(vec![product_page(&[], 0, "")]).await;
        assert!(result.unwrap().is_empty());
        assert_eq!(cursors.len(), 1);
    }

    #[tokio::test]
    async fn test_paging_propagates_page_error() {
        let (result, cursors) = walk(vec![product_page(&["A"], 3, "c1")]).await;
        assert!(matches!(result, Err(SyncError::InvalidResponse(_))));
        assert_eq!(cursors.len(), 2);
    }

    #[test]
    fn test_client_id_suffix() {
        assert_eq!(credentials().client_id_suffix(), "2345");
        let short = OzonCredentials {
            client_id: "12".to_string(),
            api_key: String::new(),
        };
        assert_eq!(short.client_id_suffix(), "12");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = OzonClient::with_base_url(
            "http://localhost:1/",
            credentials(),
            Duration::from_secs(1),
        )
        .unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret-key"));
        assert!(!debug.contains("12345"));
        assert_eq!(client.base_url, "http://localhost:1");
        assert_eq!(client.batch_limits().stock_batch_size, 100);
        assert_eq!(client.batch_limits().price_batch_size, 1000);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = OzonClient::with_base_url(
            "http://127.0.0.1:9",
            credentials(),
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client
            .fetch_listing_ids(&Campaign::new("seller", ""))
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
