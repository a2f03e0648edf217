//! Configuration for the stock sync job.
//!
//! Loaded once at startup from the environment (after `.env`). A marketplace
//! is enabled when its credentials are present.

use anyhow::{anyhow, bail, Result};
use stock_sync_core::clients::ozon::{self, OzonCredentials};
use stock_sync_core::clients::yandex;
use stock_sync_core::feed::{FeedConfig, DEFAULT_FEED_ENTRY, DEFAULT_FEED_URL, DEFAULT_HEADER_ROW};
use stock_sync_core::{BatchLimits, Campaign};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct OzonConfig {
    pub credentials: OzonCredentials,
    pub base_url: Option<String>,
    pub limits: BatchLimits,
}

#[derive(Clone)]
pub struct MarketConfig {
    pub access_token: String,
    pub base_url: Option<String>,
    /// FBS first, then DBS
    pub campaigns: Vec<Campaign>,
    pub limits: BatchLimits,
}

impl std::fmt::Debug for MarketConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketConfig")
            .field("base_url", &self.base_url)
            .field("campaigns", &self.campaigns)
            .field("limits", &self.limits)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub feed: FeedConfig,
    pub http_timeout: Duration,
    pub ozon: Option<OzonConfig>,
    pub market: Option<MarketConfig>,
}

/// Environment lookup that treats empty values as unset.
struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key).ok_or_else(|| anyhow!("{} must be set", key))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow!("{} has invalid value {:?}: {}", key, raw, e)),
            None => Ok(default),
        }
    }

    fn batch_size(&self, key: &str, default: usize) -> Result<usize> {
        let size = self.parse_or(key, default)?;
        if size == 0 {
            bail!("{} must be positive", key);
        }
        Ok(size)
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let http_timeout = Duration::from_secs(vars.parse_or("HTTP_TIMEOUT_SECS", 30u64)?);

        let feed = FeedConfig {
            url: vars.get("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            entry: vars
                .get("FEED_ENTRY")
                .unwrap_or_else(|| DEFAULT_FEED_ENTRY.to_string()),
            header_row: vars.parse_or("FEED_HEADER_ROW", DEFAULT_HEADER_ROW)?,
            timeout: http_timeout,
        };

        let ozon = match (vars.get("SELLER_TOKEN"), vars.get("CLIENT_ID")) {
            (Some(api_key), Some(client_id)) => Some(OzonConfig {
                credentials: OzonCredentials { client_id, api_key },
                base_url: vars.get("OZON_BASE_URL"),
                limits: BatchLimits {
                    stock_batch_size: vars
                        .batch_size("OZON_STOCK_BATCH_SIZE", ozon::DEFAULT_STOCK_BATCH_SIZE)?,
                    price_batch_size: vars
                        .batch_size("OZON_PRICE_BATCH_SIZE", ozon::DEFAULT_PRICE_BATCH_SIZE)?,
                },
            }),
            (None, None) => None,
            (Some(_), None) => bail!("CLIENT_ID must be set when SELLER_TOKEN is set"),
            (None, Some(_)) => bail!("SELLER_TOKEN must be set when CLIENT_ID is set"),
        };

        let market_keys = ["FBS_ID", "DBS_ID", "WAREHOUSE_FBS_ID", "WAREHOUSE_DBS_ID"];
        let market = match vars.get("MARKET_TOKEN") {
            Some(access_token) => {
                let fbs = Campaign::new("FBS", vars.require("FBS_ID")?)
                    .with_warehouse(vars.require("WAREHOUSE_FBS_ID")?);
                let dbs = Campaign::new("DBS", vars.require("DBS_ID")?)
                    .with_warehouse(vars.require("WAREHOUSE_DBS_ID")?);
                Some(MarketConfig {
                    access_token,
                    base_url: vars.get("MARKET_BASE_URL"),
                    campaigns: vec![fbs, dbs],
                    limits: BatchLimits {
                        stock_batch_size: vars.batch_size(
                            "MARKET_STOCK_BATCH_SIZE",
                            yandex::DEFAULT_STOCK_BATCH_SIZE,
                        )?,
                        price_batch_size: vars.batch_size(
                            "MARKET_PRICE_BATCH_SIZE",
                            yandex::DEFAULT_PRICE_BATCH_SIZE,
                        )?,
                    },
                })
            }
            None if market_keys.iter().any(|k| vars.get(k).is_some()) => {
                bail!("MARKET_TOKEN must be set when Yandex Market campaigns are configured")
            }
            None => None,
        };

        if ozon.is_none() && market.is_none() {
            bail!("No marketplace configured: set SELLER_TOKEN/CLIENT_ID or MARKET_TOKEN");
        }

        Ok(Self {
            feed,
            http_timeout,
            ozon,
            market,
        })
    }

    /// Log current configuration (secrets omitted)
    pub fn log_config(&self) {
        info!("Config loaded:");
        info!("  feed: {} ({}, header row {})", self.feed.url, self.feed.entry, self.feed.header_row);
        info!("  http_timeout: {}s", self.http_timeout.as_secs());
        match &self.ozon {
            Some(ozon) => info!(
                "  ozon: client ...{} (stock batch {}, price batch {})",
                ozon.credentials.client_id_suffix(),
                ozon.limits.stock_batch_size,
                ozon.limits.price_batch_size
            ),
            None => info!("  ozon: disabled"),
        }
        match &self.market {
            Some(market) => {
                for campaign in &market.campaigns {
                    info!(
                        "  yandex-market {}: campaign {} warehouse {}",
                        campaign.name,
                        campaign.campaign_id,
                        campaign.warehouse_id.as_deref().unwrap_or("-")
                    );
                }
                info!(
                    "  yandex-market batches: stock {}, price {}",
                    market.limits.stock_batch_size, market.limits.price_batch_size
                );
            }
            None => info!("  yandex-market: disabled"),
        }
    }
}
