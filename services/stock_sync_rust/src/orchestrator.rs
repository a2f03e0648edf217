//! Top-level sync run across all configured marketplaces.
//!
//! The feed is loaded once per run. Each marketplace then processes its
//! campaigns in order; the first failing campaign ends that marketplace's run
//! (its later campaigns are skipped) while other marketplaces still run.

use crate::config::Config;
use chrono::{DateTime, Utc};
use serde::Serialize;
use stock_sync_core::clients::{Marketplace, OzonClient, YandexMarketClient};
use stock_sync_core::feed::{FeedSource, HttpFeedLoader};
use stock_sync_core::sync::sync_campaign;
use stock_sync_core::{Campaign, CampaignReport, FailureKind, SyncError};
use tracing::{error, info, warn};

/// A marketplace together with the campaigns to sync on it.
pub struct SyncTarget {
    pub marketplace: Box<dyn Marketplace>,
    pub campaigns: Vec<Campaign>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    /// "feed" or "<marketplace>/<campaign>"
    pub scope: String,
    #[serde(skip)]
    pub kind: Option<FailureKind>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub reports: Vec<CampaignReport>,
    pub failures: Vec<SyncFailure>,
    /// "<marketplace>/<campaign>" entries not attempted after an earlier failure
    pub skipped: Vec<String>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    pub fn log(&self) {
        for report in &self.reports {
            info!(
                "{}/{}: {} listings, {} stocks ({} in stock), {} prices",
                report.marketplace,
                report.campaign,
                report.listings,
                report.stocks_uploaded,
                report.in_stock,
                report.prices_uploaded
            );
        }
        for scope in &self.skipped {
            warn!("{}: skipped after earlier failure", scope);
        }
        if self.is_success() {
            info!("Stock sync finished: {} campaigns synced", self.reports.len());
        } else {
            error!(
                "Stock sync finished with {} failures ({} campaigns synced, {} skipped)",
                self.failures.len(),
                self.reports.len(),
                self.skipped.len()
            );
        }
    }
}

fn report_failure(scope: &str, err: &SyncError) -> SyncFailure {
    let kind = err.kind();
    match kind {
        FailureKind::Timeout => error!("{}: request timed out: {}", scope, err),
        FailureKind::Connection => error!("{}: connection error: {}", scope, err),
        _ => error!("{}: sync failed: {}", scope, err),
    }
    SyncFailure {
        scope: scope.to_string(),
        kind: Some(kind),
        message: err.to_string(),
    }
}

pub struct Orchestrator {
    feed: Box<dyn FeedSource>,
    targets: Vec<SyncTarget>,
}

impl Orchestrator {
    pub fn new(feed: Box<dyn FeedSource>, targets: Vec<SyncTarget>) -> Self {
        Self { feed, targets }
    }

    /// Build the HTTP feed loader and marketplace clients from `config`.
    pub fn from_config(config: &Config) -> stock_sync_core::Result<Self> {
        let feed = HttpFeedLoader::new(config.feed.clone())?;
        let mut targets = Vec::new();

        if let Some(ozon) = &config.ozon {
            let client = match &ozon.base_url {
                Some(url) => OzonClient::with_base_url(
                    url.clone(),
                    ozon.credentials.clone(),
                    config.http_timeout,
                )?,
                None => OzonClient::new(ozon.credentials.clone(), config.http_timeout)?,
            };
            targets.push(SyncTarget {
                marketplace: Box::new(client.with_batch_limits(ozon.limits)),
                campaigns: vec![Campaign::new("seller", "")],
            });
        }

        if let Some(market) = &config.market {
            let client = match &market.base_url {
                Some(url) => YandexMarketClient::with_base_url(
                    url.clone(),
                    market.access_token.clone(),
                    config.http_timeout,
                )?,
                None => YandexMarketClient::new(market.access_token.clone(), config.http_timeout)?,
            };
            targets.push(SyncTarget {
                marketplace: Box::new(client.with_batch_limits(market.limits)),
                campaigns: market.campaigns.clone(),
            });
        }

        Ok(Self::new(Box::new(feed), targets))
    }

    pub async fn run(&self) -> RunSummary {
        self.run_at(Utc::now()).await
    }

    /// Run every target, stamping stock updates with `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunSummary {
        let mut summary = RunSummary::default();

        let feed = match self.feed.load().await {
            Ok(feed) => feed,
            Err(e) => {
                summary.failures.push(report_failure("feed", &e));
                for target in &self.targets {
                    for campaign in &target.campaigns {
                        summary
                            .skipped
                            .push(format!("{}/{}", target.marketplace.name(), campaign.name));
                    }
                }
                return summary;
            }
        };
        info!("Feed loaded: {} records", feed.len());

        for target in &self.targets {
            let name = target.marketplace.name();
            let mut campaigns = target.campaigns.iter();

            for campaign in campaigns.by_ref() {
                let scope = format!("{}/{}", name, campaign.name);
                info!("{}: starting sync", scope);
                match sync_campaign(target.marketplace.as_ref(), campaign, &feed, now).await {
                    Ok(report) => summary.reports.push(report),
                    Err(e) => {
                        summary.failures.push(report_failure(&scope, &e));
                        break;
                    }
                }
            }

            summary
                .skipped
                .extend(campaigns.map(|c| format!("{}/{}", name, c.name)));
        }

        summary
    }
}
