//! Stock Sync Core - distributor feed to marketplace stock and price sync.
//!
//! This module provides:
//! - Feed loading (zipped spreadsheet from the distributor)
//! - Value normalization for feed quantities and prices
//! - Reconciliation of the feed against a marketplace catalog
//! - Batching of update payloads to API request limits
//! - Ozon and Yandex Market seller API clients
//! - Per-campaign sync runs with batched, sequential uploads

pub mod clients;
pub mod error;
pub mod feed;
pub mod models;
pub mod reconcile;
pub mod sync;
pub mod utils;

pub use error::{FailureKind, Result, SyncError};
pub use models::*;
