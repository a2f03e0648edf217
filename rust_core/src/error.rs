//! Error types for feed loading, reconciliation and marketplace calls.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{marketplace} API returned status {status}: {body}")]
    Api {
        marketplace: String,
        status: u16,
        body: String,
    },

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid stock quantity: {0:?}")]
    InvalidQuantity(String),

    #[error("Cannot convert price {0:?} to an integer")]
    InvalidPrice(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Feed archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Feed spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Feed is missing column {0:?}")]
    MissingColumn(String),

    #[error("Feed contains no worksheet")]
    EmptyFeed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Coarse classification used for top-level failure reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Connection,
    Api,
    Data,
    Other,
}

impl SyncError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SyncError::Http(e) if e.is_timeout() => FailureKind::Timeout,
            SyncError::Http(e) if e.is_connect() => FailureKind::Connection,
            SyncError::Http(e) if e.is_status() => FailureKind::Api,
            SyncError::Api { .. } => FailureKind::Api,
            SyncError::InvalidQuantity(_)
            | SyncError::InvalidPrice(_)
            | SyncError::MissingColumn(_)
            | SyncError::EmptyFeed
            | SyncError::Json(_)
            | SyncError::InvalidResponse(_) => FailureKind::Data,
            _ => FailureKind::Other,
        }
    }

    /// Network or API-layer failure (never retried here).
    pub fn is_transport(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::Timeout | FailureKind::Connection | FailureKind::Api
        ) || matches!(self, SyncError::Http(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let api = SyncError::Api {
            marketplace: "ozon".to_string(),
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(api.kind(), FailureKind::Api);
        assert!(api.is_transport());

        let qty = SyncError::InvalidQuantity("abc".to_string());
        assert_eq!(qty.kind(), FailureKind::Data);
        assert!(!qty.is_transport());

        let arg = SyncError::InvalidArgument("batch size must be positive".to_string());
        assert_eq!(arg.kind(), FailureKind::Other);
    }

    #[test]
    fn test_display_messages() {
        let err = SyncError::Api {
            marketplace: "yandex-market".to_string(),
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "yandex-market API returned status 401: unauthorized"
        );
        assert_eq!(
            SyncError::MissingColumn("Код".to_string()).to_string(),
            "Feed is missing column \"Код\""
        );
    }
}
