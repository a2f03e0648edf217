pub mod marketplace;
pub mod ozon;
pub mod yandex;

// Re-export commonly used types
pub use marketplace::Marketplace;
pub use ozon::{OzonClient, OzonCredentials};
pub use yandex::YandexMarketClient;
