//! API clients for external services
//!
//! - HUD: USPS ZIP → county crosswalk
//! - Census: County Business Patterns statistics
//! - NAICS: Industry taxonomy lookup and search

pub mod census;
pub mod geo;
pub mod naics;

pub use census::CensusClient;
pub use geo::GeoClient;
pub use naics::NaicsClient;

use std::time::Duration;

/// Shared HTTP client configuration for all API clients
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_default()
}
