//! HUD USPS crosswalk client
//!
//! Resolves a ZIP code to the county that holds most of its addresses.
//! API docs: https://www.huduser.gov/portal/dataset/uspszip-api.html

use anyhow::Result;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::{County, ZipCode};

/// Crosswalk type for ZIP → county
const ZIP_COUNTY: u8 = 2;

/// ZIP lookup error types
#[derive(Error, Debug)]
pub enum GeoError {
    #[error("No county found for ZIP {0}")]
    NotFound(String),

    #[error("Crosswalk API rejected the credential ({0})")]
    Unauthorized(u16),

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// HUD USPS ZIP crosswalk client
pub struct GeoClient {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeoClient {
    /// Create a new crosswalk client with the given bearer token
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, "https://www.huduser.gov/hudapi/public")
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: base_url.into(),
            client: super::http_client(),
        }
    }

    /// Resolve a ZIP to the county containing it
    pub async fn county_for_zip(&self, zip: &ZipCode) -> Result<County> {
        let url = format!(
            "{}/usps?type={}&query={}",
            self.base_url,
            ZIP_COUNTY,
            zip.as_str()
        );
        debug!(zip = %zip, "Resolving ZIP via crosswalk");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(GeoError::from)?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(GeoError::NotFound(zip.to_string()).into()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(GeoError::Unauthorized(response.status().as_u16()).into())
            }
            status => return Err(GeoError::ServerError(status.as_u16()).into()),
        }

        let body = response.text().await.map_err(GeoError::from)?;
        let parsed: CrosswalkResponse = serde_json::from_str(&body)
            .map_err(|e| GeoError::InvalidResponse(format!("JSON parse error: {}", e)))?;

        let county = parsed
            .data
            .into_primary_county()
            .ok_or_else(|| GeoError::NotFound(zip.to_string()))?;

        debug!(zip = %zip, geoid = %county.geoid(), "ZIP resolved");
        Ok(county)
    }
}

// =============================================================================
// Response Structures (internal deserialization)
// =============================================================================

#[derive(Debug, Deserialize)]
struct CrosswalkResponse {
    data: CrosswalkData,
}

#[derive(Debug, Deserialize)]
struct CrosswalkData {
    #[serde(default)]
    results: Vec<CrosswalkRow>,
}

impl CrosswalkData {
    /// Valid county with the highest total address ratio; the first one wins ties
    fn into_primary_county(self) -> Option<County> {
        let mut best: Option<(f64, County)> = None;
        for row in self.results {
            let ratio = row.total_ratio();
            let Some(county) = row.into_county() else {
                continue;
            };
            let better = match &best {
                Some((current, _)) => ratio > *current,
                None => true,
            };
            if better {
                best = Some((ratio, county));
            }
        }
        best.map(|(_, county)| county)
    }
}

#[derive(Debug, Deserialize)]
struct CrosswalkRow {
    geoid: String,
    // HUD has served ratios as both numbers and strings
    #[serde(default)]
    tot_ratio: Option<Value>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl CrosswalkRow {
    fn total_ratio(&self) -> f64 {
        self.tot_ratio.as_ref().map(parse_ratio).unwrap_or(0.0)
    }

    fn into_county(self) -> Option<County> {
        let mut county = County::from_geoid(self.geoid.trim())?;
        county.state = self.state.filter(|s| !s.is_empty());
        county.city = self.city.filter(|c| !c.is_empty());
        Some(county)
    }
}

fn parse_ratio(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(geoid: &str, ratio: Value) -> CrosswalkRow {
        CrosswalkRow {
            geoid: geoid.to_string(),
            tot_ratio: Some(ratio),
            city: None,
            state: None,
        }
    }

    #[test]
    fn test_parse_ratio() {
        assert_eq!(parse_ratio(&json!(0.75)), 0.75);
        assert_eq!(parse_ratio(&json!("0.25")), 0.25);
        assert_eq!(parse_ratio(&json!(null)), 0.0);
        assert_eq!(parse_ratio(&json!("bogus")), 0.0);
    }

    #[test]
    fn test_primary_county_highest_ratio() {
        let data = CrosswalkData {
            results: vec![row("51059", json!(0.3)), row("51600", json!("0.7"))],
        };
        assert_eq!(data.into_primary_county().unwrap().geoid(), "51600");
    }

    #[test]
    fn test_primary_county_tie_keeps_first() {
        let data = CrosswalkData {
            results: vec![row("06075", json!(0.5)), row("06081", json!(0.5))],
        };
        assert_eq!(data.into_primary_county().unwrap().geoid(), "06075");
    }

    #[test]
    fn test_primary_county_skips_malformed_geoid() {
        let data = CrosswalkData {
            results: vec![row("", json!(0.9)), row("51059", json!(0.1))],
        };
        assert_eq!(data.into_primary_county().unwrap().geoid(), "51059");

        let data = CrosswalkData {
            results: vec![row("5105", json!(0.6)), row("bogus", json!(0.4))],
        };
        assert!(data.into_primary_county().is_none());
    }

    #[test]
    fn test_primary_county_empty() {
        let data = CrosswalkData { results: vec![] };
        assert!(data.into_primary_county().is_none());
    }
}
