//! Census County Business Patterns client
//!
//! Fetches employees, establishments, and payroll per NAICS code for a county.
//! API docs: https://www.census.gov/data/developers/data-sets/cbp-zbp/cbp-api.html

use anyhow::Result;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::StatusCode;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::models::{County, CountyTotals, IndustryRecord, Metric};
use crate::taxonomy::TOTAL_CODE;

/// Default number of in-flight CBP requests during a fan-out
pub const DEFAULT_CONCURRENCY: usize = 6;

/// Census API error types
#[derive(Error, Debug)]
pub enum CensusError {
    #[error("Census API rejected the key ({0})")]
    Unauthorized(u16),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// County Business Patterns client
pub struct CensusClient {
    api_key: Option<String>,
    base_url: String,
    year: u16,
    concurrency: usize,
    client: reqwest::Client,
}

impl CensusClient {
    /// Create a client for the given CBP vintage; the key is optional
    pub fn new(api_key: Option<String>, year: u16) -> Self {
        Self::with_base_url(api_key, year, "https://api.census.gov/data")
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(api_key: Option<String>, year: u16, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: base_url.into(),
            year,
            concurrency: DEFAULT_CONCURRENCY,
            client: super::http_client(),
        }
    }

    /// Limit concurrent requests during fan-out (minimum 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn naics_variable(&self) -> &'static str {
        if self.year >= 2017 {
            "NAICS2017"
        } else {
            "NAICS2012"
        }
    }

    fn build_url(&self, county: &County, code: &str) -> String {
        let var = self.naics_variable();
        let mut url = format!(
            "{}/{}/cbp?get=NAME,{}_LABEL,EMP,ESTAB,PAYANN&for=county:{}&in=state:{}&{}={}",
            self.base_url,
            self.year,
            var,
            county.county_fips,
            county.state_fips,
            var,
            urlencoding::encode(code)
        );
        if let Some(key) = &self.api_key {
            url.push_str("&key=");
            url.push_str(&urlencoding::encode(key));
        }
        url
    }

    /// Raw rows for a county and code, `None` when CBP has no data
    async fn fetch_table(&self, county: &County, code: &str) -> Result<Option<Table>> {
        let url = self.build_url(county, code);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(CensusError::from)?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(CensusError::Unauthorized(response.status().as_u16()).into())
            }
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                return Err(CensusError::BadRequest(body.trim().to_string()).into());
            }
            status => return Err(CensusError::ServerError(status.as_u16()).into()),
        }

        let body = response.text().await.map_err(CensusError::from)?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        // An invalid key yields 200 with an HTML page instead of JSON
        let rows: Vec<Vec<Option<String>>> = serde_json::from_str(&body)
            .map_err(|e| CensusError::InvalidResponse(format!("JSON parse error: {}", e)))?;

        Table::from_rows(rows).map(Some)
    }

    /// CBP row for one NAICS code in a county
    pub async fn industry(&self, county: &County, code: &str) -> Result<Option<IndustryRecord>> {
        let table = self.fetch_table(county, code).await?;
        Ok(table.and_then(|t| t.record(self.naics_variable(), code)))
    }

    /// All-sector totals for a county
    pub async fn county_totals(&self, county: &County) -> Result<Option<CountyTotals>> {
        let Some(table) = self.fetch_table(county, TOTAL_CODE).await? else {
            return Ok(None);
        };
        let county_name = table.first_value("NAME");
        Ok(table
            .record(self.naics_variable(), TOTAL_CODE)
            .map(|record| CountyTotals {
                county_name,
                record,
            }))
    }

    /// Fan out one request per code; codes without data are dropped
    ///
    /// Results come back in the order of `codes`.
    pub async fn industries(
        &self,
        county: &County,
        codes: &[String],
    ) -> Result<Vec<IndustryRecord>> {
        debug!(
            geoid = %county.geoid(),
            codes = codes.len(),
            concurrency = self.concurrency,
            "CBP fan-out"
        );

        let records: Vec<Option<IndustryRecord>> = stream::iter(codes.iter())
            .map(|code| self.industry(county, code))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(records.into_iter().flatten().collect())
    }
}

// =============================================================================
// Response Structures (internal deserialization)
// =============================================================================

/// CBP answers with a header row followed by data rows
#[derive(Debug)]
struct Table {
    columns: HashMap<String, usize>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    fn from_rows(mut rows: Vec<Vec<Option<String>>>) -> Result<Self> {
        if rows.is_empty() {
            return Err(CensusError::InvalidResponse("missing header row".into()).into());
        }
        let header = rows.remove(0);
        let columns = header
            .into_iter()
            .enumerate()
            .filter_map(|(i, name)| name.map(|n| (n, i)))
            .collect();
        Ok(Self { columns, rows })
    }

    fn cell<'a>(&self, row: &'a [Option<String>], column: &str) -> Option<&'a str> {
        let idx = *self.columns.get(column)?;
        row.get(idx)?.as_deref()
    }

    fn metric(&self, row: &[Option<String>], metric: Metric) -> Option<u64> {
        self.cell(row, metric.census_variable()).and_then(parse_count)
    }

    fn first_value(&self, column: &str) -> Option<String> {
        let row = self.rows.first()?;
        self.cell(row, column)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    /// First row matching `code`
    ///
    /// CBP may repeat a code across legal-form or size-class breakdowns; the
    /// first row is the all-establishments figure.
    fn record(&self, naics_var: &str, code: &str) -> Option<IndustryRecord> {
        let label_col = format!("{}_LABEL", naics_var);
        let row = self.rows.iter().find(|row| {
            self.cell(row, naics_var)
                .map(|c| c == code)
                .unwrap_or(true)
        })?;

        Some(IndustryRecord {
            code: code.to_string(),
            label: self
                .cell(row, &label_col)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            employees: self.metric(row, Metric::Employees),
            establishments: self.metric(row, Metric::Establishments),
            payroll: self.metric(row, Metric::Payroll),
        })
    }
}

/// Numeric CBP cell; suppression flags and blanks become `None`
fn parse_count(cell: &str) -> Option<u64> {
    cell.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1234"), Some(1234));
        assert_eq!(parse_count(" 7 "), Some(7));
        assert_eq!(parse_count("N"), None);
        assert_eq!(parse_count("D"), None);
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("-1"), None);
    }

    #[test]
    fn test_table_reads_by_header_name() {
        let rows = vec![
            vec![
                s("EMP"),
                s("NAME"),
                s("NAICS2017_LABEL"),
                s("PAYANN"),
                s("ESTAB"),
                s("NAICS2017"),
            ],
            vec![s("120"), s("Somewhere County"), s("Utilities"), s("9000"), s("4"), s("22")],
        ];
        let table = Table::from_rows(rows).unwrap();
        let record = table.record("NAICS2017", "22").unwrap();
        assert_eq!(record.label, "Utilities");
        assert_eq!(record.employees, Some(120));
        assert_eq!(record.establishments, Some(4));
        assert_eq!(record.payroll, Some(9000));
        assert_eq!(table.first_value("NAME").as_deref(), Some("Somewhere County"));
    }

    #[test]
    fn test_table_null_cells() {
        let rows = vec![
            vec![s("NAICS2017_LABEL"), s("EMP"), s("ESTAB"), s("PAYANN"), s("NAICS2017")],
            vec![s("Mining"), None, s("3"), s("N"), s("21")],
        ];
        let table = Table::from_rows(rows).unwrap();
        let record = table.record("NAICS2017", "21").unwrap();
        assert_eq!(record.employees, None);
        assert_eq!(record.establishments, Some(3));
        assert_eq!(record.payroll, None);
    }

    #[test]
    fn test_table_header_only() {
        let rows = vec![vec![s("EMP"), s("NAICS2017")]];
        let table = Table::from_rows(rows).unwrap();
        assert!(table.record("NAICS2017", "54").is_none());
    }

    #[test]
    fn test_table_empty_is_error() {
        assert!(Table::from_rows(vec![]).is_err());
    }

    #[test]
    fn test_url_includes_key_only_when_set() {
        let county = County::new("51", "059");
        let with_key = CensusClient::with_base_url(Some("abc".into()), 2021, "http://x");
        let url = with_key.build_url(&county, "31-33");
        assert!(url.starts_with("http://x/2021/cbp?get=NAME,NAICS2017_LABEL,EMP,ESTAB,PAYANN"));
        assert!(url.contains("for=county:059&in=state:51"));
        assert!(url.contains("NAICS2017=31-33"));
        assert!(url.ends_with("&key=abc"));

        let without_key = CensusClient::with_base_url(Some(String::new()), 2021, "http://x");
        assert!(!without_key.build_url(&county, "54").contains("key="));
    }

    #[test]
    fn test_naics_variable_by_vintage() {
        assert_eq!(CensusClient::new(None, 2016).naics_variable(), "NAICS2012");
        assert_eq!(CensusClient::new(None, 2021).naics_variable(), "NAICS2017");
    }
}
