//! NAICS taxonomy client
//!
//! Resolves a parent industry code to its children. Strategies are tried
//! in order: the code's own listing, a keyword search, then the built-in
//! subsector table. Resolutions are cached for the life of the client.

use anyhow::Result;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::{ChildCodes, ChildSource, TaxonomyEntry};
use crate::taxonomy;

/// Taxonomy API error types
#[derive(Error, Debug)]
pub enum NaicsError {
    #[error("Invalid NAICS code: {0}")]
    InvalidCode(String),

    #[error("Code not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// NAICS taxonomy client with an in-memory child cache
pub struct NaicsClient {
    base_url: String,
    year: u16,
    client: reqwest::Client,
    cache: Mutex<HashMap<String, ChildCodes>>,
}

impl NaicsClient {
    /// Create a client for the given NAICS vintage
    pub fn new(year: u16) -> Self {
        Self::with_base_url(year, "https://api.naics.us/v0")
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(year: u16, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            year,
            client: super::http_client(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(NaicsError::from)?;

        match response.status() {
            StatusCode::OK => {
                let body = response.text().await.map_err(NaicsError::from)?;
                let parsed: T = serde_json::from_str(&body)
                    .map_err(|e| NaicsError::InvalidResponse(format!("JSON parse error: {}", e)))?;
                Ok(parsed)
            }
            StatusCode::NOT_FOUND => Err(NaicsError::NotFound(endpoint.to_string()).into()),
            status => Err(NaicsError::ServerError(status.as_u16()).into()),
        }
    }

    /// The code's own record, including the children it lists
    pub async fn lookup(&self, code: &str) -> Result<CodeRecord> {
        let endpoint = format!(
            "/q?year={}&code={}",
            self.year,
            urlencoding::encode(code)
        );
        let raw: CodeRecordRaw = self.get(&endpoint).await?;
        raw.into_record()
            .ok_or_else(|| NaicsError::NotFound(code.to_string()).into())
    }

    /// Keyword search across the taxonomy
    pub async fn search(&self, terms: &str) -> Result<Vec<TaxonomyEntry>> {
        let endpoint = format!(
            "/s?year={}&terms={}",
            self.year,
            urlencoding::encode(terms)
        );
        let raw: Vec<EntryRaw> = self.get(&endpoint).await?;
        Ok(raw.into_iter().filter_map(EntryRaw::into_entry).collect())
    }

    /// Children of `parent`, resolved through listing → search → static table
    ///
    /// An empty result from a strategy falls through to the next one. Only
    /// API-backed answers are cached, so a static fallback is retried later.
    pub async fn children(&self, parent: &str) -> Result<ChildCodes> {
        if !taxonomy::is_valid_code(parent) {
            return Err(NaicsError::InvalidCode(parent.to_string()).into());
        }

        if let Some(hit) = self.cache.lock().await.get(parent) {
            debug!(parent, source = %hit.source, "Taxonomy cache hit");
            return Ok(hit.clone());
        }

        let mut title = taxonomy::static_title(parent).map(String::from);

        match self.children_by_listing(parent).await {
            Ok((found_title, children)) => {
                if title.is_none() {
                    title = found_title;
                }
                if !children.is_empty() {
                    return Ok(self.remember(parent, ChildSource::Listing, children).await);
                }
                debug!(parent, "Listing had no children, trying search");
            }
            Err(e) => warn!(parent, error = %e, "Listing failed, trying search"),
        }

        match self.children_by_search(parent, title.as_deref()).await {
            Ok(children) if !children.is_empty() => {
                return Ok(self.remember(parent, ChildSource::Search, children).await);
            }
            Ok(_) => debug!(parent, "Search had no children, using static table"),
            Err(e) => warn!(parent, error = %e, "Search failed, using static table"),
        }

        let children = taxonomy::static_children(parent);
        info!(parent, count = children.len(), "Static taxonomy fallback");
        Ok(ChildCodes {
            parent: parent.to_string(),
            source: ChildSource::Static,
            children,
        })
    }

    /// Listing strategy; a ranged sector is listed once per covered prefix
    async fn children_by_listing(
        &self,
        parent: &str,
    ) -> Result<(Option<String>, Vec<TaxonomyEntry>)> {
        let mut title = None;
        let mut candidates = Vec::new();
        let mut last_err = None;

        for code in taxonomy::prefixes(parent) {
            match self.lookup(&code).await {
                Ok(record) => {
                    if title.is_none() && !taxonomy::is_sector_range(parent) {
                        title = Some(record.title);
                    }
                    candidates.extend(record.children);
                }
                Err(e) => last_err = Some(e),
            }
        }

        // Partial coverage of a ranged sector is still an answer
        if candidates.is_empty() {
            if let Some(e) = last_err {
                return Err(e);
            }
        }
        Ok((title, taxonomy::nearest_children(parent, candidates)))
    }

    /// Search strategy: title keywords first, then the bare code
    async fn children_by_search(
        &self,
        parent: &str,
        title: Option<&str>,
    ) -> Result<Vec<TaxonomyEntry>> {
        let mut attempts: Vec<String> = Vec::new();
        if let Some(t) = title {
            attempts.push(search_terms(t));
        }
        attempts.extend(taxonomy::prefixes(parent));

        let mut last_err = None;
        for terms in attempts.into_iter().filter(|t| !t.is_empty()) {
            match self.search(&terms).await {
                Ok(results) => {
                    let children = taxonomy::nearest_children(parent, results);
                    if !children.is_empty() {
                        debug!(
                            parent,
                            terms = %terms,
                            count = children.len(),
                            "Search resolved children"
                        );
                        return Ok(children);
                    }
                }
                Err(e) => last_err = Some(e),
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(Vec::new()),
        }
    }

    async fn remember(
        &self,
        parent: &str,
        source: ChildSource,
        children: Vec<TaxonomyEntry>,
    ) -> ChildCodes {
        let resolved = ChildCodes {
            parent: parent.to_string(),
            source,
            children,
        };
        self.cache
            .lock()
            .await
            .insert(parent.to_string(), resolved.clone());
        resolved
    }

    /// Number of cached parents
    pub async fn cached(&self) -> usize {
        self.cache.lock().await.len()
    }
}

/// Keywords from a title, dropping punctuation and filler words
fn search_terms(title: &str) -> String {
    const STOP: &[&str] = &["and", "or", "the", "of", "for", "except", "related", "other"];
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .filter(|w| !STOP.contains(&w.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A code's record from the listing endpoint
#[derive(Debug, Clone)]
pub struct CodeRecord {
    pub code: String,
    pub title: String,
    pub children: Vec<TaxonomyEntry>,
}

// =============================================================================
// Response Structures (internal deserialization)
// =============================================================================

#[derive(Debug, Deserialize)]
struct CodeRecordRaw {
    code: Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    children: Vec<Value>,
}

impl CodeRecordRaw {
    fn into_record(self) -> Option<CodeRecord> {
        let code = code_string(&self.code)?;
        let children = self
            .children
            .into_iter()
            .filter_map(|child| match child {
                // Children come either as full entries or as bare codes
                Value::Object(_) => serde_json::from_value::<EntryRaw>(child)
                    .ok()
                    .and_then(EntryRaw::into_entry),
                other => code_string(&other).map(|c| {
                    let title = taxonomy::static_title(&c).unwrap_or_default().to_string();
                    TaxonomyEntry::new(c, title)
                }),
            })
            .collect();

        Some(CodeRecord {
            code,
            title: self.title.unwrap_or_default(),
            children,
        })
    }
}

#[derive(Debug, Deserialize)]
struct EntryRaw {
    code: Value,
    #[serde(default)]
    title: Option<String>,
}

impl EntryRaw {
    fn into_entry(self) -> Option<TaxonomyEntry> {
        let code = code_string(&self.code)?;
        Some(TaxonomyEntry::new(code, self.title.unwrap_or_default()))
    }
}

/// Codes arrive as numbers or strings
fn code_string(value: &Value) -> Option<String> {
    let code = match value {
        Value::Number(n) => n.as_u64()?.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    taxonomy::is_valid_code(&code).then_some(code)
}
