//! Industry explorer
//!
//! Ties the three APIs together: ZIP → county, county totals, the sector
//! fan-out, and taxonomy-driven drill-down with percentages of the county.

use anyhow::Result;
use futures::future::{FutureExt, LocalBoxFuture};
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::{CensusClient, GeoClient, NaicsClient};
use crate::config::Config;
use crate::models::{
    ChildCodes, County, CountyTotals, IndustryNode, IndustryRecord, IndustryReport, IndustryTree,
    Metric, RankedIndustry, TaxonomyEntry, ZipCode,
};
use crate::taxonomy;

#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("No County Business Patterns data for {0}")]
    NoData(String),

    #[error("{0} has no child industries")]
    NoChildren(String),

    #[error("{0} is a national industry and has no children")]
    Leaf(String),
}

/// Orchestrates ZIP resolution, statistics, and taxonomy lookups
pub struct IndustryExplorer {
    geo: GeoClient,
    census: CensusClient,
    naics: NaicsClient,
}

impl IndustryExplorer {
    pub fn new(geo: GeoClient, census: CensusClient, naics: NaicsClient) -> Self {
        Self { geo, census, naics }
    }

    /// Build all three clients from config; the HUD token is required
    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config.require_hud_token()?;
        let geo = match &config.endpoints.hud {
            Some(url) => GeoClient::with_base_url(token, url),
            None => GeoClient::new(token),
        };
        Ok(Self::new(geo, census_client(config), naics_client(config)))
    }

    pub async fn resolve_county(&self, zip: &ZipCode) -> Result<County> {
        self.geo.county_for_zip(zip).await
    }

    /// Resolve the ZIP, then rank its county's sectors
    pub async fn report_for_zip(
        &self,
        zip: &ZipCode,
        metric: Metric,
        limit: usize,
    ) -> Result<IndustryReport> {
        let county = self.resolve_county(zip).await?;
        self.top_sectors(&county, metric, limit).await
    }

    /// Rank the fixed sector list for a county
    pub async fn top_sectors(
        &self,
        county: &County,
        metric: Metric,
        limit: usize,
    ) -> Result<IndustryReport> {
        Ok(self.sector_level(county, metric, limit).await?.1)
    }

    /// Rank the children of `parent` for a county
    pub async fn drill_down(
        &self,
        county: &County,
        parent: &str,
        metric: Metric,
        limit: usize,
    ) -> Result<IndustryReport> {
        Ok(self.child_level(county, parent, metric, limit).await?.1)
    }

    /// Drill-down tree `depth` levels deep, rooted at `root` or at the sectors
    ///
    /// `depth == 1` is a flat ranking; each extra level expands every row.
    pub async fn explore(
        &self,
        county: &County,
        root: Option<&str>,
        metric: Metric,
        limit: usize,
        depth: usize,
    ) -> Result<IndustryTree> {
        let (totals, top) = match root {
            Some(code) => self.child_level(county, code, metric, limit).await?,
            None => self.sector_level(county, metric, limit).await?,
        };

        let nodes = self
            .expand(
                &top.county,
                top.industries,
                metric,
                limit,
                depth.saturating_sub(1),
                totals.as_ref(),
            )
            .await?;

        Ok(IndustryTree {
            county: top.county,
            metric,
            root: root.map(String::from),
            total: top.total,
            nodes,
        })
    }

    /// Totals and the sector fan-out, fetched in parallel
    async fn sector_level(
        &self,
        county: &County,
        metric: Metric,
        limit: usize,
    ) -> Result<(Option<CountyTotals>, IndustryReport)> {
        let sectors = taxonomy::sectors();
        let codes: Vec<String> = sectors.iter().map(|s| s.code.clone()).collect();

        let (totals, records) = tokio::try_join!(
            self.census.county_totals(county),
            self.census.industries(county, &codes),
        )?;

        if records.is_empty() {
            return Err(ExplorerError::NoData(county.geoid()).into());
        }

        info!(geoid = %county.geoid(), sectors = records.len(), %metric, "Ranked sectors");
        let report = build_report(county, metric, None, totals.as_ref(), records, &sectors, limit);
        Ok((totals, report))
    }

    /// Children from the taxonomy, then totals and the child fan-out in parallel
    async fn child_level(
        &self,
        county: &County,
        parent: &str,
        metric: Metric,
        limit: usize,
    ) -> Result<(Option<CountyTotals>, IndustryReport)> {
        let children = self.child_codes(parent).await?;
        let codes: Vec<String> = children.children.iter().map(|c| c.code.clone()).collect();

        let (totals, records) = tokio::try_join!(
            self.census.county_totals(county),
            self.census.industries(county, &codes),
        )?;

        let report = self.finish_drill(
            county,
            parent,
            metric,
            limit,
            totals.as_ref(),
            records,
            &children,
        )?;
        Ok((totals, report))
    }

    async fn child_codes(&self, parent: &str) -> Result<ChildCodes> {
        if taxonomy::is_valid_code(parent) && taxonomy::depth(parent) >= taxonomy::MAX_DEPTH {
            return Err(ExplorerError::Leaf(parent.to_string()).into());
        }
        let children = self.naics.children(parent).await?;
        if children.children.is_empty() {
            return Err(ExplorerError::NoChildren(parent.to_string()).into());
        }
        debug!(
            parent,
            source = %children.source,
            count = children.children.len(),
            "Children resolved"
        );
        Ok(children)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_drill(
        &self,
        county: &County,
        parent: &str,
        metric: Metric,
        limit: usize,
        totals: Option<&CountyTotals>,
        records: Vec<IndustryRecord>,
        children: &ChildCodes,
    ) -> Result<IndustryReport> {
        if records.is_empty() {
            return Err(ExplorerError::NoData(format!("{} in {}", parent, county.geoid())).into());
        }
        Ok(build_report(
            county,
            metric,
            Some(parent.to_string()),
            totals,
            records,
            &children.children,
            limit,
        ))
    }

    fn expand<'a>(
        &'a self,
        county: &'a County,
        industries: Vec<RankedIndustry>,
        metric: Metric,
        limit: usize,
        depth: usize,
        totals: Option<&'a CountyTotals>,
    ) -> LocalBoxFuture<'a, Result<Vec<IndustryNode>>> {
        async move {
            let mut nodes = Vec::with_capacity(industries.len());
            for industry in industries {
                if depth == 0 || taxonomy::depth(&industry.code) >= taxonomy::MAX_DEPTH {
                    nodes.push(IndustryNode::leaf(industry));
                    continue;
                }

                let report = match self.child_codes(&industry.code).await {
                    Ok(children) => {
                        let codes: Vec<String> =
                            children.children.iter().map(|c| c.code.clone()).collect();
                        let records = self.census.industries(county, &codes).await?;
                        self.finish_drill(
                            county,
                            &industry.code,
                            metric,
                            limit,
                            totals,
                            records,
                            &children,
                        )
                    }
                    Err(e) => Err(e),
                };

                let children = match report {
                    Ok(report) => {
                        self.expand(county, report.industries, metric, limit, depth - 1, totals)
                            .await?
                    }
                    Err(e) if is_dead_end(&e) => {
                        debug!(code = %industry.code, reason = %e, "Not expanding");
                        Vec::new()
                    }
                    Err(e) => return Err(e),
                };

                nodes.push(IndustryNode { industry, children });
            }
            Ok(nodes)
        }
        .boxed_local()
    }
}

/// Branches that simply stop a tree rather than fail it
fn is_dead_end(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ExplorerError>(),
        Some(ExplorerError::NoData(_) | ExplorerError::NoChildren(_) | ExplorerError::Leaf(_))
    )
}

pub(crate) fn census_client(config: &Config) -> CensusClient {
    let client = match &config.endpoints.census {
        Some(url) => CensusClient::with_base_url(config.census_api_key(), config.cbp_year(), url),
        None => CensusClient::new(config.census_api_key(), config.cbp_year()),
    };
    client.with_concurrency(config.concurrency())
}

pub(crate) fn naics_client(config: &Config) -> NaicsClient {
    match &config.endpoints.naics {
        Some(url) => NaicsClient::with_base_url(config.naics_year(), url),
        None => NaicsClient::new(config.naics_year()),
    }
}

/// Merge records with totals, rank, and truncate (`limit == 0` keeps all)
pub fn build_report(
    county: &County,
    metric: Metric,
    parent: Option<String>,
    totals: Option<&CountyTotals>,
    records: Vec<IndustryRecord>,
    taxonomy_entries: &[TaxonomyEntry],
    limit: usize,
) -> IndustryReport {
    let titles: HashMap<&str, &str> = taxonomy_entries
        .iter()
        .map(|e| (e.code.as_str(), e.title.as_str()))
        .collect();

    let mut industries: Vec<RankedIndustry> = records
        .into_iter()
        .map(|mut record| {
            if record.label.is_empty() {
                if let Some(title) = titles.get(record.code.as_str()) {
                    record.label = title.to_string();
                }
            }
            RankedIndustry::from_record(record, metric, totals)
        })
        .collect();

    industries.sort_by(rank_order);
    if limit > 0 {
        industries.truncate(limit);
    }

    let mut county = county.clone();
    if county.name.is_none() {
        county.name = totals.and_then(|t| t.county_name.clone());
    }

    IndustryReport {
        county,
        metric,
        parent,
        total: totals.and_then(|t| t.value(metric)),
        industries,
    }
}

/// Descending by value, missing values last, ties by code
fn rank_order(a: &RankedIndustry, b: &RankedIndustry) -> Ordering {
    match (a.value, b.value) {
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.code.cmp(&b.code)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.code.cmp(&b.code),
    }
}
