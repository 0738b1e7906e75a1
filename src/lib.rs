//! zipindustry - Top industries for the county behind a U.S. ZIP code
//!
//! Resolves a ZIP to its county, ranks the county's industries by employees,
//! establishments, or payroll, and drills down through NAICS codes.
//!
//! # Modules
//!
//! - `models` - ZIP codes, counties, CBP records, rankings, taxonomy entries
//! - `taxonomy` - NAICS sector list, code arithmetic, static fallback table
//! - `api` - API clients (HUD crosswalk, Census CBP, NAICS taxonomy)
//! - `explorer` - Orchestration across the three APIs
//! - `config` - Config file and credentials
//! - `cli` / `commands` - Scriptable command line

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod explorer;
pub mod logging;
pub mod models;
pub mod taxonomy;

// Re-export commonly used types
pub use models::{
    ChildCodes, ChildSource, County, CountyTotals, IndustryNode, IndustryRecord, IndustryReport,
    IndustryTree, Metric, RankedIndustry, TaxonomyEntry, ZipCode,
};

pub use api::{CensusClient, GeoClient, NaicsClient};
pub use config::Config;
pub use explorer::{ExplorerError, IndustryExplorer};
