//! Data structures and types for zipindustry
//!
//! Contains all shared models used across the application organized by domain:
//! - **Geography**: ZIP codes and the counties they resolve to
//! - **Statistics**: County Business Patterns rows and county totals
//! - **Rankings**: Ranked industries, reports, and drill-down trees
//! - **Taxonomy**: NAICS entries and where they came from

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

// =============================================================================
// Geography Models
// =============================================================================

/// Rejected ZIP code input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid ZIP code '{0}' (expected 5 digits, optionally followed by -NNNN)")]
pub struct InvalidZip(pub String);

/// A validated 5-digit U.S. ZIP code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ZipCode(String);

impl ZipCode {
    /// Parse a ZIP or ZIP+4, keeping the 5-digit part
    pub fn parse(input: &str) -> Result<Self, InvalidZip> {
        static ZIP_RE: OnceLock<Regex> = OnceLock::new();
        let re = ZIP_RE.get_or_init(|| {
            Regex::new(r"^(\d{5})(?:-\d{4})?$").expect("static ZIP regex is valid")
        });

        let trimmed = input.trim();
        re.captures(trimmed)
            .and_then(|c| c.get(1))
            .map(|m| ZipCode(m.as_str().to_string()))
            .ok_or_else(|| InvalidZip(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ZipCode {
    type Err = InvalidZip;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ZipCode {
    type Error = InvalidZip;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ZipCode> for String {
    fn from(zip: ZipCode) -> String {
        zip.0
    }
}

impl fmt::Display for ZipCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A U.S. county identified by its FIPS codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct County {
    /// 2-digit state FIPS code
    pub state_fips: String,
    /// 3-digit county FIPS code
    pub county_fips: String,
    /// Display name, e.g. "Fairfax County, Virginia"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// USPS state abbreviation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Preferred city for the ZIP that produced this county
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl County {
    pub fn new(state_fips: impl Into<String>, county_fips: impl Into<String>) -> Self {
        Self {
            state_fips: state_fips.into(),
            county_fips: county_fips.into(),
            name: None,
            state: None,
            city: None,
        }
    }

    /// Build from a 5-digit GEOID (state + county)
    pub fn from_geoid(geoid: &str) -> Option<Self> {
        if geoid.len() != 5 || !geoid.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Self::new(&geoid[..2], &geoid[2..]))
    }

    /// 5-digit GEOID
    pub fn geoid(&self) -> String {
        format!("{}{}", self.state_fips, self.county_fips)
    }
}

impl fmt::Display for County {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.state) {
            (Some(name), _) => write!(f, "{} [{}]", name, self.geoid()),
            (None, Some(state)) => {
                write!(f, "County {} ({}) [{}]", self.county_fips, state, self.geoid())
            }
            (None, None) => write!(f, "County {}", self.geoid()),
        }
    }
}

// =============================================================================
// Statistics Models (County Business Patterns)
// =============================================================================

/// Ranking metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Employees,
    Establishments,
    Payroll,
}

impl Metric {
    /// CBP variable carrying this metric
    pub fn census_variable(&self) -> &'static str {
        match self {
            Metric::Employees => "EMP",
            Metric::Establishments => "ESTAB",
            Metric::Payroll => "PAYANN",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Employees => "Employees",
            Metric::Establishments => "Establishments",
            Metric::Payroll => "Annual payroll ($1,000)",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One County Business Patterns row for a county and NAICS code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryRecord {
    pub code: String,
    pub label: String,
    pub employees: Option<u64>,
    pub establishments: Option<u64>,
    /// Annual payroll in thousands of dollars
    pub payroll: Option<u64>,
}

impl IndustryRecord {
    pub fn value(&self, metric: Metric) -> Option<u64> {
        match metric {
            Metric::Employees => self.employees,
            Metric::Establishments => self.establishments,
            Metric::Payroll => self.payroll,
        }
    }
}

/// All-sector totals for a county (NAICS "00")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyTotals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub county_name: Option<String>,
    pub record: IndustryRecord,
}

impl CountyTotals {
    pub fn value(&self, metric: Metric) -> Option<u64> {
        self.record.value(metric)
    }

    /// Percent of the county total, if both sides are known and the total is non-zero
    pub fn share(&self, metric: Metric, value: Option<u64>) -> Option<f64> {
        let total = self.value(metric)?;
        let value = value?;
        if total == 0 {
            return None;
        }
        Some(value as f64 * 100.0 / total as f64)
    }
}

// =============================================================================
// Ranking Models
// =============================================================================

/// Industry with its value for the ranking metric and share of the county
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedIndustry {
    pub code: String,
    pub title: String,
    pub value: Option<u64>,
    pub percent: Option<f64>,
    pub employees: Option<u64>,
    pub establishments: Option<u64>,
    pub payroll: Option<u64>,
}

impl RankedIndustry {
    /// Rank a record against county totals
    pub fn from_record(
        record: IndustryRecord,
        metric: Metric,
        totals: Option<&CountyTotals>,
    ) -> Self {
        let value = record.value(metric);
        let percent = totals.and_then(|t| t.share(metric, value));
        Self {
            code: record.code,
            title: record.label,
            value,
            percent,
            employees: record.employees,
            establishments: record.establishments,
            payroll: record.payroll,
        }
    }
}

impl fmt::Display for RankedIndustry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self
            .value
            .map(format_count)
            .unwrap_or_else(|| "n/a".to_string());
        let percent = self
            .percent
            .map(|p| format!("{:>6.2}%", p))
            .unwrap_or_else(|| "     - ".to_string());
        write!(f, "{:<8} {:>12} {}  {}", self.code, value, percent, self.title)
    }
}

/// Ranked industries for a county at one taxonomy level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndustryReport {
    pub county: County,
    pub metric: Metric,
    /// Parent NAICS code, `None` at the sector level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// County total for the metric (the percentage denominator)
    pub total: Option<u64>,
    pub industries: Vec<RankedIndustry>,
}

impl fmt::Display for IndustryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.county)?;
        match &self.parent {
            Some(parent) => writeln!(f, "Top industries under {} by {}", parent, self.metric)?,
            None => writeln!(f, "Top sectors by {}", self.metric)?,
        }
        if let Some(total) = self.total {
            writeln!(f, "County total: {}", format_count(total))?;
        }
        for industry in &self.industries {
            writeln!(f, "{}", industry)?;
        }
        Ok(())
    }
}

/// Drill-down tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndustryNode {
    pub industry: RankedIndustry,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<IndustryNode>,
}

impl IndustryNode {
    pub fn leaf(industry: RankedIndustry) -> Self {
        Self {
            industry,
            children: Vec::new(),
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        writeln!(f, "{}{}", "  ".repeat(level), self.industry)?;
        for child in &self.children {
            child.fmt_indented(f, level + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for IndustryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

/// A drill-down tree rooted at the sector level or at a parent code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndustryTree {
    pub county: County,
    pub metric: Metric,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub total: Option<u64>,
    pub nodes: Vec<IndustryNode>,
}

impl fmt::Display for IndustryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.county)?;
        writeln!(f, "Industries by {}", self.metric)?;
        for node in &self.nodes {
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}

// =============================================================================
// Taxonomy Models
// =============================================================================

/// NAICS code and title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub code: String,
    pub title: String,
}

impl TaxonomyEntry {
    pub fn new(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
        }
    }
}

impl fmt::Display for TaxonomyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<8} {}", self.code, self.title)
    }
}

/// Which strategy resolved a set of child codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildSource {
    Listing,
    Search,
    Static,
}

impl fmt::Display for ChildSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildSource::Listing => write!(f, "listing"),
            ChildSource::Search => write!(f, "search"),
            ChildSource::Static => write!(f, "static"),
        }
    }
}

/// Child codes for a parent plus their provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildCodes {
    pub parent: String,
    pub source: ChildSource,
    pub children: Vec<TaxonomyEntry>,
}

impl fmt::Display for ChildCodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Children of {} (via {})", self.parent, self.source)?;
        for child in &self.children {
            writeln!(f, "{}", child)?;
        }
        Ok(())
    }
}

/// Format a count with thousands separators
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zip_parse() {
        assert_eq!(ZipCode::parse("22031").unwrap().as_str(), "22031");
        assert_eq!(ZipCode::parse(" 22031-4412 ").unwrap().as_str(), "22031");
        assert!(ZipCode::parse("2203").is_err());
        assert!(ZipCode::parse("220311").is_err());
        assert!(ZipCode::parse("abcde").is_err());
        assert!(ZipCode::parse("22031-44").is_err());
    }

    #[test]
    fn test_county_geoid() {
        let county = County::from_geoid("51059").unwrap();
        assert_eq!(county.state_fips, "51");
        assert_eq!(county.county_fips, "059");
        assert_eq!(county.geoid(), "51059");
        assert!(County::from_geoid("5105").is_none());
        assert!(County::from_geoid("51a59").is_none());
    }

    #[test]
    fn test_share() {
        let totals = CountyTotals {
            county_name: None,
            record: IndustryRecord {
                code: "00".into(),
                label: "Total for all sectors".into(),
                employees: Some(200),
                establishments: Some(0),
                payroll: None,
            },
        };
        assert_eq!(totals.share(Metric::Employees, Some(50)), Some(25.0));
        assert_eq!(totals.share(Metric::Employees, None), None);
        assert_eq!(totals.share(Metric::Establishments, Some(3)), None);
        assert_eq!(totals.share(Metric::Payroll, Some(3)), None);
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }
}
