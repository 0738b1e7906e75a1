//! NAICS 2017 taxonomy: the fixed sector list, code arithmetic, and
//! the static subsector table used when the taxonomy API gives no answer.

use crate::models::TaxonomyEntry;

/// Code CBP uses for the all-sectors county total
pub const TOTAL_CODE: &str = "00";

/// Deepest NAICS level (national industry)
pub const MAX_DEPTH: usize = 6;

/// The 20 sectors County Business Patterns reports, ranged sectors written as CBP writes them
pub const SECTORS: &[(&str, &str)] = &[
    ("11", "Agriculture, Forestry, Fishing and Hunting"),
    ("21", "Mining, Quarrying, and Oil and Gas Extraction"),
    ("22", "Utilities"),
    ("23", "Construction"),
    ("31-33", "Manufacturing"),
    ("42", "Wholesale Trade"),
    ("44-45", "Retail Trade"),
    ("48-49", "Transportation and Warehousing"),
    ("51", "Information"),
    ("52", "Finance and Insurance"),
    ("53", "Real Estate and Rental and Leasing"),
    ("54", "Professional, Scientific, and Technical Services"),
    ("55", "Management of Companies and Enterprises"),
    (
        "56",
        "Administrative and Support and Waste Management and Remediation Services",
    ),
    ("61", "Educational Services"),
    ("62", "Health Care and Social Assistance"),
    ("71", "Arts, Entertainment, and Recreation"),
    ("72", "Accommodation and Food Services"),
    ("81", "Other Services (except Public Administration)"),
    ("99", "Industries not classified"),
];

const SUBSECTORS: &[(&str, &str)] = &[
    ("111", "Crop Production"),
    ("112", "Animal Production and Aquaculture"),
    ("113", "Forestry and Logging"),
    ("114", "Fishing, Hunting and Trapping"),
    ("115", "Support Activities for Agriculture and Forestry"),
    ("211", "Oil and Gas Extraction"),
    ("212", "Mining (except Oil and Gas)"),
    ("213", "Support Activities for Mining"),
    ("221", "Utilities"),
    ("236", "Construction of Buildings"),
    ("237", "Heavy and Civil Engineering Construction"),
    ("238", "Specialty Trade Contractors"),
    ("311", "Food Manufacturing"),
    ("312", "Beverage and Tobacco Product Manufacturing"),
    ("313", "Textile Mills"),
    ("314", "Textile Product Mills"),
    ("315", "Apparel Manufacturing"),
    ("316", "Leather and Allied Product Manufacturing"),
    ("321", "Wood Product Manufacturing"),
    ("322", "Paper Manufacturing"),
    ("323", "Printing and Related Support Activities"),
    ("324", "Petroleum and Coal Products Manufacturing"),
    ("325", "Chemical Manufacturing"),
    ("326", "Plastics and Rubber Products Manufacturing"),
    ("327", "Nonmetallic Mineral Product Manufacturing"),
    ("331", "Primary Metal Manufacturing"),
    ("332", "Fabricated Metal Product Manufacturing"),
    ("333", "Machinery Manufacturing"),
    ("334", "Computer and Electronic Product Manufacturing"),
    (
        "335",
        "Electrical Equipment, Appliance, and Component Manufacturing",
    ),
    ("336", "Transportation Equipment Manufacturing"),
    ("337", "Furniture and Related Product Manufacturing"),
    ("339", "Miscellaneous Manufacturing"),
    ("423", "Merchant Wholesalers, Durable Goods"),
    ("424", "Merchant Wholesalers, Nondurable Goods"),
    ("425", "Wholesale Electronic Markets and Agents and Brokers"),
    ("441", "Motor Vehicle and Parts Dealers"),
    ("442", "Furniture and Home Furnishings Stores"),
    ("443", "Electronics and Appliance Stores"),
    (
        "444",
        "Building Material and Garden Equipment and Supplies Dealers",
    ),
    ("445", "Food and Beverage Stores"),
    ("446", "Health and Personal Care Stores"),
    ("447", "Gasoline Stations"),
    ("448", "Clothing and Clothing Accessories Stores"),
    (
        "451",
        "Sporting Goods, Hobby, Musical Instrument, and Book Stores",
    ),
    ("452", "General Merchandise Stores"),
    ("453", "Miscellaneous Store Retailers"),
    ("454", "Nonstore Retailers"),
    ("481", "Air Transportation"),
    ("482", "Rail Transportation"),
    ("483", "Water Transportation"),
    ("484", "Truck Transportation"),
    ("485", "Transit and Ground Passenger Transportation"),
    ("486", "Pipeline Transportation"),
    ("487", "Scenic and Sightseeing Transportation"),
    ("488", "Support Activities for Transportation"),
    ("491", "Postal Service"),
    ("492", "Couriers and Messengers"),
    ("493", "Warehousing and Storage"),
    ("511", "Publishing Industries (except Internet)"),
    ("512", "Motion Picture and Sound Recording Industries"),
    ("515", "Broadcasting (except Internet)"),
    ("517", "Telecommunications"),
    ("518", "Data Processing, Hosting, and Related Services"),
    ("519", "Other Information Services"),
    ("521", "Monetary Authorities-Central Bank"),
    ("522", "Credit Intermediation and Related Activities"),
    (
        "523",
        "Securities, Commodity Contracts, and Other Financial Investments and Related Activities",
    ),
    ("524", "Insurance Carriers and Related Activities"),
    ("525", "Funds, Trusts, and Other Financial Vehicles"),
    ("531", "Real Estate"),
    ("532", "Rental and Leasing Services"),
    (
        "533",
        "Lessors of Nonfinancial Intangible Assets (except Copyrighted Works)",
    ),
    ("541", "Professional, Scientific, and Technical Services"),
    ("551", "Management of Companies and Enterprises"),
    ("561", "Administrative and Support Services"),
    ("562", "Waste Management and Remediation Services"),
    ("611", "Educational Services"),
    ("621", "Ambulatory Health Care Services"),
    ("622", "Hospitals"),
    ("623", "Nursing and Residential Care Facilities"),
    ("624", "Social Assistance"),
    (
        "711",
        "Performing Arts, Spectator Sports, and Related Industries",
    ),
    ("712", "Museums, Historical Sites, and Similar Institutions"),
    ("713", "Amusement, Gambling, and Recreation Industries"),
    ("721", "Accommodation"),
    ("722", "Food Services and Drinking Places"),
    ("811", "Repair and Maintenance"),
    ("812", "Personal and Laundry Services"),
    (
        "813",
        "Religious, Grantmaking, Civic, Professional, and Similar Organizations",
    ),
    ("814", "Private Households"),
];

/// All sectors as taxonomy entries
pub fn sectors() -> Vec<TaxonomyEntry> {
    SECTORS
        .iter()
        .map(|(code, title)| TaxonomyEntry::new(*code, *title))
        .collect()
}

/// True for CBP's ranged sector codes ("31-33", "44-45", "48-49")
pub fn is_sector_range(code: &str) -> bool {
    code.contains('-')
}

/// A NAICS code is 2 to 6 digits, or one of the ranged sectors
pub fn is_valid_code(code: &str) -> bool {
    if is_sector_range(code) {
        return SECTORS.iter().any(|(c, _)| *c == code);
    }
    (2..=MAX_DEPTH).contains(&code.len()) && code.chars().all(|c| c.is_ascii_digit())
}

/// Level in the hierarchy: sector = 2 ... national industry = 6
pub fn depth(code: &str) -> usize {
    if is_sector_range(code) {
        2
    } else {
        code.len()
    }
}

/// Two-digit prefixes a code covers; a ranged sector expands to all of them
pub fn prefixes(code: &str) -> Vec<String> {
    match code.split_once('-') {
        Some((start, end)) => match (start.parse::<u32>(), end.parse::<u32>()) {
            (Ok(s), Ok(e)) if s <= e => (s..=e).map(|n| n.to_string()).collect(),
            _ => vec![code.to_string()],
        },
        None => vec![code.to_string()],
    }
}

/// Sector code (as CBP writes it) that contains `code`
pub fn sector_of(code: &str) -> Option<&'static str> {
    if code.len() < 2 {
        return None;
    }
    let head = code.get(..2)?;
    SECTORS
        .iter()
        .map(|(c, _)| *c)
        .find(|sector| *sector == code || prefixes(sector).iter().any(|p| p == head))
}

/// Title of a sector or subsector from the built-in tables
pub fn static_title(code: &str) -> Option<&'static str> {
    SECTORS
        .iter()
        .chain(SUBSECTORS.iter())
        .find(|(c, _)| *c == code)
        .map(|(_, t)| *t)
}

/// True when `code` sits strictly below `parent`
pub fn is_descendant(parent: &str, code: &str) -> bool {
    if is_sector_range(code) || code.len() <= depth(parent) {
        return false;
    }
    prefixes(parent).iter().any(|p| code.starts_with(p.as_str()))
}

/// Keep the nearest level of descendants of `parent` among `candidates`
///
/// Direct children sit at the smallest depth below the parent that any
/// candidate occupies, so a skipped level still yields the next one down.
pub fn nearest_children(parent: &str, candidates: Vec<TaxonomyEntry>) -> Vec<TaxonomyEntry> {
    let mut descendants: Vec<TaxonomyEntry> = candidates
        .into_iter()
        .filter(|e| is_descendant(parent, &e.code))
        .collect();

    let Some(level) = descendants.iter().map(|e| e.code.len()).min() else {
        return Vec::new();
    };

    descendants.retain(|e| e.code.len() == level);
    descendants.sort_by(|a, b| a.code.cmp(&b.code));
    descendants.dedup_by(|a, b| a.code == b.code);
    descendants
}

/// Built-in children; covers sector → subsector only
pub fn static_children(parent: &str) -> Vec<TaxonomyEntry> {
    if depth(parent) != 2 {
        return Vec::new();
    }
    let entries = SUBSECTORS
        .iter()
        .map(|(code, title)| TaxonomyEntry::new(*code, *title))
        .collect();
    nearest_children(parent, entries)
}
