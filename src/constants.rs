/// Column name constants shared by every pipeline stage.
/// Canonical names are what downstream consumers of the workbook see.

pub const APN: &str = "APN";
pub const PROPERTY_ADDRESS: &str = "Property Address";
pub const CITY: &str = "City";
pub const STATE: &str = "State";
pub const ZIP: &str = "Zip";
pub const COUNTY_FINDER: &str = "County Finder";

// Derived fields appended by the normalizer
pub const APN_NORM: &str = "APN_norm";
pub const ADDR_QUERY: &str = "addr_query";

// Ephemeral merge key, never present in output
pub const APN_KEY: &str = "APN_key";

pub const CONFIDENCE_SCORE: &str = "confidence_score";

/// Canonical fields guaranteed present after normalization, in backfill order.
pub const CANONICAL_FIELDS: [&str; 6] = [APN, PROPERTY_ADDRESS, CITY, STATE, ZIP, COUNTY_FINDER];

/// Case-insensitive raw header aliases for each canonical field.
pub const COLUMN_ALIASES: [(&str, &[&str]); 6] = [
    (APN, &["apn", "parcel", "parcel number", "parcel_number"]),
    (PROPERTY_ADDRESS, &["address", "property address", "site address"]),
    (COUNTY_FINDER, &["county", "county finder", "county_name"]),
    (CITY, &["city", "town"]),
    (STATE, &["state", "st"]),
    (ZIP, &["zip", "zipcode", "postal code"]),
];

/// Case-sensitive parcel headers probed on secondary exports, first hit wins.
pub const SECONDARY_PARCEL_HEADERS: [&str; 5] = ["APN", "Parcel", "Parcel Number", "parcel", "parcel number"];

// Search endpoints used by the link synthesizer
pub const GOOGLE_SEARCH: &str = "https://www.google.com/search?q=";
pub const BING_SEARCH: &str = "https://www.bing.com/search?q=";
pub const WHITEPAGES_ADDRESS: &str = "https://www.whitepages.com/address/";
pub const FASTPEOPLESEARCH_ADDRESS: &str = "https://www.fastpeoplesearch.com/address/";
pub const BEENVERIFIED_SEARCH: &str = "https://www.beenverified.com/people/search/?n=&citystatezip=";
pub const FACEBOOK_SEARCH: &str = "https://www.facebook.com/search/top/?q=";
pub const LINKEDIN_SEARCH: &str = "https://www.linkedin.com/search/results/all/?keywords=";
pub const X_SEARCH: &str = "https://x.com/search?q=";
pub const X_SEARCH_SUFFIX: &str = "&src=typed_query";

// Workbook sheet names
pub const SHEET_ENRICHED: &str = "enriched";
pub const SHEET_META: &str = "meta";
pub const SHEET_COLUMNS: &str = "columns";

pub const WORKBOOK_EXTENSION: &str = "xlsx";
