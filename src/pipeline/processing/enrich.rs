use url::form_urlencoded;

use crate::constants;
use crate::types::{CanonicalLead, Table};

/// Query-string escape: space becomes `+`, everything outside
/// alphanumerics and `_.-~` is percent-encoded.
pub fn quote_plus(text: &str) -> String {
    // form_urlencoded leaves `*` bare and escapes `~`; swap both
    form_urlencoded::byte_serialize(text.as_bytes())
        .collect::<String>()
        .replace('*', "%2A")
        .replace("%7E", "~")
}

/// A family of lookup links derived from one lead row.
///
/// Implementations are pure string construction and never fail.
pub trait LinkSynthesizer {
    /// Short name used in logs and metrics
    fn name(&self) -> &'static str;

    /// Output column names, in the order `links` returns values
    fn columns(&self) -> &'static [&'static str];

    /// Build the link values for one lead
    fn links(&self, lead: &CanonicalLead) -> Vec<String>;

    /// Build a table of this set's columns, one row per input row
    fn synthesize(&self, table: &Table) -> Table {
        let headers = self.columns().iter().map(|c| c.to_string()).collect();
        let rows = (0..table.len())
            .map(|row| {
                self.links(&CanonicalLead::from_row(table, row))
                    .into_iter()
                    .map(Some)
                    .collect()
            })
            .collect();
        Table::from_raw(headers, rows)
    }
}

/// County GIS and property appraiser searches
pub struct GisLinks;

impl LinkSynthesizer for GisLinks {
    fn name(&self) -> &'static str {
        "county"
    }

    fn columns(&self) -> &'static [&'static str] {
        &["GIS_Google", "GIS_Bing", "Appraiser_Search", "GIS_By_Address"]
    }

    fn links(&self, lead: &CanonicalLead) -> Vec<String> {
        let county = &lead.county_finder;
        let state = &lead.state;
        let parcel_query = format!("{} {} GIS parcel {}", county, state, lead.apn);
        let parcel_query = quote_plus(parcel_query.trim());
        let appraiser_query = format!("{} {} property appraiser {}", county, state, lead.apn);
        let address_query = format!("{} {} GIS {}", county, state, lead.addr_query);

        vec![
            format!("{}{}", constants::GOOGLE_SEARCH, parcel_query),
            format!("{}{}", constants::BING_SEARCH, parcel_query),
            format!("{}{}", constants::GOOGLE_SEARCH, quote_plus(appraiser_query.trim())),
            format!("{}{}", constants::GOOGLE_SEARCH, quote_plus(&address_query)),
        ]
    }
}

/// Address searches on general engines and people-search sites
pub struct OsintLinks;

impl LinkSynthesizer for OsintLinks {
    fn name(&self) -> &'static str {
        "osint"
    }

    fn columns(&self) -> &'static [&'static str] {
        &["OSINT_Google_Addr", "OSINT_Bing_Addr", "Whitepages", "FastPeopleSearch", "BeenVerified"]
    }

    fn links(&self, lead: &CanonicalLead) -> Vec<String> {
        let encoded = quote_plus(&lead.addr_query);
        // People-search sites take the address as a hyphenated path segment
        let slug = lead.addr_query.replace(' ', "-");

        vec![
            format!("{}{}", constants::GOOGLE_SEARCH, encoded),
            format!("{}{}", constants::BING_SEARCH, encoded),
            format!("{}{}", constants::WHITEPAGES_ADDRESS, slug),
            format!("{}{}", constants::FASTPEOPLESEARCH_ADDRESS, slug),
            format!("{}{}", constants::BEENVERIFIED_SEARCH, encoded),
        ]
    }
}

/// Address searches on social platforms
pub struct SocialLinks;

impl LinkSynthesizer for SocialLinks {
    fn name(&self) -> &'static str {
        "social"
    }

    fn columns(&self) -> &'static [&'static str] {
        &["Facebook_Search", "LinkedIn_Search", "X_Search"]
    }

    fn links(&self, lead: &CanonicalLead) -> Vec<String> {
        let encoded = quote_plus(&lead.addr_query);
        vec![
            format!("{}{}", constants::FACEBOOK_SEARCH, encoded),
            format!("{}{}", constants::LINKEDIN_SEARCH, encoded),
            format!("{}{}{}", constants::X_SEARCH, encoded, constants::X_SEARCH_SUFFIX),
        ]
    }
}
