use std::fmt;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

static GOOGLE_SHEET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://docs\.google\.com/spreadsheets/d/([A-Za-z0-9_-]+)").expect("static regex")
});
static SHEET_GID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?#&]gid=(\d+)").expect("static regex"));

/// Where a table comes from: a local file or a shared link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    File(PathBuf),
    Link(String),
}

impl SourceRef {
    /// Anything starting with http:// or https:// is a link, everything else a path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceRef::Link(trimmed.to_string())
        } else {
            SourceRef::File(PathBuf::from(trimmed))
        }
    }

    /// Name handed to the loader to pick its first parse attempts.
    pub fn name_hint(&self) -> String {
        match self {
            SourceRef::File(path) => path.to_string_lossy().to_string(),
            SourceRef::Link(url) if GOOGLE_SHEET.is_match(url) => "shared_sheet.csv".to_string(),
            SourceRef::Link(url) => url
                .split(['?', '#'])
                .next()
                .unwrap_or(url)
                .to_string(),
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::File(path) => write!(f, "{}", path.display()),
            SourceRef::Link(url) => write!(f, "{}", url),
        }
    }
}

/// Download URL for a shared link. Google Sheets links become their CSV
/// export for the referenced tab (first tab when no gid is present); other
/// links are returned unchanged.
pub fn resolve_sheet_link(url: &str) -> String {
    match GOOGLE_SHEET.captures(url) {
        Some(caps) => {
            let gid = SHEET_GID
                .captures(url)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .unwrap_or("0");
            format!(
                "https://docs.google.com/spreadsheets/d/{}/export?format=csv&gid={}",
                &caps[1], gid
            )
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_sheet_links_resolve_to_csv_export() {
        assert_eq!(
            resolve_sheet_link("https://docs.google.com/spreadsheets/d/1AbC_d-9/edit#gid=42"),
            "https://docs.google.com/spreadsheets/d/1AbC_d-9/export?format=csv&gid=42"
        );
        assert_eq!(
            resolve_sheet_link("https://docs.google.com/spreadsheets/d/XYZ/edit?usp=sharing"),
            "https://docs.google.com/spreadsheets/d/XYZ/export?format=csv&gid=0"
        );
    }

    #[test]
    fn test_other_links_are_unchanged() {
        let url = "https://example.com/exports/leads.xlsx?token=abc";
        assert_eq!(resolve_sheet_link(url), url);
    }

    #[test]
    fn test_source_ref_parse_and_hint() {
        assert_eq!(SourceRef::parse(" leads.csv "), SourceRef::File(PathBuf::from("leads.csv")));

        let link = SourceRef::parse("HTTPS://example.com/a/leads.xlsx?x=1");
        assert!(matches!(link, SourceRef::Link(_)));
        assert_eq!(link.name_hint(), "HTTPS://example.com/a/leads.xlsx");

        let sheet = SourceRef::parse("https://docs.google.com/spreadsheets/d/abc/edit");
        assert_eq!(sheet.name_hint(), "shared_sheet.csv");
    }
}
