use crate::types::CanonicalLead;

/// Parcel numbers at or above this length earn the full parcel weight.
const APN_FULL_LENGTH: usize = 12;
const ADDRESS_WEIGHT: f64 = 0.5;
const CITY_WEIGHT: f64 = 0.1;
const STATE_WEIGHT: f64 = 0.1;

/// Heuristic completeness score in [0.0, 1.0], rounded to two decimals.
///
/// Parcel length contributes up to 1.0 on its own; address, city and state
/// add fixed weights when non-empty.
pub fn confidence_score(lead: &CanonicalLead) -> f64 {
    let apn_len = lead.apn.chars().count().min(APN_FULL_LENGTH);
    let mut score = apn_len as f64 / APN_FULL_LENGTH as f64;
    if !lead.property_address.is_empty() {
        score += ADDRESS_WEIGHT;
    }
    if !lead.city.is_empty() {
        score += CITY_WEIGHT;
    }
    if !lead.state.is_empty() {
        score += STATE_WEIGHT;
    }
    (score.min(1.0) * 100.0).round() / 100.0
}

/// Cell text for a score, always two decimals.
pub fn format_score(score: f64) -> String {
    format!("{:.2}", score)
}
