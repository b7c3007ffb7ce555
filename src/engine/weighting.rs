use chrono::{DateTime, Duration, Utc};

/// Weights are multiples of 0.2; scores are summed in these units.
pub const UNITS_PER_WEIGHT: u32 = 5;

/// Weight used when a record has no starred-at timestamp.
pub const DEFAULT_WEIGHT_UNITS: u32 = 1;

// (max age in days, inclusive; weight in fifths)
const TIERS: [(i64, u32); 4] = [(30, 5), (90, 4), (180, 3), (365, 2)];

/// Recency tier of a star in fifths: 5 for the last 30 days down to 1 for
/// anything older than a year.
pub fn weight_units(starred_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let age = now.signed_duration_since(starred_at);
    TIERS
        .iter()
        .find(|(days, _)| age <= Duration::days(*days))
        .map(|(_, units)| *units)
        .unwrap_or(DEFAULT_WEIGHT_UNITS)
}

pub fn weight_units_or_default(starred_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    starred_at.map_or(DEFAULT_WEIGHT_UNITS, |at| weight_units(at, now))
}

/// Decay weight for a star of the given age: 1.0, 0.8, 0.6, 0.4 or 0.2.
pub fn weight(starred_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    to_weight(weight_units(starred_at, now))
}

/// Like [`weight`], returning 0.2 when the timestamp is unknown.
pub fn weight_or_default(starred_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    to_weight(weight_units_or_default(starred_at, now))
}

fn to_weight(units: u32) -> f64 {
    units as f64 / UNITS_PER_WEIGHT as f64
}
