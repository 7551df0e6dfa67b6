//! Result-size limits for read endpoints
//!
//! Every list/export endpoint has a default and a hard maximum. The raw
//! `limit` query value is taken as text so that garbage input falls back to
//! the default instead of rejecting the request.

/// Default and ceiling for one endpoint's `limit` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    pub default: i64,
    pub max: i64,
}

/// GET /api/surveys
pub const LIST_LIMIT: LimitPolicy = LimitPolicy {
    default: 100,
    max: 500,
};

/// GET /api/survey/ndjson
pub const NDJSON_LIMIT: LimitPolicy = LimitPolicy {
    default: 500,
    max: 2000,
};

/// GET /api/surveys/compact
pub const COMPACT_LIMIT: LimitPolicy = LimitPolicy {
    default: 200,
    max: 1000,
};

/// Fixed cap for GET /api/survey/export
pub const EXPORT_CAP: i64 = 1000;

/// Bounds for the recommendation result-count hint
pub const MIN_TOP: u32 = 1;
pub const MAX_TOP: u32 = 10;

impl LimitPolicy {
    /// Resolve a raw `limit` query value
    ///
    /// Missing, non-numeric, zero or negative values give the default;
    /// anything larger than `max` is clamped to `max`.
    pub fn resolve(&self, raw: Option<&str>) -> i64 {
        let requested = raw
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(self.default);
        requested.min(self.max)
    }
}

/// Resolve the `top` hint for recommendations, clamped to `MIN_TOP..=MAX_TOP`
pub fn resolve_top(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(default)
        .clamp(MIN_TOP, MAX_TOP)
}
