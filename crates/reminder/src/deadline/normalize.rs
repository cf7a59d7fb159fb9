//! Deadline timestamp canonicalization.
//!
//! The portal stores deadlines as naive local timestamps in two layouts and
//! with two encoding quirks: an hour of `24:00` for "end of the named day",
//! and a plain midnight boundary that actually means "end of the previous
//! day". Both are resolved here, once, so everything downstream sees a
//! single canonical instant.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// A non-empty deadline string that matches none of the accepted layouts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed deadline timestamp: {raw:?}")]
pub struct MalformedTimestamp {
    pub raw: String,
}

static HOUR_24_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2}) 24:00(:00)?$").unwrap());

/// Accepted layouts, in priority order: first match wins.
const LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Canonicalizes a raw deadline string.
///
/// Returns `Ok(None)` for an empty/blank field ("no deadline"), the
/// canonical instant for a parseable one, and [`MalformedTimestamp`] when a
/// non-empty field matches no accepted layout. Deterministic and
/// side-effect-free.
pub fn normalize_end_time(raw: &str) -> Result<Option<NaiveDateTime>, MalformedTimestamp> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let malformed = || MalformedTimestamp {
        raw: raw.to_string(),
    };

    // "D 24:00" means midnight at the end of day D; rewrite to 00:00 of the
    // following day before parsing so the midnight rollback below applies.
    let rewritten;
    let candidate = if let Some(caps) = HOUR_24_RE.captures(trimmed) {
        let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").map_err(|_| malformed())?;
        let next = date.succ_opt().ok_or_else(malformed)?;
        rewritten = format!("{} 00:00:00", next.format("%Y-%m-%d"));
        rewritten.as_str()
    } else {
        trimmed
    };

    let parsed = LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(candidate, layout).ok())
        .ok_or_else(malformed)?;

    // A deadline stored exactly at midnight is the boundary of the previous
    // day, not the start of the named one.
    if parsed.time() == NaiveTime::MIN {
        Ok(Some(parsed - Duration::seconds(1)))
    } else {
        Ok(Some(parsed))
    }
}
