use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Supplies a presentation-ready label for listings and logs.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Case-insensitive substring match of `query` against any of `fields`.
///
/// An empty query matches everything.
pub fn matches_query(fields: &[&str], query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Parses an ISO-8601 timestamp. Date-only values resolve to midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

// Re-export common dependencies so consumers can rely on this module as a façade.
pub use chrono;
pub use serde;
pub use uuid;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn query_matching_ignores_case() {
        assert!(matches_query(&["Empresa XYZ S.A."], "xyz"));
        assert!(!matches_query(&["Acme"], "xyz"));
        assert!(matches_query(&["anything"], "  "));
    }

    #[test]
    fn timestamps_accept_several_iso_shapes() {
        let full = parse_timestamp("2024-03-05T10:30:00Z").expect("rfc3339");
        assert_eq!(full.hour(), 10);
        let naive = parse_timestamp("2024-03-05T10:30:00.123456").expect("naive");
        assert_eq!(naive.minute(), 30);
        let date_only = parse_timestamp("2024-03-05").expect("date only");
        assert_eq!((date_only.day(), date_only.hour()), (5, 0));
        assert!(parse_timestamp("next tuesday").is_none());
    }
}
