//! Helpers shared by the carrier response parsers.

use crate::utils::error::{Result, TrackingError};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

/// Carriers collapse a one-element list into a bare object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Joins the non-empty parts with commas; "UNKNOWN" when nothing is left.
pub fn join_location<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    let parts: Vec<&str> = parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        "UNKNOWN".to_string()
    } else {
        parts.join(",")
    }
}

pub fn parse_date(value: &str, format: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), format)
        .map_err(|e| TrackingError::api(format!("Unparseable {} '{}': {}", field, value, e)))
}

pub fn parse_time(value: &str, format: &str, field: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), format)
        .map_err(|e| TrackingError::api(format!("Unparseable {} '{}': {}", field, value, e)))
}

pub fn parse_datetime(value: &str, format: &str, field: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), format)
        .map_err(|e| TrackingError::api(format!("Unparseable {} '{}': {}", field, value, e)))
}

pub fn truncate(body: &str, max_chars: usize) -> &str {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default)]
        items: OneOrMany<u32>,
    }

    #[test]
    fn test_one_or_many_normalizes_shapes() {
        let one: Holder = serde_json::from_str(r#"{"items": 7}"#).unwrap();
        assert_eq!(one.items.into_vec(), vec![7]);
        let many: Holder = serde_json::from_str(r#"{"items": [1, 2]}"#).unwrap();
        assert_eq!(many.items.into_vec(), vec![1, 2]);
        let none: Holder = serde_json::from_str("{}").unwrap();
        assert!(none.items.into_vec().is_empty());
    }

    #[test]
    fn test_join_location() {
        assert_eq!(join_location([Some("Atlanta"), Some(" GA "), None]), "Atlanta,GA");
        assert_eq!(join_location([None, Some("")]), "UNKNOWN");
    }

    #[test]
    fn test_parse_errors_are_api_failures() {
        let err = parse_date("yesterday", "%Y%m%d", "Date").unwrap_err();
        assert!(matches!(err, TrackingError::Api { .. }));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
