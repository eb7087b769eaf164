// Fiches - core/wire.rs
//
// Validation of backend JSON into typed records.
//
// The files API is loosely typed: ids may be numbers, timestamps may lack an
// offset, pagination fields may be missing. Everything is coerced here so
// that only well-formed `ResultItem`s reach the accumulator. Records that
// cannot be identified or ordered (no id, no parseable creation time) are
// dropped with a warning instead of failing the whole page.
//
// Core layer: pure logic, no I/O.

use crate::core::model::{same_tag, ResultItem, SearchPage};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use crate::util::error::WireError;
use serde_json::{Map, Value};

/// Decode a `/search` response.
///
/// `requested_page` and `page_size` fill in pagination fields the server
/// left out. Fails only when there is no `items` array at all.
pub fn decode_search_page(
    value: &Value,
    requested_page: u32,
    page_size: u32,
) -> Result<SearchPage, WireError> {
    let obj = value.as_object().ok_or(WireError::UnexpectedShape {
        what: "search response",
        expected: "a JSON object",
    })?;
    let raw_items = obj
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| WireError::MissingField {
            what: "search response".to_string(),
            field: "items",
        })?;

    let items = decode_items(raw_items);

    let page = get_u64(obj, "page")
        .and_then(|p| u32::try_from(p).ok())
        .filter(|p| *p >= 1)
        .unwrap_or(requested_page);
    let total_count = get_u64(obj, "total_count").unwrap_or(items.len() as u64);
    let total_pages = get_u64(obj, "total_pages")
        .and_then(|p| u32::try_from(p).ok())
        .unwrap_or_else(|| pages_for(total_count, page_size));
    let has_more = obj
        .get("has_more")
        .and_then(Value::as_bool)
        .unwrap_or(page < total_pages);

    Ok(SearchPage {
        items,
        page,
        total_count,
        total_pages,
        has_more,
    })
}

/// Decode a `/by-period` response: a bare array of records.
pub fn decode_item_list(value: &Value) -> Result<Vec<ResultItem>, WireError> {
    let raw = value.as_array().ok_or(WireError::UnexpectedShape {
        what: "file list response",
        expected: "a JSON array",
    })?;
    Ok(decode_items(raw))
}

/// Decode a `/count` response: `{ "total_count": n }`.
pub fn decode_count(value: &Value) -> Result<u64, WireError> {
    value
        .as_object()
        .and_then(|obj| get_u64(obj, "total_count"))
        .ok_or_else(|| WireError::MissingField {
            what: "count response".to_string(),
            field: "total_count",
        })
}

/// Decode an `/available-tags` response.
///
/// Accepts plain strings or `{ "name": ... }` objects. Blank and duplicate
/// (case-insensitive) tags are dropped; the result is sorted.
pub fn decode_tags(value: &Value) -> Result<Vec<String>, WireError> {
    let raw = value.as_array().ok_or(WireError::UnexpectedShape {
        what: "tag response",
        expected: "a JSON array",
    })?;

    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for entry in raw {
        let name = match entry {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("name").and_then(Value::as_str),
            _ => None,
        };
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            continue;
        };
        if !tags.iter().any(|t| same_tag(t, name)) {
            tags.push(name.to_string());
        }
    }
    tags.sort_by_key(|t| t.to_lowercase());
    Ok(tags)
}

fn decode_items(raw: &[Value]) -> Vec<ResultItem> {
    let mut items = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;
    for value in raw {
        match decode_item(value) {
            Ok(item) => items.push(item),
            Err(reason) => {
                dropped += 1;
                tracing::debug!(reason = %reason, "Dropping malformed file record");
            }
        }
    }
    if dropped > 0 {
        tracing::warn!(dropped, kept = items.len(), "Backend returned malformed file records");
    }
    items
}

/// Validate a single file record.
fn decode_item(value: &Value) -> Result<ResultItem, WireError> {
    let obj = value.as_object().ok_or(WireError::UnexpectedShape {
        what: "file record",
        expected: "a JSON object",
    })?;

    let file_id = match obj.get("file_id").or_else(|| obj.get("id")) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            return Err(WireError::MissingField {
                what: "file record".to_string(),
                field: "file_id",
            })
        }
    };

    let created_at = obj
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .ok_or_else(|| WireError::MissingField {
            what: format!("file record '{file_id}'"),
            field: "created_at",
        })?;

    let tags = match obj.get("tags") {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    Ok(ResultItem {
        file_id,
        created_at,
        title: get_string(obj, "custom_name"),
        filename: get_string(obj, "filename"),
        domain: get_string(obj, "exercice_domain").or_else(|| get_string(obj, "domain")),
        level: get_string(obj, "class_level").or_else(|| get_string(obj, "level")),
        tags,
        download_count: get_u64(obj, "download_count").unwrap_or(0),
    })
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn get_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Non-negative integer field; integral floats and numeric strings accepted.
fn get_u64(obj: &Map<String, Value>, key: &str) -> Option<u64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn pages_for(total_count: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_count.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_search_page() {
        let body = json!({
            "items": [
                {
                    "file_id": "abc",
                    "created_at": "2025-04-02T09:15:00Z",
                    "custom_name": "Tables de 3",
                    "exercice_domain": "math",
                    "class_level": "CE1",
                    "tags": ["multiplication", " "],
                    "download_count": 4
                }
            ],
            "page": 2,
            "total_count": 41,
            "has_more": true,
            "total_pages": 3
        });
        let page = decode_search_page(&body, 2, 20).unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.total_count, 41);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_more);
        let item = &page.items[0];
        assert_eq!(item.file_id, "abc");
        assert_eq!(item.title.as_deref(), Some("Tables de 3"));
        assert_eq!(item.domain.as_deref(), Some("math"));
        assert_eq!(item.tags, vec!["multiplication".to_string()]);
        assert_eq!(item.download_count, 4);
    }

    #[test]
    fn test_missing_pagination_is_derived() {
        let body = json!({ "items": [] , "total_count": 45 });
        let page = decode_search_page(&body, 1, 20).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_more);
    }

    #[test]
    fn test_missing_items_is_an_error() {
        assert_eq!(
            decode_search_page(&json!({"page": 1}), 1, 20),
            Err(WireError::MissingField {
                what: "search response".to_string(),
                field: "items",
            })
        );
        let err = decode_search_page(&json!([]), 1, 20).unwrap_err();
        assert_eq!(err.to_string(), "search response is not a JSON object");
    }

    #[test]
    fn test_malformed_records_are_dropped() {
        let list = json!([
            { "file_id": "ok", "created_at": "2025-01-01T00:00:00+01:00" },
            { "file_id": "", "created_at": "2025-01-01T00:00:00Z" },
            { "file_id": "no-date" },
            { "file_id": "bad-date", "created_at": "yesterday" },
            "not an object",
            { "file_id": 17, "created_at": "2025-01-02T10:00:00.123456" }
        ]);
        let items = decode_item_list(&list).unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.file_id.as_str()).collect();
        assert_eq!(ids, vec!["ok", "17"]);
        assert_eq!(
            items[0].created_at,
            Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let ts = parse_timestamp("2025-06-01 08:00:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_decode_count() {
        assert_eq!(decode_count(&json!({"total_count": 12})), Ok(12));
        assert_eq!(decode_count(&json!({"total_count": "12"})), Ok(12));
        assert!(decode_count(&json!({"count": 12})).is_err());
        assert!(decode_count(&json!({"total_count": -1})).is_err());
    }

    #[test]
    fn test_decode_tags_mixed_shapes() {
        let body = json!(["soustraction", {"name": "Addition"}, "addition", "", 5, {"id": 1}]);
        let tags = decode_tags(&body).unwrap();
        assert_eq!(tags, vec!["Addition".to_string(), "soustraction".to_string()]);

        let accented = decode_tags(&json!(["Géométrie", "GÉOMÉTRIE", "énigmes"])).unwrap();
        assert_eq!(accented, vec!["Géométrie".to_string(), "énigmes".to_string()]);
    }
}
