// Fiches - core/persisted.rs
//
// Plain-data projection of the filter state for durable storage.
//
// Decoding never fails: each field is type-checked on its own and replaced
// by its default when missing or malformed, so one bad field (or a blob
// written by an older client) never discards the others. Unknown keys are
// ignored.

use crate::core::filter::{clamp_search_text, FilterState, TagSet};
use crate::core::model::{ClassLevel, Domain, TimeRange};
use serde::Serialize;
use serde_json::Value;

/// Serialisable snapshot of `FilterState`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistedFilters {
    pub domain: Option<Domain>,
    pub level: Option<ClassLevel>,
    pub time_range: TimeRange,
    pub tags: Vec<String>,
    pub search_text: String,
}

impl PersistedFilters {
    pub fn from_state(state: &FilterState) -> Self {
        Self {
            domain: state.domain,
            level: state.level,
            time_range: state.time_range,
            tags: state.tags.iter().cloned().collect(),
            search_text: state.search_text.clone(),
        }
    }

    /// Rebuild a filter state. Tags go through `TagSet` again, so duplicate
    /// or empty tags from a hand-edited blob are dropped here.
    pub fn into_state(self) -> FilterState {
        FilterState {
            domain: self.domain,
            level: self.level,
            time_range: self.time_range,
            tags: self.tags.iter().collect::<TagSet>(),
            search_text: clamp_search_text(&self.search_text),
        }
    }

    /// True if any field differs from its default.
    pub fn differs_from_default(&self) -> bool {
        *self != Self::default()
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Lenient decode of a stored blob. Never fails.
    pub fn decode(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Persisted filters are not valid JSON, using defaults");
                return Self::default();
            }
        };
        Self::from_value(&value)
    }

    /// Per-field decode of an already parsed JSON value.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            tracing::warn!("Persisted filters are not a JSON object, using defaults");
            return Self::default();
        };

        let mut rejected: Vec<&'static str> = Vec::new();

        let domain = match obj.get("domain") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => {
                let parsed = Domain::parse(s);
                if parsed.is_none() {
                    rejected.push("domain");
                }
                parsed
            }
            Some(_) => {
                rejected.push("domain");
                None
            }
        };

        let level = match obj.get("level") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => {
                let parsed = ClassLevel::parse(s);
                if parsed.is_none() {
                    rejected.push("level");
                }
                parsed
            }
            Some(_) => {
                rejected.push("level");
                None
            }
        };

        let time_range = match obj.get("time_range") {
            None => TimeRange::default(),
            Some(Value::String(s)) => TimeRange::parse(s).unwrap_or_else(|| {
                rejected.push("time_range");
                TimeRange::default()
            }),
            Some(_) => {
                rejected.push("time_range");
                TimeRange::default()
            }
        };

        let tags = match obj.get("tags") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => {
                let strings: Option<Vec<String>> = values
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect();
                strings.unwrap_or_else(|| {
                    rejected.push("tags");
                    Vec::new()
                })
            }
            Some(_) => {
                rejected.push("tags");
                Vec::new()
            }
        };

        let search_text = match obj.get("search_text") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                rejected.push("search_text");
                String::new()
            }
        };

        if !rejected.is_empty() {
            tracing::debug!(fields = ?rejected, "Malformed persisted filter fields reset to defaults");
        }

        Self {
            domain,
            level,
            time_range,
            tags,
            search_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> FilterState {
        FilterState {
            domain: Some(Domain::Math),
            level: Some(ClassLevel::Ce1),
            time_range: TimeRange::ThreeMonths,
            tags: ["addition", "soustraction"].into_iter().collect(),
            search_text: "fractions du CE1".to_string(),
        }
    }

    #[test]
    fn test_round_trip() {
        let state = sample_state();
        let blob = PersistedFilters::from_state(&state).encode().unwrap();
        let restored = PersistedFilters::decode(&blob).into_state();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_round_trip_defaults() {
        let state = FilterState::default();
        let blob = PersistedFilters::from_state(&state).encode().unwrap();
        let decoded = PersistedFilters::decode(&blob);
        assert!(!decoded.differs_from_default());
        assert_eq!(decoded.into_state(), state);
    }

    #[test]
    fn test_wire_shape() {
        let blob = PersistedFilters::from_state(&sample_state()).encode().unwrap();
        let value: Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(value["domain"], "math");
        assert_eq!(value["level"], "CE1");
        assert_eq!(value["time_range"], "3months");
    }

    #[test]
    fn test_corrupted_blob_returns_defaults() {
        for raw in ["not json {{{", "", "42", "[1,2,3]", "null", "\"week\""] {
            let decoded = PersistedFilters::decode(raw);
            assert_eq!(decoded, PersistedFilters::default(), "input: {raw:?}");
        }
    }

    #[test]
    fn test_bad_fields_fall_back_individually() {
        let raw = r#"{
            "domain": 12,
            "level": "CM1",
            "time_range": "fortnight",
            "tags": ["ok", 3],
            "search_text": "conjugaison",
            "unknown_key": true
        }"#;
        let decoded = PersistedFilters::decode(raw);
        assert_eq!(decoded.domain, None);
        assert_eq!(decoded.level, Some(ClassLevel::Cm1));
        assert_eq!(decoded.time_range, TimeRange::Week);
        assert!(decoded.tags.is_empty());
        assert_eq!(decoded.search_text, "conjugaison");
        assert!(decoded.differs_from_default());
    }

    #[test]
    fn test_missing_fields_are_defaults() {
        let decoded = PersistedFilters::decode(r#"{"level": "cp"}"#);
        assert_eq!(decoded.level, Some(ClassLevel::Cp));
        assert_eq!(decoded.time_range, TimeRange::Week);
        assert!(decoded.tags.is_empty());
    }

    #[test]
    fn test_into_state_dedups_hand_edited_tags() {
        let decoded = PersistedFilters::decode(r#"{"tags": ["Lecture", "lecture", " "]}"#);
        let state = decoded.into_state();
        assert_eq!(state.tags.as_slice(), &["Lecture"]);
    }
}
