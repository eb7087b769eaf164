// Fiches - core/planner.rs
//
// Decides how a settled filter combination is fetched.
//
// Two strategies exist:
//   - Fast path: the filters are exactly the defaults and the pre-loaded
//     recent window (last 7 days) is usable, so no search request is sent.
//   - Backend search: anything else. Page 1 is requested and replaces the
//     accumulated list; "load more" then walks pages 2, 3, ... in order.
//
// Core layer: pure logic, no I/O.

use crate::core::filter::SettledFilterState;
use crate::core::model::{ClassLevel, Domain, TimeRange};
use serde::Serialize;

/// Body of `POST /files/{user}/search`.
///
/// Only non-empty dimensions are serialised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub page: u32,
    pub page_size: u32,
    pub active_only: bool,

    #[serde(rename = "exercice_domain", skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,

    #[serde(rename = "class_level", skip_serializing_if = "Option::is_none")]
    pub level: Option<ClassLevel>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_period: Option<TimeRange>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Always `Some(true)` when tags are present: a file must carry all of
    /// the selected tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_all_tags: Option<bool>,
}

impl SearchQuery {
    /// Build the page-1 query for a settled filter combination.
    pub fn first_page(settled: &SettledFilterState, page_size: u32, active_only: bool) -> Self {
        let search_text = settled.search_text.trim();
        let tags: Vec<String> = settled.tags.iter().cloned().collect();
        let match_all_tags = (!tags.is_empty()).then_some(true);

        Self {
            page: 1,
            page_size,
            active_only,
            domain: settled.domain,
            level: settled.level,
            time_period: match settled.time_range {
                TimeRange::Unlimited => None,
                other => Some(other),
            },
            custom_name: (!search_text.is_empty()).then(|| search_text.to_string()),
            tags,
            match_all_tags,
        }
    }

    /// Same filters, next page.
    pub fn next_page(&self) -> Self {
        Self {
            page: self.page + 1,
            ..self.clone()
        }
    }
}

/// Fetch strategy for a settled filter combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPlan {
    /// Show the pre-loaded recent window as-is.
    FastPath,
    /// Replace the list with the result of this page-1 search.
    Search(SearchQuery),
}

/// True when the pre-loaded recent window is enough to answer `settled`.
///
/// `recent_window_usable` is false once the recent-window fetch failed; the
/// default filters then go through a regular search instead.
pub fn is_fast_path(settled: &SettledFilterState, recent_window_usable: bool) -> bool {
    recent_window_usable
        && settled.domain.is_none()
        && settled.level.is_none()
        && settled.time_range == TimeRange::default()
        && settled.search_text.trim().is_empty()
        && settled.tags.is_empty()
}

/// Choose the fetch strategy for `settled`.
pub fn plan(
    settled: &SettledFilterState,
    recent_window_usable: bool,
    page_size: u32,
    active_only: bool,
) -> FetchPlan {
    if is_fast_path(settled, recent_window_usable) {
        FetchPlan::FastPath
    } else {
        FetchPlan::Search(SearchQuery::first_page(settled, page_size, active_only))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::FilterState;
    use crate::util::constants::PAGE_SIZE;

    fn settled(state: FilterState) -> SettledFilterState {
        SettledFilterState::new(state)
    }

    #[test]
    fn test_defaults_take_fast_path() {
        let s = settled(FilterState::default());
        assert_eq!(plan(&s, true, PAGE_SIZE, true), FetchPlan::FastPath);
    }

    #[test]
    fn test_defaults_search_when_recent_window_failed() {
        let s = settled(FilterState::default());
        match plan(&s, false, PAGE_SIZE, true) {
            FetchPlan::Search(q) => {
                assert_eq!(q.page, 1);
                assert_eq!(q.time_period, Some(TimeRange::Week));
            }
            FetchPlan::FastPath => panic!("expected a search"),
        }
    }

    #[test]
    fn test_each_dimension_leaves_fast_path() {
        let variants = [
            FilterState {
                domain: Some(Domain::Francais),
                ..Default::default()
            },
            FilterState {
                level: Some(ClassLevel::Cp),
                ..Default::default()
            },
            FilterState {
                time_range: TimeRange::Today,
                ..Default::default()
            },
            FilterState {
                search_text: "dictée".to_string(),
                ..Default::default()
            },
            FilterState {
                tags: ["lecture"].into_iter().collect(),
                ..Default::default()
            },
        ];
        for state in variants {
            assert!(!is_fast_path(&settled(state), true));
        }
    }

    #[test]
    fn test_scenario_payload_has_all_tags_and_match_all() {
        let s = settled(FilterState {
            domain: Some(Domain::Math),
            level: Some(ClassLevel::Ce1),
            tags: ["addition", "soustraction"].into_iter().collect(),
            ..Default::default()
        });
        let FetchPlan::Search(query) = plan(&s, true, PAGE_SIZE, true) else {
            panic!("expected a search");
        };
        let body = serde_json::to_value(&query).unwrap();
        assert_eq!(body["page"], 1);
        assert_eq!(body["page_size"], 20);
        assert_eq!(body["active_only"], true);
        assert_eq!(body["exercice_domain"], "math");
        assert_eq!(body["class_level"], "CE1");
        assert_eq!(body["time_period"], "week");
        assert_eq!(body["tags"], serde_json::json!(["addition", "soustraction"]));
        assert_eq!(body["match_all_tags"], true);
        assert!(body.get("custom_name").is_none());
    }

    #[test]
    fn test_payload_omits_empty_dimensions() {
        let s = settled(FilterState {
            time_range: TimeRange::Unlimited,
            search_text: "  fractions ".to_string(),
            ..Default::default()
        });
        let query = SearchQuery::first_page(&s, PAGE_SIZE, false);
        let body = serde_json::to_value(&query).unwrap();
        let obj = body.as_object().unwrap();
        assert_eq!(body["custom_name"], "fractions");
        assert_eq!(body["active_only"], false);
        for absent in [
            "exercice_domain",
            "class_level",
            "time_period",
            "tags",
            "match_all_tags",
        ] {
            assert!(!obj.contains_key(absent), "{absent} should be omitted");
        }
    }

    #[test]
    fn test_next_page_keeps_filters() {
        let s = settled(FilterState {
            domain: Some(Domain::Math),
            ..Default::default()
        });
        let q1 = SearchQuery::first_page(&s, PAGE_SIZE, true);
        let q2 = q1.next_page();
        assert_eq!(q2.page, 2);
        assert_eq!(q2.domain, Some(Domain::Math));
        assert_eq!(q2.next_page().page, 3);
    }
}
