// Fiches - platform/http.rs
//
// Production `FilesBackend`: the files API over blocking HTTP.
//
// Responses are read as untyped JSON and validated by `core::wire`, so a
// loosely typed or partially malformed response degrades record by record
// instead of failing the whole request.

use crate::app::backend::FilesBackend;
use crate::core::model::{RecentPeriod, ResultItem, SearchPage};
use crate::core::planner::SearchQuery;
use crate::core::wire;
use crate::util::constants::APP_VERSION;
use crate::util::error::{BackendError, WireError};
use serde_json::Value;
use std::time::Duration;

pub struct HttpBackend {
    agent: ureq::Agent,
    /// `{base_url}/files/{user_id}`
    files_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, user_id: &str, timeout: Duration) -> Self {
        let files_url = format!("{}/files/{}", base_url.trim_end_matches('/'), user_id.trim());
        tracing::debug!(url = %files_url, timeout_secs = timeout.as_secs(), "HTTP backend ready");
        Self {
            agent: make_agent(timeout),
            files_url,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.files_url)
    }

    fn get_json(&self, endpoint: &str, active_only: bool) -> Result<Value, BackendError> {
        let response = self
            .agent
            .get(&self.url(endpoint))
            .header("User-Agent", &user_agent())
            .query("active_only", if active_only { "true" } else { "false" })
            .call()
            .map_err(|e| map_error(endpoint, e))?;
        read_json(endpoint, response)
    }
}

fn make_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    config.into()
}

fn user_agent() -> String {
    format!("fiches/{APP_VERSION}")
}

fn read_json(
    endpoint: &str,
    mut response: ureq::http::Response<ureq::Body>,
) -> Result<Value, BackendError> {
    response
        .body_mut()
        .read_json::<Value>()
        .map_err(|e| BackendError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
}

fn map_error(endpoint: &str, error: ureq::Error) -> BackendError {
    match error {
        ureq::Error::StatusCode(status) => BackendError::Http {
            endpoint: endpoint.to_string(),
            status,
        },
        other => BackendError::Transport {
            endpoint: endpoint.to_string(),
            message: other.to_string(),
        },
    }
}

fn decode_error(endpoint: &str, error: WireError) -> BackendError {
    BackendError::Decode {
        endpoint: endpoint.to_string(),
        message: error.to_string(),
    }
}

impl FilesBackend for HttpBackend {
    fn search(&self, query: &SearchQuery) -> Result<SearchPage, BackendError> {
        const ENDPOINT: &str = "search";
        let response = self
            .agent
            .post(&self.url(ENDPOINT))
            .header("User-Agent", &user_agent())
            .send_json(query)
            .map_err(|e| map_error(ENDPOINT, e))?;
        let body = read_json(ENDPOINT, response)?;
        wire::decode_search_page(&body, query.page, query.page_size)
            .map_err(|e| decode_error(ENDPOINT, e))
    }

    fn count(&self, active_only: bool) -> Result<u64, BackendError> {
        const ENDPOINT: &str = "count";
        let body = self.get_json(ENDPOINT, active_only)?;
        wire::decode_count(&body).map_err(|e| decode_error(ENDPOINT, e))
    }

    fn list_by_period(
        &self,
        period: RecentPeriod,
        active_only: bool,
    ) -> Result<Vec<ResultItem>, BackendError> {
        let endpoint = format!("by-period/{}", period.as_str());
        let body = self.get_json(&endpoint, active_only)?;
        wire::decode_item_list(&body).map_err(|e| decode_error(&endpoint, e))
    }

    fn available_tags(&self, active_only: bool) -> Result<Vec<String>, BackendError> {
        const ENDPOINT: &str = "available-tags";
        let body = self.get_json(ENDPOINT, active_only)?;
        wire::decode_tags(&body).map_err(|e| decode_error(ENDPOINT, e))
    }
}
