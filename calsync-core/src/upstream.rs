//! Client for the university calendar API.
//!
//! Two read-only endpoints are used: the share profile (which doubles as a
//! login probe) and the event list over a date window. Authentication is
//! ambient: requests ride on whatever cookie the deployment supplies.

use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use serde_json::Value;

use crate::error::{SyncError, SyncResult};
use crate::event::Event;
use crate::http::{HttpTransport, Method};
use crate::time;

pub const UPSTREAM_BASE_URL: &str = "https://calendar.sjtu.edu.cn";

pub struct UpstreamClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    cookie: String,
}

impl UpstreamClient {
    pub fn new(transport: Arc<dyn HttpTransport>, cookie: &str) -> Self {
        Self {
            transport,
            base_url: UPSTREAM_BASE_URL.to_string(),
            cookie: cookie.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(transport: Arc<dyn HttpTransport>, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.to_string(),
            cookie: String::new(),
        }
    }

    fn headers(&self) -> Vec<(String, String)> {
        if self.cookie.is_empty() {
            Vec::new()
        } else {
            vec![("Cookie".to_string(), self.cookie.clone())]
        }
    }

    /// Fetch the account name from the share profile. A well-formed
    /// response without an account means the session is not logged in.
    pub async fn fetch_account(&self) -> SyncResult<String> {
        let url = format!("{}/api/share/profile", self.base_url);
        let response = self
            .transport
            .request(Method::Get, &url, &self.headers(), None)
            .await
            .map_err(|e| SyncError::UpstreamFetch(format!("profile: {e}")))?;

        if !response.is_success() {
            return Err(SyncError::UpstreamFetch(format!(
                "profile fetch returned HTTP {}",
                response.status
            )));
        }

        let envelope: Value = serde_json::from_str(&response.body)
            .map_err(|e| SyncError::UpstreamFetch(format!("profile body is not JSON: {e}")))?;

        let success = envelope
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let account = envelope
            .pointer("/data/account")
            .and_then(Value::as_str)
            .unwrap_or("");

        if success && !account.is_empty() {
            Ok(account.to_string())
        } else {
            Err(SyncError::NotLoggedIn)
        }
    }

    /// Fetch raw event records for today plus/minus `window_days`.
    pub async fn fetch_events(&self, window_days: i64) -> SyncResult<Vec<Event>> {
        let today = Local::now().date_naive();
        let start = today - Duration::days(window_days);
        let end = today + Duration::days(window_days);
        let url = self.events_url(start, end);

        let response = self
            .transport
            .request(Method::Get, &url, &self.headers(), None)
            .await
            .map_err(|e| SyncError::UpstreamFetch(format!("event list: {e}")))?;

        if !response.is_success() {
            return Err(SyncError::UpstreamFetch(format!(
                "event list returned HTTP {}",
                response.status
            )));
        }

        let envelope: Value = serde_json::from_str(&response.body)
            .map_err(|e| SyncError::UpstreamFetch(format!("event list body is not JSON: {e}")))?;

        if !envelope
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return Err(SyncError::UpstreamFetch(
                "event list returned an error envelope".to_string(),
            ));
        }

        let raw = envelope
            .pointer("/data/events")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        tracing::debug!(count = raw.len(), "fetched upstream events");
        Ok(raw.iter().map(Event::from_upstream).collect())
    }

    fn events_url(&self, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/api/event/list?startDate={}&endDate={}&weekly=false&ids=",
            self.base_url,
            time::format_api_date(start),
            time::format_api_date(end),
        )
    }
}
