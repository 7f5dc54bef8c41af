//! The sync pipeline.
//!
//! One run fetches the account and its events from upstream, encodes them
//! into a calendar document and uploads it to the remote store, merging
//! with whatever the store already holds. Runs are idempotent.

use std::sync::Arc;

use chrono::Utc;

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::event::Event;
use crate::http::HttpTransport;
use crate::ics;
use crate::state::{self, SyncState};
use crate::store::CalendarStore;
use crate::upstream::UpstreamClient;

const CALENDAR_PREFIX: &str = "SJTU";

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub calendar: String,
    pub url: String,
    pub events: usize,
    pub merged: bool,
}

pub struct SyncEngine {
    config: SyncConfig,
    transport: Arc<dyn HttpTransport>,
}

impl SyncEngine {
    pub fn new(config: SyncConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one full sync: upstream fetch, encode, merge-upload.
    pub async fn run(&self) -> SyncResult<SyncOutcome> {
        let upstream =
            UpstreamClient::new(self.transport.clone(), &self.config.upstream_cookie);

        let account = upstream.fetch_account().await?;
        tracing::info!(%account, "fetching upstream events");

        let records = upstream.fetch_events(self.config.date_window_days).await?;
        let calendar = format!("{CALENDAR_PREFIX}-{account}");
        self.upload_records(&calendar, &records).await
    }

    /// Encode `records` and merge-upload them into `calendar`. Also the
    /// upload half of the text-parsing flow.
    pub async fn upload_records(
        &self,
        calendar: &str,
        records: &[Event],
    ) -> SyncResult<SyncOutcome> {
        let document = ics::build_calendar(records, calendar);
        let store = CalendarStore::new(
            self.transport.clone(),
            &self.config.remote_base_url,
            &self.config.remote_username,
            &self.config.remote_auth_header,
        );
        let uploaded = store.upload_merged(calendar, &document).await?;

        let data_dir = self.config.data_path()?;
        state::save_state(
            &data_dir,
            &SyncState {
                last_sync: Some(Utc::now()),
            },
        )?;

        tracing::info!(
            calendar,
            events = records.len(),
            url = %uploaded.url,
            merged = uploaded.merged,
            "sync complete"
        );
        Ok(SyncOutcome {
            calendar: calendar.to_string(),
            url: uploaded.url,
            events: records.len(),
            merged: uploaded.merged,
        })
    }
}
