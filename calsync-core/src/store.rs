//! Client for the remote calendar store.
//!
//! Documents live at `<base>/<username>/<calendar>.ics`. An upload first
//! reads the current remote document and merges the new blocks into it by
//! UID, so repeated runs converge instead of clobbering events that have
//! scrolled out of the fetch window. When the remote document cannot be
//! read it is overwritten whole.

use std::sync::Arc;

use url::Url;

use crate::error::{SyncError, SyncResult};
use crate::http::{HttpTransport, Method};
use crate::ics::merge_calendars;

const CONTENT_TYPE_CALENDAR: &str = "text/calendar; charset=utf-8";

// Server error bodies can be whole HTML pages; keep error messages short.
const BODY_EXCERPT_LEN: usize = 200;

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub url: String,
    pub merged: bool,
}

pub struct CalendarStore {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    username: String,
    auth_header: String,
}

impl CalendarStore {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: &str,
        username: &str,
        auth_header: &str,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.to_string(),
            username: username.to_string(),
            auth_header: auth_header.to_string(),
        }
    }

    fn resource_url(&self, calendar_name: &str) -> SyncResult<String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SyncError::Config(format!("invalid remote base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| {
                SyncError::Config(format!("remote base URL is not usable: {}", self.base_url))
            })?
            .pop_if_empty()
            .push(&self.username)
            .push(&format!("{calendar_name}.ics"));
        Ok(url.to_string())
    }

    fn headers(&self, content_type: bool) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if content_type {
            headers.push((
                "Content-Type".to_string(),
                CONTENT_TYPE_CALENDAR.to_string(),
            ));
        }
        if !self.auth_header.is_empty() {
            headers.push(("Authorization".to_string(), self.auth_header.clone()));
        }
        headers
    }

    /// Upload `document`, merging it with whatever the server already
    /// holds for this calendar.
    pub async fn upload_merged(
        &self,
        calendar_name: &str,
        document: &str,
    ) -> SyncResult<UploadOutcome> {
        let url = self.resource_url(calendar_name)?;

        let mut body = document.to_string();
        let mut merged = false;
        match self
            .transport
            .request(Method::Get, &url, &self.headers(false), None)
            .await
        {
            Ok(r) if r.status == 200 && r.body.starts_with("BEGIN:VCALENDAR") => {
                body = merge_calendars(&r.body, document, calendar_name);
                merged = true;
            }
            Ok(r) if r.status == 404 => {
                tracing::debug!(%url, "no remote document yet, uploading fresh");
            }
            Ok(r) if !r.is_success() => {
                tracing::warn!(status = r.status, %url, "could not read remote document, overwriting");
            }
            // 2xx but not a calendar document; replace it.
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, %url, "could not read remote document, overwriting");
            }
        }

        let response = self
            .transport
            .request(Method::Put, &url, &self.headers(true), Some(body))
            .await?;

        match response.status {
            200 | 201 | 204 => {
                tracing::debug!(status = response.status, %url, "uploaded calendar");
                Ok(UploadOutcome { url, merged })
            }
            401 | 403 => Err(SyncError::Unauthorized(response.status)),
            status => Err(SyncError::UploadFailed {
                status,
                body: excerpt(&response.body),
            }),
        }
    }
}

fn excerpt(body: &str) -> String {
    if body.chars().count() <= BODY_EXCERPT_LEN {
        body.to_string()
    } else {
        let cut: String = body.chars().take(BODY_EXCERPT_LEN).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeTransport;

    const DOC: &str = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:new\r\nSUMMARY:New\r\nEND:VEVENT\r\nEND:VCALENDAR";
    const REMOTE: &str = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:old\r\nSUMMARY:Old\r\nEND:VEVENT\r\nEND:VCALENDAR";

    fn store(transport: Arc<FakeTransport>) -> CalendarStore {
        CalendarStore::new(transport, "http://store.test:5232", "alice", "Basic Zm9v")
    }

    #[test]
    fn test_resource_url_joins_username_and_calendar() {
        let transport = Arc::new(FakeTransport::new());
        let store = store(transport);
        assert_eq!(
            store.resource_url("SJTU-alice").unwrap(),
            "http://store.test:5232/alice/SJTU-alice.ics"
        );
    }

    #[test]
    fn test_resource_url_tolerates_trailing_slash() {
        let transport = Arc::new(FakeTransport::new());
        let store =
            CalendarStore::new(transport, "http://store.test:5232/", "alice", "");
        assert_eq!(
            store.resource_url("SJTU-alice").unwrap(),
            "http://store.test:5232/alice/SJTU-alice.ics"
        );
    }

    #[test]
    fn test_resource_url_percent_encodes() {
        let transport = Arc::new(FakeTransport::new());
        let store = CalendarStore::new(transport, "http://store.test", "a b", "");
        assert_eq!(
            store.resource_url("My Plan").unwrap(),
            "http://store.test/a%20b/My%20Plan.ics"
        );
    }

    #[test]
    fn test_resource_url_rejects_garbage_base() {
        let transport = Arc::new(FakeTransport::new());
        let store = CalendarStore::new(transport, "not a url", "alice", "");
        assert!(matches!(
            store.resource_url("SJTU-alice"),
            Err(SyncError::Config(_))
        ));
    }

    const URL: &str = "http://store.test:5232/alice/SJTU-alice.ics";

    #[tokio::test]
    async fn test_upload_fresh_when_remote_missing() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::Get, URL, 404, "");
        transport.respond(Method::Put, URL, 201, "");

        let outcome = store(transport.clone())
            .upload_merged("SJTU-alice", DOC)
            .await
            .unwrap();
        assert_eq!(outcome.url, URL);
        assert!(!outcome.merged);

        let puts = transport.requests_to(Method::Put, URL);
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].body.as_deref(), Some(DOC));
        assert_eq!(
            puts[0].header("content-type"),
            Some("text/calendar; charset=utf-8")
        );
        assert_eq!(puts[0].header("authorization"), Some("Basic Zm9v"));
    }

    #[tokio::test]
    async fn test_upload_merges_with_existing_remote() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::Get, URL, 200, REMOTE);
        transport.respond(Method::Put, URL, 204, "");

        let outcome = store(transport.clone())
            .upload_merged("SJTU-alice", DOC)
            .await
            .unwrap();
        assert!(outcome.merged);

        let puts = transport.requests_to(Method::Put, URL);
        let body = puts[0].body.as_deref().unwrap();
        assert!(body.contains("UID:old"));
        assert!(body.contains("UID:new"));
    }

    #[tokio::test]
    async fn test_get_failure_falls_back_to_overwrite() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::Get, URL, 500, "boom");
        transport.respond(Method::Put, URL, 200, "");

        let outcome = store(transport.clone())
            .upload_merged("SJTU-alice", DOC)
            .await
            .unwrap();
        assert!(!outcome.merged);

        let puts = transport.requests_to(Method::Put, URL);
        assert_eq!(puts[0].body.as_deref(), Some(DOC));
    }

    #[tokio::test]
    async fn test_get_transport_error_falls_back_to_overwrite() {
        let transport = Arc::new(FakeTransport::new());
        transport.fail(Method::Get, URL, "connection refused");
        transport.respond(Method::Put, URL, 200, "");

        let outcome = store(transport)
            .upload_merged("SJTU-alice", DOC)
            .await
            .unwrap();
        assert!(!outcome.merged);
    }

    #[tokio::test]
    async fn test_non_calendar_remote_body_is_replaced() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::Get, URL, 200, "<html>login</html>");
        transport.respond(Method::Put, URL, 200, "");

        let outcome = store(transport.clone())
            .upload_merged("SJTU-alice", DOC)
            .await
            .unwrap();
        assert!(!outcome.merged);

        let puts = transport.requests_to(Method::Put, URL);
        assert_eq!(puts[0].body.as_deref(), Some(DOC));
    }

    #[tokio::test]
    async fn test_put_unauthorized() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::Get, URL, 404, "");
        transport.respond(Method::Put, URL, 401, "");

        let result = store(transport).upload_merged("SJTU-alice", DOC).await;
        assert!(matches!(result, Err(SyncError::Unauthorized(401))));
    }

    #[tokio::test]
    async fn test_put_server_error_carries_body_excerpt() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::Get, URL, 404, "");
        transport.respond(Method::Put, URL, 500, &"x".repeat(400));

        match store(transport).upload_merged("SJTU-alice", DOC).await {
            Err(SyncError::UploadFailed { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), BODY_EXCERPT_LEN + 3);
                assert!(body.ends_with("..."));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let body = "日".repeat(300);
        let cut = excerpt(&body);
        assert_eq!(cut.chars().count(), BODY_EXCERPT_LEN + 3);
        assert!(cut.ends_with("..."));
    }
}
