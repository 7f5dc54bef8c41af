//! Natural-language event parsing through a hosted agent.
//!
//! Free-form text ("组会明天下午三点") goes to a Zhipu agent application
//! that returns structured events. The agent's reply is doubly wrapped:
//! an invocation envelope whose message content is itself a JSON string
//! holding the `events` array.

use chrono::{Local, Utc};
use serde_json::{Value, json};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::event::Event;
use crate::http::{HttpTransport, Method};
use crate::time;

pub const DEFAULT_LLM_API_URL: &str =
    "https://open.bigmodel.cn/api/llm-application/open/v3/application/invoke";

/// Calendar that parsed events are uploaded to.
pub const PARSED_CALENDAR_NAME: &str = "LLM-Parsed";

const SUPPORTED_PROVIDER: &str = "zhipu_agent";

/// Parse free-form text into event records. An empty result is valid
/// here; callers decide whether "no events" is an error for their flow.
pub async fn parse_text(
    config: &SyncConfig,
    transport: &dyn HttpTransport,
    text: &str,
) -> SyncResult<Vec<Event>> {
    if config.llm_provider != SUPPORTED_PROVIDER {
        return Err(SyncError::UnsupportedProvider(config.llm_provider.clone()));
    }
    if config.llm_api_key.is_empty() {
        return Err(SyncError::ParseServiceNotConfigured(
            "llm_api_key is not set".to_string(),
        ));
    }
    if config.llm_agent_id.is_empty() {
        return Err(SyncError::ParseServiceNotConfigured(
            "llm_agent_id is not set".to_string(),
        ));
    }

    let url = match config.llm_api_url.trim() {
        "" => DEFAULT_LLM_API_URL,
        configured => configured,
    };

    // The agent is addressed in Chinese. Today's date and the current
    // clock time anchor relative phrases like "明天下午".
    let prompt = format!(
        "今天的日期是 {}，当前时间是 {}。\n\n请解析以下文本为日程:\n{}",
        Utc::now().format("%Y-%m-%d"),
        Local::now().format("%H:%M:%S"),
        text
    );

    let request = json!({
        "app_id": config.llm_agent_id,
        "messages": [{
            "role": "user",
            "content": [{ "type": "input", "value": prompt }],
        }],
        "stream": false,
    });
    let headers = vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        (
            "Authorization".to_string(),
            format!("Bearer {}", config.llm_api_key),
        ),
    ];

    let response = transport
        .request(Method::Post, url, &headers, Some(request.to_string()))
        .await?;
    if !response.is_success() {
        return Err(SyncError::ParseServiceHttp(response.status));
    }

    let envelope: Value = serde_json::from_str(&response.body)
        .map_err(|e| SyncError::ParseServiceInvalid(format!("envelope is not JSON: {e}")))?;
    let content = envelope
        .pointer("/choices/0/messages/content/msg")
        .and_then(Value::as_str)
        .ok_or_else(|| SyncError::ParseServiceInvalid("response carries no content".to_string()))?;

    let parsed: Value = serde_json::from_str(content)
        .map_err(|e| SyncError::ParseServiceInvalid(format!("content is not JSON: {e}")))?;
    let raw = parsed
        .get("events")
        .and_then(Value::as_array)
        .ok_or_else(|| SyncError::ParseServiceInvalid("content has no events array".to_string()))?;

    for (index, event) in raw.iter().enumerate() {
        validate_event(index, event)?;
    }

    tracing::debug!(count = raw.len(), "parsed events from text");
    Ok(raw.iter().map(Event::from_parsed).collect())
}

// One malformed event rejects the batch; a partial upload would silently
// drop what the user typed.
fn validate_event(index: usize, event: &Value) -> SyncResult<()> {
    let title = event.get("title").and_then(Value::as_str).unwrap_or("");
    if title.is_empty() {
        return Err(SyncError::ParseServiceInvalid(format!(
            "event {index} has no title"
        )));
    }
    for field in ["startTime", "endTime"] {
        let value = event.get(field).and_then(Value::as_str).unwrap_or("");
        if time::parse_offset_time(value).is_none() {
            return Err(SyncError::ParseServiceInvalid(format!(
                "event {index} has an unusable {field}: {value:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeTransport;

    fn config() -> SyncConfig {
        SyncConfig {
            llm_api_key: "sk-test".to_string(),
            ..SyncConfig::default()
        }
    }

    fn envelope_with(inner: &Value) -> String {
        json!({
            "choices": [{
                "messages": { "content": { "msg": inner.to_string() } },
            }],
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_parse_happy_path() {
        let transport = FakeTransport::new();
        let inner = json!({
            "events": [{
                "title": "组会",
                "startTime": "20240320T150000+0800",
                "endTime": "20240320T160000+0800",
                "location": "A301",
            }],
        });
        transport.respond(Method::Post, DEFAULT_LLM_API_URL, 200, &envelope_with(&inner));

        let events = parse_text(&config(), &transport, "明天下午三点组会")
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title.as_deref(), Some("组会"));
        assert_eq!(events[0].location.as_deref(), Some("A301"));
        assert_eq!(
            time::format_ics_utc(&events[0].start.unwrap()),
            "20240320T070000Z"
        );
    }

    #[tokio::test]
    async fn test_request_shape() {
        let transport = FakeTransport::new();
        let inner = json!({ "events": [] });
        transport.respond(Method::Post, DEFAULT_LLM_API_URL, 200, &envelope_with(&inner));

        parse_text(&config(), &transport, "买牛奶").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].header("authorization"), Some("Bearer sk-test"));
        assert_eq!(requests[0].header("content-type"), Some("application/json"));

        let body: Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["app_id"], crate::config::DEFAULT_LLM_AGENT_ID);
        assert_eq!(body["stream"], false);

        let prompt = body
            .pointer("/messages/0/content/0/value")
            .and_then(Value::as_str)
            .unwrap();
        assert!(prompt.starts_with("今天的日期是 "));
        assert!(prompt.ends_with("请解析以下文本为日程:\n买牛奶"));
    }

    #[tokio::test]
    async fn test_empty_events_list_is_ok() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::Post,
            DEFAULT_LLM_API_URL,
            200,
            &envelope_with(&json!({ "events": [] })),
        );

        let events = parse_text(&config(), &transport, "hello").await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let transport = FakeTransport::new();
        let config = SyncConfig::default();

        match parse_text(&config, &transport, "text").await {
            Err(SyncError::ParseServiceNotConfigured(msg)) => {
                assert!(msg.contains("llm_api_key"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_provider() {
        let transport = FakeTransport::new();
        let config = SyncConfig {
            llm_provider: "openai".to_string(),
            ..config()
        };

        assert!(matches!(
            parse_text(&config, &transport, "text").await,
            Err(SyncError::UnsupportedProvider(p)) if p == "openai"
        ));
    }

    #[tokio::test]
    async fn test_blank_agent_id() {
        let transport = FakeTransport::new();
        let config = SyncConfig {
            llm_agent_id: String::new(),
            ..config()
        };

        assert!(matches!(
            parse_text(&config, &transport, "text").await,
            Err(SyncError::ParseServiceNotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let transport = FakeTransport::new();
        transport.respond(Method::Post, DEFAULT_LLM_API_URL, 429, "rate limited");

        assert!(matches!(
            parse_text(&config(), &transport, "text").await,
            Err(SyncError::ParseServiceHttp(429))
        ));
    }

    #[tokio::test]
    async fn test_envelope_without_content() {
        let transport = FakeTransport::new();
        transport.respond(Method::Post, DEFAULT_LLM_API_URL, 200, r#"{"choices": []}"#);

        assert!(matches!(
            parse_text(&config(), &transport, "text").await,
            Err(SyncError::ParseServiceInvalid(_))
        ));
    }

    #[tokio::test]
    async fn test_content_that_is_not_json() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::Post,
            DEFAULT_LLM_API_URL,
            200,
            &json!({
                "choices": [{ "messages": { "content": { "msg": "sorry, no" } } }],
            })
            .to_string(),
        );

        assert!(matches!(
            parse_text(&config(), &transport, "text").await,
            Err(SyncError::ParseServiceInvalid(_))
        ));
    }

    #[tokio::test]
    async fn test_content_without_events_array() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::Post,
            DEFAULT_LLM_API_URL,
            200,
            &envelope_with(&json!({ "note": "nothing found" })),
        );

        assert!(matches!(
            parse_text(&config(), &transport, "text").await,
            Err(SyncError::ParseServiceInvalid(_))
        ));
    }

    #[tokio::test]
    async fn test_event_missing_title_rejects_batch() {
        let transport = FakeTransport::new();
        let inner = json!({
            "events": [
                {
                    "title": "Fine",
                    "startTime": "20240320T150000+0800",
                    "endTime": "20240320T160000+0800",
                },
                {
                    "startTime": "20240320T170000+0800",
                    "endTime": "20240320T180000+0800",
                },
            ],
        });
        transport.respond(Method::Post, DEFAULT_LLM_API_URL, 200, &envelope_with(&inner));

        match parse_text(&config(), &transport, "text").await {
            Err(SyncError::ParseServiceInvalid(msg)) => assert!(msg.contains("event 1")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_event_with_unusable_time_rejects_batch() {
        let transport = FakeTransport::new();
        let inner = json!({
            "events": [{
                "title": "Fine",
                "startTime": "tomorrow 3pm",
                "endTime": "20240320T160000+0800",
            }],
        });
        transport.respond(Method::Post, DEFAULT_LLM_API_URL, 200, &envelope_with(&inner));

        match parse_text(&config(), &transport, "text").await {
            Err(SyncError::ParseServiceInvalid(msg)) => assert!(msg.contains("startTime")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_configured_url_overrides_default() {
        let transport = FakeTransport::new();
        transport.respond(
            Method::Post,
            "http://llm.test/invoke",
            200,
            &envelope_with(&json!({ "events": [] })),
        );

        let config = SyncConfig {
            llm_api_url: "http://llm.test/invoke".to_string(),
            ..config()
        };
        parse_text(&config, &transport, "text").await.unwrap();
        assert_eq!(transport.requests()[0].url, "http://llm.test/invoke");
    }
}
