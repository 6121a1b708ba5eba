// Invocation helpers: the response-pane error block and a history-recording
// invoker decorator.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::warn;

use crate::collab::{HistorySink, InvokeError, InvokeRequest, InvokeResponse, Invoker};
use crate::store::NewHistoryRecord;

/// Status code recorded for failed invocations.
const FAILED_STATUS_CODE: i32 = 2;

/// Render a failed invocation for the response pane. Structured (JSON)
/// messages are pretty-printed under the header; anything else is commented
/// out line by line.
pub fn format_invocation_error(message: &str) -> String {
    let mut out = String::from("// Request failed\n");
    let structured = serde_json::from_str::<Value>(message.trim())
        .ok()
        .filter(|value| value.is_object() || value.is_array())
        .and_then(|value| serde_json::to_string_pretty(&value).ok());

    match structured {
        Some(pretty) => out.push_str(&pretty),
        None => {
            let lines: Vec<String> = message.lines().map(|line| format!("// {line}")).collect();
            if lines.is_empty() {
                out.push_str("// (no details)");
            } else {
                out.push_str(&lines.join("\n"));
            }
        }
    }
    out
}

/// Encode key/value pairs as the JSON object stored with history rows.
/// No pairs encode as an empty string.
pub fn pairs_to_json(pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let map: Map<String, Value> =
        pairs.iter().map(|(key, value)| (key.clone(), Value::String(value.clone()))).collect();
    Value::Object(map).to_string()
}

/// Appends a history row after every invocation, successful or not.
pub struct RecordingInvoker<I> {
    inner: I,
    sink: Arc<dyn HistorySink>,
}

impl<I: Invoker> RecordingInvoker<I> {
    pub fn new(inner: I, sink: Arc<dyn HistorySink>) -> Self {
        Self { inner, sink }
    }
}

#[async_trait]
impl<I: Invoker> Invoker for RecordingInvoker<I> {
    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse, InvokeError> {
        let started = std::time::Instant::now();
        let outcome = self.inner.invoke(request.clone()).await;

        let (response, status_code, execution_time_ms, error) = match &outcome {
            Ok(response) => (response.body.clone(), 0, response.elapsed_ms, None),
            Err(error) => {
                let elapsed = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
                (String::new(), FAILED_STATUS_CODE, elapsed, Some(error.message.clone()))
            }
        };
        let record = NewHistoryRecord {
            server_id: request.server_id,
            service: request.service,
            method: request.method,
            request: request.body,
            response,
            request_headers: pairs_to_json(&request.metadata),
            context_values: pairs_to_json(&request.context_values),
            status_code,
            execution_time_ms,
            error,
            created_at: Utc::now(),
        };
        if let Err(error) = self.sink.record_history(record).await {
            warn!(error = %error, "failed to record history");
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};
    use tempfile::TempDir;

    use super::*;
    use crate::store::SqliteStore;

    #[derive(Default)]
    struct MemorySink {
        records: Mutex<Vec<NewHistoryRecord>>,
        broken: bool,
    }

    #[async_trait]
    impl HistorySink for MemorySink {
        async fn record_history(&self, record: NewHistoryRecord) -> Result<i64> {
            if self.broken {
                return Err(anyhow!("disk full"));
            }
            let mut records = self.records.lock().unwrap();
            records.push(record);
            Ok(records.len() as i64)
        }
    }

    struct Scripted(Result<InvokeResponse, InvokeError>);

    #[async_trait]
    impl Invoker for Scripted {
        async fn invoke(&self, _request: InvokeRequest) -> Result<InvokeResponse, InvokeError> {
            self.0.clone()
        }
    }

    fn request() -> InvokeRequest {
        InvokeRequest {
            server_id: 1,
            address: "localhost:50051".into(),
            service: "pkg.Greeter".into(),
            method: "SayHello".into(),
            body: r#"{"name": "bob"}"#.into(),
            metadata: vec![("authorization".into(), "Bearer t".into())],
            context_values: Vec::new(),
        }
    }

    #[test]
    fn plain_message_is_commented_out() {
        let block = format_invocation_error("connection refused\nretry later");
        assert_eq!(block, "// Request failed\n// connection refused\n// retry later");
    }

    #[test]
    fn json_message_is_pretty_printed() {
        let block = format_invocation_error(r#"{"code": 5, "message": "not found"}"#);
        assert!(block.starts_with("// Request failed\n{\n"));
        let body = block.trim_start_matches("// Request failed\n");
        let value: Value = serde_json::from_str(body).unwrap();
        assert_eq!(value["code"], 5);
    }

    #[test]
    fn scalar_json_is_treated_as_text() {
        assert_eq!(format_invocation_error("42"), "// Request failed\n// 42");
        assert_eq!(format_invocation_error(""), "// Request failed\n// (no details)");
    }

    #[test]
    fn pairs_encode_as_object_or_empty() {
        assert_eq!(pairs_to_json(&[]), "");
        assert_eq!(pairs_to_json(&[("b".into(), "1".into()), ("a".into(), "2".into())]), r#"{"b":"1","a":"2"}"#);
    }

    #[tokio::test]
    async fn success_and_failure_are_both_recorded() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::open(dir.path().join("rpcdesk.db")).unwrap());

        let ok = RecordingInvoker::new(
            Scripted(Ok(InvokeResponse { body: r#"{"message": "hi"}"#.into(), elapsed_ms: 7 })),
            store.clone(),
        );
        ok.invoke(request()).await.unwrap();

        let failing = RecordingInvoker::new(Scripted(Err(InvokeError::new("unavailable"))), store.clone());
        assert!(failing.invoke(request()).await.is_err());

        let history = store.history(None, 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].error.as_deref(), Some("unavailable"));
        assert_eq!(history[0].status_code, FAILED_STATUS_CODE);
        assert_eq!(history[1].response, r#"{"message": "hi"}"#);
        assert_eq!(history[1].execution_time_ms, 7);
        assert_eq!(history[1].request_header_pairs(), vec![("authorization".to_string(), "Bearer t".to_string())]);
    }

    #[tokio::test]
    async fn any_sink_receives_the_record() {
        let sink = Arc::new(MemorySink::default());
        let invoker = RecordingInvoker::new(Scripted(Err(InvokeError::new("deadline exceeded"))), sink.clone());
        assert!(invoker.invoke(request()).await.is_err());

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].method, "SayHello");
        assert_eq!(records[0].request_headers, r#"{"authorization":"Bearer t"}"#);
        assert_eq!(records[0].context_values, "");
        assert_eq!(records[0].error.as_deref(), Some("deadline exceeded"));
    }

    #[tokio::test]
    async fn sink_failure_does_not_change_the_outcome() {
        let sink = Arc::new(MemorySink { broken: true, ..MemorySink::default() });
        let body = r#"{"message": "hi"}"#;
        let invoker =
            RecordingInvoker::new(Scripted(Ok(InvokeResponse { body: body.into(), elapsed_ms: 3 })), sink.clone());

        let response = invoker.invoke(request()).await.unwrap();
        assert_eq!(response.body, body);
        assert!(sink.records.lock().unwrap().is_empty());
    }
}
