//! Trigger/poll client for the remote recognition workflow.
//!
//! One [`WorkflowOcrClient::recognize`] call performs a single trigger POST
//! and then polls the execution status endpoint on a fixed cadence until the
//! workflow reports a terminal status or the deadline elapses. Trigger
//! failures are terminal; per-attempt poll failures are swallowed and only
//! the most recent one is kept for the timeout report.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::OcrError;
use crate::extract::extract_json_object;
use crate::fields::DocumentFields;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Where and how to reach the workflow.
///
/// All values are pass-through: the client neither generates nor validates
/// credentials, it only forwards them.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Trigger endpoint that starts an execution.
    pub trigger_url: String,
    /// Pre-shared token the workflow validates.
    pub secret: String,
    /// Optional API key sent as `Authorization: Api-Key ...` on polls.
    pub api_key: Option<String>,
    /// Optional cloud folder id sent as a query parameter and header on polls.
    pub folder_id: Option<String>,
    /// Optional status URL template containing an `{execution_id}`
    /// placeholder. When unset the status URL is derived from `trigger_url`.
    pub status_url_template: Option<String>,
    /// Timeout for the trigger request.
    pub trigger_timeout: Duration,
    /// Timeout for each poll attempt.
    pub poll_timeout: Duration,
    /// Pause between poll attempts.
    pub poll_interval: Duration,
    /// Overall deadline for the poll phase.
    pub poll_deadline: Duration,
}

impl WorkflowConfig {
    pub fn new(trigger_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            trigger_url: trigger_url.into(),
            secret: secret.into(),
            api_key: None,
            folder_id: None,
            status_url_template: None,
            trigger_timeout: Duration::from_secs(30),
            poll_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(1500),
            poll_deadline: Duration::from_secs(45),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn with_status_url_template(mut self, template: impl Into<String>) -> Self {
        self.status_url_template = Some(template.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct TriggerRequest<'a> {
    image_base64: &'a str,
    secret: &'a str,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct WorkflowOcrClient {
    http: Client,
    config: WorkflowConfig,
}

impl WorkflowOcrClient {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Run one full recognition: trigger the workflow, poll the execution
    /// to completion, normalize the agent output.
    pub async fn recognize(&self, image_base64: &str) -> Result<DocumentFields, OcrError> {
        let execution_id = self.trigger(image_base64).await?;
        debug!(execution_id = %execution_id, "Workflow execution started");
        self.poll(&execution_id).await
    }

    /// Status endpoint for an execution.
    ///
    /// The configured template wins; the fallback derives the URL from the
    /// trigger URL by the service's path convention (`.../start` sits next
    /// to `.../execution/<id>`).
    pub fn status_url(&self, execution_id: &str) -> String {
        if let Some(template) = &self.config.status_url_template {
            return template.replace("{execution_id}", execution_id);
        }
        let base = match self.config.trigger_url.rsplit_once("/start") {
            Some((head, _)) => head,
            None => self.config.trigger_url.as_str(),
        };
        let base = match base.rsplit_once("/execution") {
            Some((head, _)) => head,
            None => base,
        };
        format!("{base}/execution/{execution_id}")
    }

    async fn trigger(&self, image_base64: &str) -> Result<String, OcrError> {
        let resp = self
            .http
            .post(&self.config.trigger_url)
            .timeout(self.config.trigger_timeout)
            .json(&TriggerRequest {
                image_base64,
                secret: &self.config.secret,
            })
            .send()
            .await
            .map_err(|e| OcrError::Trigger(e.to_string()))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(OcrError::TriggerStatus {
                status,
                body: body.chars().take(200).collect(),
            });
        }

        let body: Value = resp.json().await.map_err(|_| OcrError::MalformedResponse)?;
        match body.get("executionId").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(OcrError::MissingExecutionId),
        }
    }

    async fn poll(&self, execution_id: &str) -> Result<DocumentFields, OcrError> {
        let url = self.status_url(execution_id);
        let deadline = Instant::now() + self.config.poll_deadline;
        let mut last_err: Option<String> = None;
        let mut consecutive_failures: u32 = 0;

        while Instant::now() < deadline {
            tokio::time::sleep(self.config.poll_interval).await;

            let mut req = self.http.get(&url).timeout(self.config.poll_timeout);
            if let Some(folder_id) = &self.config.folder_id {
                req = req
                    .query(&[("folderId", folder_id.as_str())])
                    .header("x-folder-id", folder_id.as_str());
            }
            if let Some(api_key) = &self.config.api_key {
                req = req.header("Authorization", format!("Api-Key {api_key}"));
            }

            let resp = match req.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    last_err = Some(e.to_string());
                    consecutive_failures += 1;
                    warn!(
                        failures = consecutive_failures,
                        error = %e,
                        "Workflow status poll failed"
                    );
                    continue;
                }
            };

            let status = resp.status().as_u16();
            if status != 200 {
                last_err = Some(format!("GET {status}"));
                consecutive_failures += 1;
                warn!(
                    failures = consecutive_failures,
                    status, "Workflow status poll returned non-200"
                );
                continue;
            }

            // A 200 body that is not JSON is skipped without touching
            // last_err; the next tick retries.
            let body: Value = match resp.json().await {
                Ok(body) => body,
                Err(_) => continue,
            };
            consecutive_failures = 0;

            match interpret_execution(&body) {
                PollOutcome::Continue => continue,
                PollOutcome::Success(fields) => return Ok(fields),
                PollOutcome::Failed(err) => return Err(err),
            }
        }

        Err(OcrError::Timeout(last_err.unwrap_or_else(|| {
            "timed out waiting for the workflow result".to_string()
        })))
    }
}

// ---------------------------------------------------------------------------
// Status interpretation
// ---------------------------------------------------------------------------

enum PollOutcome {
    /// Execution still running (or reporting an unknown status); keep polling.
    Continue,
    Success(DocumentFields),
    Failed(OcrError),
}

/// Interpret one status response. Statuses are case-normalized; anything
/// other than SUCCEEDED/FAILED/CANCELLED keeps the loop alive.
fn interpret_execution(body: &Value) -> PollOutcome {
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_ascii_uppercase();

    match status.as_str() {
        "SUCCEEDED" => match recover_fields(body) {
            Ok(fields) => PollOutcome::Success(fields),
            Err(err) => PollOutcome::Failed(err),
        },
        "FAILED" | "CANCELLED" => {
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| status.clone());
            PollOutcome::Failed(OcrError::RemoteFailed(message))
        }
        _ => PollOutcome::Continue,
    }
}

/// Recover the normalized fields from a SUCCEEDED response.
///
/// The payload sits under `output` (falling back to `result`) and may be a
/// JSON object directly, a string with an embedded object, or an object
/// nested one more level under an `output` key whose value is either again.
fn recover_fields(body: &Value) -> Result<DocumentFields, OcrError> {
    let output = body
        .get("output")
        .filter(|v| non_empty(v))
        .or_else(|| body.get("result").filter(|v| non_empty(v)))
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));

    match output {
        Value::String(text) => extract_json_object(&text)
            .map(|map| DocumentFields::from_output(&map))
            .ok_or(OcrError::Extraction),
        Value::Object(map) => {
            let inner = match map.get("output") {
                Some(v) => v.clone(),
                None => Value::Object(map),
            };
            match inner {
                Value::String(text) => extract_json_object(&text)
                    .map(|map| DocumentFields::from_output(&map))
                    .ok_or(OcrError::UnexpectedOutput),
                Value::Object(map) => Ok(DocumentFields::from_output(&map)),
                _ => Err(OcrError::UnexpectedOutput),
            }
        }
        _ => Err(OcrError::UnexpectedOutput),
    }
}

fn non_empty(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Array(arr) => !arr.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_config(trigger_url: String) -> WorkflowConfig {
        let mut config = WorkflowConfig::new(trigger_url, "s3cret");
        config.poll_interval = Duration::from_millis(20);
        config.poll_deadline = Duration::from_millis(500);
        config
    }

    // ----- status interpretation (no network) -----

    #[test]
    fn running_status_keeps_polling() {
        let outcome = interpret_execution(&json!({"status": "RUNNING"}));
        assert!(matches!(outcome, PollOutcome::Continue));
    }

    #[test]
    fn unknown_status_keeps_polling() {
        let outcome = interpret_execution(&json!({"status": "QUEUED"}));
        assert!(matches!(outcome, PollOutcome::Continue));
    }

    #[test]
    fn succeeded_with_prose_wrapped_output() {
        let body = json!({
            "status": "SUCCEEDED",
            "output": "Here is the result: {\"vehicle_vin\": \"X7LBSRBUCFH012345\", \"vehicle_year\": 2019}"
        });
        match interpret_execution(&body) {
            PollOutcome::Success(fields) => {
                assert_eq!(fields.vehicle_vin, "X7LBSRBUCFH012345");
                assert_eq!(fields.vehicle_year, "2019");
            }
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn succeeded_status_is_case_insensitive() {
        let body = json!({"status": "succeeded", "output": {"vehicle_brand": "Lada"}});
        match interpret_execution(&body) {
            PollOutcome::Success(fields) => assert_eq!(fields.vehicle_brand, "Lada"),
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn succeeded_with_nested_output_string() {
        let body = json!({
            "status": "SUCCEEDED",
            "output": {"output": "{\"vehicle_model\": \"Vesta\"}"}
        });
        match interpret_execution(&body) {
            PollOutcome::Success(fields) => assert_eq!(fields.vehicle_model, "Vesta"),
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn succeeded_falls_back_to_result_key() {
        let body = json!({
            "status": "SUCCEEDED",
            "result": {"vehicle_color": "black"}
        });
        match interpret_execution(&body) {
            PollOutcome::Success(fields) => assert_eq!(fields.vehicle_color, "black"),
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn succeeded_with_unextractable_text_is_terminal() {
        let body = json!({"status": "SUCCEEDED", "output": "the document was unreadable"});
        match interpret_execution(&body) {
            PollOutcome::Failed(OcrError::Extraction) => {}
            _ => panic!("expected extraction error"),
        }
    }

    #[test]
    fn succeeded_with_scalar_output_is_unexpected() {
        let body = json!({"status": "SUCCEEDED", "output": 7});
        match interpret_execution(&body) {
            PollOutcome::Failed(OcrError::UnexpectedOutput) => {}
            _ => panic!("expected unexpected-output error"),
        }
    }

    #[test]
    fn failed_status_carries_remote_message() {
        let body = json!({
            "status": "FAILED",
            "error": {"message": "low confidence"}
        });
        match interpret_execution(&body) {
            PollOutcome::Failed(err) => assert_eq!(err.to_string(), "low confidence"),
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn cancelled_without_message_reports_bare_status() {
        let body = json!({"status": "cancelled"});
        match interpret_execution(&body) {
            PollOutcome::Failed(err) => assert_eq!(err.to_string(), "CANCELLED"),
            _ => panic!("expected failure"),
        }
    }

    // ----- status URL derivation -----

    #[test]
    fn status_url_from_template() {
        let config = WorkflowConfig::new("https://wf.example/api/start", "s")
            .with_status_url_template("https://wf.example/api/executions/{execution_id}");
        let client = WorkflowOcrClient::new(config);
        assert_eq!(
            client.status_url("ex-42"),
            "https://wf.example/api/executions/ex-42"
        );
    }

    #[test]
    fn status_url_derived_from_trigger_url() {
        let client = WorkflowOcrClient::new(WorkflowConfig::new(
            "https://wf.example/workflows/w1/start",
            "s",
        ));
        assert_eq!(
            client.status_url("ex-42"),
            "https://wf.example/workflows/w1/execution/ex-42"
        );
    }

    #[test]
    fn status_url_derivation_strips_existing_execution_suffix() {
        let client = WorkflowOcrClient::new(WorkflowConfig::new(
            "https://wf.example/workflows/w1/execution/start",
            "s",
        ));
        assert_eq!(
            client.status_url("ex-42"),
            "https://wf.example/workflows/w1/execution/ex-42"
        );
    }

    // ----- full trigger/poll loop against a mock server -----

    #[tokio::test]
    async fn recognize_happy_path_with_interim_running_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/workflows/w1/start"))
            .and(body_partial_json(json!({"secret": "s3cret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "executionId": "ex-1"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/workflows/w1/execution/ex-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "RUNNING"
            })))
            .up_to_n_times(2)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/workflows/w1/execution/ex-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "SUCCEEDED",
                "output": "Here is the result: {\"vehicle_vin\": \"X7LBSRBUCFH012345\", \"vehicle_year\": 2019}"
            })))
            .mount(&server)
            .await;

        let client = WorkflowOcrClient::new(fast_config(format!(
            "{}/workflows/w1/start",
            server.uri()
        )));
        let fields = client.recognize("aGVsbG8=").await.unwrap();
        assert_eq!(fields.vehicle_vin, "X7LBSRBUCFH012345");
        assert_eq!(fields.vehicle_year, "2019");
        assert_eq!(fields.vehicle_brand, "");
    }

    #[tokio::test]
    async fn recognize_forwards_credentials_on_polls() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/wf/start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "executionId": "ex-9"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/wf/execution/ex-9"))
            .and(query_param("folderId", "folder-1"))
            .and(header("Authorization", "Api-Key key-1"))
            .and(header("x-folder-id", "folder-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "SUCCEEDED",
                "output": {"vehicle_brand": "Kia"}
            })))
            .mount(&server)
            .await;

        let mut config = fast_config(format!("{}/wf/start", server.uri()));
        config = config.with_api_key("key-1").with_folder_id("folder-1");
        let client = WorkflowOcrClient::new(config);
        let fields = client.recognize("aGVsbG8=").await.unwrap();
        assert_eq!(fields.vehicle_brand, "Kia");
    }

    #[tokio::test]
    async fn trigger_without_execution_id_is_terminal() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/wf/start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = WorkflowOcrClient::new(fast_config(format!("{}/wf/start", server.uri())));
        let err = client.recognize("aGVsbG8=").await.unwrap_err();
        assert!(matches!(err, OcrError::MissingExecutionId));
        assert!(err.to_string().contains("executionId"));
    }

    #[tokio::test]
    async fn trigger_non_200_is_terminal() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/wf/start"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let client = WorkflowOcrClient::new(fast_config(format!("{}/wf/start", server.uri())));
        match client.recognize("aGVsbG8=").await.unwrap_err() {
            OcrError::TriggerStatus { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn remote_failure_message_is_passed_through() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/wf/start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "executionId": "ex-2"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/wf/execution/ex-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "FAILED",
                "error": {"message": "low confidence"}
            })))
            .mount(&server)
            .await;

        let client = WorkflowOcrClient::new(fast_config(format!("{}/wf/start", server.uri())));
        let err = client.recognize("aGVsbG8=").await.unwrap_err();
        assert_eq!(err.to_string(), "low confidence");
    }

    #[tokio::test]
    async fn deadline_reports_last_poll_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/wf/start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "executionId": "ex-3"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/wf/execution/ex-3"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = WorkflowOcrClient::new(fast_config(format!("{}/wf/start", server.uri())));
        match client.recognize("aGVsbG8=").await.unwrap_err() {
            OcrError::Timeout(message) => assert_eq!(message, "GET 500"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn deadline_without_poll_errors_reports_generic_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/wf/start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "executionId": "ex-4"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/wf/execution/ex-4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "RUNNING"
            })))
            .mount(&server)
            .await;

        let client = WorkflowOcrClient::new(fast_config(format!("{}/wf/start", server.uri())));
        match client.recognize("aGVsbG8=").await.unwrap_err() {
            OcrError::Timeout(message) => assert!(message.contains("timed out")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
