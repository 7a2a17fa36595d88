//! Agent backend API client

use crate::{
    error::{Error, Result},
    stream::{EventStream, StreamEvent},
    types::{
        Agent, ChatRequest, Envelope, FileView, FileViewRequest, ShellView, ShellViewRequest,
    },
};
use async_stream::stream;
use futures::StreamExt;
use reqwest::StatusCode;
use reqwest_eventsource::{Event, EventSource, retry::Never};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

/// Default backend address
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// API version segment appended to a bare host
pub const API_VERSION: &str = "v1";

/// Timeout applied to unary calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full API base URL, e.g. `http://localhost:8000/api/v1`
    pub base_url: String,
    /// Timeout for unary requests; never applied to the event stream
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Config for an explicit API base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Config for a bare host; the versioned API path is appended
    pub fn from_host(host: &str) -> Self {
        Self::new(format!(
            "{}/api/{}",
            host.trim_end_matches('/'),
            API_VERSION
        ))
    }

    /// Set the unary request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for the agent backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client from a config
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::InvalidConfig("base URL must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            timeout: config.timeout,
        })
    }

    /// The API base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a new agent session
    pub async fn create_agent(&self) -> Result<Agent> {
        self.post::<(), _>("/agents", None).await
    }

    /// Fetch the output of one of the agent's shell sessions
    pub async fn view_shell(&self, agent_id: &str, session_id: &str) -> Result<ShellView> {
        let body = ShellViewRequest {
            session_id: session_id.to_string(),
        };
        self.post(&format!("/agents/{}/shell", agent_id), Some(&body))
            .await
    }

    /// Fetch the content of a file in the agent's sandbox
    pub async fn view_file(&self, agent_id: &str, file: &str) -> Result<FileView> {
        let body = FileViewRequest {
            file: file.to_string(),
        };
        self.post(&format!("/agents/{}/file", agent_id), Some(&body))
            .await
    }

    /// WebSocket address of the agent's VNC endpoint
    pub fn vnc_url(&self, agent_id: &str) -> String {
        let ws_base = match self.base_url.strip_prefix("http") {
            Some(rest) => format!("ws{}", rest),
            None => self.base_url.clone(),
        };
        format!("{}/agents/{}/vnc", ws_base, agent_id)
    }

    /// Send a chat message and stream the agent's events
    ///
    /// The connection is opened lazily when the stream is first polled and
    /// is never re-established after a failure.
    pub fn chat(&self, agent_id: &str, message: &str) -> Result<EventStream> {
        let url = self.url(&format!("/agents/{}/chat", agent_id));
        tracing::debug!("Opening event stream: {}", url);

        let request_builder = self
            .client
            .post(&url)
            .header("accept", "text/event-stream")
            .json(&ChatRequest::now(message));

        let mut event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Stream(format!("Failed to create event source: {}", e)))?;
        event_source.set_retry_policy(Box::new(Never));

        Ok(Box::pin(create_stream(event_source)))
    }

    /// Callback form of [`ApiClient::chat`]
    ///
    /// `on_event` sees every decoded event in order. On failure `on_error`
    /// runs once and the error is returned.
    pub async fn chat_with_handlers<F, E>(
        &self,
        agent_id: &str,
        message: &str,
        mut on_event: F,
        on_error: E,
    ) -> Result<()>
    where
        F: FnMut(StreamEvent),
        E: FnOnce(&Error),
    {
        let mut stream = match self.chat(agent_id, message) {
            Ok(stream) => stream,
            Err(e) => {
                on_error(&e);
                return Err(e);
            }
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => on_event(event),
                Err(e) => {
                    tracing::error!("Chat stream failed: {}", e);
                    on_error(&e);
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, T>(&self, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let mut request = self.client.post(&url).timeout(self.timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(Error::from_transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(Error::from_transport)?;

        decode_envelope(status, &bytes).inspect_err(|e| tracing::warn!("API error on {}: {}", path, e))
    }
}

/// Unwrap a unary response into its `data`, classifying failures
fn decode_envelope<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    if !status.is_success() {
        return Err(Error::Http {
            status: status.as_u16(),
            message: extract_message(status, body),
        });
    }

    let envelope: Envelope<serde_json::Value> = serde_json::from_slice(body)?;
    if !envelope.is_success() {
        return Err(Error::business(envelope.code, envelope.msg));
    }

    match envelope.data {
        Some(data) if !data.is_null() => Ok(serde_json::from_value(data)?),
        _ => Err(Error::UnexpectedResponse(
            "success envelope carried no data".into(),
        )),
    }
}

/// Best-effort message for a non-2xx response
fn extract_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(serde_json::Value::Object(obj)) = serde_json::from_slice(body) {
        for key in ["msg", "message"] {
            if let Some(msg) = obj.get(key).and_then(|v| v.as_str()) {
                if !msg.is_empty() {
                    return msg.to_string();
                }
            }
        }
    }

    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}

/// Create the event stream from SSE events
///
/// A known tag whose JSON payload fails to decode is logged and skipped; the
/// stream keeps going.
fn create_stream(mut event_source: EventSource) -> impl futures::Stream<Item = Result<StreamEvent>> {
    stream! {
        while let Some(event_result) = event_source.next().await {
            match event_result {
                Ok(Event::Open) => {
                    tracing::debug!("Event stream opened");
                }
                Ok(Event::Message(message)) => {
                    tracing::debug!("Frame: event={:?} data={}", message.event, message.data);
                    match StreamEvent::from_frame(&message.event, &message.data) {
                        Ok(Some(event)) => {
                            let terminal = event.is_terminal();
                            yield Ok(event);
                            if terminal {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!("Dropping malformed '{}' frame: {}", message.event, e);
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    tracing::debug!("Event stream closed by server");
                    break;
                }
                Err(e) => {
                    yield Err(stream_error(e).await);
                    break;
                }
            }
        }

        event_source.close();
    }
}

async fn stream_error(err: reqwest_eventsource::Error) -> Error {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let body = response.bytes().await.unwrap_or_default();
            Error::Http {
                status: status.as_u16(),
                message: extract_message(status, &body),
            }
        }
        reqwest_eventsource::Error::Transport(e) => Error::Stream(e.to_string()),
        other => Error::Stream(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StepStatus;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(ClientConfig::from_host(&server.uri())).unwrap()
    }

    fn sse(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream")
    }

    // --- unary envelope handling ---

    #[test]
    fn test_decode_success() {
        let body = br#"{"code":0,"msg":"","data":{"agent_id":"a1","status":"ok","message":""}}"#;
        let agent: Agent = decode_envelope(StatusCode::OK, body).unwrap();
        assert_eq!(
            agent,
            Agent {
                agent_id: "a1".into(),
                status: "ok".into(),
                message: String::new(),
            }
        );
    }

    #[test]
    fn test_decode_business_error() {
        let err = decode_envelope::<Agent>(StatusCode::OK, br#"{"code":1,"msg":"bad"}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Business { code: 1, .. }));
        assert_eq!(err.message(), "bad");
    }

    #[test]
    fn test_decode_missing_data() {
        let err = decode_envelope::<Agent>(StatusCode::OK, br#"{"code":0,"msg":"ok","data":null}"#)
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse(_)));
    }

    #[test]
    fn test_decode_http_error_prefers_msg() {
        let err = decode_envelope::<Agent>(
            StatusCode::NOT_FOUND,
            br#"{"code":404,"msg":"Agent not found","data":null}"#,
        )
        .unwrap_err();
        match err {
            Error::Http { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Agent not found");
            }
            other => panic!("expected HTTP error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_http_error_message_field() {
        let err = decode_envelope::<Agent>(
            StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"message":"sandbox crashed"}"#,
        )
        .unwrap_err();
        assert_eq!(err.message(), "sandbox crashed");
    }

    #[test]
    fn test_decode_http_error_falls_back_to_reason() {
        let err = decode_envelope::<Agent>(StatusCode::BAD_GATEWAY, b"<html>oops</html>")
            .unwrap_err();
        assert_eq!(err.message(), "Bad Gateway");
        assert_eq!(err.code(), Some(502));
    }

    #[test]
    fn test_empty_base_url_rejected() {
        assert!(matches!(
            ApiClient::new(ClientConfig::new("  ")),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_vnc_url_scheme_swap() {
        let client = ApiClient::new(ClientConfig::new("http://host:8000/api/v1/")).unwrap();
        assert_eq!(client.vnc_url("a1"), "ws://host:8000/api/v1/agents/a1/vnc");

        let client = ApiClient::new(ClientConfig::from_host("https://example.com")).unwrap();
        assert_eq!(client.vnc_url("a1"), "wss://example.com/api/v1/agents/a1/vnc");
    }

    #[tokio::test]
    async fn test_create_agent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/agents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "success",
                "data": {"agent_id": "a1", "status": "created", "message": "Agent created successfully"}
            })))
            .mount(&server)
            .await;

        let agent = client_for(&server).await.create_agent().await.unwrap();
        assert_eq!(agent.agent_id, "a1");
        assert_eq!(agent.status, "created");
    }

    #[tokio::test]
    async fn test_view_shell_sends_session_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/agents/a1/shell"))
            .and(body_json(serde_json::json!({"session_id": "s1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "success",
                "data": {
                    "output": "hello\n",
                    "session_id": "s1",
                    "console": [{"ps1": "ubuntu@sandbox:~ $", "command": "echo hello", "output": "hello"}]
                }
            })))
            .mount(&server)
            .await;

        let view = client_for(&server).await.view_shell("a1", "s1").await.unwrap();
        assert_eq!(view.session_id, "s1");
        assert_eq!(view.console.len(), 1);
        assert_eq!(view.console[0].command, "echo hello");
    }

    #[tokio::test]
    async fn test_view_file_business_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/agents/a1/file"))
            .and(body_json(serde_json::json!({"file": "/home/ubuntu/a.txt"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 404,
                "msg": "File not found",
                "data": null
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .view_file("a1", "/home/ubuntu/a.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Business { code: 404, .. }));
        assert_eq!(err.message(), "File not found");
    }

    #[tokio::test]
    async fn test_network_failure() {
        // Nothing listens on port 1
        let client = ApiClient::new(ClientConfig::new("http://127.0.0.1:1/api/v1")).unwrap();
        let err = client.create_agent().await.unwrap_err();
        assert!(err.is_network(), "got {:?}", err);
    }

    // --- event stream ---

    #[tokio::test]
    async fn test_chat_streams_events_in_order() {
        let server = MockServer::start().await;
        let body = concat!(
            ": keep-alive\n\n",
            "event: step\n",
            "data: {\"timestamp\":1,\"status\":\"running\",\"id\":\"s1\",\"description\":\"do X\"}\n\n",
            "event: tool\n",
            "data: {\"timestamp\":2,\"name\":\"shell\",\"function\":\"shell_exec\",\"args\":{\"command\":\"ls\"},\"status\":\"calling\"}\n\n",
            "event: ping\n",
            "data: {}\n\n",
            "event: step\n",
            "data: {\"timestamp\":3,\"status\":\"completed\",\"id\":\"s1\",\"description\":\"do X\"}\n\n",
            "event: done\n",
            "data: {\"timestamp\":4}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/v1/agents/a1/chat"))
            .and(body_partial_json(serde_json::json!({"message": "hi"})))
            .respond_with(sse(body))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let events: Vec<StreamEvent> = client
            .chat("a1", "hi")
            .unwrap()
            .map(|item| item.unwrap())
            .collect()
            .await;

        let tags: Vec<&str> = events.iter().map(|e| e.tag()).collect();
        assert_eq!(tags, vec!["step", "tool", "step", "done"]);
        match &events[2] {
            StreamEvent::Step(step) => assert_eq!(step.status, StepStatus::Completed),
            other => panic!("expected step, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chat_stops_after_terminal_event() {
        let server = MockServer::start().await;
        let body = concat!(
            "event: error\n",
            "data: {\"timestamp\":1,\"error\":\"sandbox unavailable\"}\n\n",
            "event: message\n",
            "data: {\"timestamp\":2,\"content\":\"late\"}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/v1/agents/a1/chat"))
            .respond_with(sse(body))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let events: Vec<_> = client.chat("a1", "").unwrap().collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Ok(StreamEvent::Error(_))));
    }

    #[tokio::test]
    async fn test_chat_malformed_payload_is_skipped() {
        let server = MockServer::start().await;
        let body = concat!(
            "event: message\n",
            "data: not json\n\n",
            "event: message\n",
            "data: {\"timestamp\":2,\"content\":\"ok\"}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/v1/agents/a1/chat"))
            .respond_with(sse(body))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let events: Vec<_> = client.chat("a1", "hi").unwrap().collect().await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            Ok(StreamEvent::Message(msg)) => assert_eq!(msg.content, "ok"),
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chat_handlers_report_error_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/agents/missing/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "code": 404,
                "msg": "Agent not found",
                "data": null
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let mut seen = 0;
        let mut errors = Vec::new();
        let result = client
            .chat_with_handlers(
                "missing",
                "hi",
                |_| seen += 1,
                |e| errors.push(e.message()),
            )
            .await;

        assert_eq!(seen, 0);
        assert_eq!(errors, vec!["Agent not found".to_string()]);
        match result {
            Err(Error::Http { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected HTTP error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chat_handlers_deliver_events() {
        let server = MockServer::start().await;
        let body = concat!(
            "event: title\n",
            "data: {\"timestamp\":1,\"title\":\"Weather report\"}\n\n",
            "event: done\n",
            "data: {\"timestamp\":2}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/v1/agents/a1/chat"))
            .respond_with(sse(body))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let mut tags = Vec::new();
        client
            .chat_with_handlers("a1", "hi", |e| tags.push(e.tag()), |_| panic!("no error expected"))
            .await
            .unwrap();
        assert_eq!(tags, vec!["title", "done"]);
    }
}
