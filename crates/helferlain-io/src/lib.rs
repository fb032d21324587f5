//! Network client for the public chat API.
//!
//! Requests run on short-lived worker threads so the caller's update loop
//! never blocks; completions are collected via [`ApiClient::poll`]. Every
//! request carries a hard deadline enforced by the HTTP client, so a
//! timeout tears down the in-flight request instead of letting a late
//! response mutate state. [`ApiClient::cancel`] (or dropping the client)
//! discards a pending entry, after which its eventual result is ignored.

pub mod protocol;

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;

pub use protocol::{
    BotConfig, Branding, ChatMetadata, ChatRequest, ChatResponse, ContactPerson, Source,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected status {status}")]
    Status { status: u16, body: String },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("request worker disconnected")]
    Disconnected,
}

impl ApiError {
    /// Fatal errors abort widget initialization; transient ones are
    /// recovered locally with a fallback message.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout(_))
    }
}

pub type RequestId = u64;

/// What a completed request resolved to.
#[derive(Debug)]
pub enum Outcome {
    BotConfig(Result<BotConfig, ApiError>),
    Chat(Result<ChatResponse, ApiError>),
    CustomCss(Result<String, ApiError>),
}

#[derive(Debug)]
pub struct Completion {
    pub request_id: RequestId,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy)]
enum RequestKind {
    BotConfig,
    Chat,
    CustomCss,
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Get,
    Post,
}

struct RawResponse {
    body: String,
}

struct PendingRequest {
    request_id: RequestId,
    kind: RequestKind,
    receiver: Receiver<Result<RawResponse, ApiError>>,
    join: Option<JoinHandle<()>>,
}

/// Poll-based client for one widget's API traffic.
pub struct ApiClient {
    base_url: String,
    config_timeout: Duration,
    chat_timeout: Duration,
    pending: Vec<PendingRequest>,
    next_id: RequestId,
}

impl ApiClient {
    /// Validate and normalize the endpoint base URL.
    pub fn new(
        base_url: &str,
        config_timeout: Duration,
        chat_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/').to_string();
        let parsed = url::Url::parse(&trimmed).map_err(|e| ApiError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ApiError::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme '{scheme}'"),
            });
        }

        Ok(Self {
            base_url: trimmed,
            config_timeout,
            chat_timeout,
            pending: Vec::new(),
            next_id: 1,
        })
    }

    /// `GET {base}/bot/{bot_id}`
    pub fn fetch_bot_config(&mut self, bot_id: &str) -> RequestId {
        let url = format!("{}/bot/{}", self.base_url, bot_id);
        self.spawn(RequestKind::BotConfig, Method::Get, url, None, self.config_timeout)
    }

    /// `POST {base}/bot/{bot_id}/chat`
    pub fn send_chat(&mut self, bot_id: &str, request: &ChatRequest) -> RequestId {
        let url = format!("{}/bot/{}/chat", self.base_url, bot_id);
        // ChatRequest has no non-serializable fields, so this cannot fail.
        let body = serde_json::to_string(request).unwrap_or_default();
        self.spawn(RequestKind::Chat, Method::Post, url, Some(body), self.chat_timeout)
    }

    /// Fetch an embedder-supplied stylesheet. The URL comes from caller
    /// config rather than from our own endpoint, so it is validated here.
    pub fn fetch_custom_css(&mut self, css_url: &str) -> Result<RequestId, ApiError> {
        url::Url::parse(css_url).map_err(|e| ApiError::InvalidUrl {
            url: css_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(self.spawn(
            RequestKind::CustomCss,
            Method::Get,
            css_url.to_string(),
            None,
            self.config_timeout,
        ))
    }

    /// Drop a pending request; any result it eventually produces is ignored.
    pub fn cancel(&mut self, request_id: RequestId) {
        self.pending.retain(|p| p.request_id != request_id);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Collect all completions that are ready, decoding response bodies
    /// into their protocol types.
    pub fn poll(&mut self) -> Vec<Completion> {
        let mut ready = Vec::new();
        let mut still_pending = Vec::new();

        for mut pending in self.pending.drain(..) {
            match pending.receiver.try_recv() {
                Ok(raw) => {
                    if let Some(join) = pending.join.take() {
                        let _ = join.join();
                    }
                    ready.push(Completion {
                        request_id: pending.request_id,
                        outcome: decode(pending.kind, raw),
                    });
                }
                Err(TryRecvError::Empty) => still_pending.push(pending),
                Err(TryRecvError::Disconnected) => {
                    if let Some(join) = pending.join.take() {
                        let _ = join.join();
                    }
                    ready.push(Completion {
                        request_id: pending.request_id,
                        outcome: decode(pending.kind, Err(ApiError::Disconnected)),
                    });
                }
            }
        }

        self.pending = still_pending;
        ready
    }

    fn spawn(
        &mut self,
        kind: RequestKind,
        method: Method,
        url: String,
        body: Option<String>,
        timeout: Duration,
    ) -> RequestId {
        let request_id = self.next_id;
        self.next_id += 1;

        let (tx, rx) = mpsc::channel();
        let join = thread::spawn(move || {
            let _ = tx.send(execute(method, &url, body.as_deref(), timeout));
        });

        self.pending.push(PendingRequest {
            request_id,
            kind,
            receiver: rx,
            join: Some(join),
        });
        request_id
    }
}

fn decode(kind: RequestKind, raw: Result<RawResponse, ApiError>) -> Outcome {
    match kind {
        RequestKind::BotConfig => Outcome::BotConfig(raw.and_then(|r| {
            serde_json::from_str(&r.body).map_err(|e| ApiError::Decode(e.to_string()))
        })),
        RequestKind::Chat => Outcome::Chat(raw.and_then(|r| {
            serde_json::from_str(&r.body).map_err(|e| ApiError::Decode(e.to_string()))
        })),
        RequestKind::CustomCss => Outcome::CustomCss(raw.map(|r| r.body)),
    }
}

/// One request with a hard deadline, shared by every call site.
fn execute(
    method: Method,
    url: &str,
    body: Option<&str>,
    timeout: Duration,
) -> Result<RawResponse, ApiError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("HelferLain/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    let mut request = match method {
        Method::Get => client.get(url),
        Method::Post => client.post(url),
    };
    if let Some(body) = body {
        request = request
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string());
    }

    let response = request.send().map_err(|e| {
        if e.is_timeout() {
            ApiError::Timeout(timeout)
        } else {
            ApiError::Transport(e.to_string())
        }
    })?;

    let status = response.status().as_u16();
    let body = response.text().map_err(|e| {
        if e.is_timeout() {
            ApiError::Timeout(timeout)
        } else {
            ApiError::Transport(e.to_string())
        }
    })?;

    if !(200..300).contains(&status) {
        tracing::debug!(status, url, "API request failed");
        return Err(ApiError::Status { status, body });
    }

    Ok(RawResponse { body })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(base: &str) -> ApiClient {
        ApiClient::new(base, Duration::from_secs(2), Duration::from_secs(2)).unwrap()
    }

    /// Pump the client until a completion arrives or the deadline passes.
    fn drain(client: &mut ApiClient, deadline: Duration) -> Vec<Completion> {
        let start = std::time::Instant::now();
        loop {
            let ready = client.poll();
            if !ready.is_empty() {
                return ready;
            }
            if start.elapsed() > deadline {
                return vec![];
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(ApiClient::new("not a url", Duration::from_secs(1), Duration::from_secs(1)).is_err());
        assert!(ApiClient::new("ftp://example.com", Duration::from_secs(1), Duration::from_secs(1)).is_err());
    }

    #[test]
    fn fetches_bot_config() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/bot/abc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"Hilfe-Bot","branding":{"welcome_message":"Hi!"}}"#)
            .create();

        let mut client = client_for(&server.url());
        let id = client.fetch_bot_config("abc");

        let ready = drain(&mut client, Duration::from_secs(3));
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].request_id, id);
        match &ready[0].outcome {
            Outcome::BotConfig(Ok(config)) => {
                assert_eq!(config.name, "Hilfe-Bot");
                assert_eq!(config.branding.welcome_message.as_deref(), Some("Hi!"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        mock.assert();
        assert!(!client.has_pending());
    }

    #[test]
    fn non_2xx_is_a_status_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/bot/missing")
            .with_status(404)
            .with_body("not found")
            .create();

        let mut client = client_for(&server.url());
        client.fetch_bot_config("missing");

        let ready = drain(&mut client, Duration::from_secs(3));
        match &ready[0].outcome {
            Outcome::BotConfig(Err(ApiError::Status { status, .. })) => assert_eq!(*status, 404),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn chat_posts_message_and_session() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/bot/abc/chat")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "message": "Preise?",
                "conversation_id": "session_1_test"
            })))
            .with_status(200)
            .with_body(r#"{"response":"Ab 99€"}"#)
            .create();

        let mut client = client_for(&server.url());
        client.send_chat(
            "abc",
            &ChatRequest {
                message: "Preise?".into(),
                conversation_id: "session_1_test".into(),
            },
        );

        let ready = drain(&mut client, Duration::from_secs(3));
        match &ready[0].outcome {
            Outcome::Chat(Ok(response)) => assert_eq!(response.response, "Ab 99€"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        mock.assert();
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/bot/abc")
            .with_status(200)
            .with_body("{not json")
            .create();

        let mut client = client_for(&server.url());
        client.fetch_bot_config("abc");

        let ready = drain(&mut client, Duration::from_secs(3));
        assert!(matches!(
            ready[0].outcome,
            Outcome::BotConfig(Err(ApiError::Decode(_)))
        ));
    }

    #[test]
    fn deadline_aborts_inflight_request() {
        // A listener that accepts but never answers forces a read timeout.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = ApiClient::new(
            &format!("http://{addr}"),
            Duration::from_millis(200),
            Duration::from_millis(200),
        )
        .unwrap();
        client.fetch_bot_config("abc");

        let ready = drain(&mut client, Duration::from_secs(3));
        assert_eq!(ready.len(), 1);
        match &ready[0].outcome {
            Outcome::BotConfig(Err(err)) => assert!(err.is_timeout(), "got {err:?}"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn cancel_discards_pending_result() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = ApiClient::new(
            &format!("http://{addr}"),
            Duration::from_millis(300),
            Duration::from_millis(300),
        )
        .unwrap();
        let id = client.fetch_bot_config("abc");
        client.cancel(id);

        assert!(!client.has_pending());
        let ready = drain(&mut client, Duration::from_millis(600));
        assert!(ready.is_empty());
    }

    #[test]
    fn custom_css_requires_valid_url() {
        let mut client = client_for("https://api.example.com");
        assert!(client.fetch_custom_css("::garbage::").is_err());
    }
}
