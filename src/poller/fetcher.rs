//! HTTP fetcher implementation
//!
//! This module handles every JSON request made by the poller:
//! - Building the shared HTTP client with the configured user agent
//! - Sending the conditional header carried by a target's token
//! - Classifying status codes and network failures
//! - Parsing response bodies as JSON

use crate::config::Config;
use crate::state::ConditionalToken;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

/// Result of one conditional fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// 200 with a body that parsed as JSON
    Success {
        /// Parsed response body
        content: Value,
        /// Validator for the next fetch of the same URI
        token: Option<ConditionalToken>,
    },

    /// 304, the content is unchanged since the token was issued
    NotModified,

    /// 404, the board or thread is gone
    NotFound,

    /// 403, the site refuses the request
    Blocked,

    /// Any other status, a network failure, a timeout or a malformed body
    TransientError {
        /// HTTP status code when a response arrived
        code: Option<u16>,
        /// Error description
        reason: String,
    },
}

impl FetchOutcome {
    /// Short name used in logs and probe reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::NotModified => "not-modified",
            Self::NotFound => "not-found",
            Self::Blocked => "blocked",
            Self::TransientError { .. } => "transient-error",
        }
    }

    /// True for outcomes that remove the target from the registry
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NotFound | Self::Blocked)
    }

    fn transient(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self::TransientError {
            code,
            reason: reason.into(),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - Loaded configuration; the user agent and timeouts are used
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use chandere::config::Config;
/// use chandere::poller::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(config.poller.request_timeout())
        .connect_timeout(config.poller.connect_timeout())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Maps a non-200 status code to an outcome
///
/// | Status | Outcome |
/// |--------|---------|
/// | 304 | NotModified |
/// | 404 | NotFound |
/// | 403 | Blocked |
/// | anything else | TransientError |
///
/// A 200 needs its body inspected and is handled by `fetch_target`; passed
/// here it classifies as transient.
pub fn classify_status(status: StatusCode) -> FetchOutcome {
    match status {
        StatusCode::NOT_MODIFIED => FetchOutcome::NotModified,
        StatusCode::NOT_FOUND => FetchOutcome::NotFound,
        StatusCode::FORBIDDEN => FetchOutcome::Blocked,
        other => FetchOutcome::transient(
            Some(other.as_u16()),
            other.canonical_reason().unwrap_or("unexpected status"),
        ),
    }
}

/// Fetches one target URI
///
/// # Request Flow
///
/// 1. Attach `If-Modified-Since` or `If-None-Match` when a token is known
/// 2. Send the GET request
/// 3. On 200, capture the new token and parse the body as JSON
/// 4. Otherwise classify the status with `classify_status`
///
/// Network errors and timeouts never escape; they become `TransientError`.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `uri` - Target URI
/// * `token` - Validator from the previous successful fetch
pub async fn fetch_target(
    client: &Client,
    uri: &Url,
    token: Option<&ConditionalToken>,
) -> FetchOutcome {
    let mut request = client.get(uri.clone());
    if let Some(token) = token {
        let (name, value) = token.request_header();
        request = request.header(name, value);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return classify_network_error(&e),
    };

    let status = response.status();
    if status != StatusCode::OK {
        return classify_status(status);
    }

    let token = ConditionalToken::from_headers(response.headers());
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => return classify_network_error(&e),
    };

    match serde_json::from_slice::<Value>(&body) {
        Ok(content) => FetchOutcome::Success { content, token },
        Err(e) => FetchOutcome::transient(Some(200), format!("malformed JSON: {}", e)),
    }
}

fn classify_network_error(e: &reqwest::Error) -> FetchOutcome {
    let code = e.status().map(|status| status.as_u16());
    if e.is_timeout() {
        FetchOutcome::transient(code, "Request timeout")
    } else if e.is_connect() {
        FetchOutcome::transient(code, "Connection refused")
    } else {
        FetchOutcome::transient(code, e.to_string())
    }
}
