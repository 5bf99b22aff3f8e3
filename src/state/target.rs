use reqwest::header::{HeaderMap, HeaderName, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use url::Url;

/// Cache validator returned by the server on a successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalToken {
    /// Value of `Last-Modified`, sent back as `If-Modified-Since`
    LastModified(String),
    /// Value of `ETag`, sent back as `If-None-Match`
    ETag(String),
}

impl ConditionalToken {
    /// Reads the validator from response headers, preferring `Last-Modified`
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let read = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        read(LAST_MODIFIED)
            .map(Self::LastModified)
            .or_else(|| read(ETAG).map(Self::ETag))
    }

    /// Request header carrying this token on the next fetch
    pub fn request_header(&self) -> (HeaderName, &str) {
        match self {
            Self::LastModified(value) => (IF_MODIFIED_SINCE, value.as_str()),
            Self::ETag(value) => (IF_NONE_MATCH, value.as_str()),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::LastModified(value) | Self::ETag(value) => value,
        }
    }
}

/// One tracked fetch endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Canonical request URI, unique within the registry
    pub uri: Url,

    pub board: String,

    /// Thread number; None for a board listing
    pub thread: Option<String>,

    /// Validator from the last successful fetch
    pub token: Option<ConditionalToken>,

    /// Transient failures since the last successful or not-modified fetch
    pub consecutive_failures: u32,

    /// Number of completed fetch attempts
    pub polls: u32,
}

impl Target {
    pub fn new(uri: Url, board: impl Into<String>, thread: Option<String>) -> Self {
        Self {
            uri,
            board: board.into(),
            thread,
            token: None,
            consecutive_failures: 0,
            polls: 0,
        }
    }

    /// False for board listings, whose content yields more targets
    pub fn is_thread(&self) -> bool {
        self.thread.is_some()
    }

    /// Short operator-facing label such as `/g/51971506`
    pub fn label(&self) -> String {
        match &self.thread {
            Some(thread) => format!("/{}/{}", self.board, thread),
            None => format!("/{}/", self.board),
        }
    }
}
