use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::filter::FilterPredicate;

/// Main configuration structure for Chandere
///
/// Every section is optional in the TOML file; missing values fall back to
/// the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(rename = "site", default)]
    pub sites: Vec<SiteEntry>,
}

/// Polling behaviour configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Maximum number of concurrent fetches per cycle (0 disables the cap)
    pub concurrency: usize,

    /// Seconds to sleep between cycles in continuous mode
    pub interval: u64,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,

    /// Connection establishment timeout in seconds
    #[serde(rename = "connect-timeout")]
    pub connect_timeout: u64,

    /// Optional deadline in seconds for all fetches of one cycle
    #[serde(rename = "cycle-timeout")]
    pub cycle_timeout: Option<u64>,

    /// Consecutive transient failures before a target is dropped (0 = never)
    #[serde(rename = "max-transient-failures")]
    pub max_transient_failures: u32,

    /// Seconds to wait before repeating a run-once cycle that saw transient failures
    #[serde(rename = "retry-delay")]
    pub retry_delay: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            interval: 30,
            request_timeout: 30,
            connect_timeout: 10,
            cycle_timeout: None,
            max_transient_failures: 0,
            retry_delay: 5,
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn cycle_timeout(&self) -> Option<Duration> {
        self.cycle_timeout.map(Duration::from_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name sent in the User-Agent header
    pub name: String,

    /// Version sent in the User-Agent header
    pub version: String,

    /// Optional contact URL or address appended to the header
    pub contact: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: "Chandere".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            contact: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version` or `Name/Version (+contact)`
    pub fn header_value(&self) -> String {
        match &self.contact {
            Some(contact) => format!("{}/{} (+{})", self.name, self.version, contact),
            None => format!("{}/{}", self.name, self.version),
        }
    }
}

/// A custom imageboard definition
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Alias used with `--site`
    pub name: String,

    /// JSON API family: "vichan", "lynxchan" or "infinity"
    pub family: String,

    /// Base URL for board and thread JSON
    #[serde(rename = "api-base")]
    pub api_base: String,

    /// Base URL for attachments (defaults to the API base)
    #[serde(rename = "media-base")]
    pub media_base: Option<String>,

    /// Path segment preceding thread numbers (vichan family only)
    #[serde(rename = "thread-dir", default = "default_thread_dir")]
    pub thread_dir: String,

    /// Board listing endpoint: "threads" or "catalog"
    #[serde(default = "default_listing")]
    pub listing: String,
}

fn default_thread_dir() -> String {
    "res".to_string()
}

fn default_listing() -> String {
    "threads".to_string()
}

/// What to do with the posts of polled threads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Download every attachment
    Download,
    /// Archive every post
    Archive,
    /// Fetch each target once and report the outcome
    Probe,
}

/// Archive storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Plaintext,
    Sqlite,
}

impl OutputFormat {
    /// Parses a format name, accepting the historical aliases
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "plaintext" | "ascii" | "text" | "txt" => Some(Self::Plaintext),
            "sqlite" | "sqlite3" | "db" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Filename used when the output path is a directory
    pub fn default_filename(&self) -> &'static str {
        match self {
            Self::Plaintext => "archive.txt",
            Self::Sqlite => "archive.db",
        }
    }
}

/// Per-invocation choices made on the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Raw target strings such as "/g/51971506"
    pub targets: Vec<String>,

    /// Imageboard alias
    pub site: String,

    pub mode: OutputMode,

    /// Loop forever instead of stopping once every thread has been polled
    pub continuous: bool,

    /// Output directory or archive file
    pub output: PathBuf,

    pub format: OutputFormat,

    /// Posts matching any of these are suppressed
    pub filters: Vec<FilterPredicate>,
}
