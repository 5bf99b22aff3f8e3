//! Site adapters for imageboard JSON APIs
//!
//! Each imageboard family lays out its endpoints and post fields differently.
//! A `SiteAdapter` hides those differences behind one capability interface:
//! forming fetch URIs, enumerating threads from a board listing, extracting
//! posts and attachments, and normalising posts for archive writers.
//!
//! # Families
//!
//! - `VichanAdapter`: Vichan/Futaba JSON (4chan, 8chan, lainchan)
//! - `LynxchanAdapter`: Lynxchan JSON (endchan)
//! - `InfinityAdapter`: Infinity Next JSON (nextchan)

mod infinity;
mod lynxchan;
mod markup;
mod registry;
mod target;
mod vichan;

pub use infinity::InfinityAdapter;
pub use lynxchan::LynxchanAdapter;
pub use markup::html_to_text;
pub use registry::SiteRegistry;
pub use target::parse_target;
pub use vichan::{Listing, MediaLayout, VichanAdapter};

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};
use std::fmt;
use url::Url;

/// JSON API family of an imageboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteFamily {
    Vichan,
    Lynxchan,
    Infinity,
}

impl SiteFamily {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "vichan" | "futaba" => Some(Self::Vichan),
            "lynxchan" => Some(Self::Lynxchan),
            "infinity" | "infinity-next" => Some(Self::Infinity),
            _ => None,
        }
    }
}

impl fmt::Display for SiteFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Vichan => "vichan",
            Self::Lynxchan => "lynxchan",
            Self::Infinity => "infinity",
        };
        f.write_str(name)
    }
}

/// Base URLs an adapter builds its URIs from
#[derive(Debug, Clone)]
pub struct SiteEndpoints {
    /// Where board listings and thread JSON live
    pub api_base: Url,
    /// Where attachments are served from
    pub media_base: Url,
}

impl SiteEndpoints {
    pub fn new(api_base: Url, media_base: Url) -> Self {
        Self {
            api_base,
            media_base,
        }
    }

    /// Uses one base URL for both JSON and media
    pub fn single(base: Url) -> Self {
        Self {
            media_base: base.clone(),
            api_base: base,
        }
    }
}

/// One post as delivered by the imageboard
///
/// `fields` keeps the raw JSON object so filters can address any
/// site-specific field by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// Post identifier, taken from the adapter's id field
    pub id: String,
    /// Identifier of the thread's opening post (equal to `id` for the OP)
    pub thread: String,
    pub fields: Map<String, Value>,
}

impl Post {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Stringified field value; a missing field is the empty string
    pub fn field_string(&self, name: &str) -> String {
        self.fields.get(name).map(value_to_string).unwrap_or_default()
    }

    pub fn is_op(&self) -> bool {
        self.id == self.thread
    }
}

/// A file attached to a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: Url,
    /// Filename as uploaded by the poster
    pub original_name: String,
    /// Filename as stored by the server
    pub server_name: String,
}

/// A post normalised for archive writers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostRecord {
    pub board: String,
    pub no: String,
    pub thread: String,
    /// Unix timestamp, when the site provided a parseable one
    pub timestamp: Option<i64>,
    pub name: String,
    pub trip: String,
    pub subject: String,
    /// Plain-text body with markup removed
    pub body: String,
    pub filename: Option<String>,
}

impl PostRecord {
    pub fn is_op(&self) -> bool {
        self.no == self.thread
    }
}

/// Per-imageboard translation layer
pub trait SiteAdapter: Send + Sync + fmt::Debug {
    /// Alias this adapter is registered under
    fn name(&self) -> &str;

    fn family(&self) -> SiteFamily;

    /// Forms the listing URI (no thread) or the thread URI
    ///
    /// Returns None when the board or thread cannot be expressed as a URI.
    fn build_uri(&self, board: &str, thread: Option<&str>) -> Option<Url>;

    /// Every thread number found in a board listing
    fn extract_threads(&self, listing: &Value) -> Vec<String>;

    /// Every post in a thread, opening post first
    fn extract_posts(&self, thread: &Value) -> Vec<Post>;

    /// Every file attached to a post
    fn extract_attachments(&self, post: &Post, board: &str) -> Vec<Attachment>;

    /// Name of the field holding post identifiers
    fn post_id_field_name(&self) -> &str;

    /// Normalises a post for the archive writers
    fn record(&self, post: &Post, board: &str) -> PostRecord;
}

/// Renders a JSON value the way filters and archives see it
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Reads an identifier that may be encoded as a number or a string
pub(crate) fn value_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Reads a timestamp encoded as unix seconds, RFC 3339 or `YYYY-MM-DD HH:MM:SS`
pub(crate) fn value_timestamp(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => parse_timestamp(s),
        _ => None,
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return Some(secs);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.timestamp());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc().timestamp())
}

/// Appends path segments to a base URL, percent-encoding each one
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> Option<Url> {
    let mut url = base.clone();
    {
        let mut path = url.path_segments_mut().ok()?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Some(url)
}

/// A board must be a single non-empty path segment
pub(crate) fn is_valid_board(board: &str) -> bool {
    let board = board.trim();
    !board.is_empty()
        && board != "."
        && board != ".."
        && !board.contains('/')
        && !board.chars().any(char::is_whitespace)
}

pub(crate) fn is_valid_thread(thread: &str) -> bool {
    !thread.is_empty() && thread.chars().all(|c| c.is_ascii_digit())
}

pub(crate) fn string_field(fields: &Map<String, Value>, name: &str) -> String {
    fields.get(name).map(value_to_string).unwrap_or_default()
}

/// Removes path separators so an uploaded name cannot escape the output directory
pub(crate) fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            other => other,
        })
        .collect::<String>()
        .trim()
        .trim_start_matches('.')
        .to_string()
}
