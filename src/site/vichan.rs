//! Vichan/Futaba JSON adapter
//!
//! Covers 4chan and the vichan-derived boards (8chan, lainchan). Listings are
//! arrays of pages, each holding a `threads` array; thread JSON holds a flat
//! `posts` array where replies point at their OP through `resto`.

use crate::site::{
    html_to_text, is_valid_board, is_valid_thread, join_segments, sanitize_filename,
    string_field, value_id, value_timestamp, Attachment, Post, PostRecord, SiteAdapter,
    SiteEndpoints, SiteFamily,
};
use serde_json::{Map, Value};
use url::Url;

/// Which board listing endpoint a site offers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// `threads.json`
    Threads,
    /// `catalog.json`
    Catalog,
}

impl Listing {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "threads" => Some(Self::Threads),
            "catalog" => Some(Self::Catalog),
            _ => None,
        }
    }

    fn endpoint(&self) -> &'static str {
        match self {
            Self::Threads => "threads.json",
            Self::Catalog => "catalog.json",
        }
    }
}

/// Where a site stores uploaded files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaLayout {
    /// `{media}/{board}/{tim}{ext}` (4chan)
    BoardScoped,
    /// `{media}/{board}/src/{tim}{ext}` (stock vichan)
    BoardSrc,
    /// 64-character hashed names under `{media}/file_store/`, else `BoardSrc`
    FileStore,
}

#[derive(Debug, Clone)]
pub struct VichanAdapter {
    name: String,
    endpoints: SiteEndpoints,
    thread_dir: String,
    listing: Listing,
    media: MediaLayout,
}

impl VichanAdapter {
    pub fn new(
        name: impl Into<String>,
        endpoints: SiteEndpoints,
        thread_dir: impl Into<String>,
        listing: Listing,
        media: MediaLayout,
    ) -> Self {
        Self {
            name: name.into(),
            endpoints,
            thread_dir: thread_dir.into(),
            listing,
            media,
        }
    }

    fn file_url(&self, board: &str, tim: &str, ext: &str) -> Option<Url> {
        let stored = format!("{}{}", tim, ext);
        let base = &self.endpoints.media_base;
        match self.media {
            MediaLayout::BoardScoped => join_segments(base, &[board, &stored]),
            MediaLayout::FileStore if tim.len() == 64 => {
                join_segments(base, &["file_store", &stored])
            }
            MediaLayout::BoardSrc | MediaLayout::FileStore => {
                join_segments(base, &[board, "src", &stored])
            }
        }
    }

    fn attachment(&self, board: &str, file: &Map<String, Value>) -> Option<Attachment> {
        let tim = value_id(file.get("tim"))?;
        let ext = string_field(file, "ext");
        let server_name = sanitize_filename(&format!("{}{}", tim, ext));

        let uploaded = string_field(file, "filename");
        let original_name = match sanitize_filename(&format!("{}{}", html_to_text(&uploaded), ext)) {
            name if uploaded.is_empty() || name.is_empty() => server_name.clone(),
            name => name,
        };

        Some(Attachment {
            url: self.file_url(board, &tim, &ext)?,
            original_name,
            server_name,
        })
    }
}

impl SiteAdapter for VichanAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> SiteFamily {
        SiteFamily::Vichan
    }

    fn build_uri(&self, board: &str, thread: Option<&str>) -> Option<Url> {
        if !is_valid_board(board) {
            return None;
        }
        let board = board.trim();

        match thread {
            None => join_segments(&self.endpoints.api_base, &[board, self.listing.endpoint()]),
            Some(thread) if is_valid_thread(thread) => join_segments(
                &self.endpoints.api_base,
                &[board, &self.thread_dir, &format!("{}.json", thread)],
            ),
            Some(_) => None,
        }
    }

    fn extract_threads(&self, listing: &Value) -> Vec<String> {
        let Some(entries) = listing.as_array() else {
            return Vec::new();
        };

        entries
            .iter()
            .flat_map(|entry| match entry.get("threads").and_then(Value::as_array) {
                Some(threads) => threads.iter().collect::<Vec<_>>(),
                // Some catalogs are a flat array of thread objects
                None => vec![entry],
            })
            .filter_map(|thread| value_id(thread.get("no")))
            .collect()
    }

    fn extract_posts(&self, thread: &Value) -> Vec<Post> {
        let Some(posts) = thread.get("posts").and_then(Value::as_array) else {
            return Vec::new();
        };

        let id_field = self.post_id_field_name();
        posts
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|fields| {
                let id = value_id(fields.get(id_field))?;
                let thread = match value_id(fields.get("resto")) {
                    Some(resto) if resto != "0" => resto,
                    _ => id.clone(),
                };
                Some(Post {
                    id,
                    thread,
                    fields: fields.clone(),
                })
            })
            .collect()
    }

    fn extract_attachments(&self, post: &Post, board: &str) -> Vec<Attachment> {
        let mut attachments = Vec::new();

        if post.fields.contains_key("tim") {
            attachments.extend(self.attachment(board, &post.fields));
        }

        if let Some(extra) = post.field("extra_files").and_then(Value::as_array) {
            attachments.extend(
                extra
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(|file| self.attachment(board, file)),
            );
        }

        attachments
    }

    fn post_id_field_name(&self) -> &str {
        "no"
    }

    fn record(&self, post: &Post, board: &str) -> PostRecord {
        let fields = &post.fields;
        let filename = string_field(fields, "filename");
        let ext = string_field(fields, "ext");

        PostRecord {
            board: board.to_string(),
            no: post.id.clone(),
            thread: post.thread.clone(),
            timestamp: value_timestamp(fields.get("time")),
            name: html_to_text(&string_field(fields, "name")),
            trip: string_field(fields, "trip"),
            subject: html_to_text(&string_field(fields, "sub")),
            body: html_to_text(&string_field(fields, "com")),
            filename: (!filename.is_empty() && !ext.is_empty())
                .then(|| format!("{}{}", html_to_text(&filename), ext)),
        }
    }
}
