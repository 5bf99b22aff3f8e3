//! Lynxchan JSON adapter (endchan)
//!
//! Thread JSON is the opening post itself, with replies nested under
//! `posts`. The OP carries `threadId` while replies carry `postId`, so the
//! adapter copies the OP's id into a `postId` field to give filters one
//! field name for every post.

use crate::site::{
    html_to_text, is_valid_board, is_valid_thread, join_segments, sanitize_filename,
    string_field, value_id, value_timestamp, Attachment, Post, PostRecord, SiteAdapter,
    SiteEndpoints, SiteFamily,
};
use serde_json::{Map, Value};
use url::Url;

const ID_FIELD: &str = "postId";
const THREAD_FIELD: &str = "threadId";

#[derive(Debug, Clone)]
pub struct LynxchanAdapter {
    name: String,
    endpoints: SiteEndpoints,
}

impl LynxchanAdapter {
    pub fn new(name: impl Into<String>, endpoints: SiteEndpoints) -> Self {
        Self {
            name: name.into(),
            endpoints,
        }
    }

    /// Resolves a server-relative file path such as `/.media/abc.png`
    fn file_url(&self, path: &str) -> Option<Url> {
        let path = path.trim().trim_start_matches('/');
        if path.is_empty() {
            return None;
        }

        let mut base = self.endpoints.media_base.clone();
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }
        base.join(path).ok()
    }
}

impl SiteAdapter for LynxchanAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> SiteFamily {
        SiteFamily::Lynxchan
    }

    fn build_uri(&self, board: &str, thread: Option<&str>) -> Option<Url> {
        if !is_valid_board(board) {
            return None;
        }
        let board = board.trim();

        match thread {
            None => join_segments(&self.endpoints.api_base, &[board, "catalog.json"]),
            Some(thread) if is_valid_thread(thread) => join_segments(
                &self.endpoints.api_base,
                &[board, "res", &format!("{}.json", thread)],
            ),
            Some(_) => None,
        }
    }

    fn extract_threads(&self, listing: &Value) -> Vec<String> {
        listing
            .as_array()
            .map(|threads| {
                threads
                    .iter()
                    .filter_map(|thread| value_id(thread.get(THREAD_FIELD)))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn extract_posts(&self, thread: &Value) -> Vec<Post> {
        let Some(op) = thread.as_object() else {
            return Vec::new();
        };
        let Some(thread_id) = value_id(op.get(THREAD_FIELD)) else {
            return Vec::new();
        };

        let mut fields = op.clone();
        let replies = match fields.remove("posts") {
            Some(Value::Array(replies)) => replies,
            _ => Vec::new(),
        };
        let id_field = self.post_id_field_name();
        fields
            .entry(id_field)
            .or_insert_with(|| Value::String(thread_id.clone()));

        let mut posts = vec![Post {
            id: thread_id.clone(),
            thread: thread_id.clone(),
            fields,
        }];

        posts.extend(replies.into_iter().filter_map(|reply| {
            let Value::Object(fields) = reply else {
                return None;
            };
            Some(Post {
                id: value_id(fields.get(id_field))?,
                thread: thread_id.clone(),
                fields,
            })
        }));

        posts
    }

    fn extract_attachments(&self, post: &Post, _board: &str) -> Vec<Attachment> {
        let Some(files) = post.field("files").and_then(Value::as_array) else {
            return Vec::new();
        };

        files
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|file: &Map<String, Value>| {
                let path = string_field(file, "path");
                let url = self.file_url(&path)?;
                let server_name = url
                    .path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .unwrap_or_default()
                    .to_string();
                let original = sanitize_filename(&string_field(file, "originalName"));
                Some(Attachment {
                    url,
                    original_name: if original.is_empty() {
                        server_name.clone()
                    } else {
                        original
                    },
                    server_name,
                })
            })
            .collect()
    }

    fn post_id_field_name(&self) -> &str {
        ID_FIELD
    }

    fn record(&self, post: &Post, board: &str) -> PostRecord {
        let fields = &post.fields;
        let filename = fields
            .get("files")
            .and_then(Value::as_array)
            .and_then(|files| files.first())
            .and_then(Value::as_object)
            .map(|file| string_field(file, "originalName"))
            .filter(|name| !name.is_empty());

        let body = match string_field(fields, "message") {
            message if !message.is_empty() => message,
            _ => html_to_text(&string_field(fields, "markdown")),
        };

        PostRecord {
            board: board.to_string(),
            no: post.id.clone(),
            thread: post.thread.clone(),
            timestamp: value_timestamp(fields.get("creation")),
            name: string_field(fields, "name"),
            trip: string_field(fields, "signedRole"),
            subject: string_field(fields, "subject"),
            body,
            filename,
        }
    }
}
