//! Infinity Next JSON adapter (nextchan)
//!
//! Thread JSON is the opening post with replies nested under `replies`.
//! Attachments are addressed by attachment id and upload time rather than
//! by a stored filename.

use crate::site::{
    html_to_text, is_valid_board, is_valid_thread, join_segments, parse_timestamp,
    sanitize_filename, string_field, value_id, value_timestamp, Attachment, Post, PostRecord,
    SiteAdapter, SiteEndpoints, SiteFamily,
};
use serde_json::{Map, Value};
use url::Url;

const ID_FIELD: &str = "board_id";

#[derive(Debug, Clone)]
pub struct InfinityAdapter {
    name: String,
    endpoints: SiteEndpoints,
}

impl InfinityAdapter {
    pub fn new(name: impl Into<String>, endpoints: SiteEndpoints) -> Self {
        Self {
            name: name.into(),
            endpoints,
        }
    }

    fn attachment(&self, index: usize, file: &Map<String, Value>) -> Option<Attachment> {
        let pivot = file.get("pivot")?.as_object()?;
        let original = string_field(pivot, "filename");
        let attachment_id = value_id(pivot.get("attachment_id"))?;
        let (_, extension) = original.rsplit_once('.')?;
        let uploaded = parse_timestamp(&string_field(file, "first_uploaded_at"))?;

        let server_name = format!("{}-{}.{}", uploaded, index, extension);
        let url = join_segments(&self.endpoints.media_base, &[&attachment_id, &server_name])?;

        Some(Attachment {
            url,
            original_name: sanitize_filename(&original),
            server_name,
        })
    }
}

impl SiteAdapter for InfinityAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> SiteFamily {
        SiteFamily::Infinity
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
                &[board, "thread", &format!("{}.json", thread)],
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
                    .filter_map(|thread| value_id(thread.get(ID_FIELD)))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn extract_posts(&self, thread: &Value) -> Vec<Post> {
        let Some(op) = thread.as_object() else {
            return Vec::new();
        };
        let id_field = self.post_id_field_name();
        let Some(op_id) = value_id(op.get(id_field)) else {
            return Vec::new();
        };

        let mut fields = op.clone();
        let replies = match fields.remove("replies") {
            Some(Value::Array(replies)) => replies,
            _ => Vec::new(),
        };

        let mut posts = vec![Post {
            id: op_id.clone(),
            thread: op_id.clone(),
            fields,
        }];

        posts.extend(replies.into_iter().filter_map(|reply| {
            let Value::Object(fields) = reply else {
                return None;
            };
            let id = value_id(fields.get(id_field))?;
            let thread = value_id(fields.get("reply_to_board_id")).unwrap_or_else(|| op_id.clone());
            Some(Post { id, thread, fields })
        }));

        posts
    }

    fn extract_attachments(&self, post: &Post, _board: &str) -> Vec<Attachment> {
        let Some(files) = post.field("attachments").and_then(Value::as_array) else {
            return Vec::new();
        };

        files
            .iter()
            .enumerate()
            .filter_map(|(index, file)| self.attachment(index, file.as_object()?))
            .collect()
    }

    fn post_id_field_name(&self) -> &str {
        ID_FIELD
    }

    fn record(&self, post: &Post, board: &str) -> PostRecord {
        let fields = &post.fields;
        let filename = fields
            .get("attachments")
            .and_then(Value::as_array)
            .and_then(|files| files.first())
            .and_then(|file| file.get("pivot"))
            .and_then(Value::as_object)
            .map(|pivot| string_field(pivot, "filename"))
            .filter(|name| !name.is_empty());

        let body = match string_field(fields, "content_raw") {
            raw if !raw.is_empty() => raw,
            _ => html_to_text(&string_field(fields, "content_html")),
        };

        PostRecord {
            board: board.to_string(),
            no: post.id.clone(),
            thread: post.thread.clone(),
            timestamp: value_timestamp(fields.get("created_at")),
            name: string_field(fields, "author"),
            trip: string_field(fields, "insecure_tripcode"),
            subject: string_field(fields, "subject"),
            body,
            filename,
        }
    }
}
