use crate::site::PostRecord;
use chrono::DateTime;

/// Width of the plaintext archive
pub const WIDTH: usize = 80;

pub(crate) const POST_PREFIX: &str = "Post ID: ";
pub(crate) const THREAD_PREFIX: &str = "Thread: ";
const FILE_PREFIX: &str = "File: ";
const NO_SUBJECT: &str = "[No Subject]";
const NO_FILE: &str = "[No File]";

/// Horizontal rule separating header and body
pub fn rule() -> String {
    "*".repeat(WIDTH)
}

/// Renders a unix timestamp the way `ctime(3)` does, in UTC
pub fn format_timestamp(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|date| date.format("%a %b %e %H:%M:%S %Y").to_string())
        .unwrap_or_else(|| "an unknown date".to_string())
}

/// Formats one post as a plaintext archive record
///
/// The record starts with a rule, carries the post and thread identifiers,
/// author, date, subject and filename, then the body wrapped at 80 columns,
/// and ends with a rule. Records are separated by a blank line when written.
/// Every record has the same header shape: a missing subject or file is
/// written as a placeholder.
pub fn format_record(record: &PostRecord) -> String {
    let rule = rule();
    let mut out = String::new();

    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!("{}{}\n", POST_PREFIX, single_line(&record.no)));
    out.push_str(&format!(
        "{}/{}/{}\n",
        THREAD_PREFIX,
        single_line(&record.board),
        single_line(&record.thread)
    ));

    let name = if record.name.trim().is_empty() {
        "Anonymous".to_string()
    } else {
        single_line(&record.name)
    };
    let trip = if record.trip.is_empty() {
        String::new()
    } else {
        format!(" {}", single_line(&record.trip))
    };
    out.push_str(&format!(
        "{}{} on {}\n",
        name,
        trip,
        format_timestamp(record.timestamp)
    ));

    if record.subject.trim().is_empty() {
        out.push_str(NO_SUBJECT);
    } else {
        out.push_str(&format!("\"{}\"", single_line(&record.subject)));
    }
    out.push('\n');

    match record.filename.as_deref().map(single_line) {
        Some(filename) if !filename.is_empty() => {
            out.push_str(&format!("{}{}\n", FILE_PREFIX, filename))
        }
        _ => out.push_str(&format!("{}{}\n", FILE_PREFIX, NO_FILE)),
    }

    out.push_str(&rule);
    out.push('\n');

    for line in record.body.lines() {
        for wrapped in textwrap::wrap(line, WIDTH) {
            // A body line must never read as a record header
            if wrapped.starts_with(POST_PREFIX) {
                out.push(' ');
            }
            out.push_str(&wrapped);
            out.push('\n');
        }
    }

    out.push_str(&rule);
    out.push('\n');
    out
}

/// Collapses a header field onto one line
fn single_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
