use chandere::site::PostRecord;
use chandere::storage::{open_archive, ArchiveWriter, PlaintextArchive, SqliteArchive};
use chandere::config::OutputFormat;
use std::fs;

fn record(no: &str, thread: &str, body: &str) -> PostRecord {
    PostRecord {
        board: "g".to_string(),
        no: no.to_string(),
        thread: thread.to_string(),
        timestamp: Some(1400000000),
        name: "Anonymous".to_string(),
        body: body.to_string(),
        ..Default::default()
    }
}

fn post_ids(content: &str) -> Vec<&str> {
    content
        .lines()
        .filter_map(|line| line.strip_prefix("Post ID: "))
        .collect()
}

#[test]
fn test_replies_land_under_their_thread() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("g.txt");
    let mut archive = PlaintextArchive::new(&path);

    archive
        .archive(&[record("100", "100", "first thread"), record("101", "100", "reply")])
        .unwrap();
    archive
        .archive(&[record("200", "200", "second thread"), record("201", "200", "reply")])
        .unwrap();
    // A late reply to the first thread goes after its last record
    archive.archive(&[record("102", "100", "late reply")]).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(post_ids(&content), vec!["100", "101", "102", "200", "201"]);
}

#[test]
fn test_rewrites_skip_known_posts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("g.txt");
    let mut archive = PlaintextArchive::new(&path);

    assert_eq!(archive.archive(&[record("1", "1", "op")]).unwrap(), 1);
    assert_eq!(archive.archive(&[record("1", "1", "op")]).unwrap(), 0);

    // A fresh writer on the same file sees what is already there
    let mut reopened = PlaintextArchive::new(&path);
    assert_eq!(
        reopened
            .archive(&[record("1", "1", "op"), record("2", "1", "new")])
            .unwrap(),
        1
    );
    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(post_ids(&content), vec!["1", "2"]);
}

#[test]
fn test_sqlite_archive_persists_across_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.db");

    {
        let mut archive = open_archive(OutputFormat::Sqlite, &path).unwrap();
        archive
            .archive(&[record("1", "1", "op"), record("2", "1", "reply")])
            .unwrap();
    }

    let mut archive = SqliteArchive::open(&path).unwrap();
    assert_eq!(archive.archive(&[record("2", "1", "reply")]).unwrap(), 0);
    assert_eq!(archive.count_posts().unwrap(), 2);

    let posts = archive.thread_posts("g", "1").unwrap();
    assert_eq!(posts.len(), 2);
    assert!(posts[0].is_op());
    assert_eq!(posts[1].body, "reply");
}

#[test]
fn test_body_starting_with_post_id_survives_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("g.txt");
    let mut archive = PlaintextArchive::new(&path);

    archive
        .archive(&[record("1", "1", "Post ID: 99\nquoted text")])
        .unwrap();
    archive.archive(&[record("2", "2", "next thread")]).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("quoted text"));
    assert!(content.contains("[No Subject]"));
    assert_eq!(post_ids(&content), vec!["1", "2"]);
}
