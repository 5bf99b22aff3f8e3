use crate::support::{mock_registry, run_options, test_config};
use chandere::config::OutputMode;
use chandere::output::{Downloader, COLLISION_PREFIX};
use chandere::site::Attachment;
use serde_json::json;
use std::fs;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve_file(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_same_original_name_gets_copy_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/g/thread/589254.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"posts": [
            {"no": 589254, "time": 1400000000, "tim": 1400000000001u64, "ext": ".png", "filename": "cat"},
            {"no": 589255, "resto": 589254, "time": 1400000001, "tim": 1400000000002u64, "ext": ".png", "filename": "cat"},
            {"no": 589256, "resto": 589254, "time": 1400000002, "com": "no file"}
        ]})))
        .mount(&server)
        .await;
    serve_file(&server, "/g/1400000000001.png", b"first").await;
    serve_file(&server, "/g/1400000000002.png", b"second").await;

    let dir = tempfile::tempdir().unwrap();
    let options = run_options(&["/g/589254"], OutputMode::Download, dir.path());
    let report = chandere::run(
        &test_config(),
        options,
        &mock_registry(&server),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.stats.files_downloaded, 2);
    assert_eq!(report.stats.dispatch_failures, 0);

    let plain = dir.path().join("cat.png");
    let copy = dir.path().join(format!("{}cat.png", COLLISION_PREFIX));
    assert!(plain.exists());
    assert!(copy.exists());

    let mut bodies = vec![fs::read(plain).unwrap(), fs::read(copy).unwrap()];
    bodies.sort();
    assert_eq!(bodies, vec![b"first".to_vec(), b"second".to_vec()]);
}

#[tokio::test]
async fn test_failed_download_is_reported_not_fatal() {
    let server = MockServer::start().await;
    serve_file(&server, "/ok.png", b"ok").await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = Downloader::new(reqwest::Client::new(), dir.path(), 2);
    let attachment = |route: &str, name: &str| Attachment {
        url: Url::parse(&format!("{}{}", server.uri(), route)).unwrap(),
        original_name: name.to_string(),
        server_name: name.to_string(),
    };

    let results = downloader
        .download_all(&[attachment("/ok.png", "ok.png"), attachment("/missing.png", "missing.png")])
        .await;

    assert_eq!(results.len(), 2);
    let failures = results.iter().filter(|(_, result)| result.is_err()).count();
    assert_eq!(failures, 1);
    assert_eq!(fs::read(dir.path().join("ok.png")).unwrap(), b"ok");
    assert!(!dir.path().join("missing.png").exists());
}

#[tokio::test]
async fn test_empty_original_name_uses_server_name() {
    let server = MockServer::start().await;
    serve_file(&server, "/g/123.jpg", b"jpeg").await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = Downloader::new(reqwest::Client::new(), dir.path(), 0);
    let attachment = Attachment {
        url: Url::parse(&format!("{}/g/123.jpg", server.uri())).unwrap(),
        original_name: String::new(),
        server_name: "123.jpg".to_string(),
    };

    let saved = downloader.download(&attachment).await.unwrap();
    assert_eq!(saved, dir.path().join("123.jpg"));
}

#[tokio::test]
async fn test_same_attachment_twice_keeps_both_files() {
    let server = MockServer::start().await;
    serve_file(&server, "/g/555.webm", b"video bytes").await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = Downloader::new(reqwest::Client::new(), dir.path(), 1);
    let attachment = Attachment {
        url: Url::parse(&format!("{}/g/555.webm", server.uri())).unwrap(),
        original_name: "clip.webm".to_string(),
        server_name: "555.webm".to_string(),
    };

    let first = downloader.download(&attachment).await.unwrap();
    let second = downloader.download(&attachment).await.unwrap();

    assert_eq!(first, dir.path().join("clip.webm"));
    assert_eq!(second, dir.path().join("(Copy) clip.webm"));
    assert_eq!(fs::read(first).unwrap(), b"video bytes");
    assert_eq!(fs::read(second).unwrap(), b"video bytes");
}

#[tokio::test]
async fn test_hostile_server_name_stays_in_output_dir() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/g/thread/589254.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"posts": [
            {"no": 589254, "time": 1400000000, "tim": "../escaped", "ext": ".txt"}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"escaped\.txt$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let out = root.path().join("out");
    fs::create_dir(&out).unwrap();
    let options = run_options(&["/g/589254"], OutputMode::Download, &out);
    let report = chandere::run(
        &test_config(),
        options,
        &mock_registry(&server),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.stats.files_downloaded, 1);
    assert!(!root.path().join("escaped.txt").exists());
    let names: Vec<_> = fs::read_dir(&out)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["_escaped.txt"]);
    assert_eq!(fs::read(out.join("_escaped.txt")).unwrap(), b"payload");
}
