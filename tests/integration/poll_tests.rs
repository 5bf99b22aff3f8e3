use crate::support::{listing, mock_registry, mock_site, reply, run_options, test_config, thread};
use chandere::config::{OutputFormat, OutputMode};
use chandere::poller::build_http_client;
use chandere::state::PollState;
use chandere::storage::SqliteArchive;
use chandere::{ChandereError, Poller, TargetError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LAST_MODIFIED: &str = "Wed, 21 Oct 2015 07:28:00 GMT";

async fn mount_board_and_thread(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/g/threads.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[589254])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/g/thread/589254.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(thread(vec![reply(589255, "first")])),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_run_once_board_to_archive() {
    let server = MockServer::start().await;
    mount_board_and_thread(&server).await;
    let dir = tempfile::tempdir().unwrap();

    let mut options = run_options(&["/g/"], OutputMode::Archive, dir.path());
    options.format = OutputFormat::Sqlite;
    let report = chandere::run(
        &test_config(),
        options,
        &mock_registry(&server),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.stats.cycles, 2);
    assert_eq!(report.stats.threads_discovered, 1);
    assert_eq!(report.stats.posts_dispatched, 2);
    assert!(report.probes.is_empty());

    let archive = SqliteArchive::open(&dir.path().join("archive.db")).unwrap();
    assert_eq!(archive.count_posts().unwrap(), 2);
    let posts = archive.thread_posts("g", "589254").unwrap();
    assert_eq!(posts[0].no, "589254");
    assert_eq!(posts[0].subject, "Rust thread");
}

#[tokio::test]
async fn test_continuous_mode_keeps_thread_alive() {
    let server = MockServer::start().await;
    mount_board_and_thread(&server).await;

    let config = test_config();
    let client = build_http_client(&config).unwrap();
    let mut poller = Poller::new(&config, mock_site(&server), client, Vec::new(), true);
    poller.register_targets(&["/g/".to_string()]).unwrap();
    let cancel = CancellationToken::new();

    let first = poller.run_cycle(&cancel).await;
    assert_eq!(first.successes, 1);
    assert_eq!(first.threads_added, 1);

    let second = poller.run_cycle(&cancel).await;
    assert_eq!(second.successes, 2);
    assert_eq!(second.threads_added, 0);

    // Both the board and its thread are still tracked
    assert_eq!(poller.registry().len(), 2);
    let thread = poller
        .registry()
        .iter()
        .find(|target| target.is_thread())
        .unwrap();
    assert_eq!(thread.label(), "/g/589254");
    assert_eq!(poller.seen().len(), 2);
}

#[tokio::test]
async fn test_conditional_requests_use_last_modified() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/g/thread/589254.json"))
        .and(header("If-Modified-Since", LAST_MODIFIED))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/g/thread/589254.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Last-Modified", LAST_MODIFIED)
                .set_body_json(thread(Vec::new())),
        )
        .with_priority(2)
        .mount(&server)
        .await;

    let config = test_config();
    let client = build_http_client(&config).unwrap();
    let mut poller = Poller::new(&config, mock_site(&server), client, Vec::new(), true);
    poller.register_targets(&["/g/589254".to_string()]).unwrap();
    let cancel = CancellationToken::new();

    let first = poller.run_cycle(&cancel).await;
    assert_eq!(first.successes, 1);

    let second = poller.run_cycle(&cancel).await;
    assert_eq!(second.not_modified, 1);
    assert_eq!(poller.registry().len(), 1);
    assert_eq!(poller.stats().not_modified, 1);
}

#[tokio::test]
async fn test_posts_are_delivered_once_across_cycles() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/g/thread/589254.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(thread(vec![reply(589255, "first")])),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/g/thread/589254.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(thread(vec![
            reply(589255, "first"),
            reply(589256, "second"),
        ])))
        .with_priority(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let archive_path = dir.path().join("g.txt");
    let config = test_config();
    let client = build_http_client(&config).unwrap();
    let sink = chandere::output::Sink::Archive(Box::new(chandere::storage::PlaintextArchive::new(
        &archive_path,
    )));
    let mut poller =
        Poller::new(&config, mock_site(&server), client, Vec::new(), true).with_sink(sink);
    poller.register_targets(&["/g/589254".to_string()]).unwrap();
    let cancel = CancellationToken::new();

    poller.run_cycle(&cancel).await;
    poller.run_cycle(&cancel).await;

    assert_eq!(poller.stats().posts_dispatched, 3);
    let content = std::fs::read_to_string(&archive_path).unwrap();
    assert_eq!(content.matches("Post ID: ").count(), 3);
    assert_eq!(content.matches("Post ID: 589256\n").count(), 1);
}

#[tokio::test]
async fn test_filtered_posts_never_reach_the_sink() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/g/thread/589254.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(thread(vec![
            reply(589255, "buy cheap watches"),
            reply(589256, "nice project"),
        ])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut options = run_options(&["/g/589254"], OutputMode::Archive, dir.path());
    options.filters = vec!["com:cheap*".parse().unwrap()];
    let report = chandere::run(
        &test_config(),
        options,
        &mock_registry(&server),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.stats.posts_filtered, 1);
    assert_eq!(report.stats.posts_dispatched, 2);
    let content = std::fs::read_to_string(dir.path().join("archive.txt")).unwrap();
    assert!(!content.contains("watches"));
    assert!(content.contains("nice project"));
}

#[tokio::test]
async fn test_probe_reports_in_registration_order() {
    let server = MockServer::start().await;
    mount_board_and_thread(&server).await;
    let dir = tempfile::tempdir().unwrap();

    let options = run_options(&["/g/589254", "/g/", "/g/1"], OutputMode::Probe, dir.path());
    let report = chandere::run(
        &test_config(),
        options,
        &mock_registry(&server),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let labels: Vec<_> = report.probes.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["/g/589254", "/g/", "/g/1"]);
    assert_eq!(report.probes[0].detail.as_deref(), Some("2 post(s)"));
    assert_eq!(report.probes[1].detail.as_deref(), Some("1 thread(s)"));
    assert_eq!(report.probes[2].outcome, "not-found");
    assert_eq!(report.stats.cycles, 1);

    // Probe mode writes nothing
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_no_valid_targets_is_fatal() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let options = run_options(&["", "/../"], OutputMode::Archive, dir.path());
    let result = chandere::run(
        &test_config(),
        options,
        &mock_registry(&server),
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(ChandereError::NoValidTargets)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unwritable_output_is_fatal() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");

    let options = run_options(&["/g/"], OutputMode::Download, &missing);
    let result = chandere::run(
        &test_config(),
        options,
        &mock_registry(&server),
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(
        result,
        Err(ChandereError::UnwritableOutputPath { .. })
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_site() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut options = run_options(&["/g/"], OutputMode::Probe, dir.path());
    options.site = "nosuchchan".to_string();

    let result = chandere::run(
        &test_config(),
        options,
        &mock_registry(&server),
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(
        result,
        Err(ChandereError::Target(TargetError::UnknownSite(_)))
    ));
}

#[tokio::test]
async fn test_cancel_interrupts_continuous_sleep() {
    let server = MockServer::start().await;
    mount_board_and_thread(&server).await;

    let mut config = test_config();
    config.poller.interval = 3600;
    let client = build_http_client(&config).unwrap();
    let mut poller = Poller::new(&config, mock_site(&server), client, Vec::new(), true);
    poller.register_targets(&["/g/589254".to_string()]).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let stats = tokio::time::timeout(Duration::from_secs(10), poller.run(&cancel))
        .await
        .expect("run should stop when cancelled");

    assert_eq!(stats.cycles, 1);
    assert_eq!(poller.state(), PollState::Done);
    assert_eq!(poller.registry().len(), 1);
}

#[tokio::test]
async fn test_concurrency_cap_limits_parallel_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(200))
                .set_body_json(thread(Vec::new())),
        )
        .mount(&server)
        .await;

    let mut config = test_config();
    config.poller.concurrency = 2;
    let client = build_http_client(&config).unwrap();
    let mut poller = Poller::new(&config, mock_site(&server), client, Vec::new(), true);
    let targets: Vec<String> = (1..=6).map(|no| format!("/g/{}", no)).collect();
    poller.register_targets(&targets).unwrap();

    let started = Instant::now();
    let report = poller.run_cycle(&CancellationToken::new()).await;

    // Six fetches, two at a time, 200ms each
    assert_eq!(report.fetched, 6);
    assert!(started.elapsed() >= Duration::from_millis(550));
}

#[tokio::test]
async fn test_board_expansion_then_single_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/g/threads.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[589254])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/g/thread/589254.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "posts": [{"no": 1, "time": 0, "name": "A", "com": "hi"}]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let archive_path = dir.path().join("archive.txt");
    let config = test_config();
    let client = build_http_client(&config).unwrap();
    let sink = chandere::output::Sink::Archive(Box::new(chandere::storage::PlaintextArchive::new(
        &archive_path,
    )));
    let mut poller =
        Poller::new(&config, mock_site(&server), client, Vec::new(), false).with_sink(sink);
    poller.register_targets(&["/g/".to_string()]).unwrap();
    let cancel = CancellationToken::new();

    // The listing replaces the board with its thread
    poller.run_cycle(&cancel).await;
    let labels: Vec<_> = poller.registry().iter().map(|t| t.label()).collect();
    assert_eq!(labels, vec!["/g/589254"]);
    assert!(!archive_path.exists());
    assert_eq!(
        chandere::poller::decide_next(false, poller.registry()),
        PollState::Draining
    );

    poller.run_cycle(&cancel).await;
    let content = std::fs::read_to_string(&archive_path).unwrap();
    assert_eq!(content.matches("Post ID: ").count(), 1);
    assert!(content.contains("Post ID: 1\n"));
    assert!(content.contains("A on Thu Jan  1 00:00:00 1970"));
    assert!(content.contains("hi"));

    let thread = poller.registry().iter().next().unwrap();
    assert_eq!(thread.label(), "/g/589254");
    assert_eq!(
        chandere::poller::decide_next(false, poller.registry()),
        PollState::Done
    );
}
